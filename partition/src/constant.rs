//! Constant-like op predicates consulted by pre-replication and cluster
//! initialization.

use cleaver_ir::{Function, OpId, ops};

/// A constant-like op: a `const` with no operands, one result and a
/// `value` elements attribute.
pub fn is_constant_like(func: &Function, op: OpId) -> bool {
    let data = func.op(op);
    data.name() == ops::CONST
        && data.num_operands() == 0
        && data.num_results() == 1
        && data.get_attr(ops::VALUE_ATTR).is_some_and(|attr| attr.as_elements().is_some())
}

/// A constant-like op whose literal is a splat (every element equal).
pub fn is_splat_constant(func: &Function, op: OpId) -> bool {
    is_constant_like(func, op)
        && func
            .op(op)
            .get_attr(ops::VALUE_ATTR)
            .and_then(|attr| attr.as_elements())
            .is_some_and(|elements| elements.is_splat())
}
