use std::collections::HashSet;

use cleaver_ir::prelude::*;

use crate::constant::{is_constant_like, is_splat_constant};
use crate::replicate::replicate_defining_ops;
use crate::test::helpers::*;

fn count_consts(func: &Function) -> usize {
    func.body_ops().iter().filter(|&&op| func.op(op).name() == ops::CONST).count()
}

#[test]
fn shared_splat_gets_private_copies() {
    let mut func = Function::new("f", FunctionType::new(vec![], vec![f32()]));
    let entry = func.entry();
    let k = func.append_op(entry, splat_const(1.0));
    let x = func.append_op(entry, unary("neg", res(k)));
    let y = func.append_op(entry, unary("abs", res(k)));
    let z = func.append_op(entry, binary("add", res(x), res(y)));
    func.append_op(entry, Operation::new(ops::RETURN).operand(res(z)));

    replicate_defining_ops(&mut func, entry, &is_splat_constant);

    assert_eq!(count_consts(&func), 2);
    // The first use keeps the original; the second got its own copy.
    assert_eq!(func.uses_of(res(k)), vec![(x, 0)]);
    let y_operand = func.op(y).operand_values()[0];
    assert_ne!(y_operand, res(k));
    func.verify().unwrap();
}

#[test]
fn single_use_is_left_alone() {
    let mut func = Function::new("f", FunctionType::new(vec![], vec![f32()]));
    let entry = func.entry();
    let k = func.append_op(entry, splat_const(1.0));
    let x = func.append_op(entry, unary("neg", res(k)));
    func.append_op(entry, Operation::new(ops::RETURN).operand(res(x)));

    replicate_defining_ops(&mut func, entry, &is_splat_constant);
    assert_eq!(count_consts(&func), 1);
}

#[test]
fn splat_mode_skips_dense_constants() {
    let mut func = Function::new("f", FunctionType::new(vec![], vec![f32()]));
    let entry = func.entry();
    let k = func.append_op(entry, dense_const(&[1, 2]));
    let x = func.append_op(entry, unary("neg", res(k)));
    let y = func.append_op(entry, unary("abs", res(k)));
    let z = func.append_op(entry, binary("add", res(x), res(y)));
    func.append_op(entry, Operation::new(ops::RETURN).operand(res(z)));

    replicate_defining_ops(&mut func, entry, &is_splat_constant);
    assert_eq!(count_consts(&func), 1);

    replicate_defining_ops(&mut func, entry, &is_constant_like);
    assert_eq!(count_consts(&func), 2);
}

#[test]
fn return_fed_constant_is_not_replicated() {
    let mut func = Function::new("f", FunctionType::new(vec![], vec![f32(), f32()]));
    let entry = func.entry();
    let k = func.append_op(entry, splat_const(1.0));
    let x = func.append_op(entry, unary("neg", res(k)));
    func.append_op(entry, Operation::new(ops::RETURN).operands([res(k), res(x)]));

    // Same predicate shape the driver uses: constants feeding the return
    // stay shared.
    let ret = func.terminator();
    let returned: HashSet<Value> = func.op(ret).operand_values().iter().copied().collect();
    let pred = move |f: &Function, op: OpId| {
        !f.results(op).any(|v| returned.contains(&v)) && is_splat_constant(f, op)
    };
    replicate_defining_ops(&mut func, entry, &pred);
    assert_eq!(count_consts(&func), 1);
}
