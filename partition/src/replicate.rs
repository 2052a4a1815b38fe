//! Pre-replication of shared defining ops.
//!
//! Clustering merges through shared values, so a constant consumed by two
//! unrelated ops would wedge both consumers into one cluster. Giving every
//! use beyond the first its own private copy keeps the consumers free to
//! cluster independently.

use cleaver_ir::{BlockId, Function, OpId, Value, ValueMap};

/// For every op in `block` matching `pred`, rewire each use of its results
/// beyond the first to a fresh clone inserted next to the original.
pub(crate) fn replicate_defining_ops(
    func: &mut Function,
    block: BlockId,
    pred: &dyn Fn(&Function, OpId) -> bool,
) {
    let ops: Vec<OpId> = func.block_ops(block).to_vec();
    for op in ops {
        if !pred(func, op) {
            continue;
        }
        let results: Vec<Value> = func.results(op).collect();
        for value in results {
            let Value::Result { index, .. } = value else { continue };
            let uses = func.uses_of(value);
            for &(user, slot) in uses.iter().skip(1) {
                let mut map = ValueMap::new();
                let dup = func.clone_op(op, &mut map);
                func.set_operand(user, slot, Value::result(dup, index as usize));
            }
        }
    }
}
