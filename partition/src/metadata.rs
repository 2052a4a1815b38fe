//! Per-cluster metadata: what a synthesized function needs to know.

use std::collections::{HashMap, HashSet};

use cleaver_ir::{Function, OpId, Value};
use smallvec::SmallVec;

/// Everything required to outline one cluster into its own function.
#[derive(Debug, Clone)]
pub struct FunctionMetadata {
    /// Anchor attribute (unit) set on the synthesized function.
    pub anchor_name: String,
    /// Device tag of the synthesized function.
    pub device: String,
    /// Name of the function the cluster came from.
    pub original_name: String,
    /// Module index where the synthesized function is inserted.
    pub insertion_index: usize,
    /// Final symbol name after insertion (collisions are renamed).
    pub partition_name: String,
    /// Values defined outside the cluster but used inside.
    pub inputs: SmallVec<[Value; 4]>,
    /// Values defined inside the cluster and used outside. Under
    /// `dup_outputs`, a value returned `k` times appears `k` times.
    pub outputs: SmallVec<[Value; 4]>,
    /// The cluster's ops, in block order.
    pub ops: Vec<OpId>,
}

/// How many return slots reference each value used by the terminator.
pub(crate) fn return_value_counts(func: &Function) -> HashMap<Value, usize> {
    let ret = func.terminator();
    let mut counts = HashMap::new();
    for &value in func.op(ret).operand_values() {
        *counts.entry(value).or_insert(0usize) += 1;
    }
    counts
}

/// The entry-block op a value's definition ultimately belongs to, or
/// `None` for function arguments.
fn defining_root(func: &Function, value: Value) -> Option<OpId> {
    match value {
        Value::Result { op, .. } => Some(func.entry_ancestor(op)),
        Value::Arg { block, .. } => {
            func.block(block).owner().map(|owner| func.entry_ancestor(owner))
        }
    }
}

/// Values flowing into the cluster: operands (anywhere inside the cluster
/// ops, including nested regions) whose definition lies outside. Ordered by
/// first encounter in a block-order walk, de-duplicated.
pub(crate) fn inputs_of_cluster(func: &Function, ops: &[OpId]) -> SmallVec<[Value; 4]> {
    let op_set: HashSet<OpId> = ops.iter().copied().collect();
    let mut seen = HashSet::new();
    let mut inputs = SmallVec::new();
    for &op in ops {
        func.walk_op_tree(op, |inner| {
            for &value in func.op(inner).operand_values() {
                let inside = defining_root(func, value).is_some_and(|root| op_set.contains(&root));
                if !inside && seen.insert(value) {
                    inputs.push(value);
                }
            }
        });
    }
    inputs
}

/// Values flowing out of the cluster: results used by any op outside it.
/// When `ret_counts` is given, a value returned `k` times contributes `k`
/// entries so each return slot can be rewired independently.
pub(crate) fn outputs_of_cluster(
    func: &Function,
    ops: &[OpId],
    ret_counts: Option<&HashMap<Value, usize>>,
) -> SmallVec<[Value; 4]> {
    let op_set: HashSet<OpId> = ops.iter().copied().collect();
    let mut seen = HashSet::new();
    let mut outputs = SmallVec::new();
    for &op in ops {
        for value in func.results(op) {
            let used_outside = func
                .uses_of(value)
                .iter()
                .any(|&(user, _)| !op_set.contains(&func.entry_ancestor(user)));
            if used_outside && seen.insert(value) {
                outputs.push(value);
                if let Some(counts) = ret_counts
                    && let Some(&k) = counts.get(&value)
                {
                    for _ in 1..k {
                        outputs.push(value);
                    }
                }
            }
        }
    }
    outputs
}
