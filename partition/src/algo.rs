//! Algorithm drivers: the two progressive merge orders, the greedy
//! measure-then-rerun selection, and the fallback host/device split.

use std::collections::HashSet;

use cleaver_ir::{Function, OpId};
use tracing::trace;

use crate::config::{DEVICE_HOST, HOST_ANCHOR_NAME, PartitionOptions, ValidateSubgraph};
use crate::engine::ClusterEngine;
use crate::host::{close_over_defs, is_host_op};
use crate::metadata::{FunctionMetadata, inputs_of_cluster, outputs_of_cluster, return_value_counts};

/// Progressive merge direction shared by Top-Down and Bottom-Up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MergeOrder {
    TopDown,
    BottomUp,
}

/// Run one clustering algorithm over `func` and extract metadata.
pub(crate) fn run_clustering(
    order: MergeOrder,
    func: &mut Function,
    options: &PartitionOptions,
    validate: Option<ValidateSubgraph<'_>>,
) -> Option<Vec<FunctionMetadata>> {
    let mut engine = ClusterEngine::new(func, &options.attr_name);
    match order {
        MergeOrder::TopDown => engine.merge_top_down(),
        MergeOrder::BottomUp => engine.merge_bottom_up(),
    }
    engine.populate_candidates();
    engine.function_metadatas(options, validate)
}

fn covered_ops(metadatas: &[FunctionMetadata]) -> usize {
    metadatas.iter().map(|m| m.ops.len()).sum()
}

/// Measure both merge orders on detached clones of `func`, then re-run the
/// winner on `func` itself. Ties favor Bottom-Up. Downstream synthesis
/// consumes op identities of the original function, which is why the
/// winning clone's result is not reused directly.
pub(crate) fn run_greedy(
    func: &mut Function,
    options: &PartitionOptions,
    validate: Option<ValidateSubgraph<'_>>,
) -> Option<Vec<FunctionMetadata>> {
    let mut top_down_probe = func.clone();
    let mut bottom_up_probe = func.clone();
    let top_down = run_clustering(MergeOrder::TopDown, &mut top_down_probe, options, validate);
    let bottom_up = run_clustering(MergeOrder::BottomUp, &mut bottom_up_probe, options, validate);

    match (top_down, bottom_up) {
        (Some(td), Some(bu)) => {
            let (td_size, bu_size) = (covered_ops(&td), covered_ops(&bu));
            let order = if td_size > bu_size { MergeOrder::TopDown } else { MergeOrder::BottomUp };
            trace!(top_down = td_size, bottom_up = bu_size, winner = ?order, "greedy selection");
            run_clustering(order, func, options, validate)
        }
        (Some(_), None) => run_clustering(MergeOrder::TopDown, func, options, validate),
        (None, Some(_)) => run_clustering(MergeOrder::BottomUp, func, options, validate),
        (None, None) => None,
    }
}

/// No merging: one host partition (transitively closed over operand
/// definitions from every host-marked seed) and one device partition with
/// everything else. Either may be absent; a device partition rejected by
/// `validate` aborts the whole function.
pub(crate) fn run_fallback(
    func: &Function,
    options: &PartitionOptions,
    validate: Option<ValidateSubgraph<'_>>,
) -> Option<Vec<FunctionMetadata>> {
    let body: Vec<OpId> = func.body_ops().to_vec();
    let mut host_ops: HashSet<OpId> = HashSet::new();
    for &op in &body {
        if is_host_op(func, op, &options.attr_name) {
            close_over_defs(func, op, &mut host_ops);
        }
    }

    let ret_counts = options.dup_outputs.then(|| return_value_counts(func));
    let mut metadatas = Vec::new();

    if !host_ops.is_empty() {
        let ops: Vec<OpId> = body.iter().copied().filter(|op| host_ops.contains(op)).collect();
        metadatas.push(FunctionMetadata {
            anchor_name: HOST_ANCHOR_NAME.to_string(),
            device: DEVICE_HOST.to_string(),
            original_name: func.name().to_string(),
            insertion_index: 0,
            partition_name: String::new(),
            inputs: inputs_of_cluster(func, &ops),
            outputs: outputs_of_cluster(func, &ops, ret_counts.as_ref()),
            ops,
        });
    }

    let device_ops: Vec<OpId> = body.iter().copied().filter(|op| !host_ops.contains(op)).collect();
    if !device_ops.is_empty() {
        if let Some(validate) = validate
            && !validate(func, &device_ops)
        {
            return None;
        }
        metadatas.push(FunctionMetadata {
            anchor_name: options.device_anchor_name.clone(),
            device: options.device.clone(),
            original_name: func.name().to_string(),
            insertion_index: 0,
            partition_name: String::new(),
            inputs: inputs_of_cluster(func, &device_ops),
            outputs: outputs_of_cluster(func, &device_ops, ret_counts.as_ref()),
            ops: device_ops,
        });
    }

    Some(metadatas)
}
