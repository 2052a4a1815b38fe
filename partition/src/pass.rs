//! Top-level pass driver.

use std::collections::HashSet;

use cleaver_ir::{Function, Module, OpId, Value};
use tracing::{debug, error};

use crate::algo::{MergeOrder, run_clustering, run_fallback, run_greedy};
use crate::config::{ClusterAlgo, PartitionOptions, ValidateSubgraph};
use crate::constant::{is_constant_like, is_splat_constant};
use crate::error::{NoPartitionsSnafu, Result};
use crate::outline::{create_calls, create_functions};
use crate::replicate::replicate_defining_ops;

/// Partition every function of `module` into per-device sub-functions.
///
/// Each source function's body is clustered by the configured algorithm;
/// every surviving cluster becomes a fresh function inserted right after
/// its source, the cluster is replaced by a call, and the original ops are
/// erased. On failure the module is left with the offending function
/// untouched and an error is returned.
pub fn partition_by_device(
    module: &mut Module,
    options: &PartitionOptions,
    validate: Option<ValidateSubgraph<'_>>,
) -> Result<()> {
    // Pre-replication: give every extra consumer of a shared constant its
    // own copy, unless the constant feeds the return directly.
    let mut original = Vec::with_capacity(module.len());
    for index in 0..module.len() {
        let func = module.func_mut(index);
        let ret = func.terminator();
        let returned: HashSet<Value> = func.op(ret).operand_values().iter().copied().collect();
        let dup_non_splat = options.dup_non_splat;
        let pred = move |f: &Function, op: OpId| {
            if f.results(op).any(|v| returned.contains(&v)) {
                return false;
            }
            if dup_non_splat { is_constant_like(f, op) } else { is_splat_constant(f, op) }
        };
        for block in func.all_blocks() {
            replicate_defining_ops(func, block, &pred);
        }
        original.push(func.name().to_string());
    }

    for name in original {
        let Some(index) = module.index_of(&name) else { continue };
        debug!(function = %name, algo = ?options.algo, "clustering function by device");

        let metadatas = match options.algo {
            ClusterAlgo::TopDown => {
                run_clustering(MergeOrder::TopDown, module.func_mut(index), options, validate)
            }
            ClusterAlgo::BottomUp => {
                run_clustering(MergeOrder::BottomUp, module.func_mut(index), options, validate)
            }
            ClusterAlgo::Greedy => run_greedy(module.func_mut(index), options, validate),
            ClusterAlgo::Fallback => run_fallback(module.func(index), options, validate),
        };
        let Some(mut metadatas) = metadatas else {
            error!(function = %name, "graph clustering by device failed");
            return NoPartitionsSnafu { function: name }.fail();
        };

        for metadata in &mut metadatas {
            metadata.insertion_index = index + 1;
        }
        create_functions(module, index, &mut metadatas, &options.attr_name);
        create_calls(module, index, &metadatas, options.dup_outputs);

        let func = module.func_mut(index);
        for metadata in &metadatas {
            for &op in metadata.ops.iter().rev() {
                func.erase_op(op);
            }
        }
        debug!(function = %name, partitions = metadatas.len(), "partitioned function");
    }
    Ok(())
}
