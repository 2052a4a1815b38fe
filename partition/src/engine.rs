//! Shared clustering machinery: initialization, progressive merging
//! drivers, candidate population and metadata extraction.

use std::cmp::Reverse;
use std::collections::{HashSet, VecDeque};

use cleaver_ir::{Function, OpId, Value};
use tracing::trace;

use crate::cluster::{ClusterId, ClusterSet};
use crate::config::{PartitionOptions, ValidateSubgraph};
use crate::constant::is_constant_like;
use crate::host::is_host_op;
use crate::metadata::{FunctionMetadata, inputs_of_cluster, outputs_of_cluster, return_value_counts};

/// One clustering run over a single function.
pub(crate) struct ClusterEngine<'f> {
    func: &'f mut Function,
    clusters: ClusterSet,
    candidates: Vec<ClusterId>,
}

impl<'f> ClusterEngine<'f> {
    /// Seed a singleton cluster for every clusterable op: host ops are
    /// excluded, and so is a constant whose only use is a host op (it
    /// belongs with the host partition).
    pub(crate) fn new(func: &'f mut Function, attr_name: &str) -> Self {
        let mut clusters = ClusterSet::default();
        let body: Vec<OpId> = func.body_ops().to_vec();
        for op in body {
            if is_host_op(func, op, attr_name) {
                continue;
            }
            if is_constant_like(func, op) {
                let uses = func.uses_of(Value::result(op, 0));
                if let [(user, _)] = uses[..]
                    && is_host_op(func, user, attr_name)
                {
                    continue;
                }
            }
            clusters.insert_singleton(op);
        }
        Self { func, clusters, candidates: Vec::new() }
    }

    /// Walk ops in block order, merging each op's cluster with the cluster
    /// of every operand producer.
    pub(crate) fn merge_top_down(&mut self) {
        let ops: Vec<OpId> = self.func.body_ops().to_vec();
        for op in ops {
            let mut current = self.clusters.cluster_of_op(op);
            let operands: Vec<Value> = self.func.op(op).operand_values().to_vec();
            for value in operands {
                let producer = self.clusters.cluster_of_value(value);
                if let (Some(producer), Some(cur)) = (producer, current)
                    && let Some(merged) = self.clusters.try_merge(self.func, producer, cur)
                {
                    current = Some(merged);
                }
            }
        }
    }

    /// Walk ops in reverse block order, merging each op's cluster with the
    /// cluster of every user.
    pub(crate) fn merge_bottom_up(&mut self) {
        let ops: Vec<OpId> = self.func.body_ops().iter().rev().copied().collect();
        for op in ops {
            let mut current = self.clusters.cluster_of_op(op);
            let results: Vec<Value> = self.func.results(op).collect();
            for value in results {
                for (user, _) in self.func.uses_of(value) {
                    let consumer = self.clusters.cluster_of_op(user);
                    if let (Some(consumer), Some(cur)) = (consumer, current)
                        && let Some(merged) = self.clusters.try_merge(self.func, consumer, cur)
                    {
                        current = Some(merged);
                    }
                }
            }
        }
    }

    /// Collect live clusters into a worklist (seeded in block order of each
    /// cluster's first op, sorted by descending size), then repeatedly pop
    /// the head and absorb every other entry that still merges into it.
    pub(crate) fn populate_candidates(&mut self) {
        let mut seen = HashSet::new();
        let mut list: Vec<ClusterId> = Vec::new();
        let body: Vec<OpId> = self.func.body_ops().to_vec();
        for op in body {
            if let Some(root) = self.clusters.cluster_of_op(op)
                && seen.insert(root)
            {
                list.push(root);
            }
        }
        list.sort_by_key(|&c| Reverse(self.clusters.ops_of(c).len()));

        let mut worklist: VecDeque<ClusterId> = list.into();
        self.candidates.clear();
        while let Some(head) = worklist.pop_front() {
            let mut cluster = head;
            let mut rest = VecDeque::with_capacity(worklist.len());
            while let Some(entry) = worklist.pop_front() {
                match self.clusters.try_merge(self.func, entry, cluster) {
                    Some(merged) => cluster = merged,
                    None => rest.push_back(entry),
                }
            }
            worklist = rest;
            self.candidates.push(cluster);
        }
        self.candidates.sort_by_key(|&c| Reverse(self.clusters.ops_of(c).len()));
        trace!(candidates = self.candidates.len(), "collected cluster candidates");
    }

    /// Turn surviving candidates into metadata, or `None` when clustering
    /// found nothing (no candidates, or the largest candidate is empty).
    pub(crate) fn function_metadatas(
        &mut self,
        options: &PartitionOptions,
        validate: Option<ValidateSubgraph<'_>>,
    ) -> Option<Vec<FunctionMetadata>> {
        let first = *self.candidates.first()?;
        if self.clusters.ops_of(first).is_empty() {
            return None;
        }

        let ret_counts = options.dup_outputs.then(|| return_value_counts(self.func));
        let mut metadatas = Vec::new();
        for &candidate in &self.candidates {
            let ops: Vec<OpId> = self.clusters.ops_of(candidate).iter().copied().collect();
            if ops.is_empty() {
                continue;
            }
            if let Some(validate) = validate
                && !validate(self.func, &ops)
            {
                continue;
            }
            let inputs = inputs_of_cluster(self.func, &ops);
            let outputs = outputs_of_cluster(self.func, &ops, ret_counts.as_ref());
            metadatas.push(FunctionMetadata {
                anchor_name: options.device_anchor_name.clone(),
                device: options.device.clone(),
                original_name: self.func.name().to_string(),
                insertion_index: 0,
                partition_name: String::new(),
                inputs,
                outputs,
                ops,
            });
            if !options.enable_multi_graph {
                break;
            }
        }
        Some(metadatas)
    }
}
