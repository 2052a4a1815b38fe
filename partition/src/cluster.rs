//! Cluster maintenance and merge legality.
//!
//! A cluster is an insertion-ordered set of entry-block ops kept in block
//! order, plus a union-find parent pointer. Merging two clusters must
//! preserve SSA: every op lying between them in the block is either hoisted
//! above the earlier cluster (when nothing it consumes is produced there)
//! or sunk below the later cluster (when nothing there consumes it). An op
//! that can do neither blocks the merge.
//!
//! Classification is cluster-coherent: once any member of another cluster
//! is forced to stay in the gap, the whole cluster stays, revoking any of
//! its members already classified as movable. Moving a proper subset would
//! break that cluster's own contiguity.

use std::collections::HashMap;

use cleaver_ir::{Function, OpId, Value};
use indexmap::IndexSet;

pub(crate) type ClusterId = usize;

#[derive(Debug)]
pub(crate) struct Cluster {
    ops: IndexSet<OpId>,
    parent: Option<ClusterId>,
}

impl Cluster {
    fn first(&self) -> OpId {
        *self.ops.first().expect("cluster must not be empty")
    }

    fn last(&self) -> OpId {
        *self.ops.last().expect("cluster must not be empty")
    }
}

/// All clusters of one function, with op-to-cluster resolution.
#[derive(Debug, Default)]
pub(crate) struct ClusterSet {
    clusters: Vec<Cluster>,
    by_op: HashMap<OpId, ClusterId>,
}

impl ClusterSet {
    pub(crate) fn insert_singleton(&mut self, op: OpId) -> ClusterId {
        let id = self.clusters.len();
        let mut ops = IndexSet::new();
        ops.insert(op);
        self.clusters.push(Cluster { ops, parent: None });
        self.by_op.insert(op, id);
        id
    }

    pub(crate) fn ops_of(&self, id: ClusterId) -> &IndexSet<OpId> {
        &self.clusters[id].ops
    }

    /// Resolve to the live root, compressing the path.
    pub(crate) fn find(&mut self, id: ClusterId) -> ClusterId {
        let mut root = id;
        while let Some(parent) = self.clusters[root].parent {
            root = parent;
        }
        let mut cur = id;
        while let Some(parent) = self.clusters[cur].parent {
            self.clusters[cur].parent = Some(root);
            cur = parent;
        }
        root
    }

    /// Root resolution without compression, usable during immutable scans.
    fn root_of(&self, mut id: ClusterId) -> ClusterId {
        while let Some(parent) = self.clusters[id].parent {
            id = parent;
        }
        id
    }

    /// The live cluster owning `op`, or `None` for ops excluded from
    /// clustering (host ops, host-only constants).
    pub(crate) fn cluster_of_op(&mut self, op: OpId) -> Option<ClusterId> {
        let id = *self.by_op.get(&op)?;
        Some(self.find(id))
    }

    pub(crate) fn cluster_of_value(&mut self, value: Value) -> Option<ClusterId> {
        self.cluster_of_op(value.defining_op()?)
    }

    /// Attempt to fuse two clusters, preferring to merge `lhs` into `rhs`.
    /// Returns the surviving root, or `None` when neither orientation is
    /// legal.
    pub(crate) fn try_merge(
        &mut self,
        func: &mut Function,
        lhs: ClusterId,
        rhs: ClusterId,
    ) -> Option<ClusterId> {
        let lhs = self.find(lhs);
        let rhs = self.find(rhs);
        if lhs == rhs {
            return None;
        }
        if self.try_merge_into(func, lhs, rhs) {
            return Some(rhs);
        }
        if self.try_merge_into(func, rhs, lhs) {
            return Some(lhs);
        }
        None
    }

    fn try_merge_into(&mut self, func: &mut Function, from: ClusterId, to: ClusterId) -> bool {
        let from_first = self.clusters[from].first();
        let from_last = self.clusters[from].last();
        let to_first = self.clusters[to].first();
        let to_last = self.clusters[to].last();

        if func.is_before_in_block(from_last, to_first) {
            let between = gap_ops(func, from_last, to_first);
            let (move_up, remain) = self.compute_move_up(func, &self.clusters[from].ops, &between);
            let remain: Vec<OpId> = remain.iter().copied().collect();
            let (move_down, remain) = self.compute_move_down(func, &self.clusters[to].ops, &remain);
            if !remain.is_empty() {
                return false;
            }
            for &op in &move_up {
                func.move_before(op, from_first);
            }
            for &op in &move_down {
                func.move_after(op, to_last);
            }
            let from_ops = std::mem::take(&mut self.clusters[from].ops);
            let to_ops = std::mem::take(&mut self.clusters[to].ops);
            let mut merged = from_ops;
            merged.extend(to_ops);
            self.clusters[to].ops = merged;
        } else {
            if !func.is_before_in_block(to_last, from_first) {
                debug_assert!(false, "live clusters must not interleave in the block");
                return false;
            }
            let between = gap_ops(func, to_last, from_first);
            let (move_down, remain) = self.compute_move_down(func, &self.clusters[from].ops, &between);
            let remain: Vec<OpId> = remain.iter().copied().collect();
            let (move_up, remain) = self.compute_move_up(func, &self.clusters[to].ops, &remain);
            if !remain.is_empty() {
                return false;
            }
            for &op in &move_up {
                func.move_before(op, to_first);
            }
            for &op in &move_down {
                func.move_after(op, from_last);
            }
            let from_ops = std::mem::take(&mut self.clusters[from].ops);
            self.clusters[to].ops.extend(from_ops);
        }

        self.clusters[from].parent = Some(to);
        true
    }

    /// Classify `src` (gap ops in block order) against the earlier cluster
    /// `target`: an op may move above the cluster iff nothing it consumes
    /// (including inside its nested regions) is produced by `target` or by
    /// an op already forced to remain. Returns `(move_up, remain)`, both in
    /// block order.
    fn compute_move_up(
        &self,
        func: &Function,
        target: &IndexSet<OpId>,
        src: &[OpId],
    ) -> (IndexSet<OpId>, IndexSet<OpId>) {
        let mut move_up: IndexSet<OpId> = IndexSet::new();
        let mut remain: IndexSet<OpId> = IndexSet::new();
        for &op in src {
            if remain.contains(&op) {
                continue;
            }
            if any_def_in(func, op, target) || any_def_in(func, op, &remain) {
                match self.by_op.get(&op).map(|&c| self.root_of(c)) {
                    None => {
                        remain.insert(op);
                    }
                    Some(cluster) => {
                        for &member in self.clusters[cluster].ops.iter() {
                            debug_assert!(src.contains(&member), "cluster extends outside the merge gap");
                            remain.insert(member);
                            move_up.shift_remove(&member);
                        }
                    }
                }
            } else {
                move_up.insert(op);
            }
        }
        (move_up, remain)
    }

    /// Mirror of [`Self::compute_move_up`] against the later cluster: an op
    /// may move below iff none of its users (including users nested inside
    /// `target` members) lie in `target` or in the remain set. `move_down`
    /// is returned in reverse block order (its application order); `remain`
    /// in block order.
    fn compute_move_down(
        &self,
        func: &Function,
        target: &IndexSet<OpId>,
        src: &[OpId],
    ) -> (IndexSet<OpId>, IndexSet<OpId>) {
        let mut move_down: IndexSet<OpId> = IndexSet::new();
        let mut remain: IndexSet<OpId> = IndexSet::new();
        for &op in src.iter().rev() {
            if remain.contains(&op) {
                continue;
            }
            if any_use_in(func, op, target) || any_use_in(func, op, &remain) {
                match self.by_op.get(&op).map(|&c| self.root_of(c)) {
                    None => {
                        remain.insert(op);
                    }
                    Some(cluster) => {
                        for &member in self.clusters[cluster].ops.iter().rev() {
                            debug_assert!(src.contains(&member), "cluster extends outside the merge gap");
                            remain.insert(member);
                            move_down.shift_remove(&member);
                        }
                    }
                }
            } else {
                move_down.insert(op);
            }
        }
        let remain: IndexSet<OpId> = remain.iter().rev().copied().collect();
        (move_down, remain)
    }
}

/// Ops strictly between `after` and `before` in their block, in block order.
fn gap_ops(func: &Function, after: OpId, before: OpId) -> Vec<OpId> {
    let block = func.parent_block(after);
    let start = func.position(after) + 1;
    let end = func.position(before);
    func.block_ops(block)[start..end].to_vec()
}

/// True when `op` (or any op nested inside it) consumes a value produced by
/// a member of `set`.
pub(crate) fn any_def_in(func: &Function, op: OpId, set: &IndexSet<OpId>) -> bool {
    let mut found = false;
    func.walk_op_tree(op, |inner| {
        if found {
            return;
        }
        for &value in func.op(inner).operand_values() {
            if value.defining_op().is_some_and(|def| set.contains(&def)) {
                found = true;
                return;
            }
        }
    });
    found
}

/// True when any result of `op` is used by a member of `set` or by an op
/// nested inside a member.
pub(crate) fn any_use_in(func: &Function, op: OpId, set: &IndexSet<OpId>) -> bool {
    for value in func.results(op) {
        for (user, _) in func.uses_of(value) {
            if set.contains(&user) {
                return true;
            }
            if set.iter().any(|&member| func.is_ancestor(member, user)) {
                return true;
            }
        }
    }
    false
}
