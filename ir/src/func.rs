//! Functions: op storage, ordering, navigation and graph surgery.
//!
//! A [`Function`] owns the arenas for its operations and blocks, so every
//! [`OpId`]/[`BlockId`] is local to one function and cloning a function is a
//! deep copy. All mutation passes go through the methods here; they keep
//! parent links and block op-lists consistent.

use std::collections::{HashMap, HashSet};

use smallvec::SmallVec;

use crate::arena::Arena;
use crate::attr::{AttrMap, Attribute};
use crate::error::{MissingTerminatorSnafu, Result, UseBeforeDefSnafu};
use crate::op::{Block, BlockId, OpId, Operation, Region, Value, ops};
use crate::types::{FunctionType, Type};

/// Symbol visibility of a function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    Public,
    #[default]
    Private,
}

/// Mapping from original values to their replacements, used while cloning.
///
/// Lookups that miss resolve to the queried value itself, mirroring the
/// usual lookup-or-default cloning semantics.
#[derive(Debug, Default)]
pub struct ValueMap {
    map: HashMap<Value, Value>,
}

impl ValueMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, from: Value, to: Value) {
        self.map.insert(from, to);
    }

    pub fn lookup(&self, value: Value) -> Option<Value> {
        self.map.get(&value).copied()
    }

    pub fn resolve(&self, value: Value) -> Value {
        self.lookup(value).unwrap_or(value)
    }
}

/// A named function with a single entry block.
#[derive(Debug, Clone)]
pub struct Function {
    name: String,
    visibility: Visibility,
    ty: FunctionType,
    attrs: AttrMap,
    ops: Arena<Operation>,
    blocks: Arena<Block>,
    entry: BlockId,
}

impl Function {
    /// Create a function with an empty entry block whose arguments mirror
    /// the signature inputs.
    pub fn new(name: impl Into<String>, ty: FunctionType) -> Self {
        let mut blocks = Arena::new();
        let entry = blocks.push(Block {
            owner: None,
            args: SmallVec::from_vec(ty.inputs.clone()),
            ops: Vec::new(),
        });
        Self {
            name: name.into(),
            visibility: Visibility::default(),
            ty,
            attrs: AttrMap::new(),
            ops: Arena::new(),
            blocks,
            entry,
        }
    }

    // ── Accessors ───────────────────────────────────────────────────────

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn set_visibility(&mut self, visibility: Visibility) {
        self.visibility = visibility;
    }

    pub fn ty(&self) -> &FunctionType {
        &self.ty
    }

    pub fn attrs(&self) -> &AttrMap {
        &self.attrs
    }

    pub fn set_attr(&mut self, name: impl Into<String>, value: Attribute) {
        self.attrs.insert(name.into(), value);
    }

    pub fn entry(&self) -> BlockId {
        self.entry
    }

    pub fn op(&self, id: OpId) -> &Operation {
        &self.ops[id]
    }

    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id]
    }

    pub fn block_ops(&self, id: BlockId) -> &[OpId] {
        &self.blocks[id].ops
    }

    /// Ops of the entry block without the trailing terminator.
    pub fn body_ops(&self) -> &[OpId] {
        let ops = self.block_ops(self.entry);
        match ops.split_last() {
            Some((_, rest)) => rest,
            None => ops,
        }
    }

    /// The last op of the entry block.
    pub fn terminator(&self) -> OpId {
        self.blocks[self.entry].ops.last().copied().expect("function body must end with a terminator")
    }

    // ── Construction ────────────────────────────────────────────────────

    /// Create a detached block, later attached to an op via
    /// [`Operation::region`].
    pub fn create_block(&mut self, args: impl IntoIterator<Item = Type>) -> BlockId {
        self.blocks.push(Block { owner: None, args: args.into_iter().collect(), ops: Vec::new() })
    }

    /// Append `op` at the end of `block`.
    pub fn append_op(&mut self, block: BlockId, op: Operation) -> OpId {
        let id = self.ops.push(op);
        self.attach(id, block);
        self.blocks[block].ops.push(id);
        id
    }

    /// Insert `op` immediately before `anchor` in the anchor's block.
    pub fn insert_op_before(&mut self, anchor: OpId, op: Operation) -> OpId {
        let block = self.parent_block(anchor);
        let pos = self.position(anchor);
        let id = self.ops.push(op);
        self.attach(id, block);
        self.blocks[block].ops.insert(pos, id);
        id
    }

    /// Insert `op` immediately after `anchor` in the anchor's block.
    pub fn insert_op_after(&mut self, anchor: OpId, op: Operation) -> OpId {
        let block = self.parent_block(anchor);
        let pos = self.position(anchor);
        let id = self.ops.push(op);
        self.attach(id, block);
        self.blocks[block].ops.insert(pos + 1, id);
        id
    }

    fn attach(&mut self, id: OpId, block: BlockId) {
        self.ops[id].block = Some(block);
        let regions = self.ops[id].regions.clone();
        for region in &regions {
            for &b in &region.blocks {
                self.blocks[b].owner = Some(id);
            }
        }
    }

    // ── Ordering ────────────────────────────────────────────────────────

    /// Block containing `op`. Panics if the op is detached.
    pub fn parent_block(&self, op: OpId) -> BlockId {
        self.ops[op].block.expect("operation is not inserted in a block")
    }

    /// Position of `op` within its block.
    pub fn position(&self, op: OpId) -> usize {
        let block = self.parent_block(op);
        self.blocks[block]
            .ops
            .iter()
            .position(|&o| o == op)
            .expect("operation missing from its parent block")
    }

    /// True when `a` comes strictly before `b` in their (shared) block.
    pub fn is_before_in_block(&self, a: OpId, b: OpId) -> bool {
        debug_assert_eq!(self.parent_block(a), self.parent_block(b));
        self.position(a) < self.position(b)
    }

    /// Move `op` so it sits immediately before `anchor`. Same-block only.
    pub fn move_before(&mut self, op: OpId, anchor: OpId) {
        let block = self.parent_block(op);
        debug_assert_eq!(block, self.parent_block(anchor));
        let pos = self.position(op);
        self.blocks[block].ops.remove(pos);
        let anchor_pos = self.position(anchor);
        self.blocks[block].ops.insert(anchor_pos, op);
    }

    /// Move `op` so it sits immediately after `anchor`. Same-block only.
    pub fn move_after(&mut self, op: OpId, anchor: OpId) {
        let block = self.parent_block(op);
        debug_assert_eq!(block, self.parent_block(anchor));
        let pos = self.position(op);
        self.blocks[block].ops.remove(pos);
        let anchor_pos = self.position(anchor);
        self.blocks[block].ops.insert(anchor_pos + 1, op);
    }

    // ── Navigation ──────────────────────────────────────────────────────

    /// Result values of `op`.
    pub fn results(&self, op: OpId) -> impl Iterator<Item = Value> + '_ {
        (0..self.ops[op].result_types.len()).map(move |i| Value::result(op, i))
    }

    /// Type of a value.
    pub fn value_type(&self, value: Value) -> &Type {
        match value {
            Value::Result { op, index } => &self.ops[op].result_types[index as usize],
            Value::Arg { block, index } => &self.blocks[block].args[index as usize],
        }
    }

    /// Visit every op in the function, in block-walk pre-order: each op is
    /// visited before the ops nested inside its regions.
    pub fn walk_ops(&self, mut f: impl FnMut(OpId)) {
        self.walk_block(self.entry, &mut f);
    }

    fn walk_block(&self, block: BlockId, f: &mut impl FnMut(OpId)) {
        for i in 0..self.blocks[block].ops.len() {
            let op = self.blocks[block].ops[i];
            f(op);
            for region in &self.ops[op].regions {
                for &b in &region.blocks {
                    self.walk_block(b, f);
                }
            }
        }
    }

    /// Visit `op` and every op nested inside its regions, pre-order.
    pub fn walk_op_tree(&self, op: OpId, mut f: impl FnMut(OpId)) {
        f(op);
        for region in &self.ops[op].regions {
            for &b in &region.blocks {
                self.walk_block(b, &mut f);
            }
        }
    }

    /// Every block of the function (entry first, then nested, walk order).
    pub fn all_blocks(&self) -> Vec<BlockId> {
        let mut blocks = vec![self.entry];
        self.walk_ops(|op| {
            for region in &self.ops[op].regions {
                blocks.extend(region.blocks.iter().copied());
            }
        });
        blocks
    }

    /// All uses of `value` as `(user op, operand slot)` pairs, in
    /// deterministic block-walk order.
    pub fn uses_of(&self, value: Value) -> Vec<(OpId, usize)> {
        let mut uses = Vec::new();
        self.walk_ops(|op| {
            for (slot, &operand) in self.ops[op].operands.iter().enumerate() {
                if operand == value {
                    uses.push((op, slot));
                }
            }
        });
        uses
    }

    /// The op owning the block that `op` lives in, if that block is nested.
    pub fn parent_op(&self, op: OpId) -> Option<OpId> {
        self.blocks[self.parent_block(op)].owner
    }

    /// The transitive ancestor of `op` that lives in the entry block.
    pub fn entry_ancestor(&self, mut op: OpId) -> OpId {
        while let Some(parent) = self.parent_op(op) {
            op = parent;
        }
        op
    }

    /// True when `a` equals `b` or `b` is nested inside one of `a`'s regions.
    pub fn is_ancestor(&self, a: OpId, b: OpId) -> bool {
        let mut cur = b;
        loop {
            if cur == a {
                return true;
            }
            match self.parent_op(cur) {
                Some(parent) => cur = parent,
                None => return false,
            }
        }
    }

    // ── Surgery ─────────────────────────────────────────────────────────

    /// Unlink `op` from its block. The arena slot stays allocated but the
    /// op becomes unreachable.
    pub fn erase_op(&mut self, op: OpId) {
        let block = self.parent_block(op);
        let pos = self.position(op);
        self.blocks[block].ops.remove(pos);
        self.ops[op].block = None;
    }

    pub fn set_operand(&mut self, op: OpId, slot: usize, value: Value) {
        self.ops[op].operands[slot] = value;
    }

    /// Rewrite every use of `old` to `new`.
    pub fn replace_all_uses(&mut self, old: Value, new: Value) {
        for (op, slot) in self.uses_of(old) {
            self.ops[op].operands[slot] = new;
        }
    }

    /// Rewrite every use of `old` to `new`, leaving uses by `except` alone.
    pub fn replace_all_uses_except(&mut self, old: Value, new: Value, except: OpId) {
        for (op, slot) in self.uses_of(old) {
            if op != except {
                self.ops[op].operands[slot] = new;
            }
        }
    }

    // ── Cloning ─────────────────────────────────────────────────────────

    /// Clone `src_op` (with its nested regions) from another function to
    /// the end of `dest` in this function. Operands resolve through `map`
    /// with lookup-or-default semantics; the source op's results are mapped
    /// to the clone's results.
    pub fn clone_op_from(
        &mut self,
        src: &Function,
        src_op: OpId,
        dest: BlockId,
        map: &mut ValueMap,
    ) -> OpId {
        let operands: SmallVec<[Value; 2]> =
            src.ops[src_op].operands.iter().map(|&v| map.resolve(v)).collect();
        let mut regions: SmallVec<[Region; 1]> = SmallVec::new();
        for region_idx in 0..src.ops[src_op].regions.len() {
            let src_blocks = src.ops[src_op].regions[region_idx].blocks.clone();
            let mut new_blocks: SmallVec<[BlockId; 1]> = SmallVec::new();
            for &b in &src_blocks {
                let nb = self.create_block(src.blocks[b].args.iter().cloned());
                for i in 0..src.blocks[b].args.len() {
                    map.insert(Value::arg(b, i), Value::arg(nb, i));
                }
                new_blocks.push(nb);
            }
            for (&b, &nb) in src_blocks.iter().zip(new_blocks.iter()) {
                for i in 0..src.blocks[b].ops.len() {
                    let nested = src.blocks[b].ops[i];
                    self.clone_op_from(src, nested, nb, map);
                }
            }
            regions.push(Region { blocks: new_blocks });
        }
        let id = self.append_op(
            dest,
            Operation {
                name: src.ops[src_op].name.clone(),
                operands,
                result_types: src.ops[src_op].result_types.clone(),
                regions,
                attrs: src.ops[src_op].attrs.clone(),
                block: None,
            },
        );
        for i in 0..src.ops[src_op].result_types.len() {
            map.insert(Value::result(src_op, i), Value::result(id, i));
        }
        id
    }

    /// Clone `src_op` (with its nested regions) within this function,
    /// inserting the clone immediately after the original. The original's
    /// results are *not* mapped; the caller decides which uses to rewire.
    pub fn clone_op(&mut self, src_op: OpId, map: &mut ValueMap) -> OpId {
        let detached = self.clone_op_detached(src_op, map);
        self.insert_op_after(src_op, detached)
    }

    fn clone_op_detached(&mut self, src_op: OpId, map: &mut ValueMap) -> Operation {
        let snapshot = self.ops[src_op].clone();
        let operands: SmallVec<[Value; 2]> =
            snapshot.operands.iter().map(|&v| map.resolve(v)).collect();
        let mut regions: SmallVec<[Region; 1]> = SmallVec::new();
        for region in &snapshot.regions {
            let mut new_blocks: SmallVec<[BlockId; 1]> = SmallVec::new();
            for &b in &region.blocks {
                let args: Vec<Type> = self.blocks[b].args.to_vec();
                let nb = self.create_block(args);
                for i in 0..self.blocks[b].args.len() {
                    map.insert(Value::arg(b, i), Value::arg(nb, i));
                }
                new_blocks.push(nb);
            }
            for (&b, &nb) in region.blocks.iter().zip(new_blocks.iter()) {
                let nested_ops = self.blocks[b].ops.clone();
                for nested in nested_ops {
                    let cloned = self.clone_op_detached(nested, map);
                    let cid = self.append_op(nb, cloned);
                    for i in 0..self.ops[nested].result_types.len() {
                        map.insert(Value::result(nested, i), Value::result(cid, i));
                    }
                }
            }
            regions.push(Region { blocks: new_blocks });
        }
        Operation {
            name: snapshot.name,
            operands,
            result_types: snapshot.result_types,
            regions,
            attrs: snapshot.attrs,
            block: None,
        }
    }

    // ── Verification ────────────────────────────────────────────────────

    /// Check structural invariants: the entry block ends with a `return`
    /// and every operand is defined before it is used.
    pub fn verify(&self) -> Result<()> {
        let last = self.blocks[self.entry].ops.last().copied();
        let terminated = last.is_some_and(|op| self.ops[op].name == ops::RETURN);
        if !terminated {
            return MissingTerminatorSnafu { function: self.name.clone() }.fail();
        }
        let mut defined: HashSet<Value> = (0..self.blocks[self.entry].args.len())
            .map(|i| Value::arg(self.entry, i))
            .collect();
        self.verify_block(self.entry, &mut defined)
    }

    fn verify_block(&self, block: BlockId, defined: &mut HashSet<Value>) -> Result<()> {
        for i in 0..self.blocks[block].ops.len() {
            let op = self.blocks[block].ops[i];
            for &operand in &self.ops[op].operands {
                if !defined.contains(&operand) {
                    return UseBeforeDefSnafu { op: self.ops[op].name.clone() }.fail();
                }
            }
            for region in &self.ops[op].regions {
                for &b in &region.blocks {
                    let mut inner = defined.clone();
                    inner.extend((0..self.blocks[b].args.len()).map(|i| Value::arg(b, i)));
                    self.verify_block(b, &mut inner)?;
                }
            }
            defined.extend(self.results(op));
        }
        Ok(())
    }
}
