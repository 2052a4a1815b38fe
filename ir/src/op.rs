//! Operations, values, blocks and regions.
//!
//! An [`Operation`] is a generic node: a name, operand values, result types,
//! optional nested regions and an attribute map. There is no closed op set;
//! passes interpret ops by name and attributes. A handful of canonical names
//! used across the workspace live in [`ops`].

use smallvec::SmallVec;

use crate::arena::Id;
use crate::attr::{AttrMap, Attribute};
use crate::types::Type;

pub type OpId = Id<Operation>;
pub type BlockId = Id<Block>;

/// Canonical operation names.
pub mod ops {
    /// Constant materialization: no operands, one result, a `value`
    /// elements attribute.
    pub const CONST: &str = "const";
    /// Function terminator; its operands are the function results.
    pub const RETURN: &str = "return";
    /// Call to another function named by the `callee` string attribute.
    pub const CALL: &str = "call";

    /// Attribute holding a [`crate::ElementsAttr`] literal on `const` ops.
    pub const VALUE_ATTR: &str = "value";
    /// Attribute naming the called function on `call` ops.
    pub const CALLEE_ATTR: &str = "callee";
}

/// An SSA value: a block argument or one result of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Value {
    Result { op: OpId, index: u32 },
    Arg { block: BlockId, index: u32 },
}

impl Value {
    pub fn result(op: OpId, index: usize) -> Self {
        Self::Result { op, index: index as u32 }
    }

    pub fn arg(block: BlockId, index: usize) -> Self {
        Self::Arg { block, index: index as u32 }
    }

    /// The operation defining this value, if any (block arguments have none).
    pub fn defining_op(self) -> Option<OpId> {
        match self {
            Self::Result { op, .. } => Some(op),
            Self::Arg { .. } => None,
        }
    }
}

/// A list of blocks nested inside an operation.
#[derive(Debug, Clone)]
pub struct Region {
    pub blocks: SmallVec<[BlockId; 1]>,
}

/// A straight-line sequence of operations.
///
/// The entry block of a function has no owner; blocks inside a region are
/// owned by the region's operation.
#[derive(Debug, Clone)]
pub struct Block {
    pub(crate) owner: Option<OpId>,
    pub(crate) args: SmallVec<[Type; 2]>,
    pub(crate) ops: Vec<OpId>,
}

impl Block {
    pub fn owner(&self) -> Option<OpId> {
        self.owner
    }

    pub fn args(&self) -> &[Type] {
        &self.args
    }

    pub fn ops(&self) -> &[OpId] {
        &self.ops
    }
}

/// A generic operation.
#[derive(Debug, Clone)]
pub struct Operation {
    pub(crate) name: String,
    pub(crate) operands: SmallVec<[Value; 2]>,
    pub(crate) result_types: SmallVec<[Type; 1]>,
    pub(crate) regions: SmallVec<[Region; 1]>,
    pub(crate) attrs: AttrMap,
    /// Parent block; `None` while detached from a function.
    pub(crate) block: Option<BlockId>,
}

impl Operation {
    /// Start building a detached operation.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            operands: SmallVec::new(),
            result_types: SmallVec::new(),
            regions: SmallVec::new(),
            attrs: AttrMap::new(),
            block: None,
        }
    }

    pub fn operand(mut self, value: Value) -> Self {
        self.operands.push(value);
        self
    }

    pub fn operands(mut self, values: impl IntoIterator<Item = Value>) -> Self {
        self.operands.extend(values);
        self
    }

    pub fn result(mut self, ty: Type) -> Self {
        self.result_types.push(ty);
        self
    }

    pub fn results(mut self, types: impl IntoIterator<Item = Type>) -> Self {
        self.result_types.extend(types);
        self
    }

    pub fn attr(mut self, name: impl Into<String>, value: Attribute) -> Self {
        self.attrs.insert(name.into(), value);
        self
    }

    /// Attach a region made of already-created blocks.
    ///
    /// Block ownership is claimed when the operation is inserted into a
    /// function.
    pub fn region(mut self, blocks: impl IntoIterator<Item = BlockId>) -> Self {
        self.regions.push(Region { blocks: blocks.into_iter().collect() });
        self
    }

    // Accessors

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn num_operands(&self) -> usize {
        self.operands.len()
    }

    pub fn operand_values(&self) -> &[Value] {
        &self.operands
    }

    pub fn num_results(&self) -> usize {
        self.result_types.len()
    }

    pub fn result_types(&self) -> &[Type] {
        &self.result_types
    }

    pub fn region_list(&self) -> &[Region] {
        &self.regions
    }

    pub fn attrs(&self) -> &AttrMap {
        &self.attrs
    }

    pub fn get_attr(&self, name: &str) -> Option<&Attribute> {
        self.attrs.get(name)
    }

    pub fn str_attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).and_then(Attribute::as_str)
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attrs.contains_key(name)
    }
}
