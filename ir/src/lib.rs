//! Block-structured SSA intermediate representation for the cleaver
//! compiler.
//!
//! The IR is deliberately small: generic named operations carrying operand
//! values, result types, nested regions and attributes, grouped into blocks
//! inside functions, with a module as the top-level symbol container.
//! Passes interpret operations by name and attributes; there is no closed
//! op set.
//!
//! # Module Organization
//!
//! - [`arena`] - Typed arenas and ids backing all IR storage
//! - [`types`] - Value types and function signatures
//! - [`attr`] - Attributes and tensor literals
//! - [`op`] - Operations, values, blocks and regions
//! - [`func`] - Functions: ordering, navigation, cloning and surgery
//! - [`module`] - Modules and symbol-table insertion
//! - [`print`] - Textual rendering for debugging and tests
//!
//! # Ownership model
//!
//! A [`Function`] owns the arenas for its operations and blocks. Ids are
//! function-local, so cloning a function is a deep copy and ids remain
//! valid inside the clone. Erasing an operation unlinks it from its block;
//! arena slots are reclaimed when the function is dropped.

pub mod arena;
pub mod attr;
pub mod error;
pub mod func;
pub mod module;
pub mod op;
pub mod print;
pub mod types;

pub use arena::{Arena, Id};
pub use attr::{AttrMap, Attribute, ConstValue, ElementsAttr};
pub use error::{Error, Result};
pub use func::{Function, ValueMap, Visibility};
pub use module::Module;
pub use op::{Block, BlockId, OpId, Operation, Region, Value, ops};
pub use types::{DType, FunctionType, Type};

/// Common imports for building and transforming IR.
pub mod prelude {
    pub use crate::attr::{Attribute, ConstValue, ElementsAttr};
    pub use crate::func::{Function, ValueMap, Visibility};
    pub use crate::module::Module;
    pub use crate::op::{BlockId, OpId, Operation, Value, ops};
    pub use crate::types::{DType, FunctionType, Type};
}
