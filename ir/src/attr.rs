//! Attributes: named constant metadata attached to operations and functions.
//!
//! Attribute maps are name-sorted (`BTreeMap`) so printing and iteration are
//! deterministic.

use std::collections::BTreeMap;
use std::fmt;

/// Constant scalar value stored inside attributes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConstValue {
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::UInt(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v:?}"),
            Self::Bool(v) => write!(f, "{v}"),
        }
    }
}

/// Dense tensor literal carried by `const` operations.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementsAttr {
    /// Every element equals the given value.
    Splat(ConstValue),
    /// Explicit per-element values.
    Dense(Vec<ConstValue>),
}

impl ElementsAttr {
    /// True when every element of the literal is equal.
    pub fn is_splat(&self) -> bool {
        match self {
            Self::Splat(_) => true,
            Self::Dense(values) => match values.split_first() {
                Some((first, rest)) => rest.iter().all(|v| v == first),
                None => false,
            },
        }
    }
}

impl fmt::Display for ElementsAttr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Splat(v) => write!(f, "splat<{v}>"),
            Self::Dense(values) => {
                write!(f, "dense<[")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]>")
            }
        }
    }
}

/// An attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum Attribute {
    /// Presence-only marker (anchors, flags).
    Unit,
    Str(String),
    I64(i64),
    Bool(bool),
    Elements(ElementsAttr),
}

impl Attribute {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_elements(&self) -> Option<&ElementsAttr> {
        match self {
            Self::Elements(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_unit(&self) -> bool {
        matches!(self, Self::Unit)
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unit => Ok(()),
            Self::Str(s) => write!(f, "\"{s}\""),
            Self::I64(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Elements(e) => write!(f, "{e}"),
        }
    }
}

/// Name-sorted attribute map.
pub type AttrMap = BTreeMap<String, Attribute>;
