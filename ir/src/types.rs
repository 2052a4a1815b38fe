//! Value types carried by SSA values and function signatures.

use std::fmt;

use smallvec::SmallVec;

/// Element data type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    Bool,
    I32,
    I64,
    U32,
    U64,
    F32,
    F64,
    /// Platform-width index type used for sizes and offsets.
    Index,
}

impl DType {
    pub fn is_float(self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }

    pub fn is_int(self) -> bool {
        matches!(self, Self::I32 | Self::I64 | Self::U32 | Self::U64 | Self::Index)
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bool => "i1",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::Index => "index",
        };
        f.write_str(name)
    }
}

/// Type of an SSA value: a scalar or a ranked tensor.
///
/// An empty dimension list denotes a scalar.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Type {
    pub dtype: DType,
    pub dims: SmallVec<[u64; 4]>,
}

impl Type {
    pub fn scalar(dtype: DType) -> Self {
        Self { dtype, dims: SmallVec::new() }
    }

    pub fn tensor(dtype: DType, dims: impl IntoIterator<Item = u64>) -> Self {
        Self { dtype, dims: dims.into_iter().collect() }
    }

    pub fn is_scalar(&self) -> bool {
        self.dims.is_empty()
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_scalar() {
            return write!(f, "{}", self.dtype);
        }
        write!(f, "tensor<")?;
        for dim in &self.dims {
            write!(f, "{dim}x")?;
        }
        write!(f, "{}>", self.dtype)
    }
}

/// Signature of a function: input types and result types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionType {
    pub inputs: Vec<Type>,
    pub results: Vec<Type>,
}

impl FunctionType {
    pub fn new(inputs: Vec<Type>, results: Vec<Type>) -> Self {
        Self { inputs, results }
    }
}

impl fmt::Display for FunctionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, ty) in self.inputs.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{ty}")?;
        }
        write!(f, ") -> (")?;
        for (i, ty) in self.results.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{ty}")?;
        }
        write!(f, ")")
    }
}
