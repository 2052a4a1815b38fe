use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    /// Clustering found nothing to outline: either the function has no
    /// device ops, or the fallback device partition failed validation.
    #[snafu(display("function `{function}`: graph clustering by device found no partitionable subgraph"))]
    NoPartitions { function: String },
}
