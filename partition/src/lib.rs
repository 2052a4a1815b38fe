//! Device-based graph clustering for cleaver IR.
//!
//! Partitions each function body into sub-functions grouped by target
//! device, separating host-bound ops from accelerator ops: clusters are
//! grown by progressive union-find merging under SSA ordering constraints,
//! then each surviving cluster is outlined into a fresh function and
//! replaced by a call.
//!
//! # Module Organization
//!
//! - [`config`] - Options, algorithm selection, validation hook
//! - [`replicate`] - Pre-replication of shared constant-like ops
//! - [`host`] - Host-bound op detection
//! - [`cluster`] - Union-find clusters and merge legality (move-up/move-down)
//! - [`engine`] - Shared clustering machinery and candidate population
//! - [`algo`] - Top-Down / Bottom-Up / Greedy / Fallback drivers
//! - [`metadata`] - Cluster input/output discovery
//! - [`outline`] - Function synthesis and call rewrite
//! - [`pass`] - The module-level driver
//!
//! # Example
//!
//! ```rust,ignore
//! use cleaver_partition::{PartitionOptions, ClusterAlgo, partition_by_device};
//!
//! let options = PartitionOptions::builder()
//!     .device("gpu".to_string())
//!     .algo(ClusterAlgo::Greedy)
//!     .build();
//! partition_by_device(&mut module, &options, None)?;
//! ```

mod algo;
mod cluster;
pub mod config;
pub mod constant;
mod engine;
pub mod error;
pub mod host;
pub mod metadata;
mod outline;
pub mod pass;
mod replicate;

#[cfg(test)]
pub mod test;

pub use config::{ClusterAlgo, DEVICE_HOST, HOST_ANCHOR_NAME, PartitionOptions, ValidateSubgraph};
pub use error::{Error, Result};
pub use host::is_host_op;
pub use metadata::FunctionMetadata;
pub use pass::partition_by_device;
