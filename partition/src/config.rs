//! Pass configuration.

use bon::bon;
use cleaver_ir::{Function, OpId};

/// Device attribute value marking an operation as host-bound.
pub const DEVICE_HOST: &str = "host";

/// Anchor attribute set on synthesized host functions.
pub const HOST_ANCHOR_NAME: &str = "host.anchor";

/// Clustering algorithm selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClusterAlgo {
    /// Walk ops in block order, merging each op with its operand producers.
    TopDown,

    /// Walk ops in reverse block order, merging each op with its users.
    BottomUp,

    /// Measure Top-Down and Bottom-Up on clones, keep whichever covers
    /// more ops (ties favor Bottom-Up).
    #[default]
    Greedy,

    /// No merging: a single host partition (closed over operand
    /// definitions) and a single device partition for everything else.
    Fallback,
}

/// Validation hook applied to every candidate cluster before it is
/// outlined. Returning `false` skips the candidate; under
/// [`ClusterAlgo::Fallback`] it aborts clustering for the whole function.
pub type ValidateSubgraph<'a> = &'a dyn Fn(&Function, &[OpId]) -> bool;

/// Options for [`crate::partition_by_device`].
#[derive(Debug, Clone)]
pub struct PartitionOptions {
    /// Name of the string attribute carrying the device tag on ops.
    pub attr_name: String,
    /// Device tag written onto synthesized device functions and used as
    /// the function-name suffix.
    pub device: String,
    /// Anchor attribute (unit) set on synthesized device functions.
    pub device_anchor_name: String,
    /// Pre-replicate every constant-like op; otherwise only splats.
    pub dup_non_splat: bool,
    /// Duplicate cluster outputs per return slot so each slot can be
    /// rewired independently.
    pub dup_outputs: bool,
    /// Clustering algorithm.
    pub algo: ClusterAlgo,
    /// Outline every validated candidate instead of only the largest.
    pub enable_multi_graph: bool,
}

impl Default for PartitionOptions {
    fn default() -> Self {
        Self {
            attr_name: "device".to_string(),
            device: "gpu".to_string(),
            device_anchor_name: "device.anchor".to_string(),
            dup_non_splat: false,
            dup_outputs: false,
            algo: ClusterAlgo::default(),
            enable_multi_graph: false,
        }
    }
}

#[bon]
impl PartitionOptions {
    /// Create partition options with builder pattern.
    #[builder]
    pub fn builder(
        #[builder(default = String::from("device"))] attr_name: String,
        #[builder(default = String::from("gpu"))] device: String,
        #[builder(default = String::from("device.anchor"))] device_anchor_name: String,
        #[builder(default = false)] dup_non_splat: bool,
        #[builder(default = false)] dup_outputs: bool,
        #[builder(default)] algo: ClusterAlgo,
        #[builder(default = false)] enable_multi_graph: bool,
    ) -> Self {
        Self { attr_name, device, device_anchor_name, dup_non_splat, dup_outputs, algo, enable_multi_graph }
    }
}
