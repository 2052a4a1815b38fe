//! Host-bound operation detection.

use std::collections::HashSet;

use cleaver_ir::{Function, OpId};

use crate::config::DEVICE_HOST;

/// An op is host-bound when its device attribute equals `"host"`, or when
/// any op nested inside its regions is host-bound.
pub fn is_host_op(func: &Function, op: OpId, attr_name: &str) -> bool {
    for region in func.op(op).region_list() {
        for &block in region.blocks.iter() {
            for &inner in func.block(block).ops() {
                if is_host_op(func, inner, attr_name) {
                    return true;
                }
            }
        }
    }
    func.op(op).str_attr(attr_name) == Some(DEVICE_HOST)
}

/// Insert `seed` and the transitive closure of its operand definitions
/// into `set`. Used by the fallback split so a host op drags every op it
/// depends on into the host partition.
pub(crate) fn close_over_defs(func: &Function, seed: OpId, set: &mut HashSet<OpId>) {
    if !set.insert(seed) {
        return;
    }
    for &value in func.op(seed).operand_values() {
        if let Some(def) = value.defining_op() {
            close_over_defs(func, def, set);
        }
    }
}
