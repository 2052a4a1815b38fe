//! Function synthesis and call rewrite.
//!
//! Each metadata becomes a fresh public function holding clones of the
//! cluster's ops; the caller gets a call at the site of the cluster's last
//! op, uses of the cluster's outputs are rewired to the call results, and
//! the originals are erased afterwards in reverse order.

use std::collections::HashMap;

use cleaver_ir::{
    Attribute, Function, FunctionType, Module, Operation, Type, Value, ValueMap, Visibility, ops,
};

use crate::metadata::FunctionMetadata;

/// Synthesize one function per metadata and insert it into the module at
/// the metadata's insertion point (advancing as siblings are inserted).
/// Records the final symbol name, which may differ on collision.
pub(crate) fn create_functions(
    module: &mut Module,
    src_index: usize,
    metadatas: &mut [FunctionMetadata],
    attr_name: &str,
) {
    let Some(first) = metadatas.first() else { return };
    let mut insert_at = first.insertion_index;

    for metadata in metadatas.iter_mut() {
        let src = module.func(src_index);
        let input_types: Vec<Type> =
            metadata.inputs.iter().map(|&v| src.value_type(v).clone()).collect();
        let result_types: Vec<Type> =
            metadata.outputs.iter().map(|&v| src.value_type(v).clone()).collect();

        let name = format!("{}_{}", metadata.original_name, metadata.device);
        let mut func = Function::new(name, FunctionType::new(input_types, result_types));
        func.set_attr(attr_name, Attribute::Str(metadata.device.clone()));
        func.set_attr(&metadata.anchor_name, Attribute::Unit);
        func.set_visibility(Visibility::Public);

        let entry = func.entry();
        let mut map = ValueMap::new();
        for (i, &input) in metadata.inputs.iter().enumerate() {
            map.insert(input, Value::arg(entry, i));
        }
        for &op in &metadata.ops {
            func.clone_op_from(src, op, entry, &mut map);
        }
        let returned: Vec<Value> = metadata.outputs.iter().map(|&v| map.resolve(v)).collect();
        func.append_op(entry, Operation::new(ops::RETURN).operands(returned));

        let (index, final_name) = module.insert_function(insert_at, func);
        metadata.partition_name = final_name;
        insert_at = index + 1;
    }
}

/// Create a call per metadata at the site of the cluster's last op and
/// rewire uses of the cluster outputs to the call results. The running
/// value map makes chained calls consume prior call results instead of the
/// about-to-be-erased originals.
pub(crate) fn create_calls(
    module: &mut Module,
    src_index: usize,
    metadatas: &[FunctionMetadata],
    dup_outputs: bool,
) {
    let mut map = ValueMap::new();
    for metadata in metadatas {
        let func = module.func_mut(src_index);
        let Some(&last) = metadata.ops.last() else { continue };

        let result_types: Vec<Type> =
            metadata.outputs.iter().map(|&v| func.value_type(v).clone()).collect();
        let operands: Vec<Value> = metadata.inputs.iter().map(|&v| map.resolve(v)).collect();
        let call = Operation::new(ops::CALL)
            .attr(ops::CALLEE_ATTR, Attribute::Str(metadata.partition_name.clone()))
            .operands(operands)
            .results(result_types);
        let call_id = func.insert_op_before(last, call);

        // Per-value stacks of return-slot indices; each duplicated output
        // copy consumes one slot, lowest index first.
        let ret = func.terminator();
        let ret_operands: Vec<Value> = func.op(ret).operand_values().to_vec();
        let mut ret_slots: HashMap<Value, Vec<usize>> = HashMap::new();
        for i in (0..ret_operands.len()).rev() {
            ret_slots.entry(ret_operands[i]).or_default().push(i);
        }

        for (i, &original) in metadata.outputs.iter().enumerate() {
            let new_value = Value::result(call_id, i);
            if dup_outputs {
                func.replace_all_uses_except(original, new_value, ret);
                if let Some(slots) = ret_slots.get_mut(&original)
                    && let Some(slot) = slots.pop()
                {
                    func.set_operand(ret, slot, new_value);
                }
            } else {
                func.replace_all_uses(original, new_value);
            }
            map.insert(original, new_value);
        }
    }
}
