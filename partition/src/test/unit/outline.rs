use cleaver_ir::prelude::*;

use crate::config::{ClusterAlgo, HOST_ANCHOR_NAME};
use crate::pass::partition_by_device;
use crate::test::helpers::*;

fn call_ops(func: &Function) -> Vec<OpId> {
    func.body_ops().iter().copied().filter(|&op| func.op(op).name() == ops::CALL).collect()
}

#[test]
fn trivial_chain_becomes_one_device_function() {
    let (mut module, ..) = simple_chain();
    let options = options(ClusterAlgo::TopDown);

    partition_by_device(&mut module, &options, None).unwrap();
    assert_module_valid(&module);
    assert_eq!(module.len(), 2);

    let outlined = module.get("main_gpu").expect("device function must exist");
    assert_eq!(outlined.visibility(), Visibility::Public);
    assert_eq!(outlined.attrs().get("device"), Some(&Attribute::Str("gpu".to_string())));
    assert_eq!(outlined.attrs().get("device.anchor"), Some(&Attribute::Unit));
    assert_eq!(outlined.body_ops().len(), 3);
    assert!(outlined.ty().inputs.is_empty());
    assert_eq!(outlined.ty().results.len(), 1);

    // The caller is reduced to a call whose result feeds the return.
    let main = module.get("main").unwrap();
    let calls = call_ops(main);
    assert_eq!(calls.len(), 1);
    assert_eq!(main.body_ops(), calls.as_slice());
    assert_eq!(main.op(calls[0]).str_attr(ops::CALLEE_ATTR), Some("main_gpu"));
    let ret = main.terminator();
    assert_eq!(main.op(ret).operand_values(), &[Value::result(calls[0], 0)]);
}

#[test]
fn fallback_chains_host_call_into_device_call() {
    let mut func = Function::new("main", FunctionType::new(vec![], vec![f32()]));
    let entry = func.entry();
    let a = func.append_op(entry, leaf("one"));
    let b = func.append_op(entry, on_host(unary("prep", res(a))));
    let c = func.append_op(entry, unary("neg", res(b)));
    func.append_op(entry, Operation::new(ops::RETURN).operand(res(c)));
    let mut module = module_of(func);

    let options = options(ClusterAlgo::Fallback);
    partition_by_device(&mut module, &options, None).unwrap();
    assert_module_valid(&module);
    assert_eq!(module.len(), 3);

    let host = module.get("main_host").expect("host function must exist");
    assert_eq!(host.attrs().get(HOST_ANCHOR_NAME), Some(&Attribute::Unit));
    assert_eq!(host.body_ops().len(), 2);

    let device = module.get("main_gpu").expect("device function must exist");
    assert_eq!(device.body_ops().len(), 1);

    // Host function is emitted first, and its call feeds the device call.
    assert_eq!(module.index_of("main_host"), Some(1));
    assert_eq!(module.index_of("main_gpu"), Some(2));
    let main = module.get("main").unwrap();
    let calls = call_ops(main);
    assert_eq!(calls.len(), 2);
    assert_eq!(main.op(calls[0]).str_attr(ops::CALLEE_ATTR), Some("main_host"));
    assert_eq!(main.op(calls[1]).str_attr(ops::CALLEE_ATTR), Some("main_gpu"));
    assert_eq!(main.op(calls[1]).operand_values(), &[Value::result(calls[0], 0)]);
    let ret = main.terminator();
    assert_eq!(main.op(ret).operand_values(), &[Value::result(calls[1], 0)]);
}

#[test]
fn duplicated_outputs_rewire_each_return_slot() {
    // main returns (v, v); with dup_outputs each slot gets its own call
    // result.
    let mut func = Function::new("main", FunctionType::new(vec![], vec![f32(), f32()]));
    let entry = func.entry();
    let a = func.append_op(entry, leaf("one"));
    let v = func.append_op(entry, unary("neg", res(a)));
    func.append_op(entry, Operation::new(ops::RETURN).operands([res(v), res(v)]));
    let mut module = module_of(func);

    let mut options = options(ClusterAlgo::TopDown);
    options.dup_outputs = true;
    partition_by_device(&mut module, &options, None).unwrap();
    assert_module_valid(&module);

    let outlined = module.get("main_gpu").unwrap();
    assert_eq!(outlined.ty().results.len(), 2);
    let outlined_ret = outlined.terminator();
    let returned = outlined.op(outlined_ret).operand_values();
    assert_eq!(returned[0], returned[1], "both slots return the same cloned value");

    let main = module.get("main").unwrap();
    let calls = call_ops(main);
    assert_eq!(calls.len(), 1);
    assert_eq!(main.op(calls[0]).num_results(), 2);
    let ret = main.terminator();
    assert_eq!(
        main.op(ret).operand_values(),
        &[Value::result(calls[0], 0), Value::result(calls[0], 1)],
        "each return slot consumes its own call result",
    );
}

#[test]
fn without_dup_outputs_the_value_is_returned_through_one_result() {
    let mut func = Function::new("main", FunctionType::new(vec![], vec![f32(), f32()]));
    let entry = func.entry();
    let a = func.append_op(entry, leaf("one"));
    let v = func.append_op(entry, unary("neg", res(a)));
    func.append_op(entry, Operation::new(ops::RETURN).operands([res(v), res(v)]));
    let mut module = module_of(func);

    let options = options(ClusterAlgo::TopDown);
    partition_by_device(&mut module, &options, None).unwrap();
    assert_module_valid(&module);

    let main = module.get("main").unwrap();
    let calls = call_ops(main);
    assert_eq!(main.op(calls[0]).num_results(), 1);
    let ret = main.terminator();
    assert_eq!(
        main.op(ret).operand_values(),
        &[Value::result(calls[0], 0), Value::result(calls[0], 0)],
    );
}

#[test]
fn multi_graph_off_leaves_smaller_group_in_the_caller() {
    let (mut module, _, h, g2) = bridged_groups();
    let options = options(ClusterAlgo::TopDown);

    partition_by_device(&mut module, &options, None).unwrap();
    assert_module_valid(&module);
    assert_eq!(module.len(), 2);

    let main = module.get("main").unwrap();
    let body = main.body_ops();
    // call + host bridge + the unextracted small group
    assert_eq!(call_ops(main).len(), 1);
    assert!(body.contains(&h));
    for op in g2 {
        assert!(body.contains(&op), "unextracted device op must stay in the caller");
    }
}

#[test]
fn multi_graph_on_extracts_every_candidate() {
    let (mut module, _, h, _) = bridged_groups();
    let mut options = options(ClusterAlgo::TopDown);
    options.enable_multi_graph = true;

    partition_by_device(&mut module, &options, None).unwrap();
    assert_module_valid(&module);
    assert_eq!(module.len(), 3);
    assert_eq!(module.index_of("main_gpu"), Some(1));
    assert_eq!(module.index_of("main_gpu_0"), Some(2));

    let main = module.get("main").unwrap();
    assert_eq!(call_ops(main).len(), 2);
    assert!(main.body_ops().contains(&h));
}

#[test]
fn colliding_names_are_renamed_and_recorded() {
    let (mut module, ..) = simple_chain();
    let mut taken = Function::new("main_gpu", FunctionType::new(vec![], vec![f32()]));
    let entry = taken.entry();
    let op = taken.append_op(entry, leaf("other"));
    taken.append_op(entry, Operation::new(ops::RETURN).operand(res(op)));
    module.add_function(taken);
    let options = options(ClusterAlgo::TopDown);

    partition_by_device(&mut module, &options, None).unwrap();
    assert_module_valid(&module);

    let main = module.get("main").unwrap();
    let calls = call_ops(main);
    assert_eq!(main.op(calls[0]).str_attr(ops::CALLEE_ATTR), Some("main_gpu_0"));
    assert!(module.get("main_gpu_0").is_some());
}

#[test]
fn host_only_constant_stays_with_its_consumer() {
    // A constant consumed solely by a host op is excluded from clustering,
    // so it survives in the caller next to the host op.
    let mut func = Function::new("main", FunctionType::new(vec![], vec![f32()]));
    let entry = func.entry();
    let k = func.append_op(entry, splat_const(2.0));
    let h = func.append_op(entry, on_host(unary("prep", res(k))));
    let d = func.append_op(entry, leaf("one"));
    func.append_op(entry, Operation::new(ops::RETURN).operand(res(d)));
    let mut module = module_of(func);
    let _ = h;

    let options = options(ClusterAlgo::TopDown);
    partition_by_device(&mut module, &options, None).unwrap();
    assert_module_valid(&module);

    let outlined = module.get("main_gpu").unwrap();
    assert_eq!(outlined.body_ops().len(), 1);
    let main = module.get("main").unwrap();
    let names: Vec<&str> = main.body_ops().iter().map(|&op| main.op(op).name()).collect();
    assert!(names.contains(&ops::CONST));
    assert!(names.contains(&"prep"));
}

#[test]
fn empty_device_body_fails_the_pass() {
    let mut func = Function::new("main", FunctionType::new(vec![], vec![f32()]));
    let entry = func.entry();
    let a = func.append_op(entry, on_host(leaf("one")));
    func.append_op(entry, Operation::new(ops::RETURN).operand(res(a)));
    let mut module = module_of(func);

    let options = options(ClusterAlgo::TopDown);
    let err = partition_by_device(&mut module, &options, None).unwrap_err();
    assert!(err.to_string().contains("main"));
}

#[test]
fn greedy_end_to_end_matches_direct_extraction() {
    let (mut module, ..) = simple_chain();
    let options = options(ClusterAlgo::Greedy);

    partition_by_device(&mut module, &options, None).unwrap();
    assert_module_valid(&module);
    assert_eq!(module.len(), 2);
    assert_eq!(module.get("main_gpu").unwrap().body_ops().len(), 3);
}
