use cleaver_ir::prelude::*;
use test_case::test_case;

use crate::algo::{MergeOrder, run_clustering, run_fallback, run_greedy};
use crate::config::{ClusterAlgo, DEVICE_HOST, HOST_ANCHOR_NAME};
use crate::test::helpers::*;

#[test_case(MergeOrder::TopDown; "top_down")]
#[test_case(MergeOrder::BottomUp; "bottom_up")]
fn chain_collapses_into_one_cluster(order: MergeOrder) {
    let (mut module, [a, b, c]) = simple_chain();
    let options = options(ClusterAlgo::TopDown);

    let metadatas = run_clustering(order, module.func_mut(0), &options, None)
        .expect("clustering must produce metadata");
    assert_eq!(metadatas.len(), 1);
    assert_eq!(metadatas[0].ops, vec![a, b, c]);
    assert!(metadatas[0].inputs.is_empty());
    assert_eq!(metadatas[0].outputs.as_slice(), &[res(c)]);
    assert_eq!(metadatas[0].device, "gpu");
}

#[test_case(MergeOrder::TopDown; "top_down")]
#[test_case(MergeOrder::BottomUp; "bottom_up")]
fn candidates_are_ordered_by_descending_size(order: MergeOrder) {
    let (mut module, g1, h, g2) = bridged_groups();
    let mut options = options(ClusterAlgo::TopDown);
    options.enable_multi_graph = true;

    let metadatas = run_clustering(order, module.func_mut(0), &options, None)
        .expect("clustering must produce metadata");
    assert_eq!(metadatas.len(), 2);
    assert_eq!(metadatas[0].ops, g1.to_vec());
    assert_eq!(metadatas[1].ops, g2.to_vec());
    for metadata in &metadatas {
        assert!(!metadata.ops.contains(&h), "host op leaked into a device cluster");
    }
}

#[test]
fn multi_graph_off_keeps_only_the_largest() {
    let (mut module, g1, _, _) = bridged_groups();
    let options = options(ClusterAlgo::TopDown);

    let metadatas = run_clustering(MergeOrder::TopDown, module.func_mut(0), &options, None)
        .expect("clustering must produce metadata");
    assert_eq!(metadatas.len(), 1);
    assert_eq!(metadatas[0].ops, g1.to_vec());
}

#[test]
fn greedy_covers_at_least_both_orders() {
    let covered = |metadatas: &[crate::metadata::FunctionMetadata]| -> usize {
        metadatas.iter().map(|m| m.ops.len()).sum()
    };
    let mut options = options(ClusterAlgo::Greedy);
    options.enable_multi_graph = true;

    let (mut td_module, ..) = bridged_groups();
    let (mut bu_module, ..) = bridged_groups();
    let (mut greedy_module, ..) = bridged_groups();

    let td = run_clustering(MergeOrder::TopDown, td_module.func_mut(0), &options, None).unwrap();
    let bu = run_clustering(MergeOrder::BottomUp, bu_module.func_mut(0), &options, None).unwrap();
    let greedy = run_greedy(greedy_module.func_mut(0), &options, None).unwrap();

    assert!(covered(&greedy) >= covered(&td).max(covered(&bu)));
}

#[test]
fn rejected_candidates_are_skipped() {
    let (mut module, g1, _, g2) = bridged_groups();
    let mut options = options(ClusterAlgo::TopDown);
    options.enable_multi_graph = true;

    // Reject the large cluster; only the small one survives.
    let validate = |func: &Function, ops: &[OpId]| !ops.iter().any(|&op| func.op(op).name() == "one");
    let metadatas =
        run_clustering(MergeOrder::TopDown, module.func_mut(0), &options, Some(&validate)).unwrap();
    assert_eq!(metadatas.len(), 1);
    assert_eq!(metadatas[0].ops, g2.to_vec());
    assert!(!metadatas[0].ops.iter().any(|op| g1.contains(op)));
}

#[test]
fn rejecting_everything_yields_no_metadata_but_no_failure() {
    let (mut module, ..) = simple_chain();
    let options = options(ClusterAlgo::TopDown);
    let validate = |_: &Function, _: &[OpId]| false;

    let metadatas =
        run_clustering(MergeOrder::TopDown, module.func_mut(0), &options, Some(&validate)).unwrap();
    assert!(metadatas.is_empty());
}

#[test]
fn fallback_splits_host_and_device() {
    // a (device), b (host, uses a), c (device, uses b): the host partition
    // pulls a in through the operand closure.
    let mut func = Function::new("main", FunctionType::new(vec![], vec![f32()]));
    let entry = func.entry();
    let a = func.append_op(entry, leaf("one"));
    let b = func.append_op(entry, on_host(unary("prep", res(a))));
    let c = func.append_op(entry, unary("neg", res(b)));
    func.append_op(entry, Operation::new(ops::RETURN).operand(res(c)));
    let mut module = module_of(func);

    let options = options(ClusterAlgo::Fallback);
    let metadatas = run_fallback(module.func_mut(0), &options, None).unwrap();
    assert_eq!(metadatas.len(), 2);

    let host = &metadatas[0];
    assert_eq!(host.device, DEVICE_HOST);
    assert_eq!(host.anchor_name, HOST_ANCHOR_NAME);
    assert_eq!(host.ops, vec![a, b]);
    assert!(host.inputs.is_empty());
    assert_eq!(host.outputs.as_slice(), &[res(b)]);

    let device = &metadatas[1];
    assert_eq!(device.device, "gpu");
    assert_eq!(device.ops, vec![c]);
    assert_eq!(device.inputs.as_slice(), &[res(b)]);
    assert_eq!(device.outputs.as_slice(), &[res(c)]);
}

#[test]
fn fallback_validation_rejects_the_whole_function() {
    let (mut module, ..) = simple_chain();
    let options = options(ClusterAlgo::Fallback);
    let validate = |_: &Function, _: &[OpId]| false;
    assert!(run_fallback(module.func_mut(0), &options, Some(&validate)).is_none());
}

#[test]
fn fallback_without_host_ops_emits_device_only() {
    let (mut module, [a, b, c]) = simple_chain();
    let options = options(ClusterAlgo::Fallback);
    let metadatas = run_fallback(module.func_mut(0), &options, None).unwrap();
    assert_eq!(metadatas.len(), 1);
    assert_eq!(metadatas[0].ops, vec![a, b, c]);
}

#[test]
fn host_only_function_yields_no_clusters() {
    let mut func = Function::new("main", FunctionType::new(vec![], vec![f32()]));
    let entry = func.entry();
    let a = func.append_op(entry, on_host(leaf("one")));
    func.append_op(entry, Operation::new(ops::RETURN).operand(res(a)));
    let mut module = module_of(func);

    let options = options(ClusterAlgo::TopDown);
    assert!(run_clustering(MergeOrder::TopDown, module.func_mut(0), &options, None).is_none());
}

#[test]
fn wedged_host_op_produces_two_device_clusters() {
    // a (device), m (host, uses a), b (device, uses m): the merge is
    // illegal, so Top-Down leaves two singleton device clusters.
    let mut func = Function::new("main", FunctionType::new(vec![], vec![f32()]));
    let entry = func.entry();
    let a = func.append_op(entry, leaf("one"));
    let m = func.append_op(entry, on_host(unary("prep", res(a))));
    let b = func.append_op(entry, unary("neg", res(m)));
    func.append_op(entry, Operation::new(ops::RETURN).operand(res(b)));
    let mut module = module_of(func);

    let mut options = options(ClusterAlgo::TopDown);
    options.enable_multi_graph = true;
    let metadatas =
        run_clustering(MergeOrder::TopDown, module.func_mut(0), &options, None).unwrap();
    assert_eq!(metadatas.len(), 2);
    assert!(metadatas.iter().all(|meta| meta.ops.len() == 1));
    assert!(!metadatas.iter().any(|meta| meta.ops.contains(&m)));
    let _ = (a, b);
}
