/*!
End-to-end scenarios driving the builder, the taint configuration and the
solver together. Each test builds a small program, runs the analysis from
`main` and checks which leaks survive.
*/

use crate::analysis::alias::ExplicitAliasInfo;
use crate::analysis::ide::IdeProblem;
use crate::builder::ModuleBuilder;
use crate::function::FuncId;
use crate::instructions::InstId;
use crate::module::Module;
use crate::taint::{CallTaintConfig, IdeTaintAnalysis};
use crate::types::Type;
use crate::values::ValueId;
use pretty_assertions::assert_eq;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

fn byte_ptr() -> Type {
    Type::Pointer(Box::new(Type::Uint(8)))
}

fn entry_inst(module: &Module, func: FuncId, index: u32) -> InstId {
    InstId {
        function: func,
        block: module.function(func).unwrap().entry_block(),
        index,
    }
}

fn leaks_of(
    module: &Rc<Module>,
    config: &CallTaintConfig,
    main: FuncId,
) -> BTreeMap<InstId, BTreeSet<ValueId>> {
    let alias = ExplicitAliasInfo::new();
    let analysis = IdeTaintAnalysis::new(module.clone(), config, &alias, vec![main]);
    let results = analysis.solve();
    analysis.all_leaks(&results)
}

#[test]
fn test_source_reaches_sink_through_call_config() {
    let mut builder = ModuleBuilder::new();
    let source = builder
        .declare_function("read_input", &[byte_ptr()], Type::Void)
        .unwrap();
    let sink = builder
        .declare_function("send", &[byte_ptr()], Type::Void)
        .unwrap();

    let mut fb = builder.function("main", Type::Void);
    let mut entry = fb.entry_block();
    let buf = entry.alloc("buf", Type::Uint(8));
    entry.call(source, &[buf]).unwrap();
    entry.call(sink, &[buf]).unwrap();
    entry.return_void().unwrap();
    let main = fb.finish().unwrap();
    let module = Rc::new(builder.build());

    let mut config = CallTaintConfig::new(module.clone());
    config.mark_source_param(source, 0).mark_sink_param(sink, 0);

    let sink_call = entry_inst(&module, main, 2);
    assert_eq!(
        leaks_of(&module, &config, main),
        BTreeMap::from([(sink_call, BTreeSet::from([buf]))])
    );
}

#[test]
fn test_sanitizer_call_suppresses_leak() {
    let mut builder = ModuleBuilder::new();
    let source = builder
        .declare_function("read_input", &[byte_ptr()], Type::Void)
        .unwrap();
    let scrub = builder
        .declare_function("scrub", &[byte_ptr()], Type::Void)
        .unwrap();
    let sink = builder
        .declare_function("send", &[byte_ptr()], Type::Void)
        .unwrap();

    let mut fb = builder.function("main", Type::Void);
    let mut entry = fb.entry_block();
    let buf = entry.alloc("buf", Type::Uint(8));
    entry.call(source, &[buf]).unwrap();
    entry.call(scrub, &[buf]).unwrap();
    entry.call(sink, &[buf]).unwrap();
    entry.return_void().unwrap();
    let main = fb.finish().unwrap();
    let module = Rc::new(builder.build());

    let mut config = CallTaintConfig::new(module.clone());
    config
        .mark_source_param(source, 0)
        .mark_sanitizer_param(scrub, 0)
        .mark_sink_param(sink, 0);

    assert_eq!(leaks_of(&module, &config, main), BTreeMap::new());
}

#[test]
fn test_sanitizing_store_suppresses_leak() {
    let mut builder = ModuleBuilder::new();
    let source = builder
        .declare_function("read_input", &[byte_ptr()], Type::Void)
        .unwrap();
    let sink = builder
        .declare_function("send", &[byte_ptr()], Type::Void)
        .unwrap();

    let mut fb = builder.function("main", Type::Void);
    let mut entry = fb.entry_block();
    let buf = entry.alloc("buf", Type::Uint(64));
    entry.call(source, &[buf]).unwrap();
    let zero = entry.const_uint(0, 64);
    entry.store(buf, zero);
    entry.call(sink, &[buf]).unwrap();
    entry.return_void().unwrap();
    let main = fb.finish().unwrap();
    let module = Rc::new(builder.build());

    let mut config = CallTaintConfig::new(module.clone());
    config.mark_source_param(source, 0).mark_sink_param(sink, 0);

    assert_eq!(leaks_of(&module, &config, main), BTreeMap::new());
}

#[test]
fn test_disabled_strong_updates_keep_overwritten_taint() {
    let mut builder = ModuleBuilder::new();
    let source = builder
        .declare_function("read_input", &[byte_ptr()], Type::Void)
        .unwrap();
    let sink = builder
        .declare_function("send", &[byte_ptr()], Type::Void)
        .unwrap();

    let mut fb = builder.function("main", Type::Void);
    let mut entry = fb.entry_block();
    let buf = entry.alloc("buf", Type::Uint(64));
    entry.call(source, &[buf]).unwrap();
    let zero = entry.const_uint(0, 64);
    entry.store(buf, zero);
    entry.call(sink, &[buf]).unwrap();
    entry.return_void().unwrap();
    let main = fb.finish().unwrap();
    let module = Rc::new(builder.build());

    let mut config = CallTaintConfig::new(module.clone());
    config.mark_source_param(source, 0).mark_sink_param(sink, 0);

    // Without strong updates the overwriting store no longer scrubs.
    let alias = ExplicitAliasInfo::new();
    let mut analysis = IdeTaintAnalysis::new(module.clone(), &config, &alias, vec![main]);
    analysis.disable_strong_updates();
    let results = analysis.solve();

    let sink_call = entry_inst(&module, main, 3);
    assert_eq!(
        analysis.all_leaks(&results),
        BTreeMap::from([(sink_call, BTreeSet::from([buf]))])
    );
}

#[test]
fn test_load_before_sanitizing_store_still_leaks() {
    let mut builder = ModuleBuilder::new();
    let source = builder
        .declare_function("read_input", &[byte_ptr()], Type::Void)
        .unwrap();
    let sink = builder
        .declare_function("send_word", &[Type::Uint(64)], Type::Void)
        .unwrap();

    let mut fb = builder.function("main", Type::Void);
    let mut entry = fb.entry_block();
    let buf = entry.alloc("buf", Type::Uint(64));
    entry.call(source, &[buf]).unwrap();
    // The value escapes before the overwrite: the stale bytes leak.
    let stale = entry.load(buf);
    let zero = entry.const_uint(0, 64);
    entry.store(buf, zero);
    entry.call(sink, &[stale]).unwrap();
    entry.return_void().unwrap();
    let main = fb.finish().unwrap();
    let module = Rc::new(builder.build());

    let mut config = CallTaintConfig::new(module.clone());
    config.mark_source_param(source, 0).mark_sink_param(sink, 0);

    let sink_call = entry_inst(&module, main, 4);
    assert_eq!(
        leaks_of(&module, &config, main),
        BTreeMap::from([(sink_call, BTreeSet::from([stale]))])
    );
}

#[test]
fn test_taint_flows_out_of_defined_callee_parameter() {
    let mut builder = ModuleBuilder::new();
    let source = builder
        .declare_function("read_input", &[byte_ptr()], Type::Void)
        .unwrap();
    let sink = builder
        .declare_function("send", &[byte_ptr()], Type::Void)
        .unwrap();

    let mut fb = builder.function("taint_it", Type::Void);
    let p = fb.param("p", byte_ptr());
    let mut entry = fb.entry_block();
    entry.call(source, &[p]).unwrap();
    entry.return_void().unwrap();
    let taint_it = fb.finish().unwrap();

    let mut fb = builder.function("main", Type::Void);
    let mut entry = fb.entry_block();
    let buf = entry.alloc("buf", Type::Uint(8));
    entry.call(taint_it, &[buf]).unwrap();
    entry.call(sink, &[buf]).unwrap();
    entry.return_void().unwrap();
    let main = fb.finish().unwrap();
    let module = Rc::new(builder.build());

    let mut config = CallTaintConfig::new(module.clone());
    config.mark_source_param(source, 0).mark_sink_param(sink, 0);

    let sink_call = entry_inst(&module, main, 2);
    assert_eq!(
        leaks_of(&module, &config, main),
        BTreeMap::from([(sink_call, BTreeSet::from([buf]))])
    );
}

#[test]
fn test_tainted_return_value_leaks_in_caller() {
    let mut builder = ModuleBuilder::new();
    let source = builder
        .declare_function("read_input", &[byte_ptr()], Type::Void)
        .unwrap();
    let sink = builder
        .declare_function("send", &[byte_ptr()], Type::Void)
        .unwrap();

    let mut fb = builder.function("get_taint", byte_ptr());
    let mut entry = fb.entry_block();
    let t = entry.alloc("t", Type::Uint(8));
    entry.call(source, &[t]).unwrap();
    entry.return_value(t).unwrap();
    let get_taint = fb.finish().unwrap();

    let mut fb = builder.function("main", Type::Void);
    let mut entry = fb.entry_block();
    let p = entry.call(get_taint, &[]).unwrap().unwrap();
    entry.call(sink, &[p]).unwrap();
    entry.return_void().unwrap();
    let main = fb.finish().unwrap();
    let module = Rc::new(builder.build());

    let mut config = CallTaintConfig::new(module.clone());
    config.mark_source_param(source, 0).mark_sink_param(sink, 0);

    let sink_call = entry_inst(&module, main, 1);
    assert_eq!(
        leaks_of(&module, &config, main),
        BTreeMap::from([(sink_call, BTreeSet::from([p]))])
    );
}

#[test]
fn test_out_parameter_transfer_round_trip() {
    let mut builder = ModuleBuilder::new();
    let source = builder
        .declare_function("read_input", &[byte_ptr()], Type::Void)
        .unwrap();
    let sink = builder
        .declare_function("send", &[byte_ptr()], Type::Void)
        .unwrap();

    let mut fb = builder.function("copy_to", Type::Void);
    let dst_p = fb.param("dst", byte_ptr());
    let src_p = fb.param("src", byte_ptr());
    let mut entry = fb.entry_block();
    let v = entry.load(src_p);
    entry.store(dst_p, v);
    entry.return_void().unwrap();
    let copy_to = fb.finish().unwrap();

    let mut fb = builder.function("main", Type::Void);
    let mut entry = fb.entry_block();
    let a = entry.alloc("a", Type::Uint(8));
    let b = entry.alloc("b", Type::Uint(8));
    entry.call(source, &[a]).unwrap();
    entry.call(copy_to, &[b, a]).unwrap();
    entry.call(sink, &[b]).unwrap();
    entry.return_void().unwrap();
    let main = fb.finish().unwrap();
    let module = Rc::new(builder.build());

    let mut config = CallTaintConfig::new(module.clone());
    config.mark_source_param(source, 0).mark_sink_param(sink, 0);

    // The taint travels into `src`, through the store into `dst`, and back
    // onto the caller's second buffer.
    let sink_call = entry_inst(&module, main, 4);
    assert_eq!(
        leaks_of(&module, &config, main),
        BTreeMap::from([(sink_call, BTreeSet::from([b]))])
    );
}

#[test]
fn test_sanitizer_on_single_branch_does_not_suppress() {
    let (module, config, main, buf, sink_call) = branchy_program(false);
    assert_eq!(
        leaks_of(&module, &config, main),
        BTreeMap::from([(sink_call, BTreeSet::from([buf]))])
    );
}

#[test]
fn test_sanitizers_on_both_branches_merge_at_join() {
    let (module, config, main, _buf, _sink_call) = branchy_program(true);
    assert_eq!(leaks_of(&module, &config, main), BTreeMap::new());
}

/// `main` taints `buf`, branches, overwrites it on the left path (and on the
/// right path too if `sanitize_both`), then leaks it at the merge block.
fn branchy_program(
    sanitize_both: bool,
) -> (Rc<Module>, CallTaintConfig, FuncId, ValueId, InstId) {
    let mut builder = ModuleBuilder::new();
    let source = builder
        .declare_function("read_input", &[byte_ptr()], Type::Void)
        .unwrap();
    let sink = builder
        .declare_function("send", &[byte_ptr()], Type::Void)
        .unwrap();

    let mut fb = builder.function("main", Type::Void);
    let mut entry = fb.entry_block();
    let entry_id = entry.block_id();
    let buf = entry.alloc("buf", Type::Uint(64));
    entry.call(source, &[buf]).unwrap();
    let cond = entry.const_bool(true);
    drop(entry);
    let left = fb.create_block();
    let right = fb.create_block();
    let merge = fb.create_block();
    fb.switch_to_block(entry_id)
        .unwrap()
        .branch(cond, left, right)
        .unwrap();

    let mut lb = fb.switch_to_block(left).unwrap();
    let zero = lb.const_uint(0, 64);
    lb.store(buf, zero);
    lb.jump(merge).unwrap();

    let mut rb = fb.switch_to_block(right).unwrap();
    if sanitize_both {
        rb.store(buf, zero);
    }
    rb.jump(merge).unwrap();

    let mut mb = fb.switch_to_block(merge).unwrap();
    mb.call(sink, &[buf]).unwrap();
    mb.return_void().unwrap();
    let main = fb.finish().unwrap();
    let module = Rc::new(builder.build());

    let mut config = CallTaintConfig::new(module.clone());
    config.mark_source_param(source, 0).mark_sink_param(sink, 0);

    let sink_call = InstId {
        function: main,
        block: merge,
        index: 0,
    };
    (module, config, main, buf, sink_call)
}

#[test]
fn test_memcpy_spreads_taint_to_destination() {
    let mut builder = ModuleBuilder::new();
    let source = builder
        .declare_function("read_input", &[byte_ptr()], Type::Void)
        .unwrap();
    let sink = builder
        .declare_function("send", &[byte_ptr()], Type::Void)
        .unwrap();

    let mut fb = builder.function("main", Type::Void);
    let mut entry = fb.entry_block();
    let src = entry.alloc("src", Type::Uint(8));
    let dst = entry.alloc("dst", Type::Uint(8));
    entry.call(source, &[src]).unwrap();
    let len = entry.const_uint(1, 64);
    entry.mem_cpy(dst, src, len);
    entry.call(sink, &[dst]).unwrap();
    entry.return_void().unwrap();
    let main = fb.finish().unwrap();
    let module = Rc::new(builder.build());

    let mut config = CallTaintConfig::new(module.clone());
    config.mark_source_param(source, 0).mark_sink_param(sink, 0);

    let sink_call = entry_inst(&module, main, 4);
    assert_eq!(
        leaks_of(&module, &config, main),
        BTreeMap::from([(sink_call, BTreeSet::from([dst]))])
    );
}

#[test]
fn test_memset_overwrites_taint() {
    let mut builder = ModuleBuilder::new();
    let source = builder
        .declare_function("read_input", &[byte_ptr()], Type::Void)
        .unwrap();
    let sink = builder
        .declare_function("send", &[byte_ptr()], Type::Void)
        .unwrap();

    let mut fb = builder.function("main", Type::Void);
    let mut entry = fb.entry_block();
    let buf = entry.alloc("buf", Type::Uint(8));
    entry.call(source, &[buf]).unwrap();
    let fill = entry.const_uint(0, 8);
    let len = entry.const_uint(1, 64);
    entry.mem_set(buf, fill, len);
    entry.call(sink, &[buf]).unwrap();
    entry.return_void().unwrap();
    let main = fb.finish().unwrap();
    let module = Rc::new(builder.build());

    let mut config = CallTaintConfig::new(module.clone());
    config.mark_source_param(source, 0).mark_sink_param(sink, 0);

    assert_eq!(leaks_of(&module, &config, main), BTreeMap::new());
}

#[test]
fn test_varargs_map_onto_va_list() {
    let mut builder = ModuleBuilder::new();
    let mut fb = builder.function("vlog", Type::Void);
    let _fmt = fb.param("fmt", byte_ptr());
    let va_list = fb.make_variadic();
    let mut entry = fb.entry_block();
    entry.return_void().unwrap();
    let vlog = fb.finish().unwrap();

    let mut fb = builder.function("main", Type::Void);
    let mut entry = fb.entry_block();
    let first = entry.alloc("first", Type::Uint(64));
    let second = entry.alloc("second", Type::Uint(64));
    let fmt = entry.const_null();
    entry.call(vlog, &[fmt, first, second]).unwrap();
    entry.return_void().unwrap();
    let main = fb.finish().unwrap();
    let module = Rc::new(builder.build());

    let config = CallTaintConfig::new(module.clone());
    let alias = ExplicitAliasInfo::new();
    let analysis = IdeTaintAnalysis::new(module.clone(), &config, &alias, vec![main]);
    let factory = analysis.factory();

    let call = entry_inst(&module, main, 2);
    let flow = analysis.call_flow(call, vlog);

    // Excess arguments land in the va_list aggregate at their byte offset.
    let into_first = flow(factory.create(first));
    let expected_first = factory.with_indirection_of(
        factory.with_transfer_to(
            factory.create(first),
            factory.create(first),
            va_list,
        ),
        &[0],
    );
    assert_eq!(into_first, BTreeSet::from([expected_first]));
    assert_eq!(factory.base_of(expected_first), Some(va_list));
    assert_eq!(factory.data(expected_first).offsets, vec![0, 0]);

    let into_second = flow(factory.create(second));
    let expected_second = factory.with_indirection_of(
        factory.with_transfer_to(
            factory.create(second),
            factory.create(second),
            va_list,
        ),
        &[8],
    );
    assert_eq!(into_second, BTreeSet::from([expected_second]));
    assert_eq!(factory.data(expected_second).offsets, vec![0, 8]);
}

#[test]
fn test_report_render_lists_leaks() {
    let mut builder = ModuleBuilder::new();
    let source = builder
        .declare_function("read_input", &[byte_ptr()], Type::Void)
        .unwrap();
    let sink = builder
        .declare_function("send", &[byte_ptr()], Type::Void)
        .unwrap();

    let mut fb = builder.function("main", Type::Void);
    let mut entry = fb.entry_block();
    let buf = entry.alloc("buf", Type::Uint(8));
    entry.call(source, &[buf]).unwrap();
    entry.call(sink, &[buf]).unwrap();
    entry.return_void().unwrap();
    let main = fb.finish().unwrap();
    let module = Rc::new(builder.build());

    let mut config = CallTaintConfig::new(module.clone());
    config.mark_source_param(source, 0).mark_sink_param(sink, 0);

    let alias = ExplicitAliasInfo::new();
    let analysis = IdeTaintAnalysis::new(module.clone(), &config, &alias, vec![main]);
    let results = analysis.solve();
    let report = analysis.report(&results);

    assert!(!report.is_empty());
    let rendered = report.render(&module);
    assert!(rendered.starts_with("===== Taint Analysis Results ====="));
    assert!(rendered.contains(&format!("At {}", entry_inst(&module, main, 2))));
    assert!(rendered.contains("\tbuf\n"));

    let mut emitted = String::new();
    analysis.emit_text_report(&results, &mut emitted).unwrap();
    assert_eq!(emitted, rendered);
}

#[test]
fn test_module_serde_round_trip() {
    let mut builder = ModuleBuilder::new();
    let callee = builder
        .declare_function("callee", &[byte_ptr()], Type::Void)
        .unwrap();
    let mut fb = builder.function("main", Type::Void);
    let mut entry = fb.entry_block();
    let buf = entry.alloc("buf", Type::Uint(32));
    let field = entry.gep(buf, 4);
    let v = entry.load(field);
    entry.store(buf, v);
    entry.call(callee, &[buf]).unwrap();
    entry.return_void().unwrap();
    fb.finish().unwrap();
    let module = builder.build();

    let encoded = serde_json::to_string(&module).unwrap();
    let decoded: Module = serde_json::from_str(&encoded).unwrap();
    assert_eq!(module, decoded);
}
