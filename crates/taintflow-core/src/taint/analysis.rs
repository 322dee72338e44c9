/*!
The taint propagation problem itself.

Facts are interned memory locations, values live in [`EdgeDomain`]. Flow
functions do the field-sensitive plumbing of taints through stores, calls
and returns; edge functions carry the sanitizer bookkeeping. Leaks are
collected while the solver runs and filtered afterwards against the
computed values, so a leak whose fact turned out sanitized on every path is
dropped again.
*/

use super::config::TaintConfig;
use super::edge_domain::EdgeDomain;
use super::edge_function::{EdgeFunction, EdgeFunctionCache};
use super::factory::{MemoryLocationFactory, DEFAULT_INDIRECTION_BOUND};
use super::memory_location::AbstractMemoryLocation;
use crate::analysis::alias::AliasInfo;
use crate::analysis::icfg::ModuleCfg;
use crate::analysis::ide::{FlowFunction, IdeProblem, SolverResults};
use crate::analysis::ordering::BasicBlockOrdering;
use crate::analysis::solver::IdeSolver;
use crate::block::Terminator;
use crate::function::FuncId;
use crate::instructions::{Callee, InstId, Instruction, MemIntrinsic};
use crate::module::Module;
use crate::values::{ValueId, ValueKind};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::Rc;

type Results = SolverResults<AbstractMemoryLocation, EdgeDomain>;

/// Where a call argument lands on the callee side.
#[derive(Debug, Clone, Copy)]
enum ArgTarget {
    Formal(ValueId),
    /// Excess argument of a variadic call: mapped onto the va_list aggregate
    /// at its byte offset within the variadic tail.
    Vararg { va_list: ValueId, offset: i64 },
}

pub struct IdeTaintAnalysis<'a> {
    module: Rc<Module>,
    config: &'a dyn TaintConfig,
    alias: &'a dyn AliasInfo,
    factory: MemoryLocationFactory,
    bbo: BasicBlockOrdering,
    cache: EdgeFunctionCache,
    entry_points: Vec<FuncId>,
    leaks: RefCell<BTreeMap<InstId, BTreeSet<ValueId>>>,
    post_processed: Cell<bool>,
    disable_strong_updates: bool,
}

impl<'a> IdeTaintAnalysis<'a> {
    pub fn new(
        module: Rc<Module>,
        config: &'a dyn TaintConfig,
        alias: &'a dyn AliasInfo,
        entry_points: Vec<FuncId>,
    ) -> Self {
        Self::with_bound(module, config, alias, entry_points, DEFAULT_INDIRECTION_BOUND)
    }

    pub fn with_bound(
        module: Rc<Module>,
        config: &'a dyn TaintConfig,
        alias: &'a dyn AliasInfo,
        entry_points: Vec<FuncId>,
        bound: u32,
    ) -> Self {
        Self {
            factory: MemoryLocationFactory::new(module.clone(), bound),
            bbo: BasicBlockOrdering::new(module.clone()),
            cache: EdgeFunctionCache::new(),
            module,
            config,
            alias,
            entry_points,
            leaks: RefCell::new(BTreeMap::new()),
            post_processed: Cell::new(false),
            disable_strong_updates: false,
        }
    }

    /// Turns every sanitizer-related strong update off; the analysis then
    /// reports raw taint reachability.
    pub fn disable_strong_updates(&mut self) {
        self.disable_strong_updates = true;
    }

    pub fn factory(&self) -> &MemoryLocationFactory {
        &self.factory
    }

    /// Runs the solver over the whole module.
    pub fn solve(&self) -> Results {
        let icfg = ModuleCfg::new(self.module.clone());
        IdeSolver::new(self, &icfg).solve()
    }

    /// All surviving leaks after filtering against the computed values.
    pub fn all_leaks(&self, results: &Results) -> BTreeMap<InstId, BTreeSet<ValueId>> {
        self.do_post_processing(results);
        self.leaks.borrow().clone()
    }

    pub fn report(&self, results: &Results) -> TaintReport {
        TaintReport {
            leaks: self.all_leaks(results),
        }
    }

    /// Writes the post-processed leak report through `out`.
    pub fn emit_text_report<W: fmt::Write>(&self, results: &Results, out: &mut W) -> fmt::Result {
        self.report(results).write_into(&self.module, out)
    }

    /// Drops recorded leaks whose fact is sanitized at the leaking
    /// instruction. Idempotent.
    fn do_post_processing(&self, results: &Results) {
        if self.post_processed.replace(true) {
            return;
        }
        let mut leaks = self.leaks.borrow_mut();
        let mut empty_insts = Vec::new();
        for (&inst, potential) in leaks.iter_mut() {
            let env = results.results_at(inst);
            let mut remove = Vec::new();
            for &leak in potential.iter() {
                let fact = self.factory.create(leak);
                let Some(value) = env.and_then(|e| e.get(&fact)) else {
                    // No value computed: the sanitizer bookkeeping was
                    // killed somewhere, assume tainted.
                    continue;
                };
                let load = self.approx_load_from(leak);
                match value {
                    EdgeDomain::Sanitized => remove.push(leak),
                    EdgeDomain::WithSanitizer(Some(sanitizer)) => {
                        if load.map_or(true, |l| self.bbo.must_come_before(*sanitizer, l)) {
                            remove.push(leak);
                        }
                    }
                    _ => {}
                }
            }
            for leak in remove {
                potential.remove(&leak);
            }
            if potential.is_empty() {
                empty_insts.push(inst);
            }
        }
        for inst in empty_insts {
            leaks.remove(&inst);
        }
    }

    fn make_flow_fact(&self, value: ValueId) -> AbstractMemoryLocation {
        self.factory.create(value)
    }

    fn base_is_global(&self, fact: AbstractMemoryLocation) -> bool {
        self.factory
            .base_of(fact)
            .map_or(false, |base| self.module.value(base).is_global())
    }

    /// Whether `fact` survives into the function containing `at`: globals
    /// always do, locals only within their own function.
    fn keep_in_function(&self, fact: AbstractMemoryLocation, at: InstId) -> bool {
        let Some(base) = self.factory.base_of(fact) else {
            return false;
        };
        let info = self.module.value(base);
        info.is_global() || info.defining_function() == Some(at.function)
    }

    fn report_leak_if_necessary(&self, inst: InstId, sink_candidate: ValueId, leaked: ValueId) {
        if self.config.is_sink_value(sink_candidate) {
            self.leaks
                .borrow_mut()
                .entry(inst)
                .or_default()
                .insert(leaked);
        }
    }

    /// The load (or call) an edge value was read by, approximated by walking
    /// the defining instructions. Pointer-typed values never carry one.
    fn approx_load_from(&self, value: ValueId) -> Option<InstId> {
        if self.module.value(value).ty.is_pointer() {
            return None;
        }
        match self.module.value(value).kind {
            ValueKind::InstResult(inst) => Some(self.approx_load_from_inst(inst)),
            _ => None,
        }
    }

    fn approx_load_from_inst(&self, inst: InstId) -> InstId {
        match self.module.instruction(inst) {
            Some(Instruction::Load { .. } | Instruction::Call { .. }) => inst,
            Some(other) => match other.operands().first() {
                Some(&operand) => match self.module.value(operand).kind {
                    ValueKind::InstResult(def) => self.approx_load_from_inst(def),
                    _ => inst,
                },
                None => inst,
            },
            None => inst,
        }
    }

    fn identity_flow(&self) -> FlowFunction<'_, AbstractMemoryLocation> {
        Rc::new(move |source| BTreeSet::from([source]))
    }

    /// Flow function of a store of `value_op` through `pointer_op`. Also
    /// models the mem intrinsics; `pa_level` widens the equivalence check
    /// for the extra indirection of memcpy/memmove.
    fn store_flow(
        &self,
        pointer_op: ValueId,
        value_op: ValueId,
        store: InstId,
        pa_level: usize,
    ) -> FlowFunction<'_, AbstractMemoryLocation> {
        let tv = self.make_flow_fact(value_op);
        let mem = self.make_flow_fact(pointer_op);
        Rc::new(move |source| {
            let mut ret = BTreeSet::from([source]);
            if self.factory.is_zero(source) {
                if self.config.is_source_value(value_op) {
                    ret.insert(mem);
                    self.report_leak_if_necessary(store, pointer_op, value_op);
                    for alias in self.alias.alias_set(pointer_op, store) {
                        if alias != pointer_op {
                            self.report_leak_if_necessary(store, alias, value_op);
                        }
                    }
                }
                return ret;
            }
            // Pointer arithmetic within the last indirection is transparent
            // here: a taint on a sibling array element is still reachable
            // from the stored pointer, so it must survive the store.
            if self
                .factory
                .equivalent_except_pointer_arithmetics(tv, source, pa_level)
            {
                let offset = self.factory.offset_difference(source, tv);
                ret.insert(self.factory.with_indirection_of(mem, &offset));
                for alias in self.alias.alias_set(pointer_op, store) {
                    if alias == pointer_op || self.module.value(alias).is_constant() {
                        continue;
                    }
                    let alias_fact = self
                        .factory
                        .with_indirection_of(self.make_flow_fact(alias), &offset);
                    if self.keep_in_function(alias_fact, store) {
                        ret.insert(alias_fact);
                    }
                }
                // Unlike the propagation above, the sink check is fully
                // field-sensitive.
                if self.factory.equivalent(tv, source) {
                    self.report_leak_if_necessary(store, pointer_op, value_op);
                    for alias in self.alias.alias_set(pointer_op, store) {
                        if alias != pointer_op {
                            self.report_leak_if_necessary(store, alias, value_op);
                        }
                    }
                }
            }
            ret
        })
    }

    /// Flow function of an instruction with configured source or sink
    /// effects: sources generate their facts out of zero, sinks record
    /// leak candidates, everything else passes through.
    fn config_flow(
        &self,
        inst: InstId,
        callee: Option<FuncId>,
    ) -> FlowFunction<'_, AbstractMemoryLocation> {
        let sources: Vec<ValueId> = self.config.generated_values_at(inst, callee);
        let sinks: Vec<ValueId> = self.config.leak_candidates_at(inst, callee);
        Rc::new(move |source| {
            let mut ret = BTreeSet::from([source]);
            if self.factory.is_zero(source) {
                for &value in &sources {
                    ret.insert(self.make_flow_fact(value));
                }
            } else {
                for &sink in &sinks {
                    if self.factory.equivalent(source, self.make_flow_fact(sink)) {
                        self.leaks
                            .borrow_mut()
                            .entry(inst)
                            .or_default()
                            .insert(sink);
                    }
                }
            }
            ret
        })
    }

    fn sanitized_fact_at(
        &self,
        inst: InstId,
        callee: Option<FuncId>,
        fact: AbstractMemoryLocation,
    ) -> bool {
        self.config
            .sanitized_values_at(inst, callee)
            .iter()
            .any(|&v| self.factory.equivalent(self.make_flow_fact(v), fact))
    }
}

impl<'p> IdeProblem for IdeTaintAnalysis<'p> {
    type Fact = AbstractMemoryLocation;
    type Value = EdgeDomain;
    type EdgeFn = Rc<EdgeFunction>;

    fn zero_value(&self) -> Self::Fact {
        self.factory.zero()
    }

    fn is_zero_value(&self, fact: Self::Fact) -> bool {
        self.factory.is_zero(fact)
    }

    fn initial_seeds(&self) -> BTreeMap<InstId, BTreeSet<Self::Fact>> {
        let mut seeds: BTreeMap<InstId, BTreeSet<Self::Fact>> = BTreeMap::new();
        for &entry in &self.entry_points {
            if let Some(inst) = self.module.entry_inst(entry) {
                seeds.entry(inst).or_default();
            }
        }
        for (inst, values) in self.config.initial_seeds() {
            let facts = seeds.entry(inst).or_default();
            for value in values {
                facts.insert(self.make_flow_fact(value));
            }
        }
        seeds
    }

    fn seed_value(&self, fact: Self::Fact) -> Self::Value {
        if self.factory.is_zero(fact) {
            EdgeDomain::Bottom
        } else {
            EdgeDomain::WithSanitizer(None)
        }
    }

    fn normal_flow(&self, curr: InstId, _succ: InstId) -> FlowFunction<'_, Self::Fact> {
        if let Some(Instruction::Store { address, value }) = self.module.instruction(curr) {
            return self.store_flow(*address, *value, curr, 1);
        }
        // Loads, geps and casts need no flow of their own: their results
        // intern to the same location as their operand chain.
        if self.config.affects(curr, None) && !self.module.instruction(curr).map_or(false, Instruction::is_call) {
            return self.config_flow(curr, None);
        }
        self.identity_flow()
    }

    fn call_flow(&self, call: InstId, callee: FuncId) -> FlowFunction<'_, Self::Fact> {
        let Some(function) = self.module.function(callee) else {
            return self.identity_flow();
        };
        if function.is_declaration {
            return self.identity_flow();
        }
        let args: Vec<ValueId> = self
            .module
            .call_args(call)
            .map(|a| a.to_vec())
            .unwrap_or_default();
        let params: Vec<ValueId> =
            function.signature.params.iter().map(|p| p.value).collect();
        let va_list = function.va_list;

        let mut plans: Vec<(ValueId, ArgTarget)> = Vec::new();
        let mut vararg_offset: i64 = 0;
        for (index, &arg) in args.iter().enumerate() {
            if index < params.len() {
                plans.push((arg, ArgTarget::Formal(params[index])));
            } else {
                if let Some(va_list) = va_list {
                    plans.push((
                        arg,
                        ArgTarget::Vararg {
                            va_list,
                            offset: vararg_offset,
                        },
                    ));
                }
                vararg_offset += self.module.value(arg).ty.byte_size();
            }
        }

        Rc::new(move |source| {
            if self.factory.is_zero(source) {
                return BTreeSet::from([source]);
            }
            let mut ret = BTreeSet::new();
            if self.base_is_global(source) {
                ret.insert(source);
            }
            for &(arg, target) in &plans {
                let from = self.make_flow_fact(arg);
                if !self
                    .factory
                    .equivalent_except_pointer_arithmetics(from, source, 1)
                {
                    continue;
                }
                match target {
                    ArgTarget::Formal(param) => {
                        ret.insert(self.factory.with_transfer_to(source, from, param));
                    }
                    ArgTarget::Vararg { va_list, offset } => {
                        let to = self.factory.with_transfer_to(source, from, va_list);
                        ret.insert(self.factory.with_indirection_of(to, &[offset]));
                    }
                }
            }
            ret
        })
    }

    fn return_flow(
        &self,
        call: Option<InstId>,
        callee: FuncId,
        exit: InstId,
        _ret_site: Option<InstId>,
    ) -> FlowFunction<'_, Self::Fact> {
        let Some(call) = call else {
            // Unbalanced return out of an entry point: only globals survive.
            return Rc::new(move |source| {
                if self.base_is_global(source) {
                    BTreeSet::from([source])
                } else {
                    BTreeSet::new()
                }
            });
        };
        let args: Vec<ValueId> = self
            .module
            .call_args(call)
            .map(|a| a.to_vec())
            .unwrap_or_default();
        let params: Vec<(ValueId, bool)> = self
            .module
            .function(callee)
            .map(|f| {
                f.signature
                    .params
                    .iter()
                    .map(|p| (p.value, p.param_type.is_pointer()))
                    .collect()
            })
            .unwrap_or_default();
        let returned = match self.module.terminator(exit) {
            Some(Terminator::Return(value)) => *value,
            _ => None,
        };
        let call_result = self.module.instruction(call).and_then(|i| i.result());

        Rc::new(move |source| {
            if self.factory.is_zero(source) {
                return BTreeSet::from([source]);
            }
            let mut ret = BTreeSet::new();
            // Only pointer parameters map back; everything else was
            // call-by-value.
            for (index, &(param, is_pointer)) in params.iter().enumerate() {
                if !is_pointer {
                    continue;
                }
                if !self
                    .factory
                    .equivalent(source, self.make_flow_fact(param))
                {
                    continue;
                }
                if let Some(&arg) = args.get(index) {
                    ret.insert(
                        self.factory
                            .with_transfer_from(source, self.make_flow_fact(arg)),
                    );
                }
            }
            if let (Some(returned), Some(result)) = (returned, call_result) {
                let ret_fact = self.make_flow_fact(returned);
                if self.factory.equivalent(source, ret_fact) {
                    let offset = self.factory.offset_difference(source, ret_fact);
                    ret.insert(
                        self.factory
                            .with_offsets(self.make_flow_fact(result), &offset),
                    );
                }
            }
            if self.base_is_global(source) {
                ret.insert(source);
            }
            ret
        })
    }

    fn call_to_return_flow(
        &self,
        call: InstId,
        _ret_site: InstId,
        callees: &[FuncId],
    ) -> FlowFunction<'_, Self::Fact> {
        let has_declaration = callees.iter().any(|&f| {
            self.module
                .function(f)
                .map_or(true, |func| func.is_declaration)
        });
        if !has_declaration {
            return self.identity_flow();
        }
        // A callee without a body could do anything with the taint it
        // receives: assume it spreads to every pointer argument and into
        // the returned value.
        let args: Vec<ValueId> = self
            .module
            .call_args(call)
            .map(|a| a.to_vec())
            .unwrap_or_default();
        let pointer_args: Vec<ValueId> = args
            .iter()
            .copied()
            .filter(|&a| self.module.value(a).ty.is_pointer())
            .collect();
        let result = self.module.instruction(call).and_then(|i| i.result());

        Rc::new(move |source| {
            let mut ret = BTreeSet::from([source]);
            if self.factory.is_zero(source) {
                return ret;
            }
            let feeds_callee = args.iter().any(|&arg| {
                self.factory.equivalent_except_pointer_arithmetics(
                    self.make_flow_fact(arg),
                    source,
                    1,
                )
            });
            if feeds_callee {
                for &arg in &pointer_args {
                    ret.insert(self.make_flow_fact(arg));
                }
                if let Some(result) = result {
                    ret.insert(self.make_flow_fact(result));
                }
            }
            ret
        })
    }

    fn summary_flow(&self, call: InstId) -> Option<FlowFunction<'_, Self::Fact>> {
        match self.module.instruction(call) {
            Some(Instruction::Call {
                callee: Callee::Intrinsic(kind),
                args,
                ..
            }) => match kind {
                // memset is a store of the fill value.
                MemIntrinsic::MemSet => Some(self.store_flow(args[0], args[1], call, 1)),
                // memcpy/memmove store what the source points at, one
                // indirection further out.
                MemIntrinsic::MemCpy | MemIntrinsic::MemMove => {
                    Some(self.store_flow(args[0], args[1], call, 2))
                }
            },
            Some(Instruction::Call {
                callee: Callee::Function(func),
                ..
            }) => {
                if self.config.affects(call, Some(*func)) {
                    Some(self.config_flow(call, Some(*func)))
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    fn normal_edge(
        &self,
        curr: InstId,
        curr_fact: Self::Fact,
        _succ: InstId,
        succ_fact: Self::Fact,
    ) -> Self::EdgeFn {
        let curr_zero = self.factory.is_zero(curr_fact);
        let succ_zero = self.factory.is_zero(succ_fact);
        if curr_zero && succ_zero {
            return self.cache.identity();
        }
        if curr_zero {
            return Rc::new(EdgeFunction::Gen { sanitizer: None });
        }
        if self.disable_strong_updates {
            return self.cache.identity();
        }
        if let Some(Instruction::Store { address, .. }) = self.module.instruction(curr) {
            // Storing into a location overwrites it: the old taint is gone
            // unless a later load still sees the stale bytes.
            if self
                .factory
                .must_alias(curr_fact, self.make_flow_fact(*address), self.alias)
            {
                return Rc::new(EdgeFunction::Gen {
                    sanitizer: Some(curr),
                });
            }
            if self.sanitized_fact_at(curr, None, curr_fact) {
                return Rc::new(EdgeFunction::Gen {
                    sanitizer: Some(curr),
                });
            }
        }
        self.cache.identity()
    }

    fn call_edge(
        &self,
        call: InstId,
        call_fact: Self::Fact,
        _callee: FuncId,
        entry_fact: Self::Fact,
    ) -> Self::EdgeFn {
        if self.disable_strong_updates {
            return self.cache.identity();
        }
        if self.factory.is_zero(call_fact) && self.factory.is_zero(entry_fact) {
            return self.cache.identity();
        }
        let args = self.module.call_args(call).unwrap_or(&[]);
        for &arg in args {
            // A sanitized fact entering the callee is definitively clean
            // there if its value was read after the sanitizing store.
            if self
                .factory
                .equivalent(self.make_flow_fact(arg), call_fact)
            {
                return Rc::new(EdgeFunction::KillIfSanitized {
                    load: self.approx_load_from(arg),
                });
            }
        }
        self.cache.identity()
    }

    fn return_edge(
        &self,
        call: Option<InstId>,
        _callee: FuncId,
        exit: InstId,
        exit_fact: Self::Fact,
        _ret_site: Option<InstId>,
        ret_fact: Self::Fact,
    ) -> Self::EdgeFn {
        let Some(call) = call else {
            return self.cache.identity();
        };
        if self.disable_strong_updates {
            return self.cache.identity();
        }
        if self.factory.is_zero(exit_fact) && self.factory.is_zero(ret_fact) {
            return self.cache.identity();
        }
        if let Some(Terminator::Return(returned)) = self.module.terminator(exit) {
            let call_result = self.module.instruction(call).and_then(|i| i.result());
            if let Some(result) = call_result {
                if self
                    .factory
                    .equivalent(ret_fact, self.make_flow_fact(result))
                {
                    return Rc::new(EdgeFunction::Transfer {
                        load: returned.and_then(|rv| self.approx_load_from(rv)),
                        to: call,
                    });
                }
            }
        }
        Rc::new(EdgeFunction::Transfer {
            load: None,
            to: call,
        })
    }

    fn call_to_return_edge(
        &self,
        call: InstId,
        call_fact: Self::Fact,
        _ret_site: InstId,
        ret_fact: Self::Fact,
    ) -> Self::EdgeFn {
        let is_intrinsic = matches!(
            self.module.instruction(call),
            Some(Instruction::Call {
                callee: Callee::Intrinsic(_),
                ..
            })
        );
        if !self.disable_strong_updates && !is_intrinsic && call_fact == ret_fact {
            let args = self.module.call_args(call).unwrap_or(&[]);
            for &arg in args {
                if self.module.value(arg).ty.is_pointer()
                    && self
                        .factory
                        .equivalent(call_fact, self.make_flow_fact(arg))
                {
                    // The callee saw the pointee; whatever comes back on the
                    // identity path is superseded by the call.
                    return Rc::new(EdgeFunction::Gen {
                        sanitizer: Some(call),
                    });
                }
            }
        }
        self.cache.identity()
    }

    fn summary_edge(
        &self,
        call: InstId,
        call_fact: Self::Fact,
        _ret_site: InstId,
        ret_fact: Self::Fact,
    ) -> Self::EdgeFn {
        if self.factory.is_zero(call_fact) && !self.factory.is_zero(ret_fact) {
            return Rc::new(EdgeFunction::Gen { sanitizer: None });
        }
        if self.disable_strong_updates {
            return self.cache.identity();
        }

        // A fact is only sanitized by the call if every possible callee
        // sanitizes it.
        let callees: Vec<FuncId> = self.module.direct_callee(call).into_iter().collect();
        let mut sanitized: Option<BTreeSet<ValueId>> = None;
        for &callee in &callees {
            let here: BTreeSet<ValueId> = self
                .config
                .sanitized_values_at(call, Some(callee))
                .into_iter()
                .collect();
            sanitized = Some(match sanitized {
                None => here,
                Some(acc) => acc.intersection(&here).copied().collect(),
            });
            if sanitized.as_ref().is_some_and(BTreeSet::is_empty) {
                break;
            }
        }
        if let Some(sanitized) = sanitized {
            if sanitized
                .iter()
                .any(|&v| self.factory.equivalent(self.make_flow_fact(v), call_fact))
            {
                return Rc::new(EdgeFunction::Gen {
                    sanitizer: Some(call),
                });
            }
        }

        if let Some(Instruction::Call {
            callee: Callee::Intrinsic(_),
            args,
            ..
        }) = self.module.instruction(call)
        {
            if self
                .factory
                .must_alias(call_fact, self.make_flow_fact(args[0]), self.alias)
            {
                return Rc::new(EdgeFunction::Gen {
                    sanitizer: Some(call),
                });
            }
        }
        self.cache.identity()
    }

    fn top_value(&self) -> Self::Value {
        EdgeDomain::Top
    }

    fn bottom_value(&self) -> Self::Value {
        EdgeDomain::Bottom
    }

    fn join_values(&self, a: &Self::Value, b: &Self::Value) -> Self::Value {
        a.join(*b, &self.bbo)
    }

    fn identity_edge(&self) -> Self::EdgeFn {
        self.cache.identity()
    }

    fn all_top_edge(&self) -> Self::EdgeFn {
        self.cache.all_top()
    }

    fn apply_edge(&self, edge: &Self::EdgeFn, source: &Self::Value) -> Self::Value {
        edge.compute_target(*source, &self.bbo)
    }

    fn compose_edge(&self, first: &Self::EdgeFn, second: &Self::EdgeFn) -> Self::EdgeFn {
        EdgeFunction::compose(first, second, &self.cache)
    }

    fn join_edge(&self, a: &Self::EdgeFn, b: &Self::EdgeFn) -> Self::EdgeFn {
        EdgeFunction::join(a, b, &self.cache, &self.bbo)
    }
}

/// Leaks that survived post-processing, ready for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaintReport {
    pub leaks: BTreeMap<InstId, BTreeSet<ValueId>>,
}

impl TaintReport {
    pub fn is_empty(&self) -> bool {
        self.leaks.is_empty()
    }

    pub fn render(&self, module: &Module) -> String {
        let mut out = String::new();
        let _ = self.write_into(module, &mut out);
        out
    }

    pub fn write_into<W: fmt::Write>(&self, module: &Module, out: &mut W) -> fmt::Result {
        writeln!(out, "===== Taint Analysis Results =====")?;
        for (inst, values) in &self.leaks {
            writeln!(out, "At {}", inst)?;
            for &value in values {
                writeln!(out, "\t{}", module.value_name(value))?;
            }
        }
        writeln!(out)
    }
}
