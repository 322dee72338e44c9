/*!
Declarative description of sources, sinks and sanitizers.

The analysis itself is policy-free; everything it knows about what taints,
what leaks and what scrubs comes through this trait.
*/

use crate::function::FuncId;
use crate::instructions::InstId;
use crate::module::Module;
use crate::values::ValueId;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

pub trait TaintConfig {
    fn is_source_value(&self, value: ValueId) -> bool;
    fn is_sink_value(&self, value: ValueId) -> bool;
    fn is_sanitizer_value(&self, value: ValueId) -> bool;

    /// Values freshly tainted by executing `inst`.
    fn generated_values_at(&self, inst: InstId, callee: Option<FuncId>) -> Vec<ValueId>;
    /// Values that leak if they are tainted when `inst` executes.
    fn leak_candidates_at(&self, inst: InstId, callee: Option<FuncId>) -> Vec<ValueId>;
    /// Values scrubbed clean by executing `inst`.
    fn sanitized_values_at(&self, inst: InstId, callee: Option<FuncId>) -> Vec<ValueId>;

    /// Extra taints to assume already present when solving starts.
    fn initial_seeds(&self) -> BTreeMap<InstId, BTreeSet<ValueId>>;

    fn affects(&self, inst: InstId, callee: Option<FuncId>) -> bool {
        !self.generated_values_at(inst, callee).is_empty()
            || !self.leak_candidates_at(inst, callee).is_empty()
            || !self.sanitized_values_at(inst, callee).is_empty()
    }
}

/// Effects a call to one function has, expressed over its argument positions.
#[derive(Debug, Clone, Default)]
pub struct FunctionEffects {
    pub source_return: bool,
    pub source_params: BTreeSet<usize>,
    pub sink_params: BTreeSet<usize>,
    pub sanitizer_params: BTreeSet<usize>,
}

/// Table-driven [`TaintConfig`] keyed by callee.
pub struct CallTaintConfig {
    module: Rc<Module>,
    effects: BTreeMap<FuncId, FunctionEffects>,
    source_values: BTreeSet<ValueId>,
    sink_values: BTreeSet<ValueId>,
    sanitizer_values: BTreeSet<ValueId>,
    seeds: BTreeMap<InstId, BTreeSet<ValueId>>,
}

impl CallTaintConfig {
    pub fn new(module: Rc<Module>) -> Self {
        Self {
            module,
            effects: BTreeMap::new(),
            source_values: BTreeSet::new(),
            sink_values: BTreeSet::new(),
            sanitizer_values: BTreeSet::new(),
            seeds: BTreeMap::new(),
        }
    }

    /// Calls to `func` return tainted data.
    pub fn mark_source_return(&mut self, func: FuncId) -> &mut Self {
        self.effects.entry(func).or_default().source_return = true;
        self
    }

    /// Calls to `func` taint the memory behind argument `index`.
    pub fn mark_source_param(&mut self, func: FuncId, index: usize) -> &mut Self {
        self.effects
            .entry(func)
            .or_default()
            .source_params
            .insert(index);
        self
    }

    /// Passing tainted data as argument `index` of `func` is a leak.
    pub fn mark_sink_param(&mut self, func: FuncId, index: usize) -> &mut Self {
        self.effects
            .entry(func)
            .or_default()
            .sink_params
            .insert(index);
        self
    }

    /// Calls to `func` scrub the memory behind argument `index`.
    pub fn mark_sanitizer_param(&mut self, func: FuncId, index: usize) -> &mut Self {
        self.effects
            .entry(func)
            .or_default()
            .sanitizer_params
            .insert(index);
        self
    }

    pub fn mark_source_value(&mut self, value: ValueId) -> &mut Self {
        self.source_values.insert(value);
        self
    }

    pub fn mark_sink_value(&mut self, value: ValueId) -> &mut Self {
        self.sink_values.insert(value);
        self
    }

    /// Any instruction consuming `value` scrubs the memory it points to.
    pub fn mark_sanitizer_value(&mut self, value: ValueId) -> &mut Self {
        self.sanitizer_values.insert(value);
        self
    }

    pub fn add_seed(&mut self, inst: InstId, value: ValueId) -> &mut Self {
        self.seeds.entry(inst).or_default().insert(value);
        self
    }

    fn args_matching(
        &self,
        inst: InstId,
        callee: Option<FuncId>,
        select: impl Fn(&FunctionEffects) -> &BTreeSet<usize>,
    ) -> Vec<ValueId> {
        let Some(effects) = callee.and_then(|f| self.effects.get(&f)) else {
            return vec![];
        };
        let Some(args) = self.module.call_args(inst) else {
            return vec![];
        };
        select(effects)
            .iter()
            .filter_map(|&index| args.get(index).copied())
            .collect()
    }
}

impl TaintConfig for CallTaintConfig {
    fn is_source_value(&self, value: ValueId) -> bool {
        self.source_values.contains(&value)
    }

    fn is_sink_value(&self, value: ValueId) -> bool {
        self.sink_values.contains(&value)
    }

    fn is_sanitizer_value(&self, value: ValueId) -> bool {
        self.sanitizer_values.contains(&value)
    }

    fn generated_values_at(&self, inst: InstId, callee: Option<FuncId>) -> Vec<ValueId> {
        let mut out = self.args_matching(inst, callee, |e| &e.source_params);
        if let Some(effects) = callee.and_then(|f| self.effects.get(&f)) {
            if effects.source_return {
                if let Some(result) =
                    self.module.instruction(inst).and_then(|i| i.result())
                {
                    out.push(result);
                }
            }
        }
        out
    }

    fn leak_candidates_at(&self, inst: InstId, callee: Option<FuncId>) -> Vec<ValueId> {
        let mut out = self.args_matching(inst, callee, |e| &e.sink_params);
        if let Some(args) = self.module.call_args(inst) {
            out.extend(
                args.iter()
                    .copied()
                    .filter(|arg| self.sink_values.contains(arg)),
            );
        }
        out.dedup();
        out
    }

    fn sanitized_values_at(&self, inst: InstId, callee: Option<FuncId>) -> Vec<ValueId> {
        let mut out = self.args_matching(inst, callee, |e| &e.sanitizer_params);
        if let Some(instruction) = self.module.instruction(inst) {
            out.extend(
                instruction
                    .operands()
                    .into_iter()
                    .filter(|op| self.sanitizer_values.contains(op)),
            );
        }
        out.dedup();
        out
    }

    fn initial_seeds(&self) -> BTreeMap<InstId, BTreeSet<ValueId>> {
        self.seeds.clone()
    }
}
