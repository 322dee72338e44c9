/*!
IDE problem contract.

An IDE problem extends an IFDS reachability problem with an edge-function
lattice: every exploded-supergraph edge carries a function from environment
values to environment values, and the solver composes and joins those
functions while it discovers path edges. The contract below follows the
classic tabulation formulation with distinct flow and edge functions per
supergraph edge kind.
*/

use crate::function::FuncId;
use crate::instructions::InstId;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;
use std::hash::Hash;
use std::rc::Rc;

/// A distributive flow function over data-flow facts.
pub type FlowFunction<'a, D> = Rc<dyn Fn(D) -> BTreeSet<D> + 'a>;

pub trait IdeProblem {
    /// Data-flow fact. Cheap to copy, totally ordered for deterministic
    /// worklist iteration.
    type Fact: Copy + Ord + Hash + Debug;
    /// Element of the value lattice computed in phase two.
    type Value: Clone + Eq + Debug;
    /// Edge function from values to values, compared for fixpoint detection.
    type EdgeFn: Clone + Eq + Debug;

    fn zero_value(&self) -> Self::Fact;
    fn is_zero_value(&self, fact: Self::Fact) -> bool;

    /// Seed facts per instruction; the zero fact is added implicitly.
    fn initial_seeds(&self) -> BTreeMap<InstId, BTreeSet<Self::Fact>>;
    /// Initial lattice value bound to a seeded fact.
    fn seed_value(&self, fact: Self::Fact) -> Self::Value;

    fn normal_flow(&self, curr: InstId, succ: InstId) -> FlowFunction<'_, Self::Fact>;
    fn call_flow(&self, call: InstId, callee: FuncId) -> FlowFunction<'_, Self::Fact>;
    /// `call` is `None` for unbalanced returns out of an entry point.
    fn return_flow(
        &self,
        call: Option<InstId>,
        callee: FuncId,
        exit: InstId,
        ret_site: Option<InstId>,
    ) -> FlowFunction<'_, Self::Fact>;
    fn call_to_return_flow(
        &self,
        call: InstId,
        ret_site: InstId,
        callees: &[FuncId],
    ) -> FlowFunction<'_, Self::Fact>;
    /// A `Some` summary replaces the whole call: neither the callees nor
    /// the call-to-return edge are processed. Summaries must therefore pass
    /// unrelated facts through themselves.
    fn summary_flow(&self, call: InstId) -> Option<FlowFunction<'_, Self::Fact>>;

    fn normal_edge(
        &self,
        curr: InstId,
        curr_fact: Self::Fact,
        succ: InstId,
        succ_fact: Self::Fact,
    ) -> Self::EdgeFn;
    fn call_edge(
        &self,
        call: InstId,
        call_fact: Self::Fact,
        callee: FuncId,
        entry_fact: Self::Fact,
    ) -> Self::EdgeFn;
    fn return_edge(
        &self,
        call: Option<InstId>,
        callee: FuncId,
        exit: InstId,
        exit_fact: Self::Fact,
        ret_site: Option<InstId>,
        ret_fact: Self::Fact,
    ) -> Self::EdgeFn;
    fn call_to_return_edge(
        &self,
        call: InstId,
        call_fact: Self::Fact,
        ret_site: InstId,
        ret_fact: Self::Fact,
    ) -> Self::EdgeFn;
    fn summary_edge(
        &self,
        call: InstId,
        call_fact: Self::Fact,
        ret_site: InstId,
        ret_fact: Self::Fact,
    ) -> Self::EdgeFn;

    fn top_value(&self) -> Self::Value;
    fn bottom_value(&self) -> Self::Value;
    fn join_values(&self, a: &Self::Value, b: &Self::Value) -> Self::Value;

    fn identity_edge(&self) -> Self::EdgeFn;
    fn all_top_edge(&self) -> Self::EdgeFn;

    fn apply_edge(&self, edge: &Self::EdgeFn, source: &Self::Value) -> Self::Value;
    /// `second` after `first`.
    fn compose_edge(&self, first: &Self::EdgeFn, second: &Self::EdgeFn) -> Self::EdgeFn;
    fn join_edge(&self, a: &Self::EdgeFn, b: &Self::EdgeFn) -> Self::EdgeFn;
}

/// Per-instruction environments computed by the solver's value phase.
#[derive(Debug, Clone)]
pub struct SolverResults<D: Ord, V> {
    pub(crate) values: BTreeMap<InstId, BTreeMap<D, V>>,
}

impl<D: Ord, V> SolverResults<D, V> {
    /// All non-top facts holding immediately before `inst` executes.
    pub fn results_at(&self, inst: InstId) -> Option<&BTreeMap<D, V>> {
        self.values.get(&inst)
    }

    pub fn result_of(&self, inst: InstId, fact: &D) -> Option<&V> {
        self.values.get(&inst)?.get(fact)
    }

    pub fn instructions(&self) -> impl Iterator<Item = InstId> + '_ {
        self.values.keys().copied()
    }
}
