/*!
Reference IDE tabulation solver.

Sequential two-phase solver over an exploded supergraph. Phase one discovers
path edges and composes jump functions with a worklist; phase two seeds the
value lattice at the entry contexts, pushes context values across discovered
call edges, and finally materializes per-instruction environments by applying
every jump function to the value of its source context.

Jump functions are keyed `(d1, n, d2)`: the fact `d1` at the start point of
`n`'s function flows to fact `d2` at `n` under the stored edge function. An
environment at `n` describes the program state immediately before `n`
executes.
*/

use super::icfg::InterproceduralCfg;
use super::ide::{IdeProblem, SolverResults};
use crate::function::FuncId;
use crate::instructions::InstId;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

type PathEdge<D> = (D, InstId, D);

pub struct IdeSolver<'a, P: IdeProblem, C: InterproceduralCfg> {
    problem: &'a P,
    icfg: &'a C,
    jump_fns: BTreeMap<PathEdge<P::Fact>, P::EdgeFn>,
    worklist: VecDeque<PathEdge<P::Fact>>,
    /// Call contexts registered per (callee, entry fact): the call site and
    /// the caller-side source and call facts that entered it.
    incoming: HashMap<(FuncId, P::Fact), BTreeSet<(InstId, P::Fact, P::Fact)>>,
    /// Summarized effects per (callee, entry fact): exit node and exit fact
    /// to the composed jump function through the callee.
    end_summaries: HashMap<(FuncId, P::Fact), BTreeMap<(InstId, P::Fact), P::EdgeFn>>,
    seeds: BTreeMap<InstId, BTreeSet<P::Fact>>,
}

impl<'a, P: IdeProblem, C: InterproceduralCfg> IdeSolver<'a, P, C> {
    pub fn new(problem: &'a P, icfg: &'a C) -> Self {
        Self {
            problem,
            icfg,
            jump_fns: BTreeMap::new(),
            worklist: VecDeque::new(),
            incoming: HashMap::new(),
            end_summaries: HashMap::new(),
            seeds: BTreeMap::new(),
        }
    }

    pub fn solve(mut self) -> SolverResults<P::Fact, P::Value> {
        self.submit_seeds();
        self.tabulate();
        self.compute_values()
    }

    fn submit_seeds(&mut self) {
        let mut seeds = self.problem.initial_seeds();
        let zero = self.problem.zero_value();
        for facts in seeds.values_mut() {
            facts.insert(zero);
        }
        for (&inst, facts) in &seeds {
            for &fact in facts {
                self.propagate(fact, inst, fact, self.problem.identity_edge());
            }
        }
        self.seeds = seeds;
    }

    fn propagate(&mut self, d1: P::Fact, n: InstId, d2: P::Fact, edge: P::EdgeFn) {
        let key = (d1, n, d2);
        let joined = match self.jump_fns.get(&key) {
            Some(existing) => {
                let joined = self.problem.join_edge(existing, &edge);
                if joined == *existing {
                    return;
                }
                joined
            }
            None => self.problem.join_edge(&self.problem.all_top_edge(), &edge),
        };
        self.jump_fns.insert(key, joined);
        self.worklist.push_back(key);
    }

    fn tabulate(&mut self) {
        while let Some((d1, n, d2)) = self.worklist.pop_front() {
            let jump = self.jump_fns[&(d1, n, d2)].clone();
            if self.icfg.is_call(n) {
                self.process_call(d1, n, d2, &jump);
            } else if self.icfg.is_exit_point(n) {
                self.process_exit(d1, n, d2, &jump);
            } else {
                self.process_normal(d1, n, d2, &jump);
            }
        }
    }

    fn process_normal(&mut self, d1: P::Fact, n: InstId, d2: P::Fact, jump: &P::EdgeFn) {
        for succ in self.icfg.successors_of(n) {
            let flow = self.problem.normal_flow(n, succ);
            let targets = flow(d2);
            drop(flow);
            for d3 in targets {
                let edge = self.problem.normal_edge(n, d2, succ, d3);
                let composed = self.problem.compose_edge(jump, &edge);
                self.propagate(d1, succ, d3, composed);
            }
        }
    }

    fn process_call(&mut self, d1: P::Fact, call: InstId, d2: P::Fact, jump: &P::EdgeFn) {
        let ret_sites = self.icfg.return_sites_of(call);
        let callees = self.icfg.callees_of(call);

        if let Some(summary) = self.problem.summary_flow(call) {
            // The summary models the whole call including its bypassing
            // facts, so neither the callees nor the call-to-return edge are
            // processed for it.
            let targets = summary(d2);
            drop(summary);
            for &ret_site in &ret_sites {
                for &d3 in &targets {
                    let edge = self.problem.summary_edge(call, d2, ret_site, d3);
                    let composed = self.problem.compose_edge(jump, &edge);
                    self.propagate(d1, ret_site, d3, composed);
                }
            }
            return;
        }

        for &callee in &callees {
            if !self.icfg.has_definition(callee) {
                continue;
            }
            let flow = self.problem.call_flow(call, callee);
            let entry_facts = flow(d2);
            drop(flow);
            for d3 in entry_facts {
                for sp in self.icfg.start_points_of(callee) {
                    self.propagate(d3, sp, d3, self.problem.identity_edge());
                }
                self.incoming
                    .entry((callee, d3))
                    .or_default()
                    .insert((call, d1, d2));
                self.replay_summaries(d1, call, d2, jump, callee, d3, &ret_sites);
            }
        }

        for &ret_site in &ret_sites {
            let flow = self.problem.call_to_return_flow(call, ret_site, &callees);
            let targets = flow(d2);
            drop(flow);
            for d3 in targets {
                let edge = self.problem.call_to_return_edge(call, d2, ret_site, d3);
                let composed = self.problem.compose_edge(jump, &edge);
                self.propagate(d1, ret_site, d3, composed);
            }
        }
    }

    /// Applies every end summary already recorded for `(callee, entry_fact)`
    /// to a newly registered call context.
    fn replay_summaries(
        &mut self,
        d1: P::Fact,
        call: InstId,
        d2: P::Fact,
        jump: &P::EdgeFn,
        callee: FuncId,
        entry_fact: P::Fact,
        ret_sites: &[InstId],
    ) {
        let Some(summaries) = self.end_summaries.get(&(callee, entry_fact)) else {
            return;
        };
        let summaries: Vec<_> = summaries
            .iter()
            .map(|(&k, f)| (k, f.clone()))
            .collect();
        let call_edge = self.problem.call_edge(call, d2, callee, entry_fact);
        for ((exit, d4), summary) in summaries {
            for &ret_site in ret_sites {
                let flow = self
                    .problem
                    .return_flow(Some(call), callee, exit, Some(ret_site));
                let targets = flow(d4);
                drop(flow);
                for d5 in targets {
                    let ret_edge =
                        self.problem
                            .return_edge(Some(call), callee, exit, d4, Some(ret_site), d5);
                    let through = self.problem.compose_edge(
                        &call_edge,
                        &self.problem.compose_edge(&summary, &ret_edge),
                    );
                    let composed = self.problem.compose_edge(jump, &through);
                    self.propagate(d1, ret_site, d5, composed);
                }
            }
        }
    }

    fn process_exit(&mut self, d1: P::Fact, exit: InstId, d2: P::Fact, jump: &P::EdgeFn) {
        let func = exit.function;

        let summaries = self.end_summaries.entry((func, d1)).or_default();
        let changed = match summaries.get(&(exit, d2)) {
            Some(existing) => {
                let joined = self.problem.join_edge(existing, jump);
                if joined == *existing {
                    false
                } else {
                    summaries.insert((exit, d2), joined);
                    true
                }
            }
            None => {
                summaries.insert((exit, d2), jump.clone());
                true
            }
        };
        if !changed {
            return;
        }

        let callers: Vec<_> = self
            .incoming
            .get(&(func, d1))
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();

        if callers.is_empty() {
            // Unbalanced return out of an entry point. The flow function is
            // still consulted so the problem can observe escaping facts.
            let flow = self.problem.return_flow(None, func, exit, None);
            let _ = flow(d2);
            return;
        }

        for (call, caller_d1, caller_d2) in callers {
            let caller_jump = match self.jump_fns.get(&(caller_d1, call, caller_d2)) {
                Some(f) => f.clone(),
                None => self.problem.all_top_edge(),
            };
            let call_edge = self.problem.call_edge(call, caller_d2, func, d1);
            for ret_site in self.icfg.return_sites_of(call) {
                let flow = self
                    .problem
                    .return_flow(Some(call), func, exit, Some(ret_site));
                let targets = flow(d2);
                drop(flow);
                for d5 in targets {
                    let ret_edge =
                        self.problem
                            .return_edge(Some(call), func, exit, d2, Some(ret_site), d5);
                    let through = self.problem.compose_edge(
                        &call_edge,
                        &self.problem.compose_edge(jump, &ret_edge),
                    );
                    let composed = self.problem.compose_edge(&caller_jump, &through);
                    self.propagate(caller_d1, ret_site, d5, composed);
                }
            }
        }
    }

    /// Phase two: context values per (function, source fact), then final
    /// environments from the jump functions.
    fn compute_values(&self) -> SolverResults<P::Fact, P::Value> {
        let mut val: HashMap<(FuncId, P::Fact), P::Value> = HashMap::new();
        let mut worklist: VecDeque<(FuncId, P::Fact)> = VecDeque::new();

        for (&inst, facts) in &self.seeds {
            for &fact in facts {
                let seeded = self.problem.seed_value(fact);
                let key = (inst.function, fact);
                let joined = match val.get(&key) {
                    Some(existing) => self.problem.join_values(existing, &seeded),
                    None => seeded,
                };
                val.insert(key, joined);
                worklist.push_back(key);
            }
        }

        while let Some((caller_func, d1)) = worklist.pop_front() {
            let source = match val.get(&(caller_func, d1)) {
                Some(v) => v.clone(),
                None => continue,
            };
            for (&(callee, d3), contexts) in &self.incoming {
                for &(call, caller_d1, caller_d2) in contexts {
                    if call.function != caller_func || caller_d1 != d1 {
                        continue;
                    }
                    let jump = match self.jump_fns.get(&(caller_d1, call, caller_d2)) {
                        Some(f) => f,
                        None => continue,
                    };
                    let at_call = self.problem.apply_edge(jump, &source);
                    let call_edge = self.problem.call_edge(call, caller_d2, callee, d3);
                    let entering = self.problem.apply_edge(&call_edge, &at_call);
                    let key = (callee, d3);
                    let joined = match val.get(&key) {
                        Some(existing) => self.problem.join_values(existing, &entering),
                        None => entering,
                    };
                    if val.get(&key) != Some(&joined) {
                        val.insert(key, joined);
                        worklist.push_back(key);
                    }
                }
            }
        }

        let top = self.problem.top_value();
        let mut results: BTreeMap<InstId, BTreeMap<P::Fact, P::Value>> = BTreeMap::new();
        for (&(d1, n, d2), jump) in &self.jump_fns {
            let Some(context) = val.get(&(n.function, d1)) else {
                continue;
            };
            let value = self.problem.apply_edge(jump, context);
            if value == top {
                continue;
            }
            let env = results.entry(n).or_default();
            match env.get(&d2) {
                Some(existing) => {
                    let joined = self.problem.join_values(existing, &value);
                    env.insert(d2, joined);
                }
                None => {
                    env.insert(d2, value);
                }
            }
        }

        SolverResults { values: results }
    }
}
