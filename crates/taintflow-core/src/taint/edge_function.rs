/*!
Edge functions of the taint analysis.

A closed, comparable representation: the solver detects fixpoints by
structural equality, so every combinator keeps its operands in a canonical
shape. Joins flatten, deduplicate and saturate to [`EdgeFunction::AllBottom`]
once they accumulate more than [`JOIN_THRESHOLD`] distinct summands.
*/

use super::edge_domain::EdgeDomain;
use crate::analysis::ordering::BasicBlockOrdering;
use crate::instructions::InstId;
use std::rc::Rc;

/// Join width after which a summand set collapses to `AllBottom`.
pub const JOIN_THRESHOLD: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EdgeFunction {
    Identity,
    AllTop,
    AllBottom,
    AllSanitized,
    /// Constant function introducing a taint, optionally carrying the
    /// sanitizing store that overwrote it.
    Gen { sanitizer: Option<InstId> },
    /// Return-edge function: the taint survived the callee; whether it is
    /// still sanitized depends on the load (if any) feeding the returned
    /// value relative to the pending sanitizer.
    Transfer { load: Option<InstId>, to: InstId },
    /// Call-edge function: a pending sanitizer that already happened before
    /// the value was read becomes definitive inside the callee.
    KillIfSanitized { load: Option<InstId> },
    Compose {
        first: Rc<EdgeFunction>,
        second: Rc<EdgeFunction>,
    },
    Join {
        subs: Vec<Rc<EdgeFunction>>,
        seed: EdgeDomain,
    },
    JoinConst {
        function: Rc<EdgeFunction>,
        constant: EdgeDomain,
    },
}

impl EdgeFunction {
    pub fn compute_target(&self, source: EdgeDomain, bbo: &BasicBlockOrdering) -> EdgeDomain {
        use EdgeDomain::*;
        match self {
            EdgeFunction::Identity => source,
            EdgeFunction::AllTop => Top,
            EdgeFunction::AllBottom => Bottom,
            EdgeFunction::AllSanitized => Sanitized,
            EdgeFunction::Gen { sanitizer } => WithSanitizer(*sanitizer),
            EdgeFunction::Transfer { load, to } => {
                let carried = match source {
                    Sanitized => true,
                    WithSanitizer(Some(s)) => {
                        load.map_or(true, |l| bbo.must_come_before(s, l))
                    }
                    _ => false,
                };
                if carried {
                    WithSanitizer(Some(*to))
                } else {
                    WithSanitizer(None)
                }
            }
            EdgeFunction::KillIfSanitized { load } => match source {
                WithSanitizer(Some(s)) => {
                    if load.map_or(true, |l| bbo.must_come_before(s, l)) {
                        Sanitized
                    } else {
                        WithSanitizer(None)
                    }
                }
                other => other,
            },
            EdgeFunction::Compose { first, second } => {
                second.compute_target(first.compute_target(source, bbo), bbo)
            }
            EdgeFunction::Join { subs, seed } => {
                let mut result = *seed;
                for sub in subs {
                    result = result.join(sub.compute_target(source, bbo), bbo);
                    if result == Bottom {
                        break;
                    }
                }
                result
            }
            EdgeFunction::JoinConst { function, constant } => {
                function.compute_target(source, bbo).join(*constant, bbo)
            }
        }
    }

    /// Functions ignoring their input entirely.
    pub fn constant_value(&self) -> Option<EdgeDomain> {
        match self {
            EdgeFunction::AllTop => Some(EdgeDomain::Top),
            EdgeFunction::AllBottom => Some(EdgeDomain::Bottom),
            EdgeFunction::AllSanitized => Some(EdgeDomain::Sanitized),
            EdgeFunction::Gen { sanitizer } => Some(EdgeDomain::WithSanitizer(*sanitizer)),
            _ => None,
        }
    }

    /// `second` after `first`.
    pub fn compose(
        first: &Rc<EdgeFunction>,
        second: &Rc<EdgeFunction>,
        _cache: &EdgeFunctionCache,
    ) -> Rc<EdgeFunction> {
        if matches!(**first, EdgeFunction::Identity) {
            return second.clone();
        }
        if matches!(**second, EdgeFunction::Identity) {
            return first.clone();
        }
        if second.constant_value().is_some() {
            return second.clone();
        }
        Rc::new(EdgeFunction::Compose {
            first: first.clone(),
            second: second.clone(),
        })
    }

    pub fn join(
        a: &Rc<EdgeFunction>,
        b: &Rc<EdgeFunction>,
        cache: &EdgeFunctionCache,
        bbo: &BasicBlockOrdering,
    ) -> Rc<EdgeFunction> {
        if a == b {
            return a.clone();
        }
        if matches!(**a, EdgeFunction::AllBottom) || matches!(**b, EdgeFunction::AllBottom) {
            return cache.all_bottom();
        }
        if matches!(**a, EdgeFunction::AllTop) {
            return b.clone();
        }
        if matches!(**b, EdgeFunction::AllTop) {
            return a.clone();
        }
        match (a.constant_value(), b.constant_value()) {
            (Some(ca), Some(cb)) => cache.from_constant(ca.join(cb, bbo)),
            (Some(c), None) => Self::join_with_constant(b, c, cache, bbo),
            (None, Some(c)) => Self::join_with_constant(a, c, cache, bbo),
            (None, None) => {
                Self::create_join(vec![a.clone(), b.clone()], EdgeDomain::Top, cache, bbo)
            }
        }
    }

    fn join_with_constant(
        func: &Rc<EdgeFunction>,
        constant: EdgeDomain,
        cache: &EdgeFunctionCache,
        bbo: &BasicBlockOrdering,
    ) -> Rc<EdgeFunction> {
        match &**func {
            EdgeFunction::JoinConst {
                function,
                constant: existing,
            } => {
                let joined = existing.join(constant, bbo);
                if joined == EdgeDomain::Bottom {
                    cache.all_bottom()
                } else {
                    Rc::new(EdgeFunction::JoinConst {
                        function: function.clone(),
                        constant: joined,
                    })
                }
            }
            EdgeFunction::Join { subs, seed } => {
                Self::create_join(subs.clone(), seed.join(constant, bbo), cache, bbo)
            }
            _ => {
                if constant == EdgeDomain::Bottom {
                    cache.all_bottom()
                } else {
                    Rc::new(EdgeFunction::JoinConst {
                        function: func.clone(),
                        constant,
                    })
                }
            }
        }
    }

    /// Normalizes a summand set: nested joins are flattened, constants are
    /// folded into the seed, duplicates dropped, and oversized sets saturate.
    fn create_join(
        parts: Vec<Rc<EdgeFunction>>,
        seed: EdgeDomain,
        cache: &EdgeFunctionCache,
        bbo: &BasicBlockOrdering,
    ) -> Rc<EdgeFunction> {
        let mut subs: Vec<Rc<EdgeFunction>> = Vec::new();
        let mut seed = seed;
        let mut stack = parts;
        while let Some(part) = stack.pop() {
            if let Some(c) = part.constant_value() {
                seed = seed.join(c, bbo);
                continue;
            }
            match &*part {
                EdgeFunction::Join {
                    subs: inner,
                    seed: inner_seed,
                } => {
                    seed = seed.join(*inner_seed, bbo);
                    stack.extend(inner.iter().cloned());
                }
                EdgeFunction::JoinConst { function, constant } => {
                    seed = seed.join(*constant, bbo);
                    stack.push(function.clone());
                }
                _ => subs.push(part),
            }
        }
        subs.sort();
        subs.dedup();
        if seed == EdgeDomain::Bottom || subs.len() > JOIN_THRESHOLD {
            return cache.all_bottom();
        }
        if subs.is_empty() {
            return cache.from_constant(seed);
        }
        if subs.len() == 1 && seed == EdgeDomain::Top {
            return subs.into_iter().next().expect("one element");
        }
        Rc::new(EdgeFunction::Join { subs, seed })
    }
}

/// Shared singletons for the nullary edge functions.
pub struct EdgeFunctionCache {
    identity: Rc<EdgeFunction>,
    all_top: Rc<EdgeFunction>,
    all_bottom: Rc<EdgeFunction>,
    all_sanitized: Rc<EdgeFunction>,
}

impl EdgeFunctionCache {
    pub fn new() -> Self {
        Self {
            identity: Rc::new(EdgeFunction::Identity),
            all_top: Rc::new(EdgeFunction::AllTop),
            all_bottom: Rc::new(EdgeFunction::AllBottom),
            all_sanitized: Rc::new(EdgeFunction::AllSanitized),
        }
    }

    pub fn identity(&self) -> Rc<EdgeFunction> {
        self.identity.clone()
    }

    pub fn all_top(&self) -> Rc<EdgeFunction> {
        self.all_top.clone()
    }

    pub fn all_bottom(&self) -> Rc<EdgeFunction> {
        self.all_bottom.clone()
    }

    pub fn all_sanitized(&self) -> Rc<EdgeFunction> {
        self.all_sanitized.clone()
    }

    pub fn from_constant(&self, constant: EdgeDomain) -> Rc<EdgeFunction> {
        match constant {
            EdgeDomain::Top => self.all_top(),
            EdgeDomain::Bottom => self.all_bottom(),
            EdgeDomain::Sanitized => self.all_sanitized(),
            EdgeDomain::WithSanitizer(sanitizer) => {
                Rc::new(EdgeFunction::Gen { sanitizer })
            }
        }
    }
}

impl Default for EdgeFunctionCache {
    fn default() -> Self {
        Self::new()
    }
}
