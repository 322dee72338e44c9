/*!
Value lattice of the taint analysis.

A fact's value tracks whether the taint it represents has passed a
sanitizer on every path reaching the current point. `WithSanitizer(Some)`
remembers the candidate sanitizing store so later loads can check whether
they read the sanitized or the stale tainted bytes.
*/

use crate::analysis::ordering::BasicBlockOrdering;
use crate::instructions::InstId;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EdgeDomain {
    /// Absence of information, the neutral join element.
    Top,
    /// Definitely tainted on some path with no sanitizer candidate left.
    Bottom,
    /// Sanitized on every path.
    Sanitized,
    /// Tainted, possibly with a pending sanitizer candidate.
    WithSanitizer(Option<InstId>),
}

impl EdgeDomain {
    pub fn join(self, other: EdgeDomain, bbo: &BasicBlockOrdering) -> EdgeDomain {
        use EdgeDomain::*;
        if self == other {
            return self;
        }
        match (self, other) {
            (Top, x) | (x, Top) => x,
            (Bottom, _) | (_, Bottom) => Bottom,
            (Sanitized, x) | (x, Sanitized) => x,
            (WithSanitizer(a), WithSanitizer(b)) => {
                let (Some(s1), Some(s2)) = (a, b) else {
                    return WithSanitizer(None);
                };
                if s1.function != s2.function {
                    return WithSanitizer(None);
                }
                // Two sanitizer candidates meet. When one strictly precedes
                // the other, the later one subsumes it: any load still
                // reading stale bytes relative to the later store also reads
                // stale bytes relative to the earlier one.
                if bbo.must_come_before(s1, s2) {
                    return WithSanitizer(Some(s2));
                }
                if bbo.must_come_before(s2, s1) {
                    return WithSanitizer(Some(s1));
                }
                let module = bbo.module();
                let successors_of = |s: InstId| {
                    module
                        .block(s.function, s.block)
                        .map(|b| b.successors())
                        .unwrap_or_default()
                };
                let s1_succs = successors_of(s1);
                let s2_succs = successors_of(s2);
                // A candidate sitting at the entry of the other's successor
                // block is on the joined path and wins.
                for &succ in &s1_succs {
                    if s2 == module.first_inst_of_block(s1.function, succ) {
                        return WithSanitizer(Some(s2));
                    }
                }
                for &succ in &s2_succs {
                    if s1 == module.first_inst_of_block(s2.function, succ) {
                        return WithSanitizer(Some(s1));
                    }
                }
                // Unrelated candidates can still be relocated to a unique
                // merge point both blocks fall through to.
                let common: Vec<_> = s1_succs
                    .iter()
                    .filter(|b| s2_succs.contains(b))
                    .collect();
                if common.len() == 1 {
                    return WithSanitizer(Some(
                        module.first_inst_of_block(s1.function, *common[0]),
                    ));
                }
                WithSanitizer(None)
            }
        }
    }

    pub fn is_tainted(self) -> bool {
        matches!(self, EdgeDomain::Bottom | EdgeDomain::WithSanitizer(_))
    }

    pub fn sanitizer(self) -> Option<InstId> {
        match self {
            EdgeDomain::WithSanitizer(s) => s,
            _ => None,
        }
    }
}

impl fmt::Display for EdgeDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeDomain::Top => write!(f, "top"),
            EdgeDomain::Bottom => write!(f, "bottom"),
            EdgeDomain::Sanitized => write!(f, "sanitized"),
            EdgeDomain::WithSanitizer(None) => write!(f, "tainted"),
            EdgeDomain::WithSanitizer(Some(s)) => {
                write!(f, "tainted (sanitizer candidate at {})", s)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ModuleBuilder;
    use crate::function::FuncId;
    use crate::types::Type;
    use std::rc::Rc;

    fn diamond() -> (BasicBlockOrdering, FuncId, Vec<crate::block::BlockId>) {
        let mut builder = ModuleBuilder::new();
        let mut fb = builder.function("f", Type::Void);
        let entry = fb.entry_block().block_id();
        let left = fb.create_block();
        let right = fb.create_block();
        let merge = fb.create_block();

        let mut eb = fb.switch_to_block(entry).unwrap();
        let p = eb.alloc("p", Type::Uint(64));
        let cond = eb.const_bool(true);
        let _ = p;
        eb.branch(cond, left, right).unwrap();

        fb.switch_to_block(left).unwrap().jump(merge).unwrap();
        fb.switch_to_block(right).unwrap().jump(merge).unwrap();
        fb.switch_to_block(merge).unwrap().return_void().unwrap();
        let func = fb.finish().unwrap();
        let module = Rc::new(builder.build());
        (
            BasicBlockOrdering::new(module),
            func,
            vec![entry, left, right, merge],
        )
    }

    fn at(func: FuncId, block: crate::block::BlockId, index: u32) -> InstId {
        InstId {
            function: func,
            block,
            index,
        }
    }

    #[test]
    fn test_join_absorbs_bottom_and_ignores_top() {
        let (bbo, func, blocks) = diamond();
        let s = EdgeDomain::WithSanitizer(Some(at(func, blocks[0], 0)));
        assert_eq!(EdgeDomain::Top.join(s, &bbo), s);
        assert_eq!(s.join(EdgeDomain::Top, &bbo), s);
        assert_eq!(s.join(EdgeDomain::Bottom, &bbo), EdgeDomain::Bottom);
        assert_eq!(EdgeDomain::Sanitized.join(s, &bbo), s);
    }

    #[test]
    fn test_join_keeps_later_dominating_sanitizer() {
        let (bbo, func, blocks) = diamond();
        let earlier = EdgeDomain::WithSanitizer(Some(at(func, blocks[0], 0)));
        let later = EdgeDomain::WithSanitizer(Some(at(func, blocks[3], 0)));
        assert_eq!(earlier.join(later, &bbo), later);
        assert_eq!(later.join(earlier, &bbo), later);
    }

    #[test]
    fn test_join_relocates_to_unique_merge_block() {
        let (bbo, func, blocks) = diamond();
        let in_left = EdgeDomain::WithSanitizer(Some(at(func, blocks[1], 0)));
        let in_right = EdgeDomain::WithSanitizer(Some(at(func, blocks[2], 0)));
        let merged = in_left.join(in_right, &bbo);
        assert_eq!(
            merged,
            EdgeDomain::WithSanitizer(Some(at(func, blocks[3], 0)))
        );
    }

    #[test]
    fn test_join_is_commutative_associative_and_idempotent() {
        let (bbo, func, blocks) = diamond();
        use EdgeDomain::*;
        let samples = [
            Top,
            Bottom,
            Sanitized,
            WithSanitizer(None),
            WithSanitizer(Some(at(func, blocks[0], 0))),
            WithSanitizer(Some(at(func, blocks[1], 0))),
            WithSanitizer(Some(at(func, blocks[2], 0))),
            WithSanitizer(Some(at(func, blocks[3], 0))),
        ];
        for &a in &samples {
            assert_eq!(a.join(a, &bbo), a);
            for &b in &samples {
                assert_eq!(a.join(b, &bbo), b.join(a, &bbo));
                for &c in &samples {
                    assert_eq!(
                        a.join(b, &bbo).join(c, &bbo),
                        a.join(b.join(c, &bbo), &bbo),
                        "associativity broke for {} / {} / {}",
                        a,
                        b,
                        c
                    );
                }
            }
        }
    }

    #[test]
    fn test_join_gives_up_across_functions() {
        let (bbo, func, blocks) = diamond();
        let here = EdgeDomain::WithSanitizer(Some(at(func, blocks[0], 0)));
        let elsewhere =
            EdgeDomain::WithSanitizer(Some(at(FuncId(99), blocks[0], 0)));
        assert_eq!(
            here.join(elsewhere, &bbo),
            EdgeDomain::WithSanitizer(None)
        );
        assert_eq!(
            here.join(EdgeDomain::WithSanitizer(None), &bbo),
            EdgeDomain::WithSanitizer(None)
        );
    }
}
