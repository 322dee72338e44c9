use crate::instructions::InstId;
use crate::values::ValueId;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasResult {
    NoAlias,
    MayAlias,
    MustAlias,
}

/// External alias oracle the taint engine consults for strong updates and
/// store propagation. Implementations are expected to be conservative.
pub trait AliasInfo {
    fn alias(&self, a: ValueId, b: ValueId) -> AliasResult;
    /// May-aliases of `value` live at `at`, including `value` itself.
    fn alias_set(&self, value: ValueId, at: InstId) -> Vec<ValueId>;
}

/// Table-driven oracle for tests and embeddings without a points-to analysis.
/// Unregistered pairs do not alias.
#[derive(Debug, Default)]
pub struct ExplicitAliasInfo {
    must: BTreeSet<(ValueId, ValueId)>,
    may: BTreeMap<ValueId, BTreeSet<ValueId>>,
}

impl ExplicitAliasInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_must_alias(&mut self, a: ValueId, b: ValueId) {
        self.must.insert((a.min(b), a.max(b)));
        self.add_may_alias(a, b);
    }

    pub fn add_may_alias(&mut self, a: ValueId, b: ValueId) {
        self.may.entry(a).or_default().insert(b);
        self.may.entry(b).or_default().insert(a);
    }
}

impl AliasInfo for ExplicitAliasInfo {
    fn alias(&self, a: ValueId, b: ValueId) -> AliasResult {
        if a == b {
            return AliasResult::MustAlias;
        }
        if self.must.contains(&(a.min(b), a.max(b))) {
            return AliasResult::MustAlias;
        }
        if self.may.get(&a).map_or(false, |set| set.contains(&b)) {
            return AliasResult::MayAlias;
        }
        AliasResult::NoAlias
    }

    fn alias_set(&self, value: ValueId, _at: InstId) -> Vec<ValueId> {
        let mut set = vec![value];
        if let Some(aliases) = self.may.get(&value) {
            set.extend(aliases.iter().copied().filter(|v| *v != value));
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_verdicts() {
        let mut info = ExplicitAliasInfo::new();
        let a = ValueId(0);
        let b = ValueId(1);
        let c = ValueId(2);

        info.add_must_alias(a, b);
        info.add_may_alias(b, c);

        assert_eq!(info.alias(a, a), AliasResult::MustAlias);
        assert_eq!(info.alias(a, b), AliasResult::MustAlias);
        assert_eq!(info.alias(b, a), AliasResult::MustAlias);
        assert_eq!(info.alias(b, c), AliasResult::MayAlias);
        assert_eq!(info.alias(a, c), AliasResult::NoAlias);
    }

    #[test]
    fn test_alias_set_contains_self() {
        let mut info = ExplicitAliasInfo::new();
        let a = ValueId(0);
        let b = ValueId(1);
        info.add_may_alias(a, b);

        let at = InstId {
            function: crate::function::FuncId(0),
            block: crate::block::BlockId(0),
            index: 0,
        };
        assert_eq!(info.alias_set(a, at), vec![a, b]);
        assert_eq!(info.alias_set(ValueId(9), at), vec![ValueId(9)]);
    }
}
