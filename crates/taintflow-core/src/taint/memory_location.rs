use crate::values::ValueId;
use std::fmt;

/// Interned handle to an abstract memory location. Handle `0` is always the
/// tautological zero fact. Handles are only meaningful relative to the
/// [`super::MemoryLocationFactory`] that created them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AbstractMemoryLocation(pub(crate) u32);

impl AbstractMemoryLocation {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for AbstractMemoryLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "loc{}", self.0)
    }
}

/// The payload behind a handle: `base` plus the byte offsets of each
/// indirection level taken from it. `lifetime` counts how many further
/// indirections may still be represented precisely before the location
/// collapses to a field-insensitive summary.
///
/// The zero fact has no base, no offsets and lifetime 0.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemoryLocationData {
    pub base: Option<ValueId>,
    pub offsets: Vec<i64>,
    pub lifetime: u32,
}

impl MemoryLocationData {
    pub fn is_zero(&self) -> bool {
        self.base.is_none()
    }

    /// Offset chains describe the same access path as far as both reach.
    /// Deliberately compares only the common prefix: a location whose
    /// precision was exhausted earlier still matches its refinements.
    pub fn equivalent_offsets(&self, other: &Self) -> bool {
        let len = self.offsets.len().min(other.offsets.len());
        self.offsets[..len] == other.offsets[..len]
    }

    pub fn equivalent(&self, other: &Self) -> bool {
        self.base == other.base && self.equivalent_offsets(other)
    }

    /// Like [`Self::equivalent`], but tolerates differing offsets within the
    /// last `pa_level` indirection levels. Used to match facts across pointer
    /// arithmetic, e.g. a store through a field pointer against the taint on
    /// the whole object.
    pub fn equivalent_except_pointer_arithmetics(&self, other: &Self, pa_level: usize) -> bool {
        if self.base != other.base {
            return false;
        }
        let min_size = self.offsets.len().min(other.offsets.len());
        if min_size <= pa_level {
            return true;
        }
        let len = min_size - pa_level;
        self.offsets[..len] == other.offsets[..len]
    }

    pub fn is_proper_prefix_of(&self, other: &Self) -> bool {
        self.base == other.base
            && self.offsets.len() < other.offsets.len()
            && other.offsets[..self.offsets.len()] == self.offsets[..]
    }

    /// The offsets `self` takes beyond `other` (or vice versa): the suffix of
    /// the longer chain past the point where the shorter one ends, keeping
    /// the overlapping last element of the shorter chain.
    pub fn offset_difference(&self, other: &Self) -> Vec<i64> {
        let (longer, shorter) = if self.offsets.len() >= other.offsets.len() {
            (&self.offsets, &other.offsets)
        } else {
            (&other.offsets, &self.offsets)
        };
        let skip = shorter.len().max(1) - 1;
        longer[skip..].to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn loc(base: u32, offsets: &[i64], lifetime: u32) -> MemoryLocationData {
        MemoryLocationData {
            base: Some(ValueId(base)),
            offsets: offsets.to_vec(),
            lifetime,
        }
    }

    #[test]
    fn test_equivalence_compares_common_prefix() {
        let short = loc(1, &[0], 2);
        let long = loc(1, &[0, 4], 1);
        assert!(short.equivalent(&long));
        assert!(long.equivalent(&short));
        assert!(!loc(1, &[8], 2).equivalent(&long));
        assert!(!loc(2, &[0], 2).equivalent(&short));
    }

    #[test]
    fn test_equivalence_modulo_pointer_arithmetics() {
        let obj = loc(1, &[0, 0], 1);
        let field = loc(1, &[0, 8], 1);
        assert!(!obj.equivalent(&field));
        assert!(obj.equivalent_except_pointer_arithmetics(&field, 1));
        assert!(!loc(1, &[4, 8], 1).equivalent_except_pointer_arithmetics(&obj, 1));
        // Short chains are always within reach of the tolerance.
        assert!(loc(1, &[3], 2).equivalent_except_pointer_arithmetics(&obj, 1));
    }

    #[test]
    fn test_proper_prefix() {
        let p = loc(1, &[0], 2);
        let deep = loc(1, &[0, 4], 1);
        assert!(p.is_proper_prefix_of(&deep));
        assert!(!deep.is_proper_prefix_of(&p));
        assert!(!p.is_proper_prefix_of(&p));
    }

    #[test]
    fn test_offset_difference() {
        let tv = loc(1, &[0], 2);
        let source = loc(1, &[0, 4, 8], 0);
        assert_eq!(source.offset_difference(&tv), vec![0, 4, 8]);
        assert_eq!(tv.offset_difference(&source), vec![0, 4, 8]);
        let flat = loc(1, &[], 3);
        assert_eq!(source.offset_difference(&flat), vec![0, 4, 8]);
    }
}
