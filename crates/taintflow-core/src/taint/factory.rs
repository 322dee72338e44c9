/*!
Interning factory for abstract memory locations.

Every fact handed to the solver is a handle into this factory. Interning
makes fact equality a handle comparison and guarantees that two ways of
naming the same access path, say a pointer and the result of loading
through it, collapse to the same handle.

`bound` caps the representable indirection depth. Each location carries the
remaining `lifetime`; once it reaches zero, further indirections are folded
into a field-insensitive summary of the deepest representable level.
*/

use super::memory_location::{AbstractMemoryLocation, MemoryLocationData};
use crate::analysis::alias::{AliasInfo, AliasResult};
use crate::instructions::{GepOffset, Instruction};
use crate::module::Module;
use crate::values::{ValueId, ValueKind};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

pub const DEFAULT_INDIRECTION_BOUND: u32 = 3;

/// Locations with a nonzero lifetime are precise and intern by exact
/// offsets; exhausted locations form their own summary equivalence class.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct InternKey {
    base: Option<ValueId>,
    offsets: Vec<i64>,
    exhausted: bool,
}

#[derive(Debug, Default)]
struct FactoryInner {
    data: Vec<MemoryLocationData>,
    intern: HashMap<InternKey, AbstractMemoryLocation>,
    value_cache: HashMap<ValueId, AbstractMemoryLocation>,
}

impl FactoryInner {
    fn intern(
        &mut self,
        base: Option<ValueId>,
        offsets: Vec<i64>,
        lifetime: u32,
    ) -> AbstractMemoryLocation {
        let key = InternKey {
            base,
            offsets: offsets.clone(),
            exhausted: lifetime == 0,
        };
        if let Some(&handle) = self.intern.get(&key) {
            return handle;
        }
        let handle = AbstractMemoryLocation(self.data.len() as u32);
        self.data.push(MemoryLocationData {
            base,
            offsets,
            lifetime,
        });
        self.intern.insert(key, handle);
        handle
    }
}

pub struct MemoryLocationFactory {
    module: Rc<Module>,
    bound: u32,
    inner: RefCell<FactoryInner>,
}

impl MemoryLocationFactory {
    pub fn new(module: Rc<Module>, bound: u32) -> Self {
        let mut inner = FactoryInner::default();
        // Handle 0 is the zero fact.
        inner.intern(None, vec![], 0);
        Self {
            module,
            bound,
            inner: RefCell::new(inner),
        }
    }

    pub fn with_default_bound(module: Rc<Module>) -> Self {
        Self::new(module, DEFAULT_INDIRECTION_BOUND)
    }

    pub fn zero(&self) -> AbstractMemoryLocation {
        AbstractMemoryLocation(0)
    }

    pub fn is_zero(&self, loc: AbstractMemoryLocation) -> bool {
        loc.0 == 0
    }

    pub fn bound(&self) -> u32 {
        self.bound
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    pub fn data(&self, loc: AbstractMemoryLocation) -> MemoryLocationData {
        self.inner.borrow().data[loc.index()].clone()
    }

    pub fn base_of(&self, loc: AbstractMemoryLocation) -> Option<ValueId> {
        self.inner.borrow().data[loc.index()].base
    }

    pub fn lifetime_of(&self, loc: AbstractMemoryLocation) -> u32 {
        self.inner.borrow().data[loc.index()].lifetime
    }

    /// The interned location naming the access path of `value`.
    ///
    /// Loads, casts and constant-offset geps are folded into the offset
    /// chain of the underlying base, so `*p` reached through a load and the
    /// same path reached through pointer arithmetic intern identically.
    /// A dynamic gep collapses the chain gathered so far.
    pub fn create(&self, value: ValueId) -> AbstractMemoryLocation {
        if let Some(&cached) = self.inner.borrow().value_cache.get(&value) {
            return cached;
        }
        let handle = match self.module.value(value).kind {
            ValueKind::InstResult(inst) => match self.module.instruction(inst) {
                Some(
                    Instruction::Load { .. }
                    | Instruction::Gep { .. }
                    | Instruction::Cast { .. },
                ) => self.create_from_walk(value),
                _ => self.create_base(value),
            },
            _ => self.create_base(value),
        };
        self.inner.borrow_mut().value_cache.insert(value, handle);
        handle
    }

    fn create_base(&self, value: ValueId) -> AbstractMemoryLocation {
        let lifetime = if self.bound == 0 { 0 } else { self.bound - 1 };
        self.inner
            .borrow_mut()
            .intern(Some(value), vec![0], lifetime)
    }

    fn create_from_walk(&self, value: ValueId) -> AbstractMemoryLocation {
        let mut offsets: Vec<i64> = vec![0];
        let mut depth: u32 = 1;
        let mut cur = value;
        loop {
            let ValueKind::InstResult(inst) = self.module.value(cur).kind else {
                break;
            };
            match self.module.instruction(inst) {
                Some(Instruction::Load { address, .. }) => {
                    offsets.push(0);
                    depth += 1;
                    cur = *address;
                }
                Some(Instruction::Cast { operand, .. }) => {
                    cur = *operand;
                }
                Some(Instruction::Gep { base, offset, .. }) => {
                    match offset {
                        GepOffset::Constant(o) => {
                            // The chain always holds at least the initial 0.
                            if let Some(last) = offsets.last_mut() {
                                *last += o;
                            }
                        }
                        GepOffset::Dynamic(_) => {
                            offsets.clear();
                            offsets.push(0);
                            depth = self.bound;
                        }
                    }
                    cur = *base;
                }
                _ => break,
            }
        }
        offsets.reverse();
        let lifetime = self.bound - depth.min(self.bound);
        if offsets.len() > self.bound as usize {
            offsets.truncate(self.bound as usize);
        }
        self.inner.borrow_mut().intern(Some(cur), offsets, lifetime)
    }

    /// Collapses `loc` to the field-insensitive summary one level up.
    pub fn limit(&self, loc: AbstractMemoryLocation) -> AbstractMemoryLocation {
        let mut data = self.data(loc);
        data.offsets.pop();
        self.inner.borrow_mut().intern(data.base, data.offsets, 0)
    }

    /// The location reached by dereferencing `loc` and stepping through
    /// `indirection`. An empty indirection is a single plain dereference.
    pub fn with_indirection_of(
        &self,
        loc: AbstractMemoryLocation,
        indirection: &[i64],
    ) -> AbstractMemoryLocation {
        let data = self.data(loc);
        if data.lifetime == 0 {
            return loc;
        }
        let mut offsets = data.offsets;
        let lifetime;
        if indirection.is_empty() {
            offsets.push(0);
            lifetime = data.lifetime - 1;
        } else {
            let take = indirection.len().min(data.lifetime as usize);
            offsets.extend_from_slice(&indirection[..take]);
            lifetime = data.lifetime - take as u32;
        }
        self.inner.borrow_mut().intern(data.base, offsets, lifetime)
    }

    pub fn with_offset(
        &self,
        loc: AbstractMemoryLocation,
        offset: GepOffset,
    ) -> AbstractMemoryLocation {
        if self.lifetime_of(loc) == 0 {
            return loc;
        }
        match offset {
            GepOffset::Dynamic(_) => self.limit(loc),
            GepOffset::Constant(o) => {
                let data = self.data(loc);
                let mut offsets = data.offsets;
                match offsets.last_mut() {
                    Some(last) => *last += o,
                    None => offsets.push(o),
                }
                self.inner
                    .borrow_mut()
                    .intern(data.base, offsets, data.lifetime)
            }
        }
    }

    /// Adds a whole offset chain: the first element shifts within the current
    /// level, the rest descend further, bounded by the remaining lifetime.
    pub fn with_offsets(
        &self,
        loc: AbstractMemoryLocation,
        offsets: &[i64],
    ) -> AbstractMemoryLocation {
        if offsets.is_empty() {
            return loc;
        }
        let data = self.data(loc);
        if data.lifetime == 0 {
            return loc;
        }
        let mut new_offsets = data.offsets;
        match new_offsets.last_mut() {
            Some(last) => *last += offsets[0],
            None => new_offsets.push(offsets[0]),
        }
        let rest = &offsets[1..];
        let take = rest.len().min(data.lifetime as usize);
        new_offsets.extend_from_slice(&rest[..take]);
        let lifetime = data.lifetime - take as u32;
        self.inner
            .borrow_mut()
            .intern(data.base, new_offsets, lifetime)
    }

    /// Rebases a fact onto the callee-side value `to` when `loc` was matched
    /// against the actual argument `from` at a call site.
    pub fn with_transfer_to(
        &self,
        loc: AbstractMemoryLocation,
        from: AbstractMemoryLocation,
        to: ValueId,
    ) -> AbstractMemoryLocation {
        let a = self.data(loc);
        let f = self.data(from);
        if a.lifetime == 0 && f.lifetime == 0 {
            return self.inner.borrow_mut().intern(Some(to), vec![0], 0);
        }
        let (larger, smaller) = if a.offsets.len() >= f.offsets.len() {
            (&a.offsets, &f.offsets)
        } else {
            (&f.offsets, &a.offsets)
        };
        let mut offsets: Vec<i64> = if smaller.is_empty() {
            larger.clone()
        } else {
            larger[smaller.len() - 1..].to_vec()
        };
        if let Some(last) = offsets.last_mut() {
            *last = 0;
        }
        let lifetime = a.lifetime.min(f.lifetime);
        self.inner.borrow_mut().intern(Some(to), offsets, lifetime)
    }

    /// Maps a callee-side fact `loc` back onto the caller-side location `to`
    /// at a return site, splicing the callee's extra offsets onto it.
    pub fn with_transfer_from(
        &self,
        loc: AbstractMemoryLocation,
        to: AbstractMemoryLocation,
    ) -> AbstractMemoryLocation {
        let a = self.data(loc);
        if a.lifetime == 0 {
            return to;
        }
        let t = self.data(to);
        let mut offsets = t.offsets.clone();
        if !a.offsets.is_empty() {
            if let Some(last) = offsets.last_mut() {
                *last += a.offsets[0];
            }
            offsets.extend_from_slice(&a.offsets[1..]);
        }
        let maximum_size = (a.offsets.len() + a.lifetime as usize)
            .min(t.offsets.len() + t.lifetime as usize);
        if offsets.len() > maximum_size {
            offsets.truncate(maximum_size);
        }
        let lifetime = (a.lifetime as usize).min(maximum_size - offsets.len()) as u32;
        self.inner.borrow_mut().intern(t.base, offsets, lifetime)
    }

    pub fn equivalent(&self, a: AbstractMemoryLocation, b: AbstractMemoryLocation) -> bool {
        if a == b {
            return true;
        }
        let inner = self.inner.borrow();
        inner.data[a.index()].equivalent(&inner.data[b.index()])
    }

    pub fn equivalent_except_pointer_arithmetics(
        &self,
        a: AbstractMemoryLocation,
        b: AbstractMemoryLocation,
        pa_level: usize,
    ) -> bool {
        if a == b {
            return true;
        }
        let inner = self.inner.borrow();
        inner.data[a.index()]
            .equivalent_except_pointer_arithmetics(&inner.data[b.index()], pa_level)
    }

    pub fn is_proper_prefix_of(
        &self,
        a: AbstractMemoryLocation,
        b: AbstractMemoryLocation,
    ) -> bool {
        let inner = self.inner.borrow();
        inner.data[a.index()].is_proper_prefix_of(&inner.data[b.index()])
    }

    pub fn offset_difference(
        &self,
        a: AbstractMemoryLocation,
        b: AbstractMemoryLocation,
    ) -> Vec<i64> {
        let inner = self.inner.borrow();
        inner.data[a.index()].offset_difference(&inner.data[b.index()])
    }

    /// Two locations denote the same memory iff their bases must alias and
    /// the offset chains agree as far as both reach. Bases from different
    /// functions are never compared.
    pub fn must_alias(
        &self,
        a: AbstractMemoryLocation,
        b: AbstractMemoryLocation,
        alias_info: &dyn AliasInfo,
    ) -> bool {
        if a == b {
            return true;
        }
        let inner = self.inner.borrow();
        let da = &inner.data[a.index()];
        let db = &inner.data[b.index()];
        let (Some(base_a), Some(base_b)) = (da.base, db.base) else {
            return false;
        };
        if base_a == base_b {
            return da.equivalent_offsets(db);
        }
        let fn_a = self.module.value(base_a).defining_function();
        let fn_b = self.module.value(base_b).defining_function();
        if fn_a != fn_b || fn_a.is_none() {
            return false;
        }
        alias_info.alias(base_a, base_b) == AliasResult::MustAlias
            && da.equivalent_offsets(db)
    }
}
