use super::dominator::DominatorTree;
use crate::function::FuncId;
use crate::instructions::InstId;
use crate::module::Module;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Lazily built instruction-level dominance oracle.
///
/// `must_come_before(a, b)` is true only if every path reaching `b` passes
/// through `a` first. Total and conservative: unknown orderings are `false`.
pub struct BasicBlockOrdering {
    module: Rc<Module>,
    cache: RefCell<HashMap<FuncId, Rc<DominatorTree>>>,
}

impl BasicBlockOrdering {
    pub fn new(module: Rc<Module>) -> Self {
        Self {
            module,
            cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    fn tree(&self, func: FuncId) -> Option<Rc<DominatorTree>> {
        if let Some(tree) = self.cache.borrow().get(&func) {
            return Some(Rc::clone(tree));
        }
        let function = self.module.function(func)?;
        if function.is_declaration {
            return None;
        }
        let tree = Rc::new(DominatorTree::build(function));
        self.cache.borrow_mut().insert(func, Rc::clone(&tree));
        Some(tree)
    }

    pub fn must_come_before(&self, a: InstId, b: InstId) -> bool {
        if a == b {
            return false;
        }
        // No inter-procedural ordering is attempted.
        if a.function != b.function {
            return false;
        }
        if a.block == b.block {
            return a.index < b.index;
        }
        match self.tree(a.function) {
            Some(tree) => tree.dominates(a.block, b.block),
            None => false,
        }
    }
}
