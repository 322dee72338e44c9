use crate::block::Terminator;
use crate::function::FuncId;
use crate::instructions::{Callee, InstId, Instruction};
use crate::module::Module;
use std::rc::Rc;

/// Instruction-granularity view of the interprocedural control-flow graph.
pub trait InterproceduralCfg {
    fn successors_of(&self, inst: InstId) -> Vec<InstId>;
    fn is_call(&self, inst: InstId) -> bool;
    /// Direct callees with a known function id. Memory intrinsics have none.
    fn callees_of(&self, inst: InstId) -> Vec<FuncId>;
    fn has_definition(&self, func: FuncId) -> bool;
    fn start_points_of(&self, func: FuncId) -> Vec<InstId>;
    fn exit_points_of(&self, func: FuncId) -> Vec<InstId>;
    fn return_sites_of(&self, call: InstId) -> Vec<InstId>;
    fn is_exit_point(&self, inst: InstId) -> bool;
}

pub struct ModuleCfg {
    module: Rc<Module>,
}

impl ModuleCfg {
    pub fn new(module: Rc<Module>) -> Self {
        Self { module }
    }

    pub fn module(&self) -> &Module {
        &self.module
    }
}

impl InterproceduralCfg for ModuleCfg {
    fn successors_of(&self, inst: InstId) -> Vec<InstId> {
        self.module.inst_successors(inst)
    }

    fn is_call(&self, inst: InstId) -> bool {
        matches!(
            self.module.instruction(inst),
            Some(Instruction::Call { .. })
        )
    }

    fn callees_of(&self, inst: InstId) -> Vec<FuncId> {
        match self.module.instruction(inst) {
            Some(Instruction::Call {
                callee: Callee::Function(func),
                ..
            }) => vec![*func],
            _ => vec![],
        }
    }

    fn has_definition(&self, func: FuncId) -> bool {
        self.module
            .function(func)
            .map_or(false, |f| !f.is_declaration)
    }

    fn start_points_of(&self, func: FuncId) -> Vec<InstId> {
        self.module.entry_inst(func).into_iter().collect()
    }

    fn exit_points_of(&self, func: FuncId) -> Vec<InstId> {
        let Some(function) = self.module.function(func) else {
            return vec![];
        };
        function
            .body
            .blocks
            .iter()
            .filter(|(_, block)| block.terminator.is_return())
            .map(|(&id, block)| InstId {
                function: func,
                block: id,
                index: block.terminator_index(),
            })
            .collect()
    }

    fn return_sites_of(&self, call: InstId) -> Vec<InstId> {
        self.successors_of(call)
    }

    fn is_exit_point(&self, inst: InstId) -> bool {
        matches!(self.module.terminator(inst), Some(Terminator::Return(_)))
    }
}
