use crate::block::{BasicBlock, BlockId, Terminator};
use crate::function::{FuncId, Function};
use crate::instructions::{Callee, InstId, Instruction};
use crate::values::{ValueId, ValueInfo};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A whole program: functions plus the registry all [`ValueId`]s index into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub functions: IndexMap<FuncId, Function>,
    pub values: Vec<ValueInfo>,
    pub(crate) function_names: HashMap<String, FuncId>,
}

impl Module {
    pub fn new() -> Self {
        Self {
            functions: IndexMap::new(),
            values: Vec::new(),
            function_names: HashMap::new(),
        }
    }

    pub fn value(&self, id: ValueId) -> &ValueInfo {
        &self.values[id.0 as usize]
    }

    pub fn value_name(&self, id: ValueId) -> String {
        match &self.value(id).name {
            Some(name) => name.clone(),
            None => id.to_string(),
        }
    }

    pub fn function(&self, id: FuncId) -> Option<&Function> {
        self.functions.get(&id)
    }

    pub fn function_by_name(&self, name: &str) -> Option<&Function> {
        self.function_names.get(name).and_then(|id| self.function(*id))
    }

    pub fn block(&self, func: FuncId, block: BlockId) -> Option<&BasicBlock> {
        self.function(func)?.body.blocks.get(&block)
    }

    /// None when `id` addresses a terminator slot.
    pub fn instruction(&self, id: InstId) -> Option<&Instruction> {
        self.block(id.function, id.block)?
            .instructions
            .get(id.index as usize)
    }

    pub fn terminator(&self, id: InstId) -> Option<&Terminator> {
        let block = self.block(id.function, id.block)?;
        if id.index == block.terminator_index() {
            Some(&block.terminator)
        } else {
            None
        }
    }

    pub fn entry_inst(&self, func: FuncId) -> Option<InstId> {
        let f = self.function(func)?;
        if f.is_declaration {
            return None;
        }
        Some(InstId {
            function: func,
            block: f.entry_block(),
            index: 0,
        })
    }

    pub fn first_inst_of_block(&self, func: FuncId, block: BlockId) -> InstId {
        InstId {
            function: func,
            block,
            index: 0,
        }
    }

    /// Intra-procedural successor program points of `id`.
    pub fn inst_successors(&self, id: InstId) -> Vec<InstId> {
        let Some(block) = self.block(id.function, id.block) else {
            return vec![];
        };
        if id.index < block.terminator_index() {
            return vec![InstId {
                index: id.index + 1,
                ..id
            }];
        }
        block
            .successors()
            .into_iter()
            .map(|succ| self.first_inst_of_block(id.function, succ))
            .collect()
    }

    pub fn direct_callee(&self, id: InstId) -> Option<FuncId> {
        match self.instruction(id) {
            Some(Instruction::Call {
                callee: Callee::Function(func),
                ..
            }) => Some(*func),
            _ => None,
        }
    }

    pub fn call_args(&self, id: InstId) -> Option<&[ValueId]> {
        match self.instruction(id) {
            Some(Instruction::Call { args, .. }) => Some(args),
            _ => None,
        }
    }
}

impl Default for Module {
    fn default() -> Self {
        Self::new()
    }
}
