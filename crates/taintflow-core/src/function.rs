use crate::block::{BasicBlock, BlockId};
use crate::types::Type;
use crate::values::ValueId;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct FuncId(pub u32);

impl fmt::Display for FuncId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "f{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub param_type: Type,
    pub value: ValueId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionSignature {
    pub name: String,
    pub params: Vec<Parameter>,
    pub return_type: Type,
    pub is_variadic: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionBody {
    pub entry_block: BlockId,
    pub blocks: IndexMap<BlockId, BasicBlock>,
    pub(crate) next_block_id: u32,
}

impl FunctionBody {
    pub fn new() -> Self {
        Self {
            entry_block: BlockId(0),
            blocks: IndexMap::new(),
            next_block_id: 0,
        }
    }

    pub fn create_block(&mut self) -> BlockId {
        let id = BlockId(self.next_block_id);
        self.next_block_id += 1;
        self.blocks.insert(id, BasicBlock::new(id));
        id
    }

    /// Recomputes every block's predecessor list from the terminators.
    pub fn compute_predecessors(&mut self) {
        let mut preds: IndexMap<BlockId, Vec<BlockId>> = IndexMap::new();
        for (&id, block) in &self.blocks {
            for succ in block.successors() {
                preds.entry(succ).or_default().push(id);
            }
        }
        for (&id, block) in &mut self.blocks {
            block.predecessors = preds.shift_remove(&id).unwrap_or_default();
        }
    }
}

impl Default for FunctionBody {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub id: FuncId,
    pub signature: FunctionSignature,
    pub is_declaration: bool,
    pub body: FunctionBody,
    /// Synthetic aggregate the variadic tail of a call maps onto.
    pub va_list: Option<ValueId>,
}

impl Function {
    pub fn entry_block(&self) -> BlockId {
        self.body.entry_block
    }

    pub fn param_value(&self, index: usize) -> Option<ValueId> {
        self.signature.params.get(index).map(|p| p.value)
    }

    pub fn name(&self) -> &str {
        &self.signature.name
    }
}
