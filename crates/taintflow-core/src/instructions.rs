use crate::block::BlockId;
use crate::function::FuncId;
use crate::types::Type;
use crate::values::ValueId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Addresses a single program point. `index == instructions.len()` of the
/// containing block addresses the block terminator, so branches and returns
/// are addressable like any other instruction.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct InstId {
    pub function: FuncId,
    pub block: BlockId,
    pub index: u32,
}

impl fmt::Display for InstId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}[{}]", self.function, self.block, self.index)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GepOffset {
    Constant(i64),
    Dynamic(ValueId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemIntrinsic {
    MemSet,
    MemCpy,
    MemMove,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Callee {
    Function(FuncId),
    Intrinsic(MemIntrinsic),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    And,
    Or,
    Xor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Instruction {
    Alloc {
        result: ValueId,
        allocated: Type,
    },
    Load {
        result: ValueId,
        address: ValueId,
    },
    Store {
        address: ValueId,
        value: ValueId,
    },
    Gep {
        result: ValueId,
        base: ValueId,
        offset: GepOffset,
    },
    Cast {
        result: ValueId,
        operand: ValueId,
        target: Type,
    },
    Binary {
        result: ValueId,
        op: BinaryOp,
        left: ValueId,
        right: ValueId,
    },
    Call {
        result: Option<ValueId>,
        callee: Callee,
        args: Vec<ValueId>,
    },
}

impl Instruction {
    pub fn result(&self) -> Option<ValueId> {
        match self {
            Instruction::Alloc { result, .. }
            | Instruction::Load { result, .. }
            | Instruction::Gep { result, .. }
            | Instruction::Cast { result, .. }
            | Instruction::Binary { result, .. } => Some(*result),
            Instruction::Call { result, .. } => *result,
            Instruction::Store { .. } => None,
        }
    }

    pub fn operands(&self) -> Vec<ValueId> {
        match self {
            Instruction::Alloc { .. } => vec![],
            Instruction::Load { address, .. } => vec![*address],
            Instruction::Store { address, value } => vec![*value, *address],
            Instruction::Gep { base, offset, .. } => match offset {
                GepOffset::Constant(_) => vec![*base],
                GepOffset::Dynamic(idx) => vec![*base, *idx],
            },
            Instruction::Cast { operand, .. } => vec![*operand],
            Instruction::Binary { left, right, .. } => vec![*left, *right],
            Instruction::Call { args, .. } => args.clone(),
        }
    }

    pub fn is_call(&self) -> bool {
        matches!(self, Instruction::Call { .. })
    }
}
