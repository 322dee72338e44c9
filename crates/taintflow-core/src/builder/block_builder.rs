use super::FunctionBuilder;
use crate::block::{BlockId, Terminator};
use crate::function::FuncId;
use crate::instructions::{
    BinaryOp, Callee, GepOffset, InstId, Instruction, MemIntrinsic,
};
use crate::types::Type;
use crate::values::{Constant, ValueId, ValueInfo, ValueKind};
use crate::{IrError, Result};
use num_bigint::BigUint;

pub struct BlockBuilder<'a, 'b> {
    fb: &'b mut FunctionBuilder<'a>,
    block: BlockId,
}

impl<'a, 'b> BlockBuilder<'a, 'b> {
    pub(crate) fn new(fb: &'b mut FunctionBuilder<'a>, block: BlockId) -> Self {
        Self { fb, block }
    }

    pub fn block_id(&self) -> BlockId {
        self.block
    }

    fn next_inst_id(&self) -> InstId {
        InstId {
            function: self.fb.func.id,
            block: self.block,
            index: self.fb.func.body.blocks[&self.block].instructions.len() as u32,
        }
    }

    fn push(&mut self, inst: Instruction) {
        self.fb
            .func
            .body
            .blocks
            .get_mut(&self.block)
            .expect("block exists")
            .instructions
            .push(inst);
    }

    fn mint_result(&mut self, ty: Type, name: Option<String>) -> ValueId {
        let inst = self.next_inst_id();
        self.fb.builder.add_value(ValueInfo {
            kind: ValueKind::InstResult(inst),
            ty,
            name,
        })
    }

    pub fn alloc(&mut self, name: &str, ty: Type) -> ValueId {
        let result = self.mint_result(
            Type::Pointer(Box::new(ty.clone())),
            Some(name.to_string()),
        );
        self.push(Instruction::Alloc {
            result,
            allocated: ty,
        });
        result
    }

    pub fn load(&mut self, address: ValueId) -> ValueId {
        let ty = self
            .fb
            .builder
            .module
            .value(address)
            .ty
            .pointee()
            .cloned()
            .unwrap_or(Type::Uint(64));
        let result = self.mint_result(ty, None);
        self.push(Instruction::Load { result, address });
        result
    }

    pub fn store(&mut self, address: ValueId, value: ValueId) {
        self.push(Instruction::Store { address, value });
    }

    pub fn gep(&mut self, base: ValueId, offset: i64) -> ValueId {
        let ty = self.fb.builder.module.value(base).ty.clone();
        let result = self.mint_result(ty, None);
        self.push(Instruction::Gep {
            result,
            base,
            offset: GepOffset::Constant(offset),
        });
        result
    }

    pub fn gep_dynamic(&mut self, base: ValueId, index: ValueId) -> ValueId {
        let ty = self.fb.builder.module.value(base).ty.clone();
        let result = self.mint_result(ty, None);
        self.push(Instruction::Gep {
            result,
            base,
            offset: GepOffset::Dynamic(index),
        });
        result
    }

    pub fn cast(&mut self, operand: ValueId, target: Type) -> ValueId {
        let result = self.mint_result(target.clone(), None);
        self.push(Instruction::Cast {
            result,
            operand,
            target,
        });
        result
    }

    pub fn binary(&mut self, op: BinaryOp, left: ValueId, right: ValueId) -> ValueId {
        let ty = self.fb.builder.module.value(left).ty.clone();
        let result = self.mint_result(ty, None);
        self.push(Instruction::Binary {
            result,
            op,
            left,
            right,
        });
        result
    }

    pub fn add(&mut self, left: ValueId, right: ValueId) -> ValueId {
        self.binary(BinaryOp::Add, left, right)
    }

    /// Direct call. The callee must already be declared or defined.
    pub fn call(&mut self, callee: FuncId, args: &[ValueId]) -> Result<Option<ValueId>> {
        let return_type = match self.fb.builder.module.functions.get(&callee) {
            Some(func) => func.signature.return_type.clone(),
            None if callee == self.fb.func.id => {
                self.fb.func.signature.return_type.clone()
            }
            None => return Err(IrError::FunctionNotFound(callee.to_string())),
        };
        let result = if return_type.is_void() {
            None
        } else {
            Some(self.mint_result(return_type, None))
        };
        self.push(Instruction::Call {
            result,
            callee: Callee::Function(callee),
            args: args.to_vec(),
        });
        Ok(result)
    }

    pub fn mem_set(&mut self, dest: ValueId, value: ValueId, len: ValueId) {
        self.push(Instruction::Call {
            result: None,
            callee: Callee::Intrinsic(MemIntrinsic::MemSet),
            args: vec![dest, value, len],
        });
    }

    pub fn mem_cpy(&mut self, dest: ValueId, src: ValueId, len: ValueId) {
        self.push(Instruction::Call {
            result: None,
            callee: Callee::Intrinsic(MemIntrinsic::MemCpy),
            args: vec![dest, src, len],
        });
    }

    pub fn mem_move(&mut self, dest: ValueId, src: ValueId, len: ValueId) {
        self.push(Instruction::Call {
            result: None,
            callee: Callee::Intrinsic(MemIntrinsic::MemMove),
            args: vec![dest, src, len],
        });
    }

    pub fn const_uint(&mut self, value: u64, bits: u16) -> ValueId {
        self.fb
            .builder
            .constant(Constant::Uint(BigUint::from(value), bits), Type::Uint(bits))
    }

    pub fn const_bool(&mut self, value: bool) -> ValueId {
        self.fb.builder.constant(Constant::Bool(value), Type::Bool)
    }

    pub fn const_null(&mut self) -> ValueId {
        self.fb.builder.constant(
            Constant::Null,
            Type::Pointer(Box::new(Type::Uint(8))),
        )
    }

    fn terminate(&mut self, terminator: Terminator) -> Result<()> {
        let block = self
            .fb
            .func
            .body
            .blocks
            .get_mut(&self.block)
            .expect("block exists");
        if block.is_terminated() {
            return Err(IrError::BuilderError(format!(
                "block {} is already terminated",
                self.block
            )));
        }
        block.terminator = terminator;
        Ok(())
    }

    pub fn jump(&mut self, target: BlockId) -> Result<()> {
        self.terminate(Terminator::Jump(target))
    }

    pub fn branch(
        &mut self,
        condition: ValueId,
        then_block: BlockId,
        else_block: BlockId,
    ) -> Result<()> {
        self.terminate(Terminator::Branch {
            condition,
            then_block,
            else_block,
        })
    }

    pub fn return_void(&mut self) -> Result<()> {
        self.terminate(Terminator::Return(None))
    }

    pub fn return_value(&mut self, value: ValueId) -> Result<()> {
        self.terminate(Terminator::Return(Some(value)))
    }
}
