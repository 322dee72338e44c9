use super::{BlockBuilder, ModuleBuilder};
use crate::block::{BlockId, Terminator};
use crate::function::{FuncId, Function, FunctionBody, FunctionSignature, Parameter};
use crate::types::Type;
use crate::values::{ValueId, ValueInfo, ValueKind};
use crate::{IrError, Result};

pub struct FunctionBuilder<'a> {
    pub(crate) builder: &'a mut ModuleBuilder,
    pub(crate) func: Function,
    duplicate: bool,
    has_entry: bool,
}

impl<'a> FunctionBuilder<'a> {
    pub(crate) fn new(
        builder: &'a mut ModuleBuilder,
        id: FuncId,
        name: &str,
        return_type: Type,
        duplicate: bool,
    ) -> Self {
        Self {
            builder,
            func: Function {
                id,
                signature: FunctionSignature {
                    name: name.to_string(),
                    params: Vec::new(),
                    return_type,
                    is_variadic: false,
                },
                is_declaration: false,
                body: FunctionBody::new(),
                va_list: None,
            },
            duplicate,
            has_entry: false,
        }
    }

    pub fn func_id(&self) -> FuncId {
        self.func.id
    }

    pub fn param(&mut self, name: &str, ty: Type) -> ValueId {
        let index = self.func.signature.params.len() as u32;
        let value = self.builder.add_value(ValueInfo {
            kind: ValueKind::Argument {
                function: self.func.id,
                index,
            },
            ty: ty.clone(),
            name: Some(name.to_string()),
        });
        self.func.signature.params.push(Parameter {
            name: name.to_string(),
            param_type: ty,
            value,
        });
        value
    }

    /// Marks the function variadic and returns the synthetic va_list
    /// aggregate the excess call arguments are mapped onto.
    pub fn make_variadic(&mut self) -> ValueId {
        if let Some(va) = self.func.va_list {
            return va;
        }
        let va = self.builder.add_value(ValueInfo {
            kind: ValueKind::VaList {
                function: self.func.id,
            },
            ty: Type::Struct(vec![]),
            name: Some(format!("{}.va_list", self.func.signature.name)),
        });
        self.func.signature.is_variadic = true;
        self.func.va_list = Some(va);
        va
    }

    pub fn entry_block(&mut self) -> BlockBuilder<'a, '_> {
        if !self.has_entry {
            let entry = self.func.body.create_block();
            self.func.body.entry_block = entry;
            self.has_entry = true;
        }
        let entry = self.func.body.entry_block;
        BlockBuilder::new(self, entry)
    }

    pub fn create_block(&mut self) -> BlockId {
        if !self.has_entry {
            let entry = self.func.body.create_block();
            self.func.body.entry_block = entry;
            self.has_entry = true;
            return entry;
        }
        self.func.body.create_block()
    }

    pub fn switch_to_block(&mut self, block: BlockId) -> Result<BlockBuilder<'a, '_>> {
        if !self.func.body.blocks.contains_key(&block) {
            return Err(IrError::BuilderError(format!(
                "unknown block {} in function {}",
                block, self.func.signature.name
            )));
        }
        Ok(BlockBuilder::new(self, block))
    }

    /// Seals the function and registers it with the module.
    pub fn finish(mut self) -> Result<FuncId> {
        if self.duplicate {
            return Err(IrError::BuilderError(format!(
                "function {} already exists",
                self.func.signature.name
            )));
        }
        for (&id, block) in &self.func.body.blocks {
            if matches!(block.terminator, Terminator::Invalid) {
                return Err(IrError::BuilderError(format!(
                    "block {} of function {} is not terminated",
                    id, self.func.signature.name
                )));
            }
        }
        self.func.body.compute_predecessors();
        let id = self.func.id;
        self.builder.module.functions.insert(id, self.func);
        Ok(id)
    }
}
