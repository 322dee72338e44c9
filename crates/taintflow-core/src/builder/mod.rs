/*! Fluent API for constructing IR programmatically.
 *
 * Hand-wiring modules is tedious and error-prone. These builders handle value
 * registration, instruction addressing, and block bookkeeping so callers can
 * focus on program shape rather than plumbing.
 */

pub mod block_builder;
pub mod function_builder;

pub use block_builder::BlockBuilder;
pub use function_builder::FunctionBuilder;

use crate::function::{FuncId, Function, FunctionBody, FunctionSignature, Parameter};
use crate::module::Module;
use crate::types::Type;
use crate::values::{Constant, ValueId, ValueInfo, ValueKind};
use crate::{IrError, Result};

pub struct ModuleBuilder {
    pub(crate) module: Module,
    next_func_id: u32,
}

impl ModuleBuilder {
    pub fn new() -> Self {
        Self {
            module: Module::new(),
            next_func_id: 0,
        }
    }

    pub fn global(&mut self, name: &str, ty: Type) -> ValueId {
        self.add_value(ValueInfo {
            kind: ValueKind::Global,
            ty,
            name: Some(name.to_string()),
        })
    }

    pub fn constant(&mut self, value: Constant, ty: Type) -> ValueId {
        self.add_value(ValueInfo {
            kind: ValueKind::Constant(value),
            ty,
            name: None,
        })
    }

    /// Registers an external function. Declarations have no body and get the
    /// conservative call-to-return treatment during analysis.
    pub fn declare_function(
        &mut self,
        name: &str,
        param_types: &[Type],
        return_type: Type,
    ) -> Result<FuncId> {
        if self.module.function_names.contains_key(name) {
            return Err(IrError::BuilderError(format!(
                "function {} already exists",
                name
            )));
        }
        let id = self.alloc_func_id(name);
        let params = param_types
            .iter()
            .enumerate()
            .map(|(index, ty)| Parameter {
                name: format!("arg{}", index),
                param_type: ty.clone(),
                value: self.add_value(ValueInfo {
                    kind: ValueKind::Argument {
                        function: id,
                        index: index as u32,
                    },
                    ty: ty.clone(),
                    name: Some(format!("{}.arg{}", name, index)),
                }),
            })
            .collect();

        self.module.functions.insert(
            id,
            Function {
                id,
                signature: FunctionSignature {
                    name: name.to_string(),
                    params,
                    return_type,
                    is_variadic: false,
                },
                is_declaration: true,
                body: FunctionBody::new(),
                va_list: None,
            },
        );
        Ok(id)
    }

    pub fn function(&mut self, name: &str, return_type: Type) -> FunctionBuilder<'_> {
        let duplicate = self.module.function_names.contains_key(name);
        let id = self.alloc_func_id(name);
        FunctionBuilder::new(self, id, name, return_type, duplicate)
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    pub fn build(self) -> Module {
        self.module
    }

    pub(crate) fn add_value(&mut self, info: ValueInfo) -> ValueId {
        let id = ValueId(self.module.values.len() as u32);
        self.module.values.push(info);
        id
    }

    fn alloc_func_id(&mut self, name: &str) -> FuncId {
        let id = FuncId(self.next_func_id);
        self.next_func_id += 1;
        self.module
            .function_names
            .entry(name.to_string())
            .or_insert(id);
        id
    }
}

impl Default for ModuleBuilder {
    fn default() -> Self {
        Self::new()
    }
}
