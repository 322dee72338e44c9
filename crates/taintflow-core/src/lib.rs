/*! IFDS/IDE taint propagation over a small SSA IR.
 *
 * Tracking tainted data across procedures requires more than reachability: a
 * sanitizer on one path but not the other must be visible in the result. This
 * crate pairs field-sensitive memory-location facts with an IDE value lattice
 * that records where (if anywhere) a taint was neutralized.
 */

pub mod analysis;
pub mod block;
pub mod builder;
pub mod function;
pub mod instructions;
pub mod module;
pub mod taint;
pub mod types;
pub mod values;

pub use block::{BasicBlock, BlockId, Terminator};
pub use builder::{BlockBuilder, FunctionBuilder, ModuleBuilder};
pub use function::{FuncId, Function, FunctionBody, FunctionSignature, Parameter};
pub use instructions::{BinaryOp, Callee, GepOffset, InstId, Instruction, MemIntrinsic};
pub use module::Module;
pub use types::Type;
pub use values::{Constant, ValueId, ValueInfo, ValueKind};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IrError {
    #[error("Type error: {0}")]
    TypeError(String),
    #[error("Invalid instruction: {0}")]
    InvalidInstruction(String),
    #[error("Builder error: {0}")]
    BuilderError(String),
    #[error("Function not found: {0}")]
    FunctionNotFound(String),
}

pub type Result<T> = std::result::Result<T, IrError>;

#[cfg(test)]
mod tests;
