use crate::function::FuncId;
use crate::instructions::InstId;
use crate::types::Type;
use num_bigint::{BigInt, BigUint};
use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle into the module's value registry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ValueId(pub u32);

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Constant {
    Bool(bool),
    Uint(BigUint, u16),
    Int(BigInt, u16),
    Null,
}

impl Constant {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Constant::Bool(b) => Some(*b as i64),
            Constant::Uint(val, _) => val.to_i64(),
            Constant::Int(val, _) => val.to_i64(),
            Constant::Null => Some(0),
        }
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Bool(b) => write!(f, "{}", b),
            Constant::Uint(val, bits) => write!(f, "{}u{}", val, bits),
            Constant::Int(val, bits) => write!(f, "{}i{}", val, bits),
            Constant::Null => write!(f, "null"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Argument { function: FuncId, index: u32 },
    /// Aggregate receiving the variadic tail of a call to a variadic function.
    VaList { function: FuncId },
    Global,
    Constant(Constant),
    InstResult(InstId),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueInfo {
    pub kind: ValueKind,
    pub ty: Type,
    pub name: Option<String>,
}

impl ValueInfo {
    pub fn is_constant(&self) -> bool {
        matches!(self.kind, ValueKind::Constant(_))
    }

    pub fn is_global(&self) -> bool {
        matches!(self.kind, ValueKind::Global)
    }

    /// The function this value is local to, if any. Globals and constants
    /// belong to no function.
    pub fn defining_function(&self) -> Option<FuncId> {
        match self.kind {
            ValueKind::Argument { function, .. } | ValueKind::VaList { function } => {
                Some(function)
            }
            ValueKind::InstResult(inst) => Some(inst.function),
            ValueKind::Global | ValueKind::Constant(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigUint;

    #[test]
    fn test_constant_narrowing() {
        assert_eq!(Constant::Bool(true).as_int(), Some(1));
        assert_eq!(Constant::Null.as_int(), Some(0));
        assert_eq!(
            Constant::Uint(BigUint::from(42u32), 64).as_int(),
            Some(42)
        );
    }
}
