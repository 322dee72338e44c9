use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    Void,
    Bool,
    Uint(u16),
    Int(u16),
    Pointer(Box<Type>),
    Array(Box<Type>, usize),
    Struct(Vec<Type>),
}

impl Type {
    pub fn byte_size(&self) -> i64 {
        match self {
            Type::Void => 0,
            Type::Bool => 1,
            Type::Uint(bits) | Type::Int(bits) => (*bits as i64 + 7) / 8,
            Type::Pointer(_) => 8,
            Type::Array(elem, len) => elem.byte_size() * *len as i64,
            Type::Struct(fields) => fields.iter().map(Type::byte_size).sum(),
        }
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, Type::Pointer(_))
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Type::Void)
    }

    pub fn pointee(&self) -> Option<&Type> {
        match self {
            Type::Pointer(inner) => Some(inner),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => write!(f, "void"),
            Type::Bool => write!(f, "bool"),
            Type::Uint(bits) => write!(f, "u{}", bits),
            Type::Int(bits) => write!(f, "i{}", bits),
            Type::Pointer(inner) => write!(f, "ptr<{}>", inner),
            Type::Array(elem, len) => write!(f, "{}[{}]", elem, len),
            Type::Struct(fields) => {
                write!(f, "{{")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", field)?;
                }
                write!(f, "}}")
            }
        }
    }
}
