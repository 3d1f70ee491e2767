use crate::typechecker::{Signature, Ty};

/// Library functions available to every program. Calls resolve to these
/// before any user function of the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinFunction {
    Print,
    Read,
    Length,
    Get,
    Concat,
    Append,
    Itos,
    Stoi,
    Dtos,
    Stod,
}

impl BuiltinFunction {
    pub const ALL: [Self; 10] = [
        Self::Print,
        Self::Read,
        Self::Length,
        Self::Get,
        Self::Concat,
        Self::Append,
        Self::Itos,
        Self::Stoi,
        Self::Dtos,
        Self::Stod,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "print" => Some(Self::Print),
            "read" => Some(Self::Read),
            "length" => Some(Self::Length),
            "get" => Some(Self::Get),
            "concat" => Some(Self::Concat),
            "append" => Some(Self::Append),
            "itos" => Some(Self::Itos),
            "stoi" => Some(Self::Stoi),
            "dtos" => Some(Self::Dtos),
            "stod" => Some(Self::Stod),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Print => "print",
            Self::Read => "read",
            Self::Length => "length",
            Self::Get => "get",
            Self::Concat => "concat",
            Self::Append => "append",
            Self::Itos => "itos",
            Self::Stoi => "stoi",
            Self::Dtos => "dtos",
            Self::Stod => "stod",
        }
    }

    pub fn arity(self) -> usize {
        match self {
            Self::Read => 0,
            Self::Get | Self::Concat | Self::Append => 2,
            _ => 1,
        }
    }

    pub fn signature(self) -> Signature {
        let (params, ret) = match self {
            Self::Print => (vec![Ty::String], Ty::Nil),
            Self::Read => (vec![], Ty::String),
            Self::Length => (vec![Ty::String], Ty::Int),
            Self::Get => (vec![Ty::Int, Ty::String], Ty::Char),
            Self::Concat => (vec![Ty::String, Ty::String], Ty::String),
            Self::Append => (vec![Ty::String, Ty::Char], Ty::String),
            Self::Itos => (vec![Ty::Int], Ty::String),
            Self::Stoi => (vec![Ty::String], Ty::Int),
            Self::Dtos => (vec![Ty::Double], Ty::String),
            Self::Stod => (vec![Ty::String], Ty::Double),
        };
        Signature { params, ret }
    }
}
