use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Type {
    Int,
    Float,
    String,
    Bool,
    Null,
    Void,
    List(Box<Type>),
    /// An instance of the named struct.
    Struct(String),
    /// The struct itself, as in `Vec2.zero()` or `Vec2(1, 2)`.
    StructName(String),
    Function(Signature),
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Signature {
    /// `None` when the parameters are not known, as for registry methods.
    pub params: Option<Vec<Type>>,
    /// The last parameter repeats any number of times, including zero.
    pub variadic: bool,
    pub returns: Box<Type>,
}

impl Type {
    /// Resolves a primitive type name. Struct names are resolved by the analyzer.
    pub fn primitive(name: &str) -> Option<Type> {
        let ty = match name {
            "int" => Type::Int,
            "float" => Type::Float,
            "string" => Type::String,
            "bool" => Type::Bool,
            "void" => Type::Void,
            "null" => Type::Null,
            "any" => Type::Unknown,
            _ => return None,
        };
        Some(ty)
    }

    /// Parses the type names used by the registry data, e.g. `int[]` or `Vec2`.
    pub fn from_registry(name: &str) -> Type {
        let mut base = name.trim();
        let mut depth = 0;
        while let Some(inner) = base.strip_suffix("[]") {
            base = inner.trim_end();
            depth += 1;
        }

        let ty = Type::primitive(base).unwrap_or_else(|| Type::Struct(base.to_string()));
        Type::list_of(ty, depth)
    }

    pub fn list_of(mut ty: Type, depth: usize) -> Type {
        for _ in 0..depth {
            ty = Type::List(Box::new(ty));
        }
        ty
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Type::Unknown)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Int | Type::Float)
    }

    /// Whether a value of type `value` can be stored where `self` is expected.
    pub fn accepts(&self, value: &Type) -> bool {
        match (self, value) {
            (Type::Unknown, _) | (_, Type::Unknown) => true,
            (Type::Float, Type::Int) => true,
            (Type::String | Type::List(_) | Type::Struct(_), Type::Null) => true,
            (Type::List(expected), Type::List(found)) => expected.accepts(found),
            (expected, found) => expected == found,
        }
    }

    /// The name of the struct whose members are reachable through a value of this type.
    pub fn struct_name(&self) -> Option<&str> {
        match self {
            Type::Struct(name) | Type::StructName(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => write!(f, "int"),
            Type::Float => write!(f, "float"),
            Type::String => write!(f, "string"),
            Type::Bool => write!(f, "bool"),
            Type::Null => write!(f, "null"),
            Type::Void => write!(f, "void"),
            Type::List(inner) => write!(f, "{inner}[]"),
            Type::Struct(name) => write!(f, "{name}"),
            Type::StructName(name) => write!(f, "struct {name}"),
            Type::Function(signature) => write!(f, "fn{signature}"),
            Type::Unknown => write!(f, "unknown"),
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.params {
            None => write!(f, "(..)")?,
            Some(params) => {
                write!(f, "(")?;
                for (index, param) in params.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    match param {
                        Type::Unknown => write!(f, "any")?,
                        param => write!(f, "{param}")?,
                    }
                    if self.variadic && index + 1 == params.len() {
                        write!(f, "...")?;
                    }
                }
                write!(f, ")")?;
            }
        }

        write!(f, " -> {}", self.returns)
    }
}
