use std::collections::HashMap;

use serde::{Deserialize, Serialize};

const BUNDLED: &str = include_str!("../data/structs.json");

pub type Result<T, E = RegistryError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("malformed registry data: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("struct `{0}` is defined more than once")]
    DuplicateStruct(String),
    #[error("function `{0}` is defined more than once")]
    DuplicateFunction(String),
    #[error("struct `{owner}` defines member `{member}` more than once")]
    DuplicateMember { owner: String, member: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberKind {
    Method,
    StaticMethod,
    Property,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberDefinition {
    pub name: String,
    pub kind: MemberKind,
    /// Property type, or the return type of a method.
    #[serde(rename = "type", default)]
    pub ty: Option<String>,
    #[serde(default)]
    pub documentation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructDefinition {
    pub name: String,
    #[serde(default)]
    pub documentation: Option<String>,
    #[serde(default)]
    pub members: Vec<MemberDefinition>,
}

impl StructDefinition {
    pub fn member(&self, name: &str) -> Option<&MemberDefinition> {
        self.members.iter().find(|member| member.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    #[serde(default)]
    pub params: Vec<ParamDefinition>,
    pub returns: String,
    /// Accepts any number of arguments shaped like the last parameter.
    #[serde(default)]
    pub variadic: bool,
    #[serde(default)]
    pub documentation: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawRegistry {
    #[serde(default)]
    structs: Vec<StructDefinition>,
    #[serde(default)]
    functions: Vec<FunctionDefinition>,
}

/// Built-in struct types and functions known to every document.
///
/// Loaded once at startup and shared read-only between documents.
#[derive(Debug, Default, Clone)]
pub struct Registry {
    structs: HashMap<String, StructDefinition>,
    functions: HashMap<String, FunctionDefinition>,
}

impl Registry {
    /// The registry shipped with the server.
    pub fn bundled() -> Result<Self> {
        Self::from_json(BUNDLED)
    }

    pub fn from_json(source: &str) -> Result<Self> {
        let raw: RawRegistry = serde_json::from_str(source)?;
        let mut registry = Registry::default();

        for definition in raw.structs {
            let mut seen = Vec::with_capacity(definition.members.len());
            for member in definition.members.iter() {
                if seen.contains(&member.name.as_str()) {
                    return Err(RegistryError::DuplicateMember {
                        owner: definition.name.clone(),
                        member: member.name.clone(),
                    });
                }
                seen.push(member.name.as_str());
            }

            if registry.structs.contains_key(&definition.name) {
                return Err(RegistryError::DuplicateStruct(definition.name));
            }
            registry.structs.insert(definition.name.clone(), definition);
        }

        for function in raw.functions {
            if registry.functions.contains_key(&function.name) {
                return Err(RegistryError::DuplicateFunction(function.name));
            }
            registry.functions.insert(function.name.clone(), function);
        }

        Ok(registry)
    }

    pub fn get_struct(&self, name: &str) -> Option<&StructDefinition> {
        self.structs.get(name)
    }

    pub fn get_function(&self, name: &str) -> Option<&FunctionDefinition> {
        self.functions.get(name)
    }

    pub fn structs(&self) -> impl Iterator<Item = &StructDefinition> {
        self.structs.values()
    }

    pub fn functions(&self) -> impl Iterator<Item = &FunctionDefinition> {
        self.functions.values()
    }
}
