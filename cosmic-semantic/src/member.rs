use cosmic_registry::{MemberDefinition, MemberKind};
use serde::Serialize;

/// A member offered after a dot, resolved from the base expression's type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Member {
    pub name: String,
    pub kind: MemberKind,
    pub documentation: Option<String>,
    /// Property type, or a method's return type.
    pub ty: Option<String>,
}

impl Member {
    pub fn property(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: MemberKind::Property,
            documentation: None,
            ty: Some(ty.into()),
        }
    }

    /// Signature line shown in hovers and completion details.
    pub fn detail(&self, owner: &str) -> String {
        let ty = self.ty.as_deref().unwrap_or("any");
        match self.kind {
            MemberKind::Property => format!("(property) {owner}.{}: {ty}", self.name),
            MemberKind::Method => format!("(method) {owner}.{}() -> {ty}", self.name),
            MemberKind::StaticMethod => format!("(static method) {owner}.{}() -> {ty}", self.name),
        }
    }
}

impl From<&MemberDefinition> for Member {
    fn from(definition: &MemberDefinition) -> Self {
        Self {
            name: definition.name.clone(),
            kind: definition.kind,
            documentation: definition.documentation.clone(),
            ty: definition.ty.clone(),
        }
    }
}
