use cosmic_core::Location;
use serde::Serialize;

use crate::scope::{Variable, VariableKind};
use crate::types::Type;

/// A source range with the markdown shown when hovering it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hoverable {
    pub location: Location,
    pub message: String,
}

impl Hoverable {
    pub fn new(location: Location, message: impl Into<String>) -> Self {
        Self {
            location,
            message: message.into(),
        }
    }
}

/// The first hoverable touching `offset`, in the order they were discovered.
///
/// Ranges may overlap, e.g. a call and its callee. No attempt is made to pick the
/// narrowest one.
pub fn hover_at(hoverables: &[Hoverable], offset: usize) -> Option<&Hoverable> {
    hoverables
        .iter()
        .find(|hoverable| hoverable.location.contains(offset))
}

pub(crate) fn code_block(signature: &str, documentation: Option<&str>) -> String {
    let mut message = format!("```cosmic\n{signature}\n```");
    if let Some(documentation) = documentation {
        message.push_str("\n\n");
        message.push_str(documentation);
    }
    message
}

pub(crate) fn describe_variable(variable: &Variable) -> String {
    let name = &variable.name;
    let ty = &variable.ty;

    let signature = match (variable.kind, ty) {
        (VariableKind::Function, Type::Function(signature)) => format!("fn {name}{signature}"),
        (VariableKind::Struct, _) => format!("struct {name}"),
        (VariableKind::Local, _) => format!("let {name}: {ty}"),
        (VariableKind::Parameter, _) => format!("(parameter) {name}: {ty}"),
        (VariableKind::LoopBinding, _) => format!("(loop variable) {name}: {ty}"),
        (VariableKind::Field, _) => format!("(field) {name}: {ty}"),
        (VariableKind::Function, _) => format!("fn {name}: {ty}"),
    };

    code_block(&signature, None)
}
