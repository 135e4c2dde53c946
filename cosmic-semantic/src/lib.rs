mod analyzer;
mod expression;
pub mod hover;
pub mod member;
pub mod scope;
pub mod types;

#[cfg(test)]
mod tests;

pub use analyzer::{SemanticAnalyzer, SemanticInfo};
pub use cosmic_registry::MemberKind;
pub use hover::{Hoverable, hover_at};
pub use member::Member;
pub use scope::{Scope, ScopeId, ScopeTree, Variable, VariableKind, completions_at, scope_at};
pub use types::{Signature, Type};
