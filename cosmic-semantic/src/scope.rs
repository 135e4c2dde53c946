use cosmic_core::Location;
use serde::Serialize;

use crate::types::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ScopeId(pub usize);

impl ScopeId {
    pub const ROOT: ScopeId = ScopeId(0);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VariableKind {
    Local,
    Parameter,
    LoopBinding,
    Field,
    Function,
    Struct,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Variable {
    pub name: String,
    /// The name at its declaration site.
    pub location: Location,
    pub kind: VariableKind,
    pub ty: Type,
    pub references: usize,
}

impl Variable {
    pub fn new(name: impl Into<String>, location: Location, kind: VariableKind, ty: Type) -> Self {
        Self {
            name: name.into(),
            location,
            kind,
            ty,
            references: 0,
        }
    }

    pub fn is_unused(&self) -> bool {
        self.references == 0
            && matches!(self.kind, VariableKind::Local | VariableKind::LoopBinding)
            && !self.name.starts_with('_')
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scope {
    pub location: Location,
    pub variables: Vec<Variable>,
    pub children: Vec<ScopeId>,
}

impl Scope {
    pub fn new(location: Location) -> Self {
        Self {
            location,
            variables: vec![],
            children: vec![],
        }
    }
}

/// Lexical scopes of one document, stored in an arena.
///
/// Every child lies within its parent and siblings never overlap, since scopes
/// follow the nesting of the syntax tree.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
}

impl ScopeTree {
    pub fn new(root: Scope) -> Self {
        Self { scopes: vec![root] }
    }

    pub fn root(&self) -> &Scope {
        self.get(ScopeId::ROOT)
    }

    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0]
    }

    pub(crate) fn get_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.0]
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ScopeId, &Scope)> {
        self.scopes
            .iter()
            .enumerate()
            .map(|(index, scope)| (ScopeId(index), scope))
    }

    /// Opens a child of `parent`, clamped to the parent's range.
    pub(crate) fn push_child(&mut self, parent: ScopeId, location: Location) -> ScopeId {
        let bounds = self.get(parent).location;
        let start = location.start_byte.clamp(bounds.start_byte, bounds.end_byte);
        let end = location.end_byte.clamp(start, bounds.end_byte);

        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope::new(Location::new(start, end)));
        self.get_mut(parent).children.push(id);
        id
    }

    pub(crate) fn declare(&mut self, scope: ScopeId, variable: Variable) -> usize {
        let variables = &mut self.get_mut(scope).variables;
        variables.push(variable);
        variables.len() - 1
    }

    /// Variables of `scope` followed by those of all its descendants, depth first.
    pub fn variables_below(&self, scope: ScopeId) -> Vec<&Variable> {
        let mut variables = vec![];
        let mut pending = vec![scope];

        while let Some(id) = pending.pop() {
            let scope = self.get(id);
            variables.extend(scope.variables.iter());
            pending.extend(scope.children.iter().rev());
        }

        variables
    }
}

/// The innermost scope whose range covers `offset`, starting the descent at the root.
pub fn scope_at(offset: usize, tree: &ScopeTree) -> ScopeId {
    let mut current = ScopeId::ROOT;

    while let Some(child) = tree
        .get(current)
        .children
        .iter()
        .find(|child| tree.get(**child).location.covers(offset))
    {
        current = *child;
    }

    current
}

/// Completion candidates at `offset`: the variables of the scope found there and of
/// every scope nested below it. Enclosing scopes are not included.
pub fn completions_at(tree: &ScopeTree, offset: usize) -> Vec<&Variable> {
    tree.variables_below(scope_at(offset, tree))
}
