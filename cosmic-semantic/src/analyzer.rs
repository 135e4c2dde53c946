use std::collections::HashMap;

use cosmic_core::{Diagnostic, Location};
use cosmic_registry::Registry;
use cosmic_syntax::*;

use crate::hover::{Hoverable, describe_variable, hover_at};
use crate::member::Member;
use crate::scope::{Scope, ScopeId, ScopeTree, Variable, VariableKind, completions_at, scope_at};
use crate::types::{Signature, Type};

/// Everything one traversal learned about a document.
#[derive(Debug, Clone, PartialEq)]
pub struct SemanticInfo {
    pub scopes: ScopeTree,
    pub diagnostics: Vec<Diagnostic>,
    pub hoverables: Vec<Hoverable>,
    pub members: Vec<Member>,
    pub use_member: bool,
}

impl SemanticInfo {
    pub fn scope_at(&self, offset: usize) -> &Scope {
        self.scopes.get(scope_at(offset, &self.scopes))
    }

    pub fn hover_at(&self, offset: usize) -> Option<&Hoverable> {
        hover_at(&self.hoverables, offset)
    }

    pub fn completions_at(&self, offset: usize) -> Vec<&Variable> {
        completions_at(&self.scopes, offset)
    }
}

/// Walks the syntax tree once, building the scope tree and collecting diagnostics,
/// hoverables and the members reachable from a dotted access.
///
/// A fresh analyzer, or a fresh call to [`SemanticAnalyzer::traverse`], is used for
/// every version of a document. The registry is the only state shared between runs.
#[derive(Debug)]
pub struct SemanticAnalyzer<'a> {
    pub(crate) content: &'a str,
    pub(crate) registry: &'a Registry,
    pub(crate) cursor: Option<usize>,
    pub(crate) tree: ScopeTree,
    pub(crate) stack: Vec<ScopeId>,
    /// Fields of the structs defined in the document, by the scope defining them.
    structs: HashMap<ScopeId, HashMap<String, Vec<(String, Type)>>>,
    signatures: HashMap<Location, Signature>,
    pub(crate) diagnostics: Vec<Diagnostic>,
    pub(crate) hoverables: Vec<Hoverable>,
    pub(crate) members: Vec<Member>,
    pub(crate) use_member: bool,
    /// Return types of the enclosing functions, innermost last.
    returns: Vec<Type>,
    loops: usize,
}

impl<'a> SemanticAnalyzer<'a> {
    pub fn new(content: &'a str, registry: &'a Registry) -> Self {
        Self {
            content,
            registry,
            cursor: None,
            tree: ScopeTree::default(),
            stack: vec![],
            structs: HashMap::new(),
            signatures: HashMap::new(),
            diagnostics: vec![],
            hoverables: vec![],
            members: vec![],
            use_member: false,
            returns: vec![],
            loops: 0,
        }
    }

    /// Only member accesses around `offset` resolve members. Without a cursor the last
    /// member access in the document wins.
    pub fn with_cursor(mut self, offset: usize) -> Self {
        self.cursor = Some(offset);
        self
    }

    pub fn traverse(&mut self, ast: &Ast, initial_scope: Scope) -> ScopeTree {
        self.tree = ScopeTree::new(initial_scope);
        self.stack = vec![ScopeId::ROOT];
        self.structs.clear();
        self.signatures.clear();
        self.diagnostics.clear();
        self.hoverables.clear();
        self.members.clear();
        self.use_member = false;
        self.returns.clear();
        self.loops = 0;

        self.analyze_statements(&ast.nodes);

        self.stack.clear();
        std::mem::take(&mut self.tree)
    }

    pub fn analyze(&mut self, ast: &Ast, document: Location) -> SemanticInfo {
        let scopes = self.traverse(ast, Scope::new(document));

        SemanticInfo {
            scopes,
            diagnostics: std::mem::take(&mut self.diagnostics),
            hoverables: std::mem::take(&mut self.hoverables),
            members: std::mem::take(&mut self.members),
            use_member: self.use_member,
        }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn hoverables(&self) -> &[Hoverable] {
        &self.hoverables
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn use_member(&self) -> bool {
        self.use_member
    }

    pub(crate) fn text(&self, location: Location) -> &'a str {
        let content = self.content;
        content.get(location.to_range()).unwrap_or_default()
    }

    pub(crate) fn error(&mut self, location: Location, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic::error(location, message));
    }

    pub(crate) fn mismatch(&mut self, location: Location, expected: &Type, found: &Type) {
        self.error(
            location,
            format!("mismatched types: expected `{expected}`, found `{found}`"),
        );
    }

    fn current_scope(&self) -> ScopeId {
        self.stack.last().copied().unwrap_or(ScopeId::ROOT)
    }

    fn push_scope(&mut self, location: Location) {
        let id = self.tree.push_child(self.current_scope(), location);
        self.stack.push(id);
    }

    fn pop_scope(&mut self) {
        let Some(id) = self.stack.pop() else { return };

        // only function-local names are reported
        if self.returns.is_empty() {
            return;
        }

        let hints = self
            .tree
            .get(id)
            .variables
            .iter()
            .filter(|variable| variable.is_unused())
            .map(|variable| {
                Diagnostic::hint(variable.location, format!("`{}` is never used", variable.name))
            })
            .collect::<Vec<_>>();
        self.diagnostics.extend(hints);
    }

    fn declare(&mut self, name: Location, kind: VariableKind, ty: Type) {
        let scope = self.current_scope();
        let text = self.text(name);

        if self.tree.get(scope).variables.iter().any(|var| var.name == text) {
            self.error(name, format!("`{text}` is already declared in this scope"));
        }

        let variable = Variable::new(text, name, kind, ty);
        self.hoverables
            .push(Hoverable::new(name, describe_variable(&variable)));
        self.tree.declare(scope, variable);
    }

    /// Innermost visible variable named `name`. Later declarations shadow earlier ones.
    pub(crate) fn lookup(&self, name: &str) -> Option<(ScopeId, usize)> {
        self.stack.iter().rev().find_map(|scope| {
            self.tree
                .get(*scope)
                .variables
                .iter()
                .rposition(|var| var.name == name)
                .map(|index| (*scope, index))
        })
    }

    pub(crate) fn variable_mut(&mut self, (scope, index): (ScopeId, usize)) -> &mut Variable {
        &mut self.tree.get_mut(scope).variables[index]
    }

    /// Fields of the innermost visible document struct named `name`.
    pub(crate) fn struct_fields(&self, name: &str) -> Option<&Vec<(String, Type)>> {
        self.stack
            .iter()
            .rev()
            .find_map(|scope| self.structs.get(scope)?.get(name))
    }

    pub(crate) fn is_struct(&self, name: &str) -> bool {
        self.registry.get_struct(name).is_some() || self.struct_fields(name).is_some()
    }

    fn resolve_annotation(&mut self, annotation: TypeAnnotation) -> Type {
        let name = self.text(annotation.name);

        let base = match Type::primitive(name) {
            Some(ty) => ty,
            None if self.is_struct(name) => Type::Struct(name.to_string()),
            None => {
                self.error(annotation.name, format!("unknown type `{name}`"));
                return Type::Unknown;
            }
        };

        Type::list_of(base, annotation.list_depth)
    }

    fn resolve_optional(&mut self, annotation: Option<TypeAnnotation>) -> Type {
        match annotation {
            Some(annotation) => self.resolve_annotation(annotation),
            None => Type::Unknown,
        }
    }

    /// Functions and structs are visible to the whole statement list that defines
    /// them, so they can be used before their definition.
    fn hoist(&mut self, nodes: &[AstNode]) {
        let definitions = nodes
            .iter()
            .filter_map(|node| match node {
                AstNode::Struct(definition) => Some(definition),
                _ => None,
            })
            .collect::<Vec<_>>();

        for definition in definitions.iter() {
            let name = self.text(definition.name);
            let scope = self.current_scope();
            self.structs
                .entry(scope)
                .or_default()
                .insert(name.to_string(), vec![]);
            self.declare(definition.name, VariableKind::Struct, Type::StructName(name.into()));
        }

        for definition in definitions {
            let mut fields = Vec::with_capacity(definition.fields.len());
            for field in definition.fields.iter() {
                let ty = self.resolve_optional(field.ty);
                fields.push((self.text(field.name).to_string(), ty));
            }
            let name = self.text(definition.name);
            let scope = self.current_scope();
            self.structs
                .entry(scope)
                .or_default()
                .insert(name.to_string(), fields);
        }

        for node in nodes {
            let AstNode::Function(function) = node else { continue };

            let mut params = Vec::with_capacity(function.params.len());
            for param in function.params.iter() {
                params.push(self.resolve_optional(param.ty));
            }

            let signature = Signature {
                params: Some(params),
                variadic: false,
                returns: Box::new(self.resolve_optional(function.return_type)),
            };

            self.signatures
                .insert(function.location, signature.clone());
            self.declare(function.name, VariableKind::Function, Type::Function(signature));
        }
    }

    fn analyze_statements(&mut self, nodes: &[AstNode]) {
        self.hoist(nodes);

        let jump = nodes.iter().position(|node| {
            matches!(
                node,
                AstNode::Return(_) | AstNode::Break(_) | AstNode::Continue(_)
            )
        });

        if let Some(jump) = jump
            && let (Some(first), Some(last)) = (nodes.get(jump + 1), nodes.last())
        {
            let location = first.location().merge(last.location());
            self.diagnostics
                .push(Diagnostic::warning(location, "unreachable statement"));
        }

        for node in nodes {
            node.accept(self);
        }
    }

    fn analyze_block(&mut self, block: &Block) {
        self.push_scope(block.location);
        self.analyze_statements(&block.nodes);
        self.pop_scope();
    }

    fn analyze_condition(&mut self, condition: &Expr) {
        let ty = self.analyze_expression(condition);
        if !Type::Bool.accepts(&ty) {
            self.mismatch(condition.location(), &Type::Bool, &ty);
        }
    }

    fn analyze_loop_body(&mut self, nodes: &[AstNode]) {
        self.loops += 1;
        self.analyze_statements(nodes);
        self.loops -= 1;
    }
}

impl<'ast> AstVisitor<'ast> for SemanticAnalyzer<'_> {
    fn visit_declaration(&mut self, decl: &'ast Declaration) {
        let annotated = decl.ty.map(|annotation| self.resolve_annotation(annotation));
        let value = decl
            .value
            .as_ref()
            .map(|value| (value.location(), self.analyze_expression(value)));

        let ty = match (annotated, value) {
            (Some(expected), Some((location, found))) => {
                if !expected.accepts(&found) {
                    self.mismatch(location, &expected, &found);
                }
                expected
            }
            (Some(expected), None) => expected,
            (None, Some((location, Type::Void))) => {
                self.error(location, "expression does not produce a value");
                Type::Unknown
            }
            (None, Some((_, found))) => found,
            (None, None) => Type::Unknown,
        };

        self.declare(decl.name, VariableKind::Local, ty);
    }

    fn visit_function(&mut self, function: &'ast Function) {
        let signature = match self.signatures.get(&function.location) {
            Some(signature) => signature.clone(),
            None => Signature {
                params: None,
                variadic: false,
                returns: Box::new(Type::Unknown),
            },
        };

        self.push_scope(function.location);

        let params = signature.params.unwrap_or_default();
        for (param, ty) in function.params.iter().zip(params) {
            self.declare(param.name, VariableKind::Parameter, ty);
        }

        self.returns.push(*signature.returns);
        let loops = std::mem::take(&mut self.loops);
        self.analyze_statements(&function.body.nodes);
        self.loops = loops;

        self.pop_scope();
        self.returns.pop();
    }

    fn visit_struct(&mut self, definition: &'ast StructDef) {
        let fields = self
            .struct_fields(self.text(definition.name))
            .cloned()
            .unwrap_or_default();

        self.push_scope(definition.body);
        for (field, (_, ty)) in definition.fields.iter().zip(fields) {
            self.declare(field.name, VariableKind::Field, ty);
        }
        self.pop_scope();
    }

    fn visit_if(&mut self, if_node: &'ast If) {
        self.analyze_condition(&if_node.condition);
        self.analyze_block(&if_node.then);

        match &if_node.otherwise {
            Some(Else::Block(block)) => self.analyze_block(block),
            Some(Else::If(else_if)) => self.visit_if(else_if),
            None => {}
        }
    }

    fn visit_while(&mut self, while_loop: &'ast While) {
        self.analyze_condition(&while_loop.condition);

        self.push_scope(while_loop.body.location);
        self.analyze_loop_body(&while_loop.body.nodes);
        self.pop_scope();
    }

    fn visit_for(&mut self, for_loop: &'ast For) {
        let iterable = self.analyze_expression(&for_loop.iterable);
        let item = match iterable {
            Type::List(item) => *item,
            Type::String => Type::String,
            Type::Unknown => Type::Unknown,
            other => {
                self.error(
                    for_loop.iterable.location(),
                    format!("`{other}` is not iterable"),
                );
                Type::Unknown
            }
        };

        self.push_scope(for_loop.location);
        self.declare(for_loop.binding, VariableKind::LoopBinding, item);
        self.analyze_loop_body(&for_loop.body.nodes);
        self.pop_scope();
    }

    fn visit_return(&mut self, ret: &'ast Return) {
        let value = ret
            .value
            .as_ref()
            .map(|value| (value.location(), self.analyze_expression(value)));

        let Some(expected) = self.returns.last().cloned() else {
            self.error(ret.keyword, "`return` outside of a function");
            return;
        };

        match value {
            Some((location, found)) if !expected.accepts(&found) => {
                self.mismatch(location, &expected, &found)
            }
            None if !matches!(expected, Type::Void | Type::Unknown) => {
                self.error(ret.location, format!("expected a value of type `{expected}`"))
            }
            _ => {}
        }
    }

    fn visit_break(&mut self, location: Location) {
        if self.loops == 0 {
            self.error(location, "`break` outside of a loop");
        }
    }

    fn visit_continue(&mut self, location: Location) {
        if self.loops == 0 {
            self.error(location, "`continue` outside of a loop");
        }
    }

    fn visit_block(&mut self, block: &'ast Block) {
        self.analyze_block(block);
    }

    fn visit_expr_stmt(&mut self, stmt: &'ast ExprStmt) {
        self.analyze_expression(&stmt.expr);
    }

    // already reported by the parser
    fn visit_error(&mut self, _err: &'ast ErrorNode) {}
}
