use cosmic_core::Location;
use cosmic_token::{Literal, Operator, TokenKind};
use serde::Serialize;

/// Statement-level visitor. Every method defaults to a no-op, so implementors only
/// override what they inspect and drive recursion themselves.
pub trait AstVisitor<'ast> {
    fn visit_declaration(&mut self, _decl: &'ast Declaration) {}
    fn visit_function(&mut self, _function: &'ast Function) {}
    fn visit_struct(&mut self, _definition: &'ast StructDef) {}
    fn visit_if(&mut self, _if_node: &'ast If) {}
    fn visit_while(&mut self, _while_loop: &'ast While) {}
    fn visit_for(&mut self, _for_loop: &'ast For) {}
    fn visit_return(&mut self, _ret: &'ast Return) {}
    fn visit_break(&mut self, _location: Location) {}
    fn visit_continue(&mut self, _location: Location) {}
    fn visit_block(&mut self, _block: &'ast Block) {}
    fn visit_expr_stmt(&mut self, _stmt: &'ast ExprStmt) {}
    fn visit_error(&mut self, _err: &'ast ErrorNode) {}
}

/// The program node. Its location always spans the whole source text.
#[derive(Debug, Default, Serialize, PartialEq)]
pub struct Ast {
    pub nodes: Vec<AstNode>,
    pub location: Location,
}

impl Ast {
    pub fn accept<'ast, V>(&'ast self, visitor: &mut V)
    where
        V: AstVisitor<'ast>,
    {
        for node in self.nodes.iter() {
            node.accept(visitor);
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub enum AstNode {
    Declaration(Declaration),
    Function(Function),
    Struct(StructDef),
    If(If),
    While(While),
    For(For),
    Return(Return),
    Break(Location),
    Continue(Location),
    Block(Block),
    Expr(ExprStmt),
    Error(ErrorNode),
}

impl AstNode {
    pub fn accept<'ast, V>(&'ast self, visitor: &mut V)
    where
        V: AstVisitor<'ast>,
    {
        match self {
            AstNode::Declaration(decl) => visitor.visit_declaration(decl),
            AstNode::Function(function) => visitor.visit_function(function),
            AstNode::Struct(definition) => visitor.visit_struct(definition),
            AstNode::If(if_node) => visitor.visit_if(if_node),
            AstNode::While(while_loop) => visitor.visit_while(while_loop),
            AstNode::For(for_loop) => visitor.visit_for(for_loop),
            AstNode::Return(ret) => visitor.visit_return(ret),
            AstNode::Break(location) => visitor.visit_break(*location),
            AstNode::Continue(location) => visitor.visit_continue(*location),
            AstNode::Block(block) => visitor.visit_block(block),
            AstNode::Expr(stmt) => visitor.visit_expr_stmt(stmt),
            AstNode::Error(error) => visitor.visit_error(error),
        }
    }

    pub fn location(&self) -> Location {
        match self {
            AstNode::Declaration(decl) => decl.location,
            AstNode::Function(function) => function.location,
            AstNode::Struct(definition) => definition.location,
            AstNode::If(if_node) => if_node.location,
            AstNode::While(while_loop) => while_loop.location,
            AstNode::For(for_loop) => for_loop.location,
            AstNode::Return(ret) => ret.location,
            AstNode::Break(location) => *location,
            AstNode::Continue(location) => *location,
            AstNode::Block(block) => block.location,
            AstNode::Expr(stmt) => stmt.location,
            AstNode::Error(error) => error.location,
        }
    }

    pub fn has_error(&self) -> bool {
        match self {
            AstNode::Error(_) => true,
            AstNode::Declaration(decl) => decl.value.as_ref().is_some_and(Expr::has_error),
            AstNode::Function(function) => function.body.has_error(),
            AstNode::Struct(_) => false,
            AstNode::If(if_node) => if_node.has_error(),
            AstNode::While(while_loop) => {
                while_loop.condition.has_error() || while_loop.body.has_error()
            }
            AstNode::For(for_loop) => for_loop.iterable.has_error() || for_loop.body.has_error(),
            AstNode::Return(ret) => ret.value.as_ref().is_some_and(Expr::has_error),
            AstNode::Break(_) | AstNode::Continue(_) => false,
            AstNode::Block(block) => block.has_error(),
            AstNode::Expr(stmt) => stmt.expr.has_error(),
        }
    }
}

/// `name` or `name[]`, where each `[]` wraps the named type in a list.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct TypeAnnotation {
    pub name: Location,
    pub list_depth: usize,
    pub location: Location,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct Declaration {
    pub name: Location,
    pub ty: Option<TypeAnnotation>,
    pub value: Option<Expr>,
    pub location: Location,
    pub keyword: Location,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct Param {
    pub name: Location,
    pub ty: Option<TypeAnnotation>,
    pub location: Location,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct Function {
    pub name: Location,
    pub params: Vec<Param>,
    pub return_type: Option<TypeAnnotation>,
    pub body: Block,
    pub location: Location,
    pub keyword: Location,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct Field {
    pub name: Location,
    pub ty: Option<TypeAnnotation>,
    pub location: Location,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct StructDef {
    pub name: Location,
    pub fields: Vec<Field>,
    /// The braces enclosing the fields.
    pub body: Location,
    pub location: Location,
    pub keyword: Location,
}

#[derive(Debug, Default, Serialize, PartialEq)]
pub struct Block {
    pub nodes: Vec<AstNode>,
    pub location: Location,
}

impl Block {
    pub fn has_error(&self) -> bool {
        self.nodes.iter().any(AstNode::has_error)
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct If {
    pub condition: Expr,
    pub then: Block,
    pub otherwise: Option<Else>,
    pub location: Location,
    pub keyword: Location,
}

impl If {
    pub fn has_error(&self) -> bool {
        self.condition.has_error()
            || self.then.has_error()
            || match &self.otherwise {
                Some(Else::Block(block)) => block.has_error(),
                Some(Else::If(if_node)) => if_node.has_error(),
                None => false,
            }
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub enum Else {
    Block(Block),
    If(Box<If>),
}

#[derive(Debug, Serialize, PartialEq)]
pub struct While {
    pub condition: Expr,
    pub body: Block,
    pub location: Location,
    pub keyword: Location,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct For {
    pub binding: Location,
    pub iterable: Expr,
    pub body: Block,
    pub location: Location,
    pub keyword: Location,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct Return {
    pub value: Option<Expr>,
    pub location: Location,
    pub keyword: Location,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct ExprStmt {
    pub expr: Expr,
    pub location: Location,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct ErrorNode {
    pub token: TokenKind,
    pub location: Location,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct Unary {
    pub op: Operator,
    pub expr: Box<Expr>,
    pub location: Location,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct Binary {
    pub lhs: Box<Expr>,
    pub rhs: Box<Expr>,
    pub op: Operator,
    pub location: Location,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct Assign {
    pub target: Box<Expr>,
    pub op: Operator,
    pub value: Box<Expr>,
    pub location: Location,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct Call {
    pub fun: Box<Expr>,
    pub args: Vec<Expr>,
    pub location: Location,
}

impl Call {
    pub fn has_error(&self) -> bool {
        self.fun.has_error() || self.args.iter().any(|arg| arg.has_error())
    }
}

/// `object.member`. While the user is still typing, `member` is missing and the
/// node ends at the dot.
#[derive(Debug, Serialize, PartialEq)]
pub struct MemberAccess {
    pub object: Box<Expr>,
    pub member: Option<Location>,
    pub dot: Location,
    pub location: Location,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct PrimitiveExpr {
    pub value: Literal,
    pub location: Location,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct ArrayIndex {
    pub lhs: Box<Expr>,
    pub index: Box<Expr>,
    pub location: Location,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct List {
    pub items: Vec<Expr>,
    pub location: Location,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct ErrorExpr {
    pub token: TokenKind,
    pub location: Location,
}

#[derive(Debug, Serialize, PartialEq)]
pub enum Expr {
    Unary(Unary),
    Binary(Binary),
    Assign(Assign),
    Ident(Location),
    String(Location),
    Call(Call),
    Member(MemberAccess),
    Primitive(PrimitiveExpr),
    ArrayIndex(ArrayIndex),
    List(List),
    Error(ErrorExpr),
}

impl Expr {
    pub fn location(&self) -> Location {
        match self {
            Expr::Unary(unary) => unary.location,
            Expr::Binary(binary) => binary.location,
            Expr::Assign(assign) => assign.location,
            Expr::Ident(location) => *location,
            Expr::String(location) => *location,
            Expr::Primitive(primitive) => primitive.location,
            Expr::Member(member) => member.location,
            Expr::ArrayIndex(array_index) => array_index.location,
            Expr::List(list) => list.location,
            Expr::Error(error) => error.location,
            Expr::Call(call) => call.location,
        }
    }

    pub fn has_error(&self) -> bool {
        match self {
            Expr::Error(_) => true,
            Expr::Ident(_) => false,
            Expr::Unary(unary) => unary.expr.has_error(),
            Expr::Binary(binary) => binary.lhs.has_error() || binary.rhs.has_error(),
            Expr::Assign(assign) => assign.target.has_error() || assign.value.has_error(),
            Expr::String(_) => false,
            Expr::Call(call) => call.has_error(),
            Expr::Member(member) => member.member.is_none() || member.object.has_error(),
            Expr::Primitive(_) => false,
            Expr::ArrayIndex(index) => index.lhs.has_error() || index.index.has_error(),
            Expr::List(list) => list.items.iter().any(|item| item.has_error()),
        }
    }

    /// Whether the expression is allowed to stand alone as a statement.
    pub fn is_statement(&self) -> bool {
        matches!(self, Expr::Assign(_) | Expr::Call(_))
    }
}
