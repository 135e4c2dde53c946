use cosmic_core::Location;
use cosmic_token::{Keyword, Operator, Punctuation, Token, TokenKind, Tokens};

use crate::ast::*;
use crate::error::{ParseError, Result};


/// Nesting deeper than this is reported instead of risking the stack.
pub(crate) const MAX_DEPTH: usize = 256;

/// Result of a parse. The AST is always present; when `error` is set it only holds
/// what could be built around the first malformed construct.
#[derive(Debug, PartialEq)]
pub struct Parse {
    pub ast: Ast,
    pub error: Option<ParseError>,
}

impl Parse {
    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    /// For consumers that reject invalid input outright.
    pub fn into_result(self) -> Result<Ast> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.ast),
        }
    }
}

/// Parses `tokens` lexed from `content`.
pub fn parse(tokens: Tokens, content: &str, recover_from_errors: bool) -> Parse {
    Parser::new(tokens, content)
        .recover_from_errors(recover_from_errors)
        .parse()
}

pub struct Parser<'src> {
    pub(crate) tokens: Tokens,
    pub(crate) content: &'src str,
    pub(crate) depth: usize,
    recover: bool,
    error: Option<ParseError>,
    errors_seen: usize,
}

impl<'src> Parser<'src> {
    pub fn new(tokens: Tokens, content: &'src str) -> Self {
        Self {
            tokens,
            content,
            depth: 0,
            recover: false,
            error: None,
            errors_seen: 0,
        }
    }

    /// In recovering mode parsing continues past malformed statements, skipping to
    /// the next statement boundary. Only the first error is ever reported.
    pub fn recover_from_errors(mut self, recover: bool) -> Self {
        self.recover = recover;
        self
    }

    pub fn parse(mut self) -> Parse {
        let nodes = self.parse_statements(false);
        let ast = Ast {
            nodes,
            location: Location::new(0, self.content.len()),
        };

        Parse {
            ast,
            error: self.error,
        }
    }

    pub(crate) fn error_at(&mut self, location: Location, message: impl Into<String>) {
        self.errors_seen += 1;
        if self.error.is_none() {
            self.error = Some(ParseError::new(location, message));
        }
    }

    pub(crate) fn describe(&self, token: Token) -> String {
        match token.kind() {
            TokenKind::Identifier => format!("identifier `{}`", token.lexeme(self.content)),
            kind => kind.to_string(),
        }
    }

    pub(crate) fn expect(&mut self, kind: TokenKind, what: &str) -> Option<Token> {
        if let Some(token) = self.tokens.eat(kind) {
            return Some(token);
        }

        let found = self.tokens.peek();
        let message = format!("expected {what}, found {}", self.describe(found));
        self.error_at(found.location(), message);
        None
    }

    pub(crate) fn expect_punctuation(&mut self, punct: Punctuation) -> Option<Token> {
        self.expect(
            TokenKind::Punctuation(punct),
            &format!("'{}'", punct.as_str()),
        )
    }

    pub(crate) fn expect_identifier(&mut self, what: &str) -> Option<Location> {
        self.expect(TokenKind::Identifier, what)
            .map(|token| token.location())
    }

    pub(crate) fn at_punctuation(&self, punct: Punctuation) -> bool {
        self.tokens.at(TokenKind::Punctuation(punct))
    }

    pub(crate) fn eat_punctuation(&mut self, punct: Punctuation) -> Option<Token> {
        self.tokens.eat(TokenKind::Punctuation(punct))
    }

    /// From `start` up to the end of the last consumed token.
    pub(crate) fn location_from(&self, start: Location) -> Location {
        let end = self.tokens.previous_end().max(start.end_byte);
        Location::new(start.start_byte, end)
    }

    fn should_stop(&self) -> bool {
        !self.recover && self.error.is_some()
    }

    fn parse_statements(&mut self, in_block: bool) -> Vec<AstNode> {
        let mut nodes = vec![];

        loop {
            if self.should_stop() {
                break;
            }

            match self.tokens.peek().kind() {
                TokenKind::Eof => break,
                TokenKind::Punctuation(Punctuation::RCurly) if in_block => break,
                TokenKind::Punctuation(Punctuation::Semicolon) => {
                    self.tokens.consume();
                    continue;
                }
                _ => {}
            }

            let start_index = self.tokens.index;
            let errors_before = self.errors_seen;
            let node = self.parse_statement();

            if self.errors_seen > errors_before {
                if !self.recover {
                    break;
                }
                self.synchronize();
            }

            nodes.push(node);

            if self.tokens.index == start_index {
                self.tokens.consume();
            }
        }

        nodes
    }

    /// Skips ahead to the start of the next statement, unless the failed statement
    /// already ended cleanly on a `;` or `}`.
    fn synchronize(&mut self) {
        let previous = self
            .tokens
            .index
            .checked_sub(1)
            .and_then(|i| self.tokens.inner.get(i))
            .map(|token| token.kind());

        if matches!(
            previous,
            Some(TokenKind::Punctuation(Punctuation::Semicolon | Punctuation::RCurly))
        ) {
            return;
        }

        loop {
            match self.tokens.peek().kind() {
                TokenKind::Eof | TokenKind::Punctuation(Punctuation::RCurly) => break,
                TokenKind::Punctuation(Punctuation::Semicolon) => {
                    self.tokens.consume();
                    break;
                }
                kind if kind.starts_statement() => break,
                _ => self.tokens.consume(),
            }
        }
    }

    fn parse_statement(&mut self) -> AstNode {
        let token = self.tokens.peek();

        if self.depth >= MAX_DEPTH {
            self.error_at(token.location(), "statement nests too deeply");
            return AstNode::Error(ErrorNode {
                token: token.kind(),
                location: token.location(),
            });
        }

        self.depth += 1;
        let node = match token.kind() {
            TokenKind::Keyword(Keyword::Let) => self.parse_declaration(),
            TokenKind::Keyword(Keyword::Fn) => self.parse_function(),
            TokenKind::Keyword(Keyword::Struct) => self.parse_struct(),
            TokenKind::Keyword(Keyword::If) => AstNode::If(self.parse_if()),
            TokenKind::Keyword(Keyword::While) => self.parse_while(),
            TokenKind::Keyword(Keyword::For) => self.parse_for(),
            TokenKind::Keyword(Keyword::Return) => self.parse_return(),
            TokenKind::Keyword(Keyword::Break) => AstNode::Break(self.parse_jump()),
            TokenKind::Keyword(Keyword::Continue) => AstNode::Continue(self.parse_jump()),
            TokenKind::Punctuation(Punctuation::LCurly) => AstNode::Block(self.parse_block()),
            TokenKind::Keyword(Keyword::Else | Keyword::In)
            | TokenKind::Punctuation(Punctuation::RCurly) => {
                self.tokens.consume();
                let message = format!("unexpected {}", self.describe(token));
                self.error_at(token.location(), message);
                AstNode::Error(ErrorNode {
                    token: token.kind(),
                    location: token.location(),
                })
            }
            _ => self.parse_expression_statement(),
        };
        self.depth -= 1;

        node
    }

    fn parse_declaration(&mut self) -> AstNode {
        let keyword = self.tokens.next_token().location();

        let Some(name) = self.expect_identifier("a variable name") else {
            return self.error_node(keyword);
        };

        let ty = match self.eat_punctuation(Punctuation::Colon) {
            Some(_) => self.parse_type(),
            None => None,
        };

        let value = match self.tokens.eat(TokenKind::Operator(Operator::Assign)) {
            Some(_) => Some(self.parse_expression()),
            None => None,
        };

        self.eat_punctuation(Punctuation::Semicolon);

        AstNode::Declaration(Declaration {
            name,
            ty,
            value,
            location: self.location_from(keyword),
            keyword,
        })
    }

    fn parse_function(&mut self) -> AstNode {
        let keyword = self.tokens.next_token().location();

        let Some(name) = self.expect_identifier("a function name") else {
            return self.error_node(keyword);
        };

        let mut params = vec![];
        if self.expect_punctuation(Punctuation::LParen).is_some() {
            while !self.at_punctuation(Punctuation::RParen) && !self.tokens.is_eof() {
                let Some(param) = self.parse_param() else { break };
                params.push(param);

                if self.eat_punctuation(Punctuation::Comma).is_none() {
                    break;
                }
            }
            self.expect_punctuation(Punctuation::RParen);
        }

        let return_type = match self.eat_punctuation(Punctuation::Arrow) {
            Some(_) => self.parse_type(),
            None => None,
        };

        let body = self.parse_block();

        AstNode::Function(Function {
            name,
            params,
            return_type,
            body,
            location: self.location_from(keyword),
            keyword,
        })
    }

    fn parse_param(&mut self) -> Option<Param> {
        let name = self.expect_identifier("a parameter name")?;
        let ty = match self.eat_punctuation(Punctuation::Colon) {
            Some(_) => self.parse_type(),
            None => None,
        };

        Some(Param {
            name,
            ty,
            location: self.location_from(name),
        })
    }

    fn parse_struct(&mut self) -> AstNode {
        let keyword = self.tokens.next_token().location();

        let Some(name) = self.expect_identifier("a struct name") else {
            return self.error_node(keyword);
        };

        let Some(open) = self.expect_punctuation(Punctuation::LCurly) else {
            return AstNode::Struct(StructDef {
                name,
                fields: vec![],
                body: Location::at(name.end_byte),
                location: self.location_from(keyword),
                keyword,
            });
        };

        let mut fields = vec![];
        while !self.at_punctuation(Punctuation::RCurly) && !self.tokens.is_eof() {
            let Some(field_name) = self.expect_identifier("a field name") else { break };

            let ty = match self.expect_punctuation(Punctuation::Colon) {
                Some(_) => self.parse_type(),
                None => None,
            };

            fields.push(Field {
                name: field_name,
                ty,
                location: self.location_from(field_name),
            });

            if self.eat_punctuation(Punctuation::Comma).is_none()
                && !self.at_punctuation(Punctuation::RCurly)
                && !self.tokens.at(TokenKind::Identifier)
            {
                break;
            }
        }

        self.close_brace();

        AstNode::Struct(StructDef {
            name,
            fields,
            body: self.location_from(open.location()),
            location: self.location_from(keyword),
            keyword,
        })
    }

    fn parse_if(&mut self) -> If {
        let keyword = self.tokens.next_token().location();
        let condition = self.parse_expression();
        let then = self.parse_block();

        let otherwise = match self.tokens.eat(TokenKind::Keyword(Keyword::Else)) {
            None => None,
            Some(_) if self.tokens.at(TokenKind::Keyword(Keyword::If)) => {
                if self.depth >= MAX_DEPTH {
                    let token = self.tokens.peek();
                    self.error_at(token.location(), "statement nests too deeply");
                    None
                } else {
                    self.depth += 1;
                    let else_if = self.parse_if();
                    self.depth -= 1;
                    Some(Else::If(Box::new(else_if)))
                }
            }
            Some(_) => Some(Else::Block(self.parse_block())),
        };

        If {
            condition,
            then,
            otherwise,
            location: self.location_from(keyword),
            keyword,
        }
    }

    fn parse_while(&mut self) -> AstNode {
        let keyword = self.tokens.next_token().location();
        let condition = self.parse_expression();
        let body = self.parse_block();

        AstNode::While(While {
            condition,
            body,
            location: self.location_from(keyword),
            keyword,
        })
    }

    fn parse_for(&mut self) -> AstNode {
        let keyword = self.tokens.next_token().location();

        let Some(binding) = self.expect_identifier("a loop variable") else {
            return self.error_node(keyword);
        };

        self.expect(TokenKind::Keyword(Keyword::In), "'in'");
        let iterable = self.parse_expression();
        let body = self.parse_block();

        AstNode::For(For {
            binding,
            iterable,
            body,
            location: self.location_from(keyword),
            keyword,
        })
    }

    fn parse_return(&mut self) -> AstNode {
        let keyword = self.tokens.next_token().location();

        let ends_here = match self.tokens.peek().kind() {
            TokenKind::Eof
            | TokenKind::Punctuation(Punctuation::Semicolon | Punctuation::RCurly) => true,
            kind => kind.starts_statement(),
        };

        let value = match ends_here {
            true => None,
            false => Some(self.parse_expression()),
        };

        self.eat_punctuation(Punctuation::Semicolon);

        AstNode::Return(Return {
            value,
            location: self.location_from(keyword),
            keyword,
        })
    }

    fn parse_jump(&mut self) -> Location {
        let keyword = self.tokens.next_token().location();
        self.eat_punctuation(Punctuation::Semicolon);
        keyword
    }

    fn parse_expression_statement(&mut self) -> AstNode {
        let expr = self.parse_expression();

        if !expr.has_error() && !expr.is_statement() {
            self.error_at(
                expr.location(),
                "expected a statement, found an expression; only assignments and calls can stand alone",
            );
        }

        self.eat_punctuation(Punctuation::Semicolon);

        AstNode::Expr(ExprStmt {
            location: self.location_from(expr.location()),
            expr,
        })
    }

    pub(crate) fn parse_block(&mut self) -> Block {
        let Some(open) = self.expect_punctuation(Punctuation::LCurly) else {
            return Block {
                nodes: vec![],
                location: Location::at(self.tokens.previous_end()),
            };
        };

        let nodes = self.parse_statements(true);
        let end = self.close_brace();

        Block {
            nodes,
            location: Location::new(open.location().start_byte, end),
        }
    }

    /// Consumes the closing brace. A block left open at the end of the input is
    /// stretched to cover the rest of the document.
    fn close_brace(&mut self) -> usize {
        match self.expect_punctuation(Punctuation::RCurly) {
            Some(close) => close.location().end_byte,
            None if self.tokens.is_eof() => self.tokens.eof,
            None => self.tokens.previous_end(),
        }
    }

    fn parse_type(&mut self) -> Option<TypeAnnotation> {
        let name = self.expect_identifier("a type name")?;
        let mut list_depth = 0;

        while self.at_punctuation(Punctuation::LBracket)
            && self.tokens.peek_nth(1).kind() == TokenKind::Punctuation(Punctuation::RBracket)
        {
            self.tokens.consume();
            self.tokens.consume();
            list_depth += 1;
        }

        Some(TypeAnnotation {
            name,
            list_depth,
            location: self.location_from(name),
        })
    }

    fn error_node(&self, start: Location) -> AstNode {
        let token = self.tokens.peek();
        AstNode::Error(ErrorNode {
            token: token.kind(),
            location: self.location_from(start),
        })
    }
}
