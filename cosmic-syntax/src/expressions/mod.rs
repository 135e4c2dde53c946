use cosmic_token::{Literal, Operator, Punctuation, TokenKind};

use crate::ast::*;
use crate::parser::{MAX_DEPTH, Parser};


pub mod precedences {
    pub const INITIAL: u8 = 0;
    pub const ASSIGNMENT: u8 = 1;
    pub const OR: u8 = 2;
    pub const AND: u8 = 3;
    pub const EQUALITY: u8 = 4;
    pub const COMPARISON: u8 = 5;
    pub const SUM: u8 = 6;
    pub const PRODUCT: u8 = 7;
    pub const PREFIX: u8 = 8;
    pub const POSTFIX: u8 = 9;
}

fn get_precedence(kind: TokenKind) -> u8 {
    match kind {
        TokenKind::Punctuation(Punctuation::Dot | Punctuation::LBracket | Punctuation::LParen) => {
            precedences::POSTFIX
        }
        TokenKind::Operator(op) => match op {
            Operator::Mul | Operator::Div | Operator::Mod => precedences::PRODUCT,
            Operator::Plus | Operator::Minus => precedences::SUM,
            Operator::GreaterThan
            | Operator::GreaterThanOrEqual
            | Operator::LessThan
            | Operator::LessThanOrEqual => precedences::COMPARISON,
            Operator::EqualEqual | Operator::NotEqual => precedences::EQUALITY,
            Operator::And => precedences::AND,
            Operator::Or => precedences::OR,
            op if op.is_assignment() => precedences::ASSIGNMENT,
            _ => precedences::INITIAL,
        },
        _ => precedences::INITIAL,
    }
}

impl Parser<'_> {
    pub(crate) fn parse_expression(&mut self) -> Expr {
        self.parse_expression_inner(precedences::INITIAL)
    }

    pub(crate) fn parse_expression_inner(&mut self, precedence: u8) -> Expr {
        if self.depth >= MAX_DEPTH {
            let token = self.tokens.peek();
            self.error_at(token.location(), "expression nests too deeply");
            return Expr::Error(ErrorExpr {
                token: token.kind(),
                location: token.location(),
            });
        }

        self.depth += 1;
        let mut lhs = self.parse_prefix();
        // every operator or postfix applied below nests `lhs` one level deeper
        let mut wrapped = 0;

        loop {
            let next = self.tokens.peek();
            let next_precedence = get_precedence(next.kind());

            if next_precedence <= precedence {
                break;
            }

            if self.depth >= MAX_DEPTH {
                self.error_at(next.location(), "expression is too long");
                lhs = Expr::Error(ErrorExpr {
                    token: next.kind(),
                    location: lhs.location().merge(next.location()),
                });
                break;
            }
            self.depth += 1;
            wrapped += 1;

            lhs = match next.kind() {
                TokenKind::Punctuation(Punctuation::LParen) => self.parse_call(lhs),
                TokenKind::Punctuation(Punctuation::LBracket) => self.parse_array_index(lhs),
                TokenKind::Punctuation(Punctuation::Dot) => self.parse_member(lhs),
                TokenKind::Operator(op) if op.is_assignment() => {
                    self.tokens.consume();
                    // right associative, `a = b = c` assigns `b = c` first
                    let value = self.parse_expression_inner(next_precedence - 1);
                    let location = lhs.location().merge(value.location());
                    Expr::Assign(Assign {
                        target: Box::new(lhs),
                        op,
                        value: Box::new(value),
                        location,
                    })
                }
                TokenKind::Operator(op) => {
                    self.tokens.consume();
                    let rhs = self.parse_expression_inner(next_precedence);
                    let location = lhs.location().merge(rhs.location());
                    Expr::Binary(Binary {
                        lhs: Box::new(lhs),
                        rhs: Box::new(rhs),
                        op,
                        location,
                    })
                }
                _ => break,
            };
        }

        self.depth -= 1 + wrapped;
        lhs
    }

    fn parse_prefix(&mut self) -> Expr {
        let token = self.tokens.peek();
        let location = token.location();

        match token.kind() {
            TokenKind::Identifier => {
                self.tokens.consume();
                Expr::Ident(location)
            }
            TokenKind::Literal(Literal::String) => {
                self.tokens.consume();
                Expr::String(location)
            }
            TokenKind::Literal(value) => {
                self.tokens.consume();
                Expr::Primitive(PrimitiveExpr { value, location })
            }
            TokenKind::Punctuation(Punctuation::LParen) => {
                self.tokens.consume();
                let inner = self.parse_expression();
                self.expect_punctuation(Punctuation::RParen);
                inner
            }
            TokenKind::Punctuation(Punctuation::LBracket) => self.parse_list(),
            TokenKind::Operator(op @ (Operator::Minus | Operator::Not)) => {
                self.tokens.consume();
                let expr = self.parse_expression_inner(precedences::PREFIX);
                Expr::Unary(Unary {
                    op,
                    location: location.merge(expr.location()),
                    expr: Box::new(expr),
                })
            }
            kind => {
                // block and statement terminators are left for the statement parser
                let terminator = matches!(
                    kind,
                    TokenKind::Eof
                        | TokenKind::Punctuation(Punctuation::Semicolon | Punctuation::RCurly)
                ) || kind.starts_statement();

                if !terminator {
                    self.tokens.consume();
                }

                let message = format!("expected an expression, found {}", self.describe(token));
                self.error_at(location, message);
                Expr::Error(ErrorExpr {
                    token: kind,
                    location,
                })
            }
        }
    }

    fn parse_list(&mut self) -> Expr {
        let open = self.tokens.next_token().location();
        let items = self.parse_comma_separated(Punctuation::RBracket);

        Expr::List(List {
            items,
            location: self.location_from(open),
        })
    }

    fn parse_call(&mut self, fun: Expr) -> Expr {
        self.tokens.consume();
        let args = self.parse_comma_separated(Punctuation::RParen);

        Expr::Call(Call {
            location: self.location_from(fun.location()),
            fun: Box::new(fun),
            args,
        })
    }

    fn parse_array_index(&mut self, lhs: Expr) -> Expr {
        self.tokens.consume();
        let index = self.parse_expression();
        self.expect_punctuation(Punctuation::RBracket);

        Expr::ArrayIndex(ArrayIndex {
            location: self.location_from(lhs.location()),
            lhs: Box::new(lhs),
            index: Box::new(index),
        })
    }

    fn parse_member(&mut self, object: Expr) -> Expr {
        let dot = self.tokens.next_token().location();
        let member = self.expect_identifier("a member name after '.'");

        Expr::Member(MemberAccess {
            location: self.location_from(object.location()),
            object: Box::new(object),
            member,
            dot,
        })
    }

    /// Items up to and including `close`, which has already been opened.
    fn parse_comma_separated(&mut self, close: Punctuation) -> Vec<Expr> {
        let mut items = vec![];

        while !self.at_punctuation(close) && !self.tokens.is_eof() {
            let item = self.parse_expression();
            let failed = item.has_error();
            items.push(item);

            if self.eat_punctuation(Punctuation::Comma).is_none() || failed {
                break;
            }
        }

        self.expect_punctuation(close);
        items
    }
}
