use std::iter::Peekable;
use std::str::CharIndices;

use crate::error::{LexErrorKind, LexicalError, Result};
use crate::token::{IntoToken, Keyword, Literal, Operator, Punctuation, Token, TokenKind, Tokens};

/// Scans the whole source, failing on the first unscannable region.
pub fn tokenize(content: &str) -> Result<Tokens> {
    let tokens = Lexer::new(content).collect::<Result<Vec<_>>>()?;
    Ok(Tokens::new(tokens, content.len()))
}

pub struct Lexer<'lex> {
    chars: Peekable<CharIndices<'lex>>,
    content: &'lex str,
    failed: bool,
}

impl<'lex> Lexer<'lex> {
    pub fn new(content: &'lex str) -> Self {
        Self {
            chars: content.char_indices().peekable(),
            content,
            failed: false,
        }
    }

    fn next_token(&mut self) -> Result<Token> {
        self.skip_trivia()?;

        let (index, curr) = match self.chars.next() {
            None => return Ok(self.eof()),
            Some(curr) => curr,
        };

        let next = self.chars.peek().map(|(_, c)| *c);

        let token = match (curr, next) {
            ('&', Some('&')) => self.double(Operator::And, index),
            ('|', Some('|')) => self.double(Operator::Or, index),
            ('=', Some('=')) => self.double(Operator::EqualEqual, index),
            ('!', Some('=')) => self.double(Operator::NotEqual, index),
            ('>', Some('=')) => self.double(Operator::GreaterThanOrEqual, index),
            ('<', Some('=')) => self.double(Operator::LessThanOrEqual, index),
            ('+', Some('=')) => self.double(Operator::PlusAssign, index),
            ('-', Some('=')) => self.double(Operator::MinusAssign, index),
            ('*', Some('=')) => self.double(Operator::MulAssign, index),
            ('/', Some('=')) => self.double(Operator::DivAssign, index),
            ('-', Some('>')) => {
                let _ = self.chars.next();
                Punctuation::Arrow.into_token(index, index + 2)
            }

            ('(', _) => Punctuation::LParen.into_token(index, index + 1),
            (')', _) => Punctuation::RParen.into_token(index, index + 1),
            ('[', _) => Punctuation::LBracket.into_token(index, index + 1),
            (']', _) => Punctuation::RBracket.into_token(index, index + 1),
            ('{', _) => Punctuation::LCurly.into_token(index, index + 1),
            ('}', _) => Punctuation::RCurly.into_token(index, index + 1),
            (',', _) => Punctuation::Comma.into_token(index, index + 1),
            (':', _) => Punctuation::Colon.into_token(index, index + 1),
            (';', _) => Punctuation::Semicolon.into_token(index, index + 1),
            ('.', _) => Punctuation::Dot.into_token(index, index + 1),
            ('!', _) => Operator::Not.into_token(index, index + 1),
            ('+', _) => Operator::Plus.into_token(index, index + 1),
            ('-', _) => Operator::Minus.into_token(index, index + 1),
            ('*', _) => Operator::Mul.into_token(index, index + 1),
            ('/', _) => Operator::Div.into_token(index, index + 1),
            ('%', _) => Operator::Mod.into_token(index, index + 1),
            ('>', _) => Operator::GreaterThan.into_token(index, index + 1),
            ('<', _) => Operator::LessThan.into_token(index, index + 1),
            ('=', _) => Operator::Assign.into_token(index, index + 1),

            ('0'..='9', _) => self.lex_number(index)?,
            ('"' | '\'', _) => self.lex_string(curr, index)?,
            _ if is_identifier_start(curr) => self.lex_identifier(curr, index),
            _ => {
                let location = (index, index + curr.len_utf8());
                return Err(LexicalError::new(LexErrorKind::UnexpectedCharacter(curr), location));
            }
        };

        Ok(token)
    }

    fn eof(&self) -> Token {
        TokenKind::Eof.into_token(self.content.len(), self.content.len())
    }

    fn double(&mut self, op: Operator, index: usize) -> Token {
        let _ = self.chars.next();
        op.into_token(index, index + 2)
    }

    fn skip_trivia(&mut self) -> Result<()> {
        loop {
            let Some(&(index, curr)) = self.chars.peek() else { return Ok(()) };

            if curr.is_whitespace() {
                self.chars.next();
                continue;
            }

            if curr != '/' {
                return Ok(());
            }

            let mut ahead = self.chars.clone();
            ahead.next();
            match ahead.peek().map(|(_, c)| *c) {
                Some('/') => {
                    while let Some((_, c)) = self.chars.peek() {
                        if *c == '\n' {
                            break;
                        }
                        self.chars.next();
                    }
                }
                Some('*') => self.skip_block_comment(index)?,
                _ => return Ok(()),
            }
        }
    }

    fn skip_block_comment(&mut self, start_byte: usize) -> Result<()> {
        // consume the opening `/*`
        self.chars.next();
        self.chars.next();

        loop {
            match self.chars.next() {
                Some((_, '*')) if matches!(self.chars.peek(), Some((_, '/'))) => {
                    self.chars.next();
                    return Ok(());
                }
                Some(_) => {}
                None => {
                    let location = (start_byte, self.content.len());
                    return Err(LexicalError::new(LexErrorKind::UnterminatedComment, location));
                }
            }
        }
    }

    fn lex_identifier(&mut self, first: char, start_byte: usize) -> Token {
        let end_byte = self.take_while(start_byte + first.len_utf8(), is_identifier_continue);
        let str = &self.content[start_byte..end_byte];

        let kind = match str {
            "let" => TokenKind::Keyword(Keyword::Let),
            "fn" => TokenKind::Keyword(Keyword::Fn),
            "struct" => TokenKind::Keyword(Keyword::Struct),
            "if" => TokenKind::Keyword(Keyword::If),
            "else" => TokenKind::Keyword(Keyword::Else),
            "while" => TokenKind::Keyword(Keyword::While),
            "for" => TokenKind::Keyword(Keyword::For),
            "in" => TokenKind::Keyword(Keyword::In),
            "return" => TokenKind::Keyword(Keyword::Return),
            "break" => TokenKind::Keyword(Keyword::Break),
            "continue" => TokenKind::Keyword(Keyword::Continue),
            "true" => TokenKind::Literal(Literal::Bool(true)),
            "false" => TokenKind::Literal(Literal::Bool(false)),
            "null" => TokenKind::Literal(Literal::Null),
            _ => TokenKind::Identifier,
        };

        kind.into_token(start_byte, end_byte)
    }

    fn lex_number(&mut self, start_byte: usize) -> Result<Token> {
        let mut end_byte = self.take_while(start_byte + 1, |c| c.is_ascii_digit());
        let mut is_float = false;

        // a dot only starts a fraction when a digit follows it, `1.abs()` stays a member access
        if self.dot_before_digit() {
            self.chars.next();
            end_byte = self.take_while(end_byte + 1, |c| c.is_ascii_digit());
            is_float = true;
        }

        // `1.2.3` and `12abc` are rejected as a whole rather than split into pieces
        let malformed = self.dot_before_digit()
            || matches!(self.chars.peek(), Some((_, c)) if is_identifier_continue(*c));
        if malformed {
            let end_byte = self.take_while(end_byte, |c| is_identifier_continue(c) || c == '.');
            return Err(LexicalError::new(
                LexErrorKind::InvalidNumber,
                (start_byte, end_byte),
            ));
        }

        let literal = &self.content[start_byte..end_byte];
        let kind = match is_float {
            true => literal
                .parse()
                .map(Literal::Float)
                .map_err(|_| LexicalError::new(LexErrorKind::InvalidNumber, (start_byte, end_byte)))?,
            false => literal
                .parse()
                .map(Literal::Int)
                .map_err(|_| LexicalError::new(LexErrorKind::IntegerOverflow, (start_byte, end_byte)))?,
        };

        Ok(kind.into_token(start_byte, end_byte))
    }

    fn lex_string(&mut self, delimiter: char, start_byte: usize) -> Result<Token> {
        loop {
            match self.chars.next() {
                Some((end_byte, next)) if next == delimiter => {
                    // include the closing delimiter in the token
                    break Ok(Literal::String.into_token(start_byte, end_byte + 1));
                }
                Some((_, '\\')) => {
                    // an escape swallows whatever follows it, including the delimiter
                    if self.chars.next().is_none() {
                        break Err(self.unterminated_string(start_byte));
                    }
                }
                None => break Err(self.unterminated_string(start_byte)),
                _ => {}
            }
        }
    }

    fn unterminated_string(&self, start_byte: usize) -> LexicalError {
        LexicalError::new(
            LexErrorKind::UnterminatedString,
            (start_byte, self.content.len()),
        )
    }

    fn dot_before_digit(&self) -> bool {
        let mut ahead = self.chars.clone();
        matches!(ahead.next(), Some((_, '.'))) && matches!(ahead.peek(), Some((_, '0'..='9')))
    }

    /// Extends a run whose consumed part ends at `end_byte` while `pred` holds.
    fn take_while(&mut self, mut end_byte: usize, pred: impl Fn(char) -> bool) -> usize {
        while let Some(&(index, c)) = self.chars.peek() {
            if !pred(c) {
                break;
            }
            end_byte = index + c.len_utf8();
            self.chars.next();
        }

        end_byte
    }
}

fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_identifier_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

impl Iterator for Lexer<'_> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        match self.next_token() {
            Ok(Token(TokenKind::Eof, _)) => None,
            Err(error) => {
                self.failed = true;
                Some(Err(error))
            }
            token => Some(token),
        }
    }
}

#[cfg(test)]
mod tests {
    use cosmic_core::Location;

    use super::*;

    fn kinds(content: &str) -> Vec<TokenKind> {
        tokenize(content)
            .expect("valid source")
            .inner
            .iter()
            .map(|t| t.kind())
            .collect()
    }

    #[test]
    fn test_declaration_tokens() {
        insta::assert_yaml_snapshot!(kinds("let total = 1.5;"), @r###"
        - Keyword: Let
        - Identifier
        - Operator: Assign
        - Literal:
            Float: 1.5
        - Punctuation: Semicolon
        "###);
    }

    #[test]
    fn test_lexemes_and_locations() {
        let content = "fn add(a, b) -> int { return a + b; }";
        let tokens = tokenize(content).unwrap();
        let lexemes = tokens
            .inner
            .iter()
            .map(|t| t.lexeme(content))
            .collect::<Vec<_>>();

        assert_eq!(
            lexemes,
            vec![
                "fn", "add", "(", "a", ",", "b", ")", "->", "int", "{", "return", "a", "+", "b",
                ";", "}"
            ]
        );
        assert_eq!(tokens.inner[1].location(), Location::new(3, 6));
        assert_eq!(tokens.eof, content.len());
    }

    #[test]
    fn test_comments_are_skipped() {
        let content = "let a = 1; // trailing\n/* block\n comment */ let b = 2;";
        let tokens = tokenize(content).unwrap();
        assert_eq!(tokens.len(), 10);
        assert_eq!(tokens.inner[5].lexeme(content), "let");
        assert_eq!(tokens.inner[5].location().start_byte, 44);
    }

    #[test]
    fn test_comment_does_not_swallow_adjacent_token() {
        let content = "a/*x*/b";
        let tokens = tokenize(content).unwrap();
        assert_eq!(tokens.inner[0].location(), Location::new(0, 1));
        assert_eq!(tokens.inner[1].location(), Location::new(6, 7));
    }

    #[test]
    fn test_compound_operators() {
        assert_eq!(
            kinds("a += 1 -= <= >= == != && || ->"),
            vec![
                TokenKind::Identifier,
                TokenKind::Operator(Operator::PlusAssign),
                TokenKind::Literal(Literal::Int(1)),
                TokenKind::Operator(Operator::MinusAssign),
                TokenKind::Operator(Operator::LessThanOrEqual),
                TokenKind::Operator(Operator::GreaterThanOrEqual),
                TokenKind::Operator(Operator::EqualEqual),
                TokenKind::Operator(Operator::NotEqual),
                TokenKind::Operator(Operator::And),
                TokenKind::Operator(Operator::Or),
                TokenKind::Punctuation(Punctuation::Arrow),
            ]
        );
    }

    #[test]
    fn test_number_followed_by_member_access() {
        assert_eq!(
            kinds("1.abs"),
            vec![
                TokenKind::Literal(Literal::Int(1)),
                TokenKind::Punctuation(Punctuation::Dot),
                TokenKind::Identifier,
            ]
        );
    }

    #[test]
    fn test_keywords_and_literals() {
        assert_eq!(
            kinds("while true null elsewhere"),
            vec![
                TokenKind::Keyword(Keyword::While),
                TokenKind::Literal(Literal::Bool(true)),
                TokenKind::Literal(Literal::Null),
                TokenKind::Identifier,
            ]
        );
    }

    #[test]
    fn test_string_with_escapes() {
        let content = r#"let s = "say \"hi\"";"#;
        let tokens = tokenize(content).unwrap();
        assert_eq!(tokens.inner[3].lexeme(content), r#""say \"hi\"""#);
    }

    #[test]
    fn test_unterminated_string() {
        let content = "let s = \"never closed\nlet t = 1;";
        let error = tokenize(content).unwrap_err();
        assert_eq!(error.kind, LexErrorKind::UnterminatedString);
        assert_eq!(error.location, Location::new(8, content.len()));
        assert_eq!(error.message(), "unterminated string literal");
    }

    #[test]
    fn test_unterminated_block_comment() {
        let error = tokenize("let a = 1; /* oops").unwrap_err();
        assert_eq!(error.kind, LexErrorKind::UnterminatedComment);
        assert_eq!(error.location, Location::new(11, 18));
    }

    #[test]
    fn test_invalid_numbers() {
        let error = tokenize("let a = 12abc;").unwrap_err();
        assert_eq!(error.kind, LexErrorKind::InvalidNumber);
        assert_eq!(error.location, Location::new(8, 13));

        let error = tokenize("1.2.3").unwrap_err();
        assert_eq!(error.kind, LexErrorKind::InvalidNumber);
        assert_eq!(error.location, Location::new(0, 5));

        let error = tokenize("99999999999999999999").unwrap_err();
        assert_eq!(error.kind, LexErrorKind::IntegerOverflow);
    }

    #[test]
    fn test_unexpected_character() {
        let error = tokenize("let a = 1 # 2").unwrap_err();
        assert_eq!(error.kind, LexErrorKind::UnexpectedCharacter('#'));
        assert_eq!(error.location, Location::new(10, 11));
    }

    #[test]
    fn test_lexer_stops_after_first_error() {
        let results = Lexer::new("a # b").collect::<Vec<_>>();
        assert_eq!(results.len(), 2);
        assert!(results[1].is_err());
    }

    #[test]
    fn test_error_span_stays_within_source() {
        for content in ["\"", "/*", "@", "1x", "'abc\\"] {
            let error = tokenize(content).unwrap_err();
            assert!(error.location.end_byte <= content.len(), "{content}");
            assert!(error.location.start_byte <= error.location.end_byte);
        }
    }

    #[test]
    fn test_empty_source() {
        let tokens = tokenize("  \n\t // nothing").unwrap();
        assert!(tokens.is_empty());
        assert_eq!(tokens.peek().kind(), TokenKind::Eof);
    }

    #[test]
    fn test_is_deterministic() {
        let content = "struct P { x: int } let p = P(1); p.x = 2;";
        assert_eq!(tokenize(content), tokenize(content));
    }
}
