use std::rc::Rc;

use lazy_static::lazy_static;
use num_bigint::BigUint;
use num_traits::One;

use super::{
    error::ScannerError,
    location::{Source, Span},
    token::{Token, TokenWithSpan},
};

lazy_static! {
    static ref WORD_MODULUS: BigUint = BigUint::one() << 256u32;
}

pub struct Scanner {
    source: Rc<Source>,
    chars: Vec<char>,
    /// Character offset of the next unconsumed character.
    pos: usize,
}

impl Scanner {
    pub fn new(source: Rc<Source>) -> Self {
        Scanner {
            chars: source.content.chars().collect(),
            source,
            pos: 0,
        }
    }

    fn cur(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos + 1).copied()
    }

    fn bump(&mut self) {
        self.pos += 1;
    }

    fn span_from(&self, start: usize) -> Span {
        Span::new(self.source.clone(), start, self.pos)
    }

    fn is_identifier_start(c: char) -> bool {
        c.is_ascii_alphabetic() || c == '_' || c == '$'
    }

    fn is_identifier_continue(c: char) -> bool {
        c.is_ascii_alphanumeric() || c == '_' || c == '$' || c == '.'
    }

    /// Skips whitespace and comments. Fails on an unterminated block
    /// comment.
    fn skip_trivia(&mut self) -> Result<(), ScannerError> {
        loop {
            match self.cur() {
                Some(c) if c.is_whitespace() => self.bump(),
                Some('/') if self.peek() == Some('/') => {
                    while !matches!(self.cur(), None | Some('\n')) {
                        self.bump();
                    }
                }
                Some('/') if self.peek() == Some('*') => {
                    let start = self.pos;
                    self.bump();
                    self.bump();
                    loop {
                        match (self.cur(), self.peek()) {
                            (Some('*'), Some('/')) => {
                                self.bump();
                                self.bump();
                                break;
                            }
                            (None, _) => {
                                return Err(ScannerError::UnterminatedBlockComment(
                                    self.span_from(start),
                                ))
                            }
                            _ => self.bump(),
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn next_identifier_or_keyword(&mut self) -> Token {
        let mut name = String::new();
        while let Some(c) = self.cur() {
            if !Self::is_identifier_continue(c) {
                break;
            }
            name.push(c);
            self.bump();
        }
        Token::keyword(&name).unwrap_or(Token::Identifier(name))
    }

    fn next_number(&mut self) -> Result<Token, ScannerError> {
        let start = self.pos;
        let mut digits = String::new();
        let hex = self.cur() == Some('0') && matches!(self.peek(), Some('x') | Some('X'));
        if hex {
            self.bump();
            self.bump();
            while let Some(c) = self.cur() {
                if !c.is_ascii_hexdigit() {
                    break;
                }
                digits.push(c);
                self.bump();
            }
            if digits.is_empty() {
                return Err(ScannerError::EmptyHexLiteral(self.span_from(start)));
            }
        } else {
            while let Some(c) = self.cur() {
                if !c.is_ascii_digit() {
                    break;
                }
                digits.push(c);
                self.bump();
            }
        }
        let radix = if hex { 16 } else { 10 };
        let value = BigUint::parse_bytes(digits.as_bytes(), radix)
            .expect("digits were validated during scanning");
        if value >= *WORD_MODULUS {
            return Err(ScannerError::NumberTooLarge(self.span_from(start)));
        }
        Ok(Token::Number(value))
    }

    /// Produces the next token. Returns `Token::EndOfFile` indefinitely
    /// once the input is exhausted, so a scanned stream always ends with
    /// the end-of-file sentinel the parser relies on.
    pub fn next(&mut self) -> Result<TokenWithSpan, ScannerError> {
        self.skip_trivia()?;
        let start = self.pos;
        let token = match self.cur() {
            None => Token::EndOfFile,
            Some(c) if Self::is_identifier_start(c) => self.next_identifier_or_keyword(),
            Some(c) if c.is_ascii_digit() => self.next_number()?,
            Some('(') => {
                self.bump();
                Token::OpenParen
            }
            Some(')') => {
                self.bump();
                Token::CloseParen
            }
            Some('{') => {
                self.bump();
                Token::OpenBrace
            }
            Some('}') => {
                self.bump();
                Token::CloseBrace
            }
            Some(',') => {
                self.bump();
                Token::Comma
            }
            Some('-') => {
                self.bump();
                if self.cur() == Some('>') {
                    self.bump();
                    Token::Arrow
                } else {
                    return Err(ScannerError::MalformedArrow(self.span_from(start)));
                }
            }
            Some(':') => {
                self.bump();
                if self.cur() == Some('=') {
                    self.bump();
                    Token::Walrus
                } else {
                    return Err(ScannerError::MalformedWalrus(self.span_from(start)));
                }
            }
            Some(c) => {
                self.bump();
                return Err(ScannerError::UnexpectedChar(c, self.span_from(start)));
            }
        };
        Ok(TokenWithSpan {
            token,
            span: self.span_from(start),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn scan(content: &str) -> Vec<Token> {
        let source = Rc::new(Source {
            filename: "<test>".to_string(),
            content: content.to_string(),
        });
        let mut scanner = Scanner::new(source);
        let mut tokens = Vec::new();
        loop {
            let token = scanner.next().expect("scan error").token;
            if token == Token::EndOfFile {
                return tokens;
            }
            tokens.push(token);
        }
    }

    #[test]
    fn keywords_symbols_and_literals() {
        assert_eq!(
            scan("let x := add(0x10, 2) // trailing\n"),
            vec![
                Token::Let,
                Token::Identifier("x".to_string()),
                Token::Walrus,
                Token::Identifier("add".to_string()),
                Token::OpenParen,
                Token::Number(BigUint::from(16u32)),
                Token::Comma,
                Token::Number(BigUint::from(2u32)),
                Token::CloseParen,
            ]
        );
    }

    #[test]
    fn block_comments_and_arrows() {
        assert_eq!(
            scan("function f() /* nothing */ -> r { leave }"),
            vec![
                Token::Function,
                Token::Identifier("f".to_string()),
                Token::OpenParen,
                Token::CloseParen,
                Token::Arrow,
                Token::Identifier("r".to_string()),
                Token::OpenBrace,
                Token::Leave,
                Token::CloseBrace,
            ]
        );
    }

    #[test]
    fn rejects_overlong_numbers() {
        let source = Rc::new(Source {
            filename: "<test>".to_string(),
            content: format!("{}", BigUint::one() << 256u32),
        });
        let mut scanner = Scanner::new(source);
        assert!(matches!(
            scanner.next(),
            Err(ScannerError::NumberTooLarge(_))
        ));
    }

    #[test]
    fn spans_point_at_the_scanned_text() {
        let source = Rc::new(Source {
            filename: "<test>".to_string(),
            content: "let abc".to_string(),
        });
        let mut scanner = Scanner::new(source);
        let let_token = scanner.next().unwrap();
        assert_eq!((let_token.span.start, let_token.span.end), (0, 3));
        let ident = scanner.next().unwrap();
        assert_eq!((ident.span.start, ident.span.end), (4, 7));
        assert_eq!(ident.span.source.position(ident.span.start), (1, 5));
    }
}
