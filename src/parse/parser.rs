use std::rc::Rc;

use num_bigint::BigUint;

use crate::{
    evm::dialect::Dialect,
    scan::token::{Token, TokenWithSpan},
};

use super::{
    ast::{
        Assignment, Block, Case, Expression, ForLoop, FunctionCall, FunctionDefinition, Ident,
        If, Literal, LiteralKind, Statement, StatementKind, StmtId, Switch, VariableDeclaration,
    },
    error::ParserError,
};

pub struct Parser<'a> {
    /// The unconsumed rest of the token stream. The scanner guarantees the
    /// stream ends with an end-of-file token, which is never consumed, so
    /// the slice is never empty.
    tokens: &'a [TokenWithSpan],
    dialect: &'a Dialect,
    next_id: usize,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [TokenWithSpan], dialect: &'a Dialect) -> Self {
        assert!(
            matches!(
                tokens.last(),
                Some(TokenWithSpan {
                    token: Token::EndOfFile,
                    ..
                })
            ),
            "token stream must end with an end-of-file token"
        );
        Self {
            tokens,
            dialect,
            next_id: 0,
        }
    }

    fn current(&self) -> &'a TokenWithSpan {
        &self.tokens[0]
    }

    /// The token after the current one; saturates at the trailing end of
    /// file.
    fn peek(&self) -> &'a TokenWithSpan {
        self.tokens.get(1).unwrap_or_else(|| self.current())
    }

    fn advance(&mut self) {
        // Keep the end-of-file token so current() stays meaningful.
        if self.tokens.len() > 1 {
            self.tokens = &self.tokens[1..];
        }
    }

    fn unexpected(&self, expected: &'static str) -> ParserError {
        ParserError::UnexpectedToken {
            expected,
            found: self.current().clone(),
        }
    }

    /// Consumes the given token, which must not carry a payload.
    fn expect(&mut self, token: Token, expected: &'static str) -> Result<(), ParserError> {
        if self.current().token == token {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn statement(&mut self, kind: StatementKind) -> Statement {
        let id = StmtId(self.next_id);
        self.next_id += 1;
        Statement { id, kind }
    }

    /// Parses a whole program: a single block followed by end of file.
    pub fn parse_program(&mut self) -> Result<Block, ParserError> {
        let block = self.parse_block()?;
        if self.current().token != Token::EndOfFile {
            return Err(self.unexpected("end of file"));
        }
        Ok(block)
    }

    fn parse_block(&mut self) -> Result<Block, ParserError> {
        self.expect(Token::OpenBrace, "'{'")?;
        let mut statements = Vec::new();
        while self.current().token != Token::CloseBrace {
            if self.current().token == Token::EndOfFile {
                return Err(self.unexpected("'}'"));
            }
            statements.push(self.parse_statement()?);
        }
        self.advance();
        Ok(Block { statements })
    }

    fn parse_statement(&mut self) -> Result<Statement, ParserError> {
        match &self.current().token {
            Token::OpenBrace => {
                let block = self.parse_block()?;
                Ok(self.statement(StatementKind::Block(block)))
            }
            Token::Function => self.parse_function_definition(),
            Token::Let => self.parse_variable_declaration(),
            Token::If => {
                self.advance();
                let condition = self.parse_expression()?;
                let body = self.parse_block()?;
                Ok(self.statement(StatementKind::If(If { condition, body })))
            }
            Token::Switch => self.parse_switch(),
            Token::For => {
                self.advance();
                let pre = self.parse_block()?;
                let condition = self.parse_expression()?;
                let post = self.parse_block()?;
                let body = self.parse_block()?;
                Ok(self.statement(StatementKind::ForLoop(ForLoop {
                    pre,
                    condition,
                    post,
                    body,
                })))
            }
            Token::Break => {
                self.advance();
                Ok(self.statement(StatementKind::Break))
            }
            Token::Continue => {
                self.advance();
                Ok(self.statement(StatementKind::Continue))
            }
            Token::Leave => {
                self.advance();
                Ok(self.statement(StatementKind::Leave))
            }
            Token::Identifier(_) => match &self.peek().token {
                Token::OpenParen => {
                    let call = self.parse_call()?;
                    Ok(self.statement(StatementKind::Expression(Expression::Call(call))))
                }
                Token::Comma | Token::Walrus => self.parse_assignment(),
                _ => Err(ParserError::ExpressionStatementNotACall(
                    self.current().span.clone(),
                )),
            },
            Token::Number(_) | Token::BoolLiteral(_) => Err(
                ParserError::ExpressionStatementNotACall(self.current().span.clone()),
            ),
            _ => Err(self.unexpected("a statement")),
        }
    }

    fn parse_function_definition(&mut self) -> Result<Statement, ParserError> {
        self.expect(Token::Function, "'function'")?;
        let name = self.parse_ident()?;
        if self.dialect.builtin(&name.name).is_some() {
            return Err(ParserError::BuiltinRedefined {
                name: name.name.to_string(),
                span: name.span,
            });
        }
        self.expect(Token::OpenParen, "'('")?;
        let mut parameters = Vec::new();
        if self.current().token != Token::CloseParen {
            parameters = self.parse_ident_list()?;
        }
        self.expect(Token::CloseParen, "')'")?;
        let mut returns = Vec::new();
        if self.current().token == Token::Arrow {
            self.advance();
            returns = self.parse_ident_list()?;
        }
        let body = self.parse_block()?;
        Ok(
            self.statement(StatementKind::FunctionDefinition(FunctionDefinition {
                name,
                parameters,
                returns,
                body,
            })),
        )
    }

    fn parse_variable_declaration(&mut self) -> Result<Statement, ParserError> {
        self.expect(Token::Let, "'let'")?;
        let variables = self.parse_ident_list()?;
        let value = if self.current().token == Token::Walrus {
            self.advance();
            Some(self.parse_expression()?)
        } else {
            None
        };
        Ok(
            self.statement(StatementKind::VariableDeclaration(VariableDeclaration {
                variables,
                value,
            })),
        )
    }

    fn parse_assignment(&mut self) -> Result<Statement, ParserError> {
        let targets = self.parse_ident_list()?;
        self.expect(Token::Walrus, "':='")?;
        let value = self.parse_expression()?;
        Ok(self.statement(StatementKind::Assignment(Assignment { targets, value })))
    }

    fn parse_switch(&mut self) -> Result<Statement, ParserError> {
        let switch_span = self.current().span.clone();
        self.expect(Token::Switch, "'switch'")?;
        let expression = self.parse_expression()?;
        let mut cases = Vec::new();
        let mut seen_default = false;
        loop {
            match &self.current().token {
                Token::Case => {
                    if seen_default {
                        return Err(ParserError::DefaultCaseNotLast(
                            self.current().span.clone(),
                        ));
                    }
                    self.advance();
                    let value = self.parse_literal()?;
                    let body = self.parse_block()?;
                    cases.push(Case {
                        value: Some(value),
                        body,
                    });
                }
                Token::Default => {
                    if seen_default {
                        return Err(ParserError::DefaultCaseNotLast(
                            self.current().span.clone(),
                        ));
                    }
                    seen_default = true;
                    self.advance();
                    let body = self.parse_block()?;
                    cases.push(Case { value: None, body });
                }
                _ => break,
            }
        }
        if cases.is_empty() {
            return Err(ParserError::SwitchWithoutCases(switch_span));
        }
        Ok(self.statement(StatementKind::Switch(Switch { expression, cases })))
    }

    fn parse_expression(&mut self) -> Result<Expression, ParserError> {
        match &self.current().token {
            Token::Identifier(_) => {
                if self.peek().token == Token::OpenParen {
                    Ok(Expression::Call(self.parse_call()?))
                } else {
                    Ok(Expression::Identifier(self.parse_ident()?))
                }
            }
            Token::Number(_) | Token::BoolLiteral(_) => {
                Ok(Expression::Literal(self.parse_literal()?))
            }
            _ => Err(self.unexpected("an expression")),
        }
    }

    fn parse_call(&mut self) -> Result<FunctionCall, ParserError> {
        let function = self.parse_ident()?;
        self.expect(Token::OpenParen, "'('")?;
        let mut arguments = Vec::new();
        while self.current().token != Token::CloseParen {
            arguments.push(self.parse_expression()?);
            if self.current().token != Token::CloseParen {
                self.expect(Token::Comma, "',' or ')'")?;
            }
        }
        self.advance();
        if let Some(builtin) = self.dialect.builtin(&function.name) {
            if builtin.parameters != arguments.len() {
                return Err(ParserError::BuiltinArityMismatch {
                    name: function.name.to_string(),
                    expected: builtin.parameters,
                    found: arguments.len(),
                    span: function.span,
                });
            }
        }
        Ok(FunctionCall {
            function,
            arguments,
        })
    }

    fn parse_ident_list(&mut self) -> Result<Vec<Ident>, ParserError> {
        let mut idents = vec![self.parse_ident()?];
        while self.current().token == Token::Comma {
            self.advance();
            idents.push(self.parse_ident()?);
        }
        Ok(idents)
    }

    fn parse_ident(&mut self) -> Result<Ident, ParserError> {
        let TokenWithSpan {
            token: Token::Identifier(name),
            span,
        } = self.current()
        else {
            return Err(self.unexpected("an identifier"));
        };
        let ident = Ident {
            name: Rc::from(name.as_str()),
            span: span.clone(),
        };
        self.advance();
        Ok(ident)
    }

    fn parse_literal(&mut self) -> Result<Literal, ParserError> {
        let literal = match &self.current().token {
            Token::Number(value) => Literal {
                span: self.current().span.clone(),
                kind: LiteralKind::Number,
                value: value.clone(),
            },
            Token::BoolLiteral(value) => Literal {
                span: self.current().span.clone(),
                kind: LiteralKind::Boolean,
                value: BigUint::from(*value as u32),
            },
            _ => return Err(self.unexpected("a literal")),
        };
        self.advance();
        Ok(literal)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::evm::dialect::Dialect;

    fn roundtrip(source: &str) -> String {
        let dialect = Dialect::evm();
        crate::parse_source("<test>", source, &dialect)
            .expect("parse error")
            .to_string()
    }

    #[test]
    fn print_parse_is_a_fixed_point() {
        let source = r#"{
    let x := mload(0)
    if iszero(x) { revert(0, 0) }
    switch x
    case 1 {
        sstore(0, 1)
    }
    default { }
    for { let i := 0 } lt(i, x) { i := add(i, 1) } {
        mstore(i, x)
    }
    function f(a, b) -> r {
        r := add(a, b)
        leave
    }
    sstore(0, f(x, 2))
}"#;
        let printed = roundtrip(source);
        assert_eq!(roundtrip(&printed), printed);
    }

    #[test]
    fn rejects_non_call_expression_statements() {
        let dialect = Dialect::evm();
        assert!(crate::parse_source("<test>", "{ x }", &dialect).is_err());
        assert!(crate::parse_source("<test>", "{ 1 }", &dialect).is_err());
    }

    #[test]
    fn rejects_wrong_builtin_arity() {
        let dialect = Dialect::evm();
        assert!(crate::parse_source("<test>", "{ mstore(0) }", &dialect).is_err());
    }

    #[test]
    fn rejects_default_before_case() {
        let dialect = Dialect::evm();
        let source = "{ switch 1 default { } case 1 { } }";
        assert!(crate::parse_source("<test>", source, &dialect).is_err());
    }
}
