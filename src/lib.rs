//! An optimizer for a low-level, EVM-oriented intermediate language: a
//! structured, block-scoped IL whose builtins are EVM instructions. The
//! centerpiece passes remove memory/storage stores and variable
//! assignments whose values can never be observed.

use std::rc::Rc;

use thiserror::Error;

pub mod evm;
pub mod opt;
pub mod parse;
pub mod scan;
pub mod utils;

use evm::dialect::Dialect;
use parse::{ast::Block, error::ParserError, parser::Parser};
use scan::{
    error::ScannerError,
    location::Source,
    scanner::Scanner,
    token::{Token, TokenWithSpan},
};

#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Scan(#[from] ScannerError),
    #[error(transparent)]
    Parse(#[from] ParserError),
}

/// Scans the given source text into tokens, stopping at the first error.
/// The returned stream always ends with the end-of-file sentinel.
pub fn scan_source(filename: &str, content: &str) -> Result<Vec<TokenWithSpan>, ScannerError> {
    let source = Rc::new(Source {
        filename: filename.to_string(),
        content: content.to_string(),
    });
    let mut scanner = Scanner::new(source);
    let mut tokens = Vec::new();
    loop {
        let token = scanner.next()?;
        let end = token.token == Token::EndOfFile;
        tokens.push(token);
        if end {
            return Ok(tokens);
        }
    }
}

/// Scans and parses a whole program.
pub fn parse_source(
    filename: &str,
    content: &str,
    dialect: &Dialect,
) -> Result<Block, CompileError> {
    let tokens = scan_source(filename, content)?;
    let mut parser = Parser::new(&tokens, dialect);
    Ok(parser.parse_program()?)
}
