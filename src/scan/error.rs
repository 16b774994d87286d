use thiserror::Error;

use super::location::Span;

#[derive(Debug, Clone, Error)]
pub enum ScannerError {
    #[error("{1}: unexpected character {0:?}")]
    UnexpectedChar(char, Span),
    #[error("{0}: expected '>' after '-'")]
    MalformedArrow(Span),
    #[error("{0}: expected '=' after ':'")]
    MalformedWalrus(Span),
    #[error("{0}: hex literal has no digits")]
    EmptyHexLiteral(Span),
    #[error("{0}: number literal does not fit in 256 bits")]
    NumberTooLarge(Span),
    #[error("{0}: unterminated block comment")]
    UnterminatedBlockComment(Span),
}

impl ScannerError {
    pub fn span(&self) -> &Span {
        match self {
            ScannerError::UnexpectedChar(_, span)
            | ScannerError::MalformedArrow(span)
            | ScannerError::MalformedWalrus(span)
            | ScannerError::EmptyHexLiteral(span)
            | ScannerError::NumberTooLarge(span)
            | ScannerError::UnterminatedBlockComment(span) => span,
        }
    }
}
