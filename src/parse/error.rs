use thiserror::Error;

use crate::scan::{location::Span, token::TokenWithSpan};

#[derive(Debug, Clone, Error)]
pub enum ParserError {
    #[error("{}: unexpected token {}, expected {expected}", .found.span, .found.token)]
    UnexpectedToken {
        expected: &'static str,
        found: TokenWithSpan,
    },
    #[error("{0}: only function calls may be used as statements")]
    ExpressionStatementNotACall(Span),
    #[error("{0}: the default case must be the last case of a switch")]
    DefaultCaseNotLast(Span),
    #[error("{0}: switch statement has no cases")]
    SwitchWithoutCases(Span),
    #[error("{span}: builtin {name} takes {expected} arguments, found {found}")]
    BuiltinArityMismatch {
        name: String,
        expected: usize,
        found: usize,
        span: Span,
    },
    #[error("{span}: cannot redefine builtin {name}")]
    BuiltinRedefined { name: String, span: Span },
}

impl ParserError {
    pub fn span(&self) -> &Span {
        match self {
            ParserError::UnexpectedToken { found, .. } => &found.span,
            ParserError::ExpressionStatementNotACall(span)
            | ParserError::DefaultCaseNotLast(span)
            | ParserError::SwitchWithoutCases(span) => span,
            ParserError::BuiltinArityMismatch { span, .. }
            | ParserError::BuiltinRedefined { span, .. } => span,
        }
    }
}
