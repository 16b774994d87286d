//! Rust-like terminal diagnostics for input errors.

use std::io::{self, Write};

use colored::Colorize;

use crate::{
    parse::error::ParserError,
    scan::{error::ScannerError, location::Span},
};

pub struct Diagnostic {
    message: String,
    span: Option<Span>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            span: None,
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn write(&self, writer: &mut dyn io::Write) -> io::Result<()> {
        writeln!(writer, "{} {}", "error:".red().bold(), self.message)?;
        let Some(span) = &self.span else {
            return Ok(());
        };
        let (line, column) = span.source.position(span.start);
        let arrow = "-->".cyan().bold();
        writeln!(
            writer,
            "  {} {}:{}:{}",
            arrow, span.source.filename, line, column
        )?;
        if let Some(text) = span.source.line(line) {
            let line_number = format!("{:4}", line).cyan().bold();
            let bar = "|".cyan().bold();
            writeln!(writer, "{} {} {}", line_number, bar, text)?;
            writeln!(
                writer,
                "     {} {}{}",
                bar,
                " ".repeat(column.saturating_sub(1)),
                "^".red().bold()
            )?;
        }
        Ok(())
    }
}

impl From<&ScannerError> for Diagnostic {
    fn from(error: &ScannerError) -> Self {
        Diagnostic::error(error.to_string()).with_span(error.span().clone())
    }
}

impl From<&ParserError> for Diagnostic {
    fn from(error: &ParserError) -> Self {
        Diagnostic::error(error.to_string()).with_span(error.span().clone())
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use crate::scan::location::{Source, Span};

    use super::*;

    #[test]
    fn renders_the_offending_line() {
        let source = Rc::new(Source {
            filename: "demo.evmil".to_string(),
            content: "{\n    mstore(0, ?)\n}\n".to_string(),
        });
        let diagnostic = Diagnostic::error("unexpected character '?'")
            .with_span(Span::new(source, 16, 17));
        let mut out = Vec::new();
        diagnostic.write(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("demo.evmil:2:15"));
        assert!(text.contains("mstore(0, ?)"));
    }
}
