//! Canonical pretty-printer for the IL. Parsing the printed form of a
//! program yields the same program, which is what the tests compare on.

use core::fmt;

use super::ast::{
    Block, Case, Expression, ForLoop, FunctionDefinition, Ident, Literal, LiteralKind, Statement,
    StatementKind, Switch,
};

const INDENT: &str = "    ";

fn write_indent(f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
    for _ in 0..depth {
        write!(f, "{}", INDENT)?;
    }
    Ok(())
}

fn write_block(f: &mut fmt::Formatter<'_>, block: &Block, depth: usize) -> fmt::Result {
    if block.statements.is_empty() {
        return write!(f, "{{ }}");
    }
    writeln!(f, "{{")?;
    for statement in &block.statements {
        write_indent(f, depth + 1)?;
        write_statement(f, statement, depth + 1)?;
        writeln!(f)?;
    }
    write_indent(f, depth)?;
    write!(f, "}}")
}

fn write_ident_list(f: &mut fmt::Formatter<'_>, idents: &[Ident]) -> fmt::Result {
    for (i, ident) in idents.iter().enumerate() {
        if i != 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", ident.name)?;
    }
    Ok(())
}

fn write_function(
    f: &mut fmt::Formatter<'_>,
    function: &FunctionDefinition,
    depth: usize,
) -> fmt::Result {
    write!(f, "function {}(", function.name.name)?;
    write_ident_list(f, &function.parameters)?;
    write!(f, ")")?;
    if !function.returns.is_empty() {
        write!(f, " -> ")?;
        write_ident_list(f, &function.returns)?;
    }
    write!(f, " ")?;
    write_block(f, &function.body, depth)
}

fn write_switch(f: &mut fmt::Formatter<'_>, switch: &Switch, depth: usize) -> fmt::Result {
    write!(f, "switch {}", switch.expression)?;
    for Case { value, body } in &switch.cases {
        writeln!(f)?;
        write_indent(f, depth)?;
        match value {
            Some(literal) => write!(f, "case {} ", literal)?,
            None => write!(f, "default ")?,
        }
        write_block(f, body, depth)?;
    }
    Ok(())
}

fn write_for_loop(f: &mut fmt::Formatter<'_>, for_loop: &ForLoop, depth: usize) -> fmt::Result {
    write!(f, "for ")?;
    write_block(f, &for_loop.pre, depth)?;
    write!(f, " {} ", for_loop.condition)?;
    write_block(f, &for_loop.post, depth)?;
    write!(f, " ")?;
    write_block(f, &for_loop.body, depth)
}

fn write_statement(f: &mut fmt::Formatter<'_>, statement: &Statement, depth: usize) -> fmt::Result {
    match &statement.kind {
        StatementKind::Block(block) => write_block(f, block, depth),
        StatementKind::FunctionDefinition(function) => write_function(f, function, depth),
        StatementKind::VariableDeclaration(declaration) => {
            write!(f, "let ")?;
            write_ident_list(f, &declaration.variables)?;
            if let Some(value) = &declaration.value {
                write!(f, " := {}", value)?;
            }
            Ok(())
        }
        StatementKind::Assignment(assignment) => {
            write_ident_list(f, &assignment.targets)?;
            write!(f, " := {}", assignment.value)
        }
        StatementKind::If(if_statement) => {
            write!(f, "if {} ", if_statement.condition)?;
            write_block(f, &if_statement.body, depth)
        }
        StatementKind::Switch(switch) => write_switch(f, switch, depth),
        StatementKind::ForLoop(for_loop) => write_for_loop(f, for_loop, depth),
        StatementKind::Break => write!(f, "break"),
        StatementKind::Continue => write!(f, "continue"),
        StatementKind::Leave => write!(f, "leave"),
        StatementKind::Expression(expression) => write!(f, "{}", expression),
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_block(f, self, 0)
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_statement(f, self, 0)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Call(call) => {
                write!(f, "{}(", call.function.name)?;
                for (i, argument) in call.arguments.iter().enumerate() {
                    if i != 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", argument)?;
                }
                write!(f, ")")
            }
            Expression::Identifier(identifier) => write!(f, "{}", identifier.name),
            Expression::Literal(literal) => write!(f, "{}", literal),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            LiteralKind::Number => write!(f, "{}", self.value),
            LiteralKind::Boolean => {
                if self.value == 0u32.into() {
                    write!(f, "false")
                } else {
                    write!(f, "true")
                }
            }
        }
    }
}
