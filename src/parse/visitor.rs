//! Read-only traversal of the AST. Passes override the hooks they care
//! about and delegate the rest to the `walk_*` functions.

use super::ast::{Block, Expression, FunctionCall, Statement, StatementKind};

pub trait Visitor<'ast> {
    fn visit_block(&mut self, block: &'ast Block) {
        walk_block(self, block);
    }

    fn visit_statement(&mut self, statement: &'ast Statement) {
        walk_statement(self, statement);
    }

    fn visit_expression(&mut self, expression: &'ast Expression) {
        walk_expression(self, expression);
    }

    fn visit_function_call(&mut self, call: &'ast FunctionCall) {
        walk_function_call(self, call);
    }
}

pub fn walk_block<'ast, V: Visitor<'ast> + ?Sized>(visitor: &mut V, block: &'ast Block) {
    for statement in &block.statements {
        visitor.visit_statement(statement);
    }
}

pub fn walk_statement<'ast, V: Visitor<'ast> + ?Sized>(visitor: &mut V, statement: &'ast Statement) {
    match &statement.kind {
        StatementKind::Block(block) => visitor.visit_block(block),
        StatementKind::FunctionDefinition(function) => visitor.visit_block(&function.body),
        StatementKind::VariableDeclaration(declaration) => {
            if let Some(value) = &declaration.value {
                visitor.visit_expression(value);
            }
        }
        StatementKind::Assignment(assignment) => visitor.visit_expression(&assignment.value),
        StatementKind::If(if_statement) => {
            visitor.visit_expression(&if_statement.condition);
            visitor.visit_block(&if_statement.body);
        }
        StatementKind::Switch(switch) => {
            visitor.visit_expression(&switch.expression);
            for case in &switch.cases {
                visitor.visit_block(&case.body);
            }
        }
        StatementKind::ForLoop(for_loop) => {
            visitor.visit_block(&for_loop.pre);
            visitor.visit_expression(&for_loop.condition);
            visitor.visit_block(&for_loop.body);
            visitor.visit_block(&for_loop.post);
        }
        StatementKind::Break | StatementKind::Continue | StatementKind::Leave => {}
        StatementKind::Expression(expression) => visitor.visit_expression(expression),
    }
}

pub fn walk_expression<'ast, V: Visitor<'ast> + ?Sized>(
    visitor: &mut V,
    expression: &'ast Expression,
) {
    if let Expression::Call(call) = expression {
        visitor.visit_function_call(call);
    }
}

/// Arguments are visited right to left, matching evaluation order.
pub fn walk_function_call<'ast, V: Visitor<'ast> + ?Sized>(visitor: &mut V, call: &'ast FunctionCall) {
    for argument in call.arguments.iter().rev() {
        visitor.visit_expression(argument);
    }
}
