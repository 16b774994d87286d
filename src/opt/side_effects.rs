//! Expression-level side effect collection, and the msize scan that
//! decides whether memory stores may be optimized at all.

use crate::{
    evm::{
        dialect::{Dialect, SideEffects},
        instruction::Instruction,
    },
    parse::{
        ast::{Block, Expression, FunctionCall},
        visitor::{self, Visitor},
    },
};

/// The combined side effects of evaluating an expression. Calls to
/// user-defined functions are not resolved here and are assumed to do
/// anything.
pub fn expression_side_effects(dialect: &Dialect, expression: &Expression) -> SideEffects {
    let mut collector = Collector {
        dialect,
        effects: SideEffects::none(),
    };
    collector.visit_expression(expression);
    collector.effects
}

struct Collector<'a> {
    dialect: &'a Dialect,
    effects: SideEffects,
}

impl<'a, 'ast> Visitor<'ast> for Collector<'a> {
    fn visit_function_call(&mut self, call: &'ast FunctionCall) {
        match self.dialect.builtin(&call.function.name) {
            Some(builtin) => self.effects.combine(&builtin.side_effects),
            None => self.effects.combine(&SideEffects::worst()),
        }
        visitor::walk_function_call(self, call);
    }
}

/// Whether the program queries its current memory size anywhere. Removing a
/// memory write could change that answer, so memory stores are only
/// optimized when this is false.
pub fn contains_msize(dialect: &Dialect, ast: &Block) -> bool {
    let mut finder = MSizeFinder {
        dialect,
        found: false,
    };
    finder.visit_block(ast);
    finder.found
}

struct MSizeFinder<'a> {
    dialect: &'a Dialect,
    found: bool,
}

impl<'a, 'ast> Visitor<'ast> for MSizeFinder<'a> {
    fn visit_function_call(&mut self, call: &'ast FunctionCall) {
        if self.dialect.instruction(&call.function.name) == Some(Instruction::MSize) {
            self.found = true;
        }
        visitor::walk_function_call(self, call);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn movability_of_expressions() {
        let dialect = Dialect::evm();
        let ast = crate::parse_source(
            "<test>",
            "{ let a := add(1, mul(2, 3)) let b := mload(0) let c := f() function f() -> r { } }",
            &dialect,
        )
        .expect("parse error");
        let value_of = |index: usize| match &ast.statements[index].kind {
            crate::parse::ast::StatementKind::VariableDeclaration(declaration) => {
                declaration.value.as_ref().unwrap()
            }
            _ => panic!("expected declaration"),
        };
        assert!(expression_side_effects(&dialect, value_of(0)).movable);
        assert!(!expression_side_effects(&dialect, value_of(1)).movable);
        // Unknown function: assume the worst.
        assert!(!expression_side_effects(&dialect, value_of(2)).movable);
    }

    #[test]
    fn msize_is_found_inside_functions() {
        let dialect = Dialect::evm();
        let with = crate::parse_source(
            "<test>",
            "{ function f() -> r { r := msize() } }",
            &dialect,
        )
        .unwrap();
        assert!(contains_msize(&dialect, &with));
        let without = crate::parse_source("<test>", "{ let a := mload(0) }", &dialect).unwrap();
        assert!(!contains_msize(&dialect, &without));
    }
}
