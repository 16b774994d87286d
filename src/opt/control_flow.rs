//! Computes, for every user-defined function, whether some execution of it
//! returns control to the caller and whether some execution terminates the
//! transaction. Both are may-predicates over structured control flow,
//! solved as a fixed point across (possibly mutually recursive) functions.

use std::collections::HashMap;

use crate::{
    evm::{dialect::Dialect, semantics::ControlFlowSideEffects},
    parse::{
        ast::{Block, Expression, FunctionDefinition, IdentStr, Statement, StatementKind},
        visitor::{self, Visitor},
    },
};

/// Which ways out of a statement sequence are reachable.
#[derive(Debug, Clone, Copy, Default)]
struct Flow {
    falls_through: bool,
    leaves: bool,
    breaks: bool,
    continues: bool,
}

pub fn function_control_flow(
    dialect: &Dialect,
    ast: &Block,
) -> HashMap<IdentStr, ControlFlowSideEffects> {
    let mut gather = GatherFunctions {
        functions: Vec::new(),
    };
    gather.visit_block(ast);

    // Start from the bottom of the lattice; flags only ever flip to true,
    // so iteration terminates.
    let mut table: HashMap<IdentStr, ControlFlowSideEffects> = gather
        .functions
        .iter()
        .map(|function| {
            (
                function.name.name.clone(),
                ControlFlowSideEffects {
                    can_continue: false,
                    can_terminate: false,
                },
            )
        })
        .collect();
    loop {
        let mut changed = false;
        for function in &gather.functions {
            let flags = {
                let mut body = BodyFlow {
                    dialect,
                    table: &table,
                    terminated: false,
                };
                let flow = body.block_flow(&function.body);
                ControlFlowSideEffects {
                    can_continue: flow.falls_through || flow.leaves,
                    can_terminate: body.terminated,
                }
            };
            let entry = table
                .get_mut(&function.name.name)
                .expect("every function has a table entry");
            let merged = ControlFlowSideEffects {
                can_continue: entry.can_continue || flags.can_continue,
                can_terminate: entry.can_terminate || flags.can_terminate,
            };
            if *entry != merged {
                *entry = merged;
                changed = true;
            }
        }
        if !changed {
            return table;
        }
    }
}

struct GatherFunctions<'ast> {
    functions: Vec<&'ast FunctionDefinition>,
}

impl<'ast> Visitor<'ast> for GatherFunctions<'ast> {
    fn visit_statement(&mut self, statement: &'ast Statement) {
        if let StatementKind::FunctionDefinition(function) = &statement.kind {
            self.functions.push(function);
        }
        visitor::walk_statement(self, statement);
    }
}

struct BodyFlow<'a> {
    dialect: &'a Dialect,
    table: &'a HashMap<IdentStr, ControlFlowSideEffects>,
    /// Whether a reachable call can terminate the transaction.
    terminated: bool,
}

impl BodyFlow<'_> {
    fn callee_flags(&self, name: &IdentStr) -> ControlFlowSideEffects {
        match self.dialect.builtin(name) {
            Some(builtin) => builtin.control_flow,
            None => self
                .table
                .get(name)
                .copied()
                .unwrap_or(ControlFlowSideEffects {
                    can_continue: false,
                    can_terminate: false,
                }),
        }
    }

    /// Returns whether evaluation of the expression can complete normally.
    fn expression_flow(&mut self, expression: &Expression) -> bool {
        match expression {
            Expression::Identifier(_) | Expression::Literal(_) => true,
            Expression::Call(call) => {
                for argument in call.arguments.iter().rev() {
                    if !self.expression_flow(argument) {
                        return false;
                    }
                }
                let flags = self.callee_flags(&call.function.name);
                if flags.can_terminate {
                    self.terminated = true;
                }
                flags.can_continue
            }
        }
    }

    fn statement_flow(&mut self, statement: &Statement) -> Flow {
        match &statement.kind {
            StatementKind::Block(block) => self.block_flow(block),
            // Nested definitions are analyzed on their own; defining one is
            // a no-op at runtime.
            StatementKind::FunctionDefinition(_) => Flow {
                falls_through: true,
                ..Flow::default()
            },
            StatementKind::VariableDeclaration(declaration) => Flow {
                falls_through: declaration
                    .value
                    .as_ref()
                    .map_or(true, |value| self.expression_flow(value)),
                ..Flow::default()
            },
            StatementKind::Assignment(assignment) => Flow {
                falls_through: self.expression_flow(&assignment.value),
                ..Flow::default()
            },
            StatementKind::Expression(expression) => Flow {
                falls_through: self.expression_flow(expression),
                ..Flow::default()
            },
            StatementKind::If(if_statement) => {
                if !self.expression_flow(&if_statement.condition) {
                    return Flow::default();
                }
                let body = self.block_flow(&if_statement.body);
                Flow {
                    // The condition may be false, so the statement can
                    // always be stepped over.
                    falls_through: true,
                    ..body
                }
            }
            StatementKind::Switch(switch) => {
                if !self.expression_flow(&switch.expression) {
                    return Flow::default();
                }
                let mut flow = Flow::default();
                let mut has_default = false;
                for case in &switch.cases {
                    if case.value.is_none() {
                        has_default = true;
                    }
                    let case_flow = self.block_flow(&case.body);
                    flow.falls_through |= case_flow.falls_through;
                    flow.leaves |= case_flow.leaves;
                    flow.breaks |= case_flow.breaks;
                    flow.continues |= case_flow.continues;
                }
                // Without a default, no case may match at all.
                flow.falls_through |= !has_default;
                flow
            }
            StatementKind::ForLoop(for_loop) => {
                let pre = self.block_flow(&for_loop.pre);
                if !pre.falls_through {
                    return pre;
                }
                let condition = self.expression_flow(&for_loop.condition);
                let body = self.block_flow(&for_loop.body);
                let post = self.block_flow(&for_loop.post);
                Flow {
                    // The loop is left when the condition turns false or the
                    // body breaks; either way the condition must have been
                    // evaluable.
                    falls_through: condition,
                    leaves: pre.leaves || body.leaves || post.leaves,
                    // break and continue are consumed by this loop.
                    breaks: false,
                    continues: false,
                }
            }
            StatementKind::Break => Flow {
                breaks: true,
                ..Flow::default()
            },
            StatementKind::Continue => Flow {
                continues: true,
                ..Flow::default()
            },
            StatementKind::Leave => Flow {
                leaves: true,
                ..Flow::default()
            },
        }
    }

    fn block_flow(&mut self, block: &Block) -> Flow {
        let mut flow = Flow {
            falls_through: true,
            ..Flow::default()
        };
        for statement in &block.statements {
            if !flow.falls_through {
                // The rest of the block is unreachable.
                break;
            }
            let statement_flow = self.statement_flow(statement);
            flow.leaves |= statement_flow.leaves;
            flow.breaks |= statement_flow.breaks;
            flow.continues |= statement_flow.continues;
            flow.falls_through = statement_flow.falls_through;
        }
        flow
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags_of(source: &str, function: &str) -> ControlFlowSideEffects {
        let dialect = Dialect::evm();
        let ast = crate::parse_source("<test>", source, &dialect).expect("parse error");
        function_control_flow(&dialect, &ast)[function]
    }

    #[test]
    fn plain_function_continues() {
        let flags = flags_of("{ function f() { mstore(0, 1) } }", "f");
        assert!(flags.can_continue);
        assert!(!flags.can_terminate);
    }

    #[test]
    fn always_reverting_function() {
        let flags = flags_of("{ function fail() { revert(0, 0) } }", "fail");
        assert!(!flags.can_continue);
        assert!(!flags.can_terminate);
    }

    #[test]
    fn terminating_function() {
        let flags = flags_of("{ function quit() { return(0, 0) } }", "quit");
        assert!(!flags.can_continue);
        assert!(flags.can_terminate);
    }

    #[test]
    fn conditional_revert_can_continue() {
        let flags = flags_of("{ function f(c) { if c { revert(0, 0) } } }", "f");
        assert!(flags.can_continue);
        assert!(!flags.can_terminate);
    }

    #[test]
    fn leave_counts_as_continuing() {
        let flags = flags_of("{ function f() { leave revert(0, 0) } }", "f");
        assert!(flags.can_continue);
        // The revert after leave is unreachable.
        assert!(!flags.can_terminate);
    }

    #[test]
    fn flags_propagate_through_wrappers() {
        let source = r#"{
            function fail() { revert(0, 0) }
            function wrap() { fail() }
            function maybe(c) -> r { if c { wrap() } r := 1 }
        }"#;
        let wrap = flags_of(source, "wrap");
        assert!(!wrap.can_continue && !wrap.can_terminate);
        let maybe = flags_of(source, "maybe");
        assert!(maybe.can_continue && !maybe.can_terminate);
    }

    #[test]
    fn recursive_functions_settle() {
        let source = r#"{
            function spin() { spin() }
            function countdown(n) { if n { countdown(sub(n, 1)) } }
        }"#;
        let spin = flags_of(source, "spin");
        assert!(!spin.can_continue && !spin.can_terminate);
        let countdown = flags_of(source, "countdown");
        assert!(countdown.can_continue && !countdown.can_terminate);
    }

    #[test]
    fn switch_without_default_falls_through() {
        let source = r#"{
            function f(c) {
                switch c
                case 0 { revert(0, 0) }
            }
            function g(c) {
                switch c
                case 0 { revert(0, 0) }
                default { revert(0, 0) }
            }
        }"#;
        assert!(flags_of(source, "f").can_continue);
        assert!(!flags_of(source, "g").can_continue);
    }
}
