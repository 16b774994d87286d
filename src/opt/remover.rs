//! Deletes statements by identity, anywhere in the tree.

use std::collections::HashSet;

use crate::parse::ast::{Block, StatementKind, StmtId};

pub fn remove_statements(block: &mut Block, to_remove: &HashSet<StmtId>) {
    block
        .statements
        .retain(|statement| !to_remove.contains(&statement.id));
    for statement in &mut block.statements {
        match &mut statement.kind {
            StatementKind::Block(inner) => remove_statements(inner, to_remove),
            StatementKind::FunctionDefinition(function) => {
                remove_statements(&mut function.body, to_remove)
            }
            StatementKind::If(if_statement) => remove_statements(&mut if_statement.body, to_remove),
            StatementKind::Switch(switch) => {
                for case in &mut switch.cases {
                    remove_statements(&mut case.body, to_remove);
                }
            }
            StatementKind::ForLoop(for_loop) => {
                remove_statements(&mut for_loop.pre, to_remove);
                remove_statements(&mut for_loop.post, to_remove);
                remove_statements(&mut for_loop.body, to_remove);
            }
            _ => {}
        }
    }
}
