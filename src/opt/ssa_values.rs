//! Tracking of variables that are declared with a single value and never
//! reassigned. Their defining expressions feed the knowledge base.

use std::collections::{HashMap, HashSet};

use num_bigint::BigUint;
use num_traits::Zero;

use crate::parse::{
    ast::{Block, Expression, IdentStr, Literal, Statement, StatementKind},
    visitor::{self, Visitor},
};

/// Returns the defining expression of every variable that is assigned
/// exactly once, at its declaration. A declaration of a single variable
/// without initializer defines the zero literal. Multi-variable
/// declarations and function parameters and returns are not tracked.
pub fn ssa_values(ast: &Block) -> HashMap<IdentStr, Expression> {
    let mut reassigned = ReassignedVariables::default();
    reassigned.visit_block(ast);
    let mut tracker = Tracker {
        reassigned: reassigned.names,
        values: HashMap::new(),
    };
    tracker.visit_block(ast);
    tracker.values
}

#[derive(Default)]
struct ReassignedVariables {
    names: HashSet<IdentStr>,
}

impl<'ast> Visitor<'ast> for ReassignedVariables {
    fn visit_statement(&mut self, statement: &'ast Statement) {
        if let StatementKind::Assignment(assignment) = &statement.kind {
            for target in &assignment.targets {
                self.names.insert(target.name.clone());
            }
        }
        visitor::walk_statement(self, statement);
    }
}

struct Tracker {
    reassigned: HashSet<IdentStr>,
    values: HashMap<IdentStr, Expression>,
}

impl<'ast> Visitor<'ast> for Tracker {
    fn visit_statement(&mut self, statement: &'ast Statement) {
        if let StatementKind::VariableDeclaration(declaration) = &statement.kind {
            if let [variable] = declaration.variables.as_slice() {
                if !self.reassigned.contains(&variable.name) {
                    let value = declaration
                        .value
                        .clone()
                        .unwrap_or_else(|| Expression::Literal(Literal::number(BigUint::zero())));
                    self.values.insert(variable.name.clone(), value);
                }
            }
        }
        visitor::walk_statement(self, statement);
    }
}
