//! Removal of assignments to variables that are re-assigned or go out of
//! scope before ever being read. Shares the active-store traversal with
//! unused-store elimination; here the active state maps each variable to
//! its pending assignments and the meet at control-flow joins is union.

use std::collections::{HashMap, HashSet};

use log::debug;

use crate::{
    evm::dialect::Dialect,
    parse::ast::{
        Block, Expression, FunctionDefinition, IdentStr, Statement, StatementKind, StmtId,
    },
};

use super::{
    remover, side_effects,
    store_base::{self, LoopContext, UnusedStorePass},
};

type ActiveAssignments = HashMap<IdentStr, im::HashSet<StmtId>>;

/// Runs unused-assignment elimination over a whole program.
pub fn eliminate_unused_assignments(dialect: &Dialect, ast: &mut Block) {
    let mut pass = UnusedAssignEliminator {
        dialect,
        all_stores: HashSet::new(),
        used_stores: HashSet::new(),
        active: ActiveAssignments::default(),
        return_variables: Vec::new(),
        loops: LoopContext::default(),
    };
    store_base::walk_block(&mut pass, ast);

    let to_remove: HashSet<StmtId> = pass
        .all_stores
        .difference(&pass.used_stores)
        .copied()
        .collect();
    debug!(
        "unused assignment elimination removes {} of {} candidate assignments",
        to_remove.len(),
        pass.all_stores.len()
    );
    remover::remove_statements(ast, &to_remove);
}

struct UnusedAssignEliminator<'a> {
    dialect: &'a Dialect,
    /// Every candidate assignment seen, anywhere.
    all_stores: HashSet<StmtId>,
    /// Candidate assignments that must be kept.
    used_stores: HashSet<StmtId>,
    active: ActiveAssignments,
    /// Return variables of the enclosing function definitions.
    return_variables: Vec<Vec<IdentStr>>,
    loops: LoopContext<ActiveAssignments>,
}

impl UnusedStorePass for UnusedAssignEliminator<'_> {
    type Active = ActiveAssignments;

    fn active(&self) -> &ActiveAssignments {
        &self.active
    }

    fn active_mut(&mut self) -> &mut ActiveAssignments {
        &mut self.active
    }

    fn loops(&mut self) -> &mut LoopContext<ActiveAssignments> {
        &mut self.loops
    }

    /// Union per variable: an assignment is pending after the join if it
    /// is pending on any incoming path.
    fn merge(&mut self, other: ActiveAssignments) {
        for (variable, stores) in other {
            self.active.entry(variable).or_default().extend(stores);
        }
    }

    fn visit_expression(&mut self, expression: &Expression) {
        match expression {
            Expression::Identifier(identifier) => self.mark_used(&identifier.name),
            Expression::Call(call) => {
                for argument in call.arguments.iter().rev() {
                    self.visit_expression(argument);
                }
            }
            Expression::Literal(_) => {}
        }
    }

    fn statement_visited(&mut self, statement: &Statement) {
        let StatementKind::Assignment(assignment) = &statement.kind else {
            return;
        };
        // The value has already been visited, so a self-referential
        // assignment keeps its predecessor.
        if side_effects::expression_side_effects(self.dialect, &assignment.value).movable {
            self.all_stores.insert(statement.id);
            for target in &assignment.targets {
                self.active
                    .insert(target.name.clone(), im::HashSet::unit(statement.id));
            }
        } else {
            // The value is kept for its effects, but it still overwrites
            // any pending assignment.
            for target in &assignment.targets {
                self.active.insert(target.name.clone(), im::HashSet::new());
            }
        }
    }

    /// Assignments still pending when their variable goes out of scope can
    /// never be read.
    fn block_exited(&mut self, block: &Block) {
        for statement in &block.statements {
            if let StatementKind::VariableDeclaration(declaration) = &statement.kind {
                for variable in &declaration.variables {
                    self.active.remove(&variable.name);
                }
            }
        }
    }

    fn visit_leave(&mut self) {
        self.mark_return_variables_used();
    }

    fn function_entered(&mut self, function: &FunctionDefinition) {
        self.return_variables.push(
            function
                .returns
                .iter()
                .map(|variable| variable.name.clone())
                .collect(),
        );
    }

    fn finalize_function(&mut self, _function: &FunctionDefinition) {
        self.mark_return_variables_used();
    }

    fn function_exited(&mut self, _function: &FunctionDefinition) {
        self.return_variables
            .pop()
            .expect("function entry pushed the return variables");
    }

    fn shortcut_nested_loop(&mut self, zero_runs: &ActiveAssignments) {
        // Keep every assignment the first run introduced.
        let Self {
            active,
            used_stores,
            ..
        } = self;
        for (variable, stores) in active.iter() {
            for statement in stores {
                let in_zero_runs = zero_runs
                    .get(variable)
                    .is_some_and(|set| set.contains(statement));
                if !in_zero_runs {
                    used_stores.insert(*statement);
                }
            }
        }
    }
}

impl UnusedAssignEliminator<'_> {
    fn mark_used(&mut self, variable: &IdentStr) {
        if let Some(stores) = self.active.remove(variable) {
            self.used_stores.extend(stores);
        }
    }

    fn mark_return_variables_used(&mut self) {
        let returns = self.return_variables.last().cloned().unwrap_or_default();
        for variable in returns {
            self.mark_used(&variable);
        }
    }
}
