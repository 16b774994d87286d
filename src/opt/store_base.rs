//! Shared traversal for passes that track a set of pending ("active")
//! store statements through structured control flow. The traversal owns
//! the snapshot/merge choreography at branches and loops; the passes own
//! the state representation and its meet operation.

use crate::parse::ast::{
    Block, Expression, ForLoop, FunctionDefinition, Statement, StatementKind, Switch,
};

/// Beyond this loop nesting depth the body is only analyzed once per loop
/// and `shortcut_nested_loop` approximates the second run, keeping the
/// overall runtime polynomial.
const MAX_DEPTH_FOR_SECOND_RUN: usize = 6;

/// Pending states of `break` and `continue` statements of the loop
/// currently being analyzed, plus the nesting depth.
pub struct LoopContext<A> {
    pub pending_break: Vec<A>,
    pub pending_continue: Vec<A>,
    pub depth: usize,
}

impl<A> Default for LoopContext<A> {
    fn default() -> Self {
        LoopContext {
            pending_break: Vec::new(),
            pending_continue: Vec::new(),
            depth: 0,
        }
    }
}

pub trait UnusedStorePass: Sized {
    /// The active-store state threaded through the traversal. `Default`
    /// must produce the empty state.
    type Active: Clone + Default;

    fn active(&self) -> &Self::Active;
    fn active_mut(&mut self) -> &mut Self::Active;
    fn loops(&mut self) -> &mut LoopContext<Self::Active>;

    /// Meet the state of another control-flow path into the current state.
    fn merge(&mut self, other: Self::Active);

    /// Called for every expression in evaluation position. Arguments of a
    /// call must be handled before the call itself.
    fn visit_expression(&mut self, expression: &Expression);

    /// Called after a statement and everything in it has been traversed.
    fn statement_visited(&mut self, statement: &Statement) {
        let _ = statement;
    }

    /// Called after the statements of a block have been traversed.
    fn block_exited(&mut self, block: &Block) {
        let _ = block;
    }

    fn visit_leave(&mut self) {}

    fn function_entered(&mut self, function: &FunctionDefinition) {
        let _ = function;
    }

    /// Called at the end of a function body, while the body's state is
    /// still current: falling off the end returns to the caller.
    fn finalize_function(&mut self, function: &FunctionDefinition) {
        let _ = function;
    }

    fn function_exited(&mut self, function: &FunctionDefinition) {
        let _ = function;
    }

    /// Approximation used instead of the second body run for deeply nested
    /// loops; `zero_runs` is the state from before the first run.
    fn shortcut_nested_loop(&mut self, zero_runs: &Self::Active);
}

pub fn walk_block<P: UnusedStorePass>(pass: &mut P, block: &Block) {
    for statement in &block.statements {
        walk_statement(pass, statement);
    }
    pass.block_exited(block);
}

pub fn walk_statement<P: UnusedStorePass>(pass: &mut P, statement: &Statement) {
    match &statement.kind {
        StatementKind::Block(block) => walk_block(pass, block),
        StatementKind::FunctionDefinition(function) => walk_function_definition(pass, function),
        StatementKind::VariableDeclaration(declaration) => {
            if let Some(value) = &declaration.value {
                pass.visit_expression(value);
            }
        }
        StatementKind::Assignment(assignment) => pass.visit_expression(&assignment.value),
        StatementKind::If(if_statement) => {
            pass.visit_expression(&if_statement.condition);
            let skip_branch = pass.active().clone();
            walk_block(pass, &if_statement.body);
            pass.merge(skip_branch);
        }
        StatementKind::Switch(switch) => walk_switch(pass, switch),
        StatementKind::ForLoop(for_loop) => walk_for_loop(pass, for_loop),
        StatementKind::Break => {
            let state = std::mem::take(pass.active_mut());
            pass.loops().pending_break.push(state);
        }
        StatementKind::Continue => {
            let state = std::mem::take(pass.active_mut());
            pass.loops().pending_continue.push(state);
        }
        StatementKind::Leave => pass.visit_leave(),
        StatementKind::Expression(expression) => pass.visit_expression(expression),
    }
    pass.statement_visited(statement);
}

fn walk_switch<P: UnusedStorePass>(pass: &mut P, switch: &Switch) {
    pass.visit_expression(&switch.expression);
    let pre_state = pass.active().clone();
    let mut has_default = false;
    let mut branches = Vec::new();
    for case in &switch.cases {
        if case.value.is_none() {
            has_default = true;
        }
        walk_block(pass, &case.body);
        branches.push(std::mem::replace(pass.active_mut(), pre_state.clone()));
    }
    if has_default {
        // The default case parses last; some case always runs, so the
        // pre-state path does not survive on its own.
        *pass.active_mut() = branches.pop().expect("switch has at least one case");
    }
    for branch in branches {
        pass.merge(branch);
    }
}

fn walk_for_loop<P: UnusedStorePass>(pass: &mut P, for_loop: &ForLoop) {
    // Pending break/continue states belong to this loop alone.
    let outer = std::mem::take(pass.loops());
    pass.loops().depth = outer.depth + 1;

    walk_block(pass, &for_loop.pre);
    pass.visit_expression(&for_loop.condition);
    let zero_runs = pass.active().clone();

    walk_block(pass, &for_loop.body);
    merge_pending_continues(pass);
    walk_block(pass, &for_loop.post);
    pass.visit_expression(&for_loop.condition);

    if pass.loops().depth < MAX_DEPTH_FOR_SECOND_RUN {
        // Run the body a second time so that state from the first
        // iteration is exposed to reads at the start of the next one.
        let one_run = pass.active().clone();
        walk_block(pass, &for_loop.body);
        merge_pending_continues(pass);
        walk_block(pass, &for_loop.post);
        pass.visit_expression(&for_loop.condition);
        pass.merge(one_run);
    } else {
        pass.shortcut_nested_loop(&zero_runs);
    }

    // The loop may also run zero times or be left through a break.
    pass.merge(zero_runs);
    let pending_break = std::mem::take(&mut pass.loops().pending_break);
    for state in pending_break {
        pass.merge(state);
    }

    *pass.loops() = outer;
}

fn merge_pending_continues<P: UnusedStorePass>(pass: &mut P) {
    let pending = std::mem::take(&mut pass.loops().pending_continue);
    for state in pending {
        pass.merge(state);
    }
}

fn walk_function_definition<P: UnusedStorePass>(pass: &mut P, function: &FunctionDefinition) {
    // The body runs with its own state: it is not executed where it is
    // defined, and functions cannot see outer variables.
    let outer_active = std::mem::take(pass.active_mut());
    let outer_loops = std::mem::take(pass.loops());

    pass.function_entered(function);
    walk_block(pass, &function.body);
    pass.finalize_function(function);
    pass.function_exited(function);

    *pass.active_mut() = outer_active;
    *pass.loops() = outer_loops;
}
