//! Call graph construction and propagation of side effects across it.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::{
    evm::dialect::{Dialect, SideEffects},
    parse::{
        ast::{Block, FunctionCall, IdentStr, Statement, StatementKind},
        visitor::{self, Visitor},
    },
};

#[derive(Debug, Default)]
pub struct CallGraph {
    /// Direct callees, builtin and user-defined alike, per defined function.
    pub direct_calls: HashMap<IdentStr, BTreeSet<IdentStr>>,
}

impl CallGraph {
    pub fn build(ast: &Block) -> CallGraph {
        let mut builder = Builder {
            graph: CallGraph::default(),
            current: Vec::new(),
        };
        builder.visit_block(ast);
        builder.graph
    }
}

struct Builder {
    graph: CallGraph,
    /// Stack of enclosing function definitions; calls belong to the
    /// innermost one.
    current: Vec<IdentStr>,
}

impl<'ast> Visitor<'ast> for Builder {
    fn visit_statement(&mut self, statement: &'ast Statement) {
        if let StatementKind::FunctionDefinition(function) = &statement.kind {
            self.graph
                .direct_calls
                .entry(function.name.name.clone())
                .or_default();
            self.current.push(function.name.name.clone());
            visitor::walk_statement(self, statement);
            self.current.pop();
        } else {
            visitor::walk_statement(self, statement);
        }
    }

    fn visit_function_call(&mut self, call: &'ast FunctionCall) {
        if let Some(current) = self.current.last() {
            self.graph
                .direct_calls
                .get_mut(current)
                .expect("enclosing function was registered on entry")
                .insert(call.function.name.clone());
        }
        visitor::walk_function_call(self, call);
    }
}

/// Side effects of each user-defined function: the combined effects of all
/// builtins transitively reachable from its body. Callees that are neither
/// builtins nor defined functions are assumed to do anything.
pub fn function_side_effects(
    dialect: &Dialect,
    graph: &CallGraph,
) -> HashMap<IdentStr, SideEffects> {
    let mut result = HashMap::new();
    for name in graph.direct_calls.keys() {
        let mut effects = SideEffects::none();
        let mut visited = HashSet::new();
        let mut stack = vec![name.clone()];
        while let Some(function) = stack.pop() {
            if !visited.insert(function.clone()) {
                continue;
            }
            for callee in &graph.direct_calls[&function] {
                if let Some(builtin) = dialect.builtin(callee) {
                    effects.combine(&builtin.side_effects);
                } else if graph.direct_calls.contains_key(callee) {
                    stack.push(callee.clone());
                } else {
                    effects.combine(&SideEffects::worst());
                }
            }
        }
        result.insert(name.clone(), effects);
    }
    result
}
