//! Removal of memory and storage writes whose values can never be
//! observed.
//!
//! An abstract interpretation threads sets of pending ("active") store
//! statements through the program. A later read that may alias an active
//! store pins it into the output; a later write that covers it drops it
//! from the active set without pinning, leaving it removable; a call that
//! never returns discards pending state that a revert would roll back
//! anyway. Stores that are neither pinned nor observed by the end of the
//! program are deleted.

use std::collections::{HashMap, HashSet};

use log::debug;
use num_bigint::BigUint;
use num_traits::One;

use crate::{
    evm::{
        dialect::{Dialect, SideEffects},
        instruction::Instruction,
        semantics::{self, ControlFlowSideEffects, Effect, Location},
    },
    parse::ast::{
        Block, Expression, FunctionCall, FunctionDefinition, IdentStr, Statement, StatementKind,
        StmtId,
    },
};

use super::{
    call_graph::{self, CallGraph},
    control_flow,
    knowledge::KnowledgeBase,
    remover, side_effects, ssa_values,
    store_base::{self, LoopContext, UnusedStorePass},
    ONE_VALUE, THIRTY_TWO_VALUE,
};

/// Runs unused-store elimination over a whole program.
pub fn eliminate_unused_stores(dialect: &Dialect, ast: &mut Block) {
    let graph = CallGraph::build(ast);
    let function_side_effects = call_graph::function_side_effects(dialect, &graph);
    let control_flow_side_effects = control_flow::function_control_flow(dialect, ast);
    let mut values = ssa_values::ssa_values(ast);
    for (name, value) in super::pseudo_constant_values() {
        values.insert(name, value);
    }
    let ignore_memory = side_effects::contains_msize(dialect, ast);

    let mut pass = UnusedStoreEliminator {
        dialect,
        function_side_effects: &function_side_effects,
        control_flow_side_effects,
        ssa_values: &values,
        knowledge: KnowledgeBase::new(dialect, &values),
        ignore_memory,
        all_stores: HashSet::new(),
        used_stores: HashSet::new(),
        store_operations: HashMap::new(),
        outer_store_operations: Vec::new(),
        active: ActiveStores::default(),
        loops: LoopContext::default(),
    };
    store_base::walk_block(&mut pass, ast);

    if dialect.provides_object_access {
        // Other parts of the surrounding object access memory through
        // their own subroutine interfaces; this code's memory is dead once
        // the outermost block ends.
        pass.clear_active(Some(Location::Memory));
    } else {
        pass.mark_active_as_used(Some(Location::Memory));
    }
    pass.mark_active_as_used(Some(Location::Storage));

    let to_remove: HashSet<StmtId> = pass
        .all_stores
        .difference(&pass.used_stores)
        .copied()
        .collect();
    debug!(
        "unused store elimination removes {} of {} candidate stores",
        to_remove.len(),
        pass.all_stores.len()
    );
    remover::remove_statements(ast, &to_remove);
}

/// A single state access with an optional symbolic byte range. Symbols are
/// SSA variable names or one of the reserved constant names.
#[derive(Debug, Clone)]
pub struct Operation {
    pub location: Location,
    pub effect: Effect,
    pub start: Option<IdentStr>,
    pub length: Option<IdentStr>,
}

#[derive(Debug, Clone, Default)]
pub struct ActiveStores {
    memory: im::HashSet<StmtId>,
    storage: im::HashSet<StmtId>,
}

impl ActiveStores {
    fn get(&self, location: Location) -> &im::HashSet<StmtId> {
        match location {
            Location::Memory => &self.memory,
            Location::Storage => &self.storage,
        }
    }

    fn get_mut(&mut self, location: Location) -> &mut im::HashSet<StmtId> {
        match location {
            Location::Memory => &mut self.memory,
            Location::Storage => &mut self.storage,
        }
    }
}

struct UnusedStoreEliminator<'a> {
    dialect: &'a Dialect,
    function_side_effects: &'a HashMap<IdentStr, SideEffects>,
    control_flow_side_effects: HashMap<IdentStr, ControlFlowSideEffects>,
    ssa_values: &'a HashMap<IdentStr, Expression>,
    knowledge: KnowledgeBase<'a>,
    ignore_memory: bool,
    /// Every candidate store seen, anywhere.
    all_stores: HashSet<StmtId>,
    /// Candidate stores that must be kept.
    used_stores: HashSet<StmtId>,
    /// The single write each candidate store performs, scoped per
    /// function.
    store_operations: HashMap<StmtId, Operation>,
    outer_store_operations: Vec<HashMap<StmtId, Operation>>,
    active: ActiveStores,
    loops: LoopContext<ActiveStores>,
}

impl UnusedStorePass for UnusedStoreEliminator<'_> {
    type Active = ActiveStores;

    fn active(&self) -> &ActiveStores {
        &self.active
    }

    fn active_mut(&mut self) -> &mut ActiveStores {
        &mut self.active
    }

    fn loops(&mut self) -> &mut LoopContext<ActiveStores> {
        &mut self.loops
    }

    /// The meet is intersection per location: only stores pending on every
    /// incoming path stay candidates. A store pending on just one side has
    /// to be kept, because the path it is missing from may expose it to a
    /// later read.
    fn merge(&mut self, other: ActiveStores) {
        meet_location(&mut self.active.memory, other.memory, &mut self.used_stores);
        meet_location(&mut self.active.storage, other.storage, &mut self.used_stores);
    }

    fn visit_expression(&mut self, expression: &Expression) {
        if let Expression::Call(call) = expression {
            for argument in call.arguments.iter().rev() {
                self.visit_expression(argument);
            }
            self.handle_call(call);
        }
    }

    fn statement_visited(&mut self, statement: &Statement) {
        self.classify_store(statement);
    }

    fn visit_leave(&mut self) {
        // Control transfers to the caller, which may observe both
        // locations.
        self.mark_active_as_used(None);
    }

    fn function_entered(&mut self, _function: &FunctionDefinition) {
        self.outer_store_operations
            .push(std::mem::take(&mut self.store_operations));
    }

    fn finalize_function(&mut self, _function: &FunctionDefinition) {
        // Falling off the end of the body returns to the caller as well.
        self.mark_active_as_used(None);
    }

    fn function_exited(&mut self, _function: &FunctionDefinition) {
        self.store_operations = self
            .outer_store_operations
            .pop()
            .expect("function entry pushed the outer operations");
    }

    fn shortcut_nested_loop(&mut self, zero_runs: &ActiveStores) {
        // Keep everything the first run introduced; only stores already
        // pending before the loop remain candidates.
        let Self {
            active,
            used_stores,
            ..
        } = self;
        for location in [Location::Memory, Location::Storage] {
            for statement in active.get(location).iter() {
                if !zero_runs.get(location).contains(statement) {
                    used_stores.insert(*statement);
                }
            }
        }
    }
}

fn meet_location(
    mine: &mut im::HashSet<StmtId>,
    other: im::HashSet<StmtId>,
    used: &mut HashSet<StmtId>,
) {
    for statement in mine.iter() {
        if !other.contains(statement) {
            used.insert(*statement);
        }
    }
    for statement in other.iter() {
        if !mine.contains(statement) {
            used.insert(*statement);
        }
    }
    mine.retain(|statement| other.contains(statement));
}

impl UnusedStoreEliminator<'_> {
    fn handle_call(&mut self, call: &FunctionCall) {
        for operation in self.operations_from_function_call(call) {
            self.apply_operation(&operation);
        }

        let side_effects = match self.dialect.builtin(&call.function.name) {
            Some(builtin) => builtin.control_flow,
            None => *self
                .control_flow_side_effects
                .get(&call.function.name)
                .expect("call to undefined function"),
        };
        if side_effects.can_terminate {
            // Storage survives a successful termination and is observable
            // afterwards.
            self.mark_active_as_used(Some(Location::Storage));
        }
        if !side_effects.can_continue {
            self.clear_active(Some(Location::Memory));
            if !side_effects.can_terminate {
                // The call always reverts; pending storage writes are
                // rolled back without ever becoming observable.
                self.clear_active(Some(Location::Storage));
            }
        }
    }

    fn apply_operation(&mut self, operation: &Operation) {
        let Self {
            active,
            store_operations,
            used_stores,
            knowledge,
            ..
        } = self;
        let set = active.get_mut(operation.location);
        let mut dropped = Vec::new();
        for statement in set.iter().copied() {
            let store_operation = &store_operations[&statement];
            match operation.effect {
                Effect::Read if !known_unrelated(knowledge, store_operation, operation) => {
                    // The store may be read here; it has to stay.
                    used_stores.insert(statement);
                    dropped.push(statement);
                }
                Effect::Write if known_covered(knowledge, store_operation, operation) => {
                    // Overwritten before any read; the store stays
                    // removable.
                    dropped.push(statement);
                }
                _ => {}
            }
        }
        for statement in dropped {
            set.remove(&statement);
        }
    }

    fn operations_from_function_call(&self, call: &FunctionCall) -> Vec<Operation> {
        let name = &call.function.name;
        let Some(builtin) = self.dialect.builtin(name) else {
            // We do not track what unknown code writes, so its writes are
            // modelled as reads: that keeps earlier stores alive, which is
            // the safe direction.
            let side_effects = self
                .function_side_effects
                .get(name)
                .expect("call to undefined function");
            let mut operations = Vec::new();
            if side_effects.memory != Effect::None {
                operations.push(Operation {
                    location: Location::Memory,
                    effect: Effect::Read,
                    start: None,
                    length: None,
                });
            }
            if side_effects.storage != Effect::None {
                operations.push(Operation {
                    location: Location::Storage,
                    effect: Effect::Read,
                    start: None,
                    length: None,
                });
            }
            return operations;
        };

        semantics::read_write_operations(builtin.instruction)
            .into_iter()
            .map(|descriptor| {
                assert!(
                    !(descriptor.length_parameter.is_some() && descriptor.length_constant.is_some())
                );
                assert_ne!(descriptor.effect, Effect::None);
                let start = descriptor
                    .start_parameter
                    .and_then(|slot| self.symbol_if_trackable(&call.arguments[slot]));
                let mut length = descriptor
                    .length_parameter
                    .and_then(|slot| self.symbol_if_trackable(&call.arguments[slot]));
                if let Some(constant) = descriptor.length_constant {
                    length = Some(match constant {
                        1 => ONE_VALUE.into(),
                        32 => THIRTY_TWO_VALUE.into(),
                        other => panic!("unsupported length constant {}", other),
                    });
                }
                Operation {
                    location: descriptor.location,
                    effect: descriptor.effect,
                    start,
                    length,
                }
            })
            .collect()
    }

    /// The symbol standing for a start/length argument: an SSA variable
    /// name, or one of the reserved constant names for the literals 0, 1
    /// and 32. Anything else is untracked.
    fn symbol_if_trackable(&self, argument: &Expression) -> Option<IdentStr> {
        match argument {
            Expression::Identifier(identifier)
                if self.ssa_values.contains_key(&identifier.name) =>
            {
                Some(identifier.name.clone())
            }
            Expression::Literal(literal) => super::pseudo_constant_name(&literal.value),
            _ => None,
        }
    }

    fn classify_store(&mut self, statement: &Statement) {
        let StatementKind::Expression(expression) = &statement.kind else {
            return;
        };
        let Expression::Call(call) = expression else {
            panic!("statement-level expressions must be function calls");
        };
        let Some(instruction) = self.dialect.instruction(&call.function.name) else {
            return;
        };

        // A compound argument may have been evaluated for its side
        // effects, so the statement cannot be removed as a whole.
        if !call
            .arguments
            .iter()
            .all(|argument| matches!(argument, Expression::Identifier(_) | Expression::Literal(_)))
        {
            return;
        }

        // Classify both through the semantic tables and through the opcode
        // list; the two must agree.
        let is_storage_write = instruction == Instruction::SStore;
        let is_memory_write = matches!(
            instruction,
            Instruction::ExtCodeCopy
                | Instruction::CodeCopy
                | Instruction::CallDataCopy
                | Instruction::ReturnDataCopy
                | Instruction::MStore
                | Instruction::MStore8
        );
        let is_candidate = semantics::other_state(instruction) != Effect::Write
            && (semantics::storage(instruction) == Effect::Write
                || (!self.ignore_memory && semantics::memory(instruction) == Effect::Write));
        assert_eq!(
            is_candidate,
            is_storage_write || (!self.ignore_memory && is_memory_write),
            "semantic tables disagree with the store opcode list for {}",
            instruction
        );
        if !is_candidate {
            return;
        }
        if instruction == Instruction::ReturnDataCopy && !self.returndatacopy_is_removable(call) {
            return;
        }

        self.all_stores.insert(statement.id);
        let mut operations = self.operations_from_function_call(call);
        assert_eq!(
            operations.len(),
            1,
            "a candidate store performs exactly one operation"
        );
        let operation = operations.pop().unwrap();
        self.active.get_mut(operation.location).insert(statement.id);
        self.store_operations.insert(statement.id, operation);
    }

    /// Out-of-bounds access to the returndata buffer reverts, so only the
    /// shape `returndatacopy(X, 0, returndatasize())`, which can never be
    /// out of bounds, may be removed.
    fn returndatacopy_is_removable(&self, call: &FunctionCall) -> bool {
        let (Some(start), Some(length)) = (
            self.symbol_if_trackable(&call.arguments[1]),
            self.symbol_if_trackable(&call.arguments[2]),
        ) else {
            return false;
        };
        if !self.knowledge.known_to_be_zero(&start) {
            return false;
        }
        match self.ssa_values.get(&length) {
            Some(Expression::Call(length_call)) => {
                self.dialect.instruction(&length_call.function.name)
                    == Some(Instruction::ReturnDataSize)
            }
            _ => false,
        }
    }

    fn mark_active_as_used(&mut self, only: Option<Location>) {
        if only.is_none() || only == Some(Location::Memory) {
            self.used_stores.extend(self.active.memory.iter().copied());
        }
        if only.is_none() || only == Some(Location::Storage) {
            self.used_stores.extend(self.active.storage.iter().copied());
        }
        self.clear_active(only);
    }

    fn clear_active(&mut self, only: Option<Location>) {
        if only.is_none() || only == Some(Location::Memory) {
            self.active.memory = im::HashSet::new();
        }
        if only.is_none() || only == Some(Location::Storage) {
            self.active.storage = im::HashSet::new();
        }
    }
}

/// No byte touched by `op1` is touched by `op2`. A `false` answer is
/// always safe.
pub fn known_unrelated(knowledge: &KnowledgeBase, op1: &Operation, op2: &Operation) -> bool {
    if op1.location != op2.location {
        return true;
    }
    match op1.location {
        Location::Storage => {
            if let (Some(start1), Some(start2)) = (&op1.start, &op2.start) {
                let slot_length = |length: &Option<IdentStr>| {
                    length
                        .as_ref()
                        .and_then(|length| knowledge.value_if_known_constant(length))
                };
                assert!(
                    slot_length(&op1.length).is_some_and(|length| length.is_one())
                        && slot_length(&op2.length).is_some_and(|length| length.is_one()),
                    "storage operations cover exactly one slot"
                );
                return knowledge.known_to_be_different(start1, start2);
            }
            false
        }
        Location::Memory => {
            let zero_length = |operation: &Operation| {
                operation
                    .length
                    .as_ref()
                    .is_some_and(|length| knowledge.known_to_be_zero(length))
            };
            if zero_length(op1) || zero_length(op2) {
                return true;
            }

            let constant = |symbol: &Option<IdentStr>| {
                symbol
                    .as_ref()
                    .and_then(|symbol| knowledge.value_if_known_constant(symbol))
            };
            // One constant-placed range ends before the other starts.
            // Values are below 2^256, so the sum cannot wrap.
            let ends_before = |left: &Operation, right: &Operation| -> bool {
                match (constant(&left.start), constant(&left.length), constant(&right.start)) {
                    (Some(start), Some(length), Some(other_start)) => start + length <= other_start,
                    _ => false,
                }
            };
            if ends_before(op1, op2) || ends_before(op2, op1) {
                return true;
            }

            // Two sub-word accesses whose starts are at least a word
            // apart cannot overlap.
            if let (Some(start1), Some(start2)) = (&op1.start, &op2.start) {
                let word = BigUint::from(32u32);
                let within_word = |length: &Option<IdentStr>| {
                    constant(length).is_some_and(|length| length <= word)
                };
                if within_word(&op1.length)
                    && within_word(&op2.length)
                    && knowledge.known_to_be_different_by_at_least_32(start1, start2)
                {
                    return true;
                }
            }
            false
        }
    }
}

/// Every byte written by `covered` is also written by `covering`. A
/// `false` answer is always safe.
pub fn known_covered(knowledge: &KnowledgeBase, covered: &Operation, covering: &Operation) -> bool {
    if covered.location != covering.location {
        return false;
    }
    if covered.start.is_some()
        && covered.start == covering.start
        && covered.length.is_some()
        && covered.length == covering.length
    {
        return true;
    }
    // Storage coverage needs syntactic equality: every slot write covers
    // exactly one word and there is nothing to reason about arithmetically.
    if covered.location == Location::Memory {
        if covered
            .length
            .as_ref()
            .is_some_and(|length| knowledge.known_to_be_zero(length))
        {
            return true;
        }
        let (Some(covered_start), Some(covered_length), Some(covering_start), Some(covering_length)) = (
            &covered.start,
            &covered.length,
            &covering.start,
            &covering.length,
        ) else {
            return false;
        };
        let covered_length_value = knowledge.value_if_known_constant(covered_length);
        let covering_length_value = knowledge.value_if_known_constant(covering_length);
        if knowledge.known_to_be_equal(covered_start, covering_start) {
            if let (Some(covered_length_value), Some(covering_length_value)) =
                (&covered_length_value, &covering_length_value)
            {
                if covered_length_value <= covering_length_value {
                    return true;
                }
            }
        }
        let covered_start_value = knowledge.value_if_known_constant(covered_start);
        let covering_start_value = knowledge.value_if_known_constant(covering_start);
        if let (
            Some(covered_start_value),
            Some(covering_start_value),
            Some(covered_length_value),
            Some(covering_length_value),
        ) = (
            covered_start_value,
            covering_start_value,
            covered_length_value,
            covering_length_value,
        ) {
            // Values are below 2^256, so the sums cannot wrap.
            if covering_start_value <= covered_start_value
                && covered_start_value + covered_length_value
                    <= covering_start_value + covering_length_value
            {
                return true;
            }
        }
    }
    false
}
