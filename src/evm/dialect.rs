use std::collections::HashMap;

use strum::IntoEnumIterator;

use crate::parse::ast::IdentStr;

use super::{
    instruction::{self, Instruction},
    semantics::{self, ControlFlowSideEffects, Effect},
};

/// Combined state interactions of an instruction, expression, or function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SideEffects {
    pub movable: bool,
    pub storage: Effect,
    pub memory: Effect,
    pub other_state: Effect,
}

impl SideEffects {
    /// The neutral element: a pure expression.
    pub fn none() -> Self {
        SideEffects {
            movable: true,
            storage: Effect::None,
            memory: Effect::None,
            other_state: Effect::None,
        }
    }

    /// What has to be assumed about a call with unknown semantics.
    pub fn worst() -> Self {
        SideEffects {
            movable: false,
            storage: Effect::ReadWrite,
            memory: Effect::ReadWrite,
            other_state: Effect::ReadWrite,
        }
    }

    pub fn combine(&mut self, other: &SideEffects) {
        self.movable &= other.movable;
        self.storage = self.storage.combine(other.storage);
        self.memory = self.memory.combine(other.memory);
        self.other_state = self.other_state.combine(other.other_state);
    }
}

#[derive(Debug, Clone)]
pub struct Builtin {
    pub name: IdentStr,
    pub instruction: Instruction,
    pub parameters: usize,
    pub returns: usize,
    pub side_effects: SideEffects,
    pub control_flow: ControlFlowSideEffects,
}

/// The builtin table plus dialect-level policy knobs.
pub struct Dialect {
    builtins: HashMap<IdentStr, Builtin>,
    /// Whether code compiled in this dialect is embedded in a larger object
    /// whose subroutines exchange data through memory. When unset, memory
    /// contents are dead once the outermost block ends.
    pub provides_object_access: bool,
}

impl Dialect {
    pub fn evm() -> Self {
        let mut builtins = HashMap::new();
        for instruction in Instruction::iter() {
            let info = instruction::info(instruction);
            let name: IdentStr = instruction.to_string().into();
            builtins.insert(
                name.clone(),
                Builtin {
                    name,
                    instruction,
                    parameters: info.args,
                    returns: info.ret,
                    side_effects: SideEffects {
                        movable: semantics::movable(instruction),
                        storage: semantics::storage(instruction),
                        memory: semantics::memory(instruction),
                        other_state: semantics::other_state(instruction),
                    },
                    control_flow: semantics::control_flow(instruction),
                },
            );
        }
        Dialect {
            builtins,
            provides_object_access: false,
        }
    }

    pub fn evm_with_object_access() -> Self {
        Dialect {
            provides_object_access: true,
            ..Self::evm()
        }
    }

    pub fn builtin(&self, name: &str) -> Option<&Builtin> {
        self.builtins.get(name)
    }

    /// The instruction behind a builtin call, if the callee is a builtin.
    pub fn instruction(&self, name: &str) -> Option<Instruction> {
        self.builtin(name).map(|builtin| builtin.instruction)
    }
}
