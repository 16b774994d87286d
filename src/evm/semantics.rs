//! Semantic classification of instructions: which state each instruction
//! touches, how, and at which byte ranges.

use super::instruction::Instruction;

/// How an instruction or function interacts with one kind of state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    None,
    Read,
    Write,
    ReadWrite,
}

impl Effect {
    pub fn reads(self) -> bool {
        matches!(self, Effect::Read | Effect::ReadWrite)
    }

    pub fn writes(self) -> bool {
        matches!(self, Effect::Write | Effect::ReadWrite)
    }

    pub fn from_flags(reads: bool, writes: bool) -> Effect {
        match (reads, writes) {
            (false, false) => Effect::None,
            (true, false) => Effect::Read,
            (false, true) => Effect::Write,
            (true, true) => Effect::ReadWrite,
        }
    }

    pub fn combine(self, other: Effect) -> Effect {
        Effect::from_flags(self.reads() || other.reads(), self.writes() || other.writes())
    }
}

/// The two byte-addressed state spaces the optimizer tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Location {
    Memory,
    Storage,
}

/// Whether a call can return control to its caller and whether it can end
/// the surrounding transaction successfully. A call that can do neither
/// always reverts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlFlowSideEffects {
    pub can_continue: bool,
    pub can_terminate: bool,
}

impl Default for ControlFlowSideEffects {
    fn default() -> Self {
        ControlFlowSideEffects {
            can_continue: true,
            can_terminate: false,
        }
    }
}

pub fn control_flow(instruction: Instruction) -> ControlFlowSideEffects {
    use Instruction::*;
    match instruction {
        Stop | Return | SelfDestruct => ControlFlowSideEffects {
            can_continue: false,
            can_terminate: true,
        },
        Revert | Invalid => ControlFlowSideEffects {
            can_continue: false,
            can_terminate: false,
        },
        _ => ControlFlowSideEffects::default(),
    }
}

pub fn storage(instruction: Instruction) -> Effect {
    use Instruction::*;
    match instruction {
        SStore => Effect::Write,
        SLoad | StaticCall => Effect::Read,
        Call | CallCode | DelegateCall | Create | Create2 => Effect::ReadWrite,
        _ => Effect::None,
    }
}

pub fn memory(instruction: Instruction) -> Effect {
    use Instruction::*;
    match instruction {
        CallDataCopy | CodeCopy | ExtCodeCopy | ReturnDataCopy | MStore | MStore8 => Effect::Write,
        Keccak256 | MLoad | MSize | Return | Revert | Log0 | Log1 | Log2 | Log3 | Log4
        | Create | Create2 => Effect::Read,
        Call | CallCode | DelegateCall | StaticCall => Effect::ReadWrite,
        _ => Effect::None,
    }
}

/// State other than storage and memory: balances, the returndata buffer,
/// other accounts' code, remaining gas, the log stream.
pub fn other_state(instruction: Instruction) -> Effect {
    use Instruction::*;
    match instruction {
        Call | CallCode | DelegateCall | StaticCall | Create | Create2 | SelfDestruct => {
            Effect::ReadWrite
        }
        Log0 | Log1 | Log2 | Log3 | Log4 => Effect::Write,
        Balance | SelfBalance | Gas | ReturnDataSize | ReturnDataCopy | ExtCodeSize
        | ExtCodeCopy | ExtCodeHash => Effect::Read,
        _ => Effect::None,
    }
}

/// Whether evaluating the instruction commutes with every other operation:
/// no state access and the result is fixed for the whole execution.
pub fn movable(instruction: Instruction) -> bool {
    use Instruction::*;
    matches!(
        instruction,
        Add | Mul
            | Sub
            | Div
            | SDiv
            | Mod
            | SMod
            | AddMod
            | MulMod
            | Exp
            | SignExtend
            | Lt
            | Gt
            | SLt
            | SGt
            | Eq
            | IsZero
            | And
            | Or
            | Xor
            | Not
            | Byte
            | Shl
            | Shr
            | Sar
            | Address
            | Origin
            | Caller
            | CallValue
            | CallDataLoad
            | CallDataSize
            | CodeSize
            | GasPrice
            | BlockHash
            | Coinbase
            | Timestamp
            | Number
            | PrevRandao
            | GasLimit
            | ChainId
            | BaseFee
    )
}

/// One state access performed by an instruction, with the argument slots
/// that carry its byte range. At most one of `length_parameter` and
/// `length_constant` is set; `length_constant` is in bytes and is only ever
/// 1 or 32.
#[derive(Debug, Clone, Copy)]
pub struct OperationDescriptor {
    pub location: Location,
    pub effect: Effect,
    pub start_parameter: Option<usize>,
    pub length_parameter: Option<usize>,
    pub length_constant: Option<u64>,
}

impl OperationDescriptor {
    fn new(location: Location, effect: Effect) -> Self {
        OperationDescriptor {
            location,
            effect,
            start_parameter: None,
            length_parameter: None,
            length_constant: None,
        }
    }

    fn range(location: Location, effect: Effect, start: usize, length: usize) -> Self {
        OperationDescriptor {
            start_parameter: Some(start),
            length_parameter: Some(length),
            ..Self::new(location, effect)
        }
    }

    fn fixed(location: Location, effect: Effect, start: usize, length: u64) -> Self {
        OperationDescriptor {
            start_parameter: Some(start),
            length_constant: Some(length),
            ..Self::new(location, effect)
        }
    }
}

/// The ordered list of state accesses an instruction performs, in terms of
/// its argument slots.
pub fn read_write_operations(instruction: Instruction) -> Vec<OperationDescriptor> {
    use Effect::{Read, Write};
    use Instruction::*;
    use Location::{Memory, Storage};
    match instruction {
        // Exactly one storage slot is affected.
        SStore => vec![OperationDescriptor::fixed(Storage, Write, 0, 1)],
        SLoad => vec![OperationDescriptor::fixed(Storage, Read, 0, 1)],
        MStore => vec![OperationDescriptor::fixed(Memory, Write, 0, 32)],
        MStore8 => vec![OperationDescriptor::fixed(Memory, Write, 0, 1)],
        MLoad => vec![OperationDescriptor::fixed(Memory, Read, 0, 32)],
        Revert | Return | Keccak256 | Log0 | Log1 | Log2 | Log3 | Log4 => {
            vec![OperationDescriptor::range(Memory, Read, 0, 1)]
        }
        ExtCodeCopy => vec![OperationDescriptor::range(Memory, Write, 1, 3)],
        CodeCopy | CallDataCopy | ReturnDataCopy => {
            vec![OperationDescriptor::range(Memory, Write, 0, 2)]
        }
        Call | CallCode => vec![
            OperationDescriptor::range(Memory, Read, 3, 4),
            OperationDescriptor::new(Storage, Read),
            OperationDescriptor::new(Storage, Write),
            OperationDescriptor::range(Memory, Write, 5, 6),
        ],
        DelegateCall => vec![
            OperationDescriptor::range(Memory, Read, 2, 3),
            OperationDescriptor::new(Storage, Read),
            OperationDescriptor::new(Storage, Write),
            OperationDescriptor::range(Memory, Write, 4, 5),
        ],
        StaticCall => vec![
            OperationDescriptor::range(Memory, Read, 2, 3),
            OperationDescriptor::new(Storage, Read),
            OperationDescriptor::range(Memory, Write, 4, 5),
        ],
        Create | Create2 => vec![
            OperationDescriptor::range(Memory, Read, 1, 2),
            OperationDescriptor::new(Storage, Read),
            OperationDescriptor::new(Storage, Write),
        ],
        // Reads the current memory size, but no particular bytes.
        MSize => vec![],
        _ => {
            assert!(
                storage(instruction) == Effect::None && memory(instruction) == Effect::None,
                "instruction {} touches storage or memory but has no operations",
                instruction
            );
            vec![]
        }
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::super::instruction::info;
    use super::*;

    #[test]
    fn descriptors_are_well_formed() {
        for instruction in Instruction::iter() {
            let arg_count = info(instruction).args;
            for descriptor in read_write_operations(instruction) {
                assert!(
                    !(descriptor.length_parameter.is_some() && descriptor.length_constant.is_some()),
                    "{}: both length forms set",
                    instruction
                );
                assert_ne!(descriptor.effect, Effect::None, "{}", instruction);
                if let Some(constant) = descriptor.length_constant {
                    assert!(constant == 1 || constant == 32, "{}", instruction);
                }
                for slot in [descriptor.start_parameter, descriptor.length_parameter]
                    .into_iter()
                    .flatten()
                {
                    assert!(slot < arg_count, "{}: parameter slot out of range", instruction);
                }
            }
        }
    }

    #[test]
    fn effect_combine_is_a_lattice_join() {
        assert_eq!(Effect::None.combine(Effect::Read), Effect::Read);
        assert_eq!(Effect::Read.combine(Effect::Write), Effect::ReadWrite);
        assert_eq!(Effect::Write.combine(Effect::Write), Effect::Write);
        assert_eq!(Effect::ReadWrite.combine(Effect::None), Effect::ReadWrite);
    }
}
