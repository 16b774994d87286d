use strum::{Display, EnumIter, EnumString};

/// The subset of the EVM instruction set surfaced as IL builtins. Builtin
/// names are the lowercase instruction names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Instruction {
    Stop,
    Add,
    Mul,
    Sub,
    Div,
    SDiv,
    Mod,
    SMod,
    AddMod,
    MulMod,
    Exp,
    SignExtend,
    Lt,
    Gt,
    SLt,
    SGt,
    Eq,
    IsZero,
    And,
    Or,
    Xor,
    Not,
    Byte,
    Shl,
    Shr,
    Sar,
    Keccak256,
    Address,
    Balance,
    Origin,
    Caller,
    CallValue,
    CallDataLoad,
    CallDataSize,
    CallDataCopy,
    CodeSize,
    CodeCopy,
    GasPrice,
    ExtCodeSize,
    ExtCodeCopy,
    ReturnDataSize,
    ReturnDataCopy,
    ExtCodeHash,
    BlockHash,
    Coinbase,
    Timestamp,
    Number,
    PrevRandao,
    GasLimit,
    ChainId,
    SelfBalance,
    BaseFee,
    Pop,
    MLoad,
    MStore,
    MStore8,
    SLoad,
    SStore,
    MSize,
    Gas,
    Log0,
    Log1,
    Log2,
    Log3,
    Log4,
    Create,
    Call,
    CallCode,
    Return,
    DelegateCall,
    Create2,
    StaticCall,
    Revert,
    Invalid,
    SelfDestruct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstructionInfo {
    /// Number of stack arguments.
    pub args: usize,
    /// Number of produced stack values.
    pub ret: usize,
}

pub fn info(instruction: Instruction) -> InstructionInfo {
    use Instruction::*;
    let (args, ret) = match instruction {
        Stop | Invalid => (0, 0),
        Address | Origin | Caller | CallValue | CallDataSize | CodeSize | GasPrice
        | ReturnDataSize | Coinbase | Timestamp | Number | PrevRandao | GasLimit | ChainId
        | SelfBalance | BaseFee | MSize | Gas => (0, 1),
        IsZero | Not | Balance | CallDataLoad | ExtCodeSize | ExtCodeHash | BlockHash | MLoad
        | SLoad => (1, 1),
        Pop | SelfDestruct => (1, 0),
        Add | Mul | Sub | Div | SDiv | Mod | SMod | Exp | SignExtend | Lt | Gt | SLt | SGt
        | Eq | And | Or | Xor | Byte | Shl | Shr | Sar | Keccak256 => (2, 1),
        AddMod | MulMod => (3, 1),
        MStore | MStore8 | SStore | Return | Revert | Log0 => (2, 0),
        CallDataCopy | CodeCopy | ReturnDataCopy | Log1 => (3, 0),
        ExtCodeCopy | Log2 => (4, 0),
        Log3 => (5, 0),
        Log4 => (6, 0),
        Create => (3, 1),
        Create2 => (4, 1),
        Call | CallCode => (7, 1),
        DelegateCall | StaticCall => (6, 1),
    };
    InstructionInfo { args, ret }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn names_are_lowercase_and_unambiguous() {
        for instruction in Instruction::iter() {
            let name = instruction.to_string();
            assert_eq!(name, name.to_lowercase());
            assert_eq!(Instruction::from_str(&name), Ok(instruction));
        }
        assert_eq!(Instruction::MStore8.to_string(), "mstore8");
        assert_eq!(Instruction::ReturnDataCopy.to_string(), "returndatacopy");
    }
}
