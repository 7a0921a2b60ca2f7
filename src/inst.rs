use strum::{Display, EnumIter, EnumString};

use crate::symbols::SymbolId;
use crate::types::Word;

/// Instruction names as they are spelled in source, matched ignoring case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Mnemonic {
    Ldm,
    Ldd,
    Ldi,
    Ldx,
    Ldr,
    Sto,
    Stx,
    Sti,
    Add,
    Jmp,
    Cmp,
    Jpe,
    Jpn,
    Inp,
    Out,
    And,
    Xor,
    Or,
    Lsl,
    Lsr,
    End,
    Inc,
    Dec,
    Call,
    Return,
}

/// The operand syntax a mnemonic accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandClass {
    None,
    /// `#n` only.
    Immediate,
    /// A bare address or label, never `#n`.
    Address,
    /// Either `#n` or an address.
    Dual,
    /// `ACC` or `IX`.
    Register,
    /// A label only.
    Label,
}

impl Mnemonic {
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        token.parse().ok()
    }

    #[must_use]
    pub const fn class(self) -> OperandClass {
        match self {
            Self::Inp | Self::Out | Self::End | Self::Return => OperandClass::None,
            Self::Ldm | Self::Ldr | Self::Lsl | Self::Lsr => OperandClass::Immediate,
            Self::Ldd
            | Self::Ldi
            | Self::Ldx
            | Self::Sto
            | Self::Stx
            | Self::Sti
            | Self::Add
            | Self::Jmp
            | Self::Jpe
            | Self::Jpn => OperandClass::Address,
            Self::Cmp | Self::And | Self::Xor | Self::Or => OperandClass::Dual,
            Self::Inc | Self::Dec => OperandClass::Register,
            Self::Call => OperandClass::Label,
        }
    }

    /// Instructions that only exist with the `extra` flag.
    #[must_use]
    pub const fn is_extra(self) -> bool {
        matches!(self, Self::Call | Self::Return)
    }

    #[must_use]
    pub const fn describe(self) -> &'static str {
        match self {
            Self::Ldm => "LDM #n: Immediate addressing. Load the number n to ACC",
            Self::Ldd => "LDD <address>: Direct addressing. Load the contents of the location at the given address to ACC",
            Self::Ldi => "LDI <address>: Indirect addressing. The address to be used is at the given address.\n\
                          Load the contents of this second address to ACC",
            Self::Ldx => "LDX <address>: Indexed addressing. Form the address from <address> + the contents of the index register.\n\
                          Copy the contents of this calculated address to ACC",
            Self::Ldr => "LDR #n: Immediate addressing. Load the number n to IX",
            Self::Sto => "STO <address>: Store the contents of ACC at the given address",
            Self::Stx => "STX <address>: Indexed addressing. Form the address from <address> + the contents of the index register.\n\
                          Copy the contents from ACC to this calculated address",
            Self::Sti => "STI <address>: Indirect addressing. The address to be used is at the given address.\n\
                          Store the contents of ACC at this second address",
            Self::Add => "ADD <address>: Add the contents of the given address to the ACC",
            Self::Jmp => "JMP <address>: Jump to the given address",
            Self::Cmp => "CMP <address>: Compare the contents of ACC with the contents of <address>\n\
                          CMP #n: Compare the contents of ACC with number n",
            Self::Jpe => "JPE <address>: Following a compare instruction, jump to <address> if the compare was True",
            Self::Jpn => "JPN <address>: Following a compare instruction, jump to <address> if the compare was False",
            Self::Inp => "INP: Key in a character and store its ASCII value in ACC",
            Self::Out => "OUT: Output to the screen the ASCII value in ACC",
            Self::And => "AND #n: Bitwise AND operation of the contents of ACC with the operand\n\
                          AND <address>: Bitwise AND operation of the contents of ACC with the contents of <address>",
            Self::Xor => "XOR #n: Bitwise XOR operation of the contents of ACC with the operand\n\
                          XOR <address>: Bitwise XOR operation of the contents of ACC with the contents of <address>",
            Self::Or => "OR #n: Bitwise OR operation of the contents of ACC with the operand\n\
                         OR <address>: Bitwise OR operation of the contents of ACC with the contents of <address>",
            Self::Lsl => "LSL #n: Shift the bits in ACC n places to the left. Zeros are introduced on the right-hand end",
            Self::Lsr => "LSR #n: Shift the bits in ACC n places to the right. Zeros are introduced on the left-hand end",
            Self::End => "END: Return control to the operating system",
            Self::Inc => "INC <register>: Add 1 to the contents of the register (ACC or IX)",
            Self::Dec => "DEC <register>: Subtract 1 from the contents of the register (ACC or IX)",
            Self::Call => "CALL <label>: Records the current address and jumps to label (extra)",
            Self::Return => "RETURN: Returns to the last recorded address, set by a CALL instruction (extra)",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    Acc,
    Ix,
}

impl Register {
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "ACC" => Some(Self::Acc),
            "IX" => Some(Self::Ix),
            _ => None,
        }
    }
}

/// A source-line address, either written out or through a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reference {
    Literal(Word),
    Label(SymbolId),
}

/// Operand of the instructions that take either `#n` or an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Immediate(Word),
    Memory(Reference),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Ldm(Word),
    Ldd(Reference),
    Ldi(Reference),
    Ldx(Reference),
    Ldr(Word),
    Sto(Reference),
    Stx(Reference),
    Sti(Reference),
    Add(Reference),
    Jmp(Reference),
    Cmp(Operand),
    Jpe(Reference),
    Jpn(Reference),
    Inp,
    Out,
    And(Operand),
    Xor(Operand),
    Or(Operand),
    Lsl(Word),
    Lsr(Word),
    End,
    IncAcc,
    DecAcc,
    IncIx,
    DecIx,
    Call(SymbolId),
    Return,
}

/// One assembled line of code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    /// Index of the file the instruction was read from.
    pub file: usize,
    /// 0-based line within that file.
    pub line: usize,
    pub op: Op,
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn mnemonics_ignore_case() {
        assert_eq!(Mnemonic::parse("ldm"), Some(Mnemonic::Ldm));
        assert_eq!(Mnemonic::parse("Return"), Some(Mnemonic::Return));
        assert_eq!(Mnemonic::parse("OR"), Some(Mnemonic::Or));
        assert_eq!(Mnemonic::parse("LOOP"), None);
    }

    #[test]
    fn mnemonics_display_upper_case() {
        assert_eq!(Mnemonic::Jpn.to_string(), "JPN");
        assert_eq!(Mnemonic::Call.to_string(), "CALL");
    }

    #[test]
    fn every_mnemonic_is_documented_under_its_name() {
        for mnemonic in Mnemonic::iter() {
            assert!(mnemonic.describe().starts_with(&mnemonic.to_string()));
        }
    }

    #[test]
    fn registers_are_case_sensitive() {
        assert_eq!(Register::parse("IX"), Some(Register::Ix));
        assert_eq!(Register::parse("acc"), None);
    }

    #[test]
    fn operand_classes() {
        assert_eq!(Mnemonic::Out.class(), OperandClass::None);
        assert_eq!(Mnemonic::Lsr.class(), OperandClass::Immediate);
        assert_eq!(Mnemonic::Sti.class(), OperandClass::Address);
        assert_eq!(Mnemonic::Xor.class(), OperandClass::Dual);
        assert_eq!(Mnemonic::Dec.class(), OperandClass::Register);
        assert_eq!(Mnemonic::Call.class(), OperandClass::Label);
        assert!(Mnemonic::Return.is_extra());
        assert!(!Mnemonic::End.is_extra());
    }
}
