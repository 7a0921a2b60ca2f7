use std::fmt;

use bitflags::bitflags;
use thiserror::Error;

use crate::inst::Mnemonic;

/// Contents of ACC, IX and every data cell.
pub type Word = i64;

bitflags! {
    /// Run modes selected on the command line.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct RunFlags: u8 {
        /// Disable the per-line jump limit guard.
        const NO_JMP_LIMITS = 1;
        /// `OUT` prints ACC as a decimal number instead of a character.
        const PRINT_NUMBERS = 1 << 1;
        /// Enable the `CALL` and `RETURN` extras.
        const EXTRA = 1 << 2;
    }
}

impl RunFlags {
    /// Looks up a flag by its command line name, ignoring case.
    #[must_use]
    pub fn from_flag_name(name: &str) -> Option<Self> {
        [
            ("no-jmp-limits", Self::NO_JMP_LIMITS),
            ("print-numbers", Self::PRINT_NUMBERS),
            ("extra", Self::EXTRA),
        ]
        .into_iter()
        .find_map(|(n, flag)| n.eq_ignore_ascii_case(name).then_some(flag))
    }
}

/// A file name and a 0-based line, rendered as `file(line)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRef {
    pub file: String,
    pub line: usize,
}

impl SourceRef {
    #[must_use]
    pub fn new(file: &str, line: usize) -> Self {
        Self {
            file: file.to_owned(),
            line,
        }
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}({})", self.file, self.line)
    }
}

/// Extra context attached to addressing errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddressNote {
    #[default]
    None,
    /// The address was formed as `base + IX`.
    Indexed { base: Word },
    /// The address was read out of the data cell on line `cell`.
    Indirect { cell: usize },
}

impl fmt::Display for AddressNote {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::None => Ok(()),
            Self::Indexed { base } => write!(
                f,
                "\nNOTE: Indexed addressing, the address is {base} + IX"
            ),
            Self::Indirect { cell } => write!(
                f,
                "\nNOTE: Indirect addressing, the address was read from the data in address {cell}"
            ),
        }
    }
}

#[derive(Error, Debug)]
pub enum AlaError {
    #[error(
        "{at}: ERROR: Unknown token '{token}'.\n\
         NOTE: Make labels with an identifier followed by a colon, like '{token}: '"
    )]
    UnknownToken { at: SourceRef, token: String },

    #[error("{at}: ERROR: Invalid value '{value}' for label '{label}'")]
    InvalidLabelValue {
        at: SourceRef,
        label: String,
        value: String,
    },

    #[error("{at}: ERROR: The instruction '{mnemonic}' doesn't take an operand")]
    UnexpectedOperand { at: SourceRef, mnemonic: Mnemonic },

    #[error("{at}: ERROR: The instruction '{mnemonic}' is missing an operand")]
    MissingOperand { at: SourceRef, mnemonic: Mnemonic },

    #[error("{at}: ERROR: Unknown token(s) '{trailing}' after '{operand}'")]
    TrailingTokens {
        at: SourceRef,
        trailing: String,
        operand: String,
    },

    #[error(
        "{at}: ERROR: Invalid operand '{operand}' for {mnemonic}.\n\
         NOTE: {mnemonic} only takes immediate numbers starting with '#', like #5"
    )]
    ImmediateRequired {
        at: SourceRef,
        mnemonic: Mnemonic,
        operand: String,
    },

    #[error("{at}: ERROR: Invalid number '{operand}' for {mnemonic}")]
    InvalidNumber {
        at: SourceRef,
        mnemonic: Mnemonic,
        operand: String,
    },

    #[error(
        "{at}: ERROR: Invalid operand '{operand}' for {mnemonic}.\n\
         NOTE: {mnemonic} doesn't have immediate addressing"
    )]
    ImmediateNotAllowed {
        at: SourceRef,
        mnemonic: Mnemonic,
        operand: String,
    },

    #[error(
        "{at}: ERROR: Invalid operand '{operand}' for {mnemonic}.\n\
         NOTE: {mnemonic} only takes labels"
    )]
    LabelRequired {
        at: SourceRef,
        mnemonic: Mnemonic,
        operand: String,
    },

    #[error(
        "{at}: ERROR: Invalid register '{operand}' for {mnemonic}.\n\
         NOTE: The register must be ACC or IX"
    )]
    InvalidRegister {
        at: SourceRef,
        mnemonic: Mnemonic,
        operand: String,
    },

    #[error("{at}: ERROR: Invalid label '{name}', it is a reserved instruction name")]
    ReservedLabel { at: SourceRef, name: String },

    #[error(
        "{at}: ERROR: The instruction '{mnemonic}' doesn't exist in A level assembly\n\
         NOTE: To use this instruction, use the flag '-extra'"
    )]
    ExtraInstruction { at: SourceRef, mnemonic: Mnemonic },

    #[error(
        "{at}: ERROR: Label '{name}' already declared.\n\
         {first}: NOTE: See initial declaration of label"
    )]
    DuplicateLabel {
        at: SourceRef,
        name: String,
        first: SourceRef,
    },

    #[error(
        "{at}: ERROR: There can only be one START label\n\
         {first}: NOTE: See first definition of the START label"
    )]
    DuplicateStart { at: SourceRef, first: SourceRef },

    #[error("{at}: ERROR: The START label must be attached to an instruction")]
    StartNotInstruction { at: SourceRef },

    #[error("ERROR: Start label not found")]
    MissingStart,

    #[error("{at}: ERROR: Undefined label '{name}'")]
    UndefinedLabel { at: SourceRef, name: String },

    #[error("{at}: ERROR: Incorrect address {address} for operand, not in file {file}{note}")]
    AddressNotInProgram {
        at: SourceRef,
        address: Word,
        file: String,
        note: AddressNote,
    },

    #[error("{at}: ERROR: No data in address {address} in file {file}{note}")]
    NoData {
        at: SourceRef,
        address: usize,
        file: String,
        note: AddressNote,
    },

    #[error("{at}: ERROR: Invalid address {address} in file {file}, there is no data to store into{note}")]
    InvalidStore {
        at: SourceRef,
        address: usize,
        file: String,
        note: AddressNote,
    },

    #[error("{at}: ERROR: Invalid jump address {address} in file {file}, it contains data")]
    JumpIntoData {
        at: SourceRef,
        address: usize,
        file: String,
    },

    #[error("{at}: ERROR: Invalid jump address {address} in file {file}, there is no instruction on that line")]
    NoInstruction {
        at: SourceRef,
        address: usize,
        file: String,
    },

    #[error(
        "{at}: ERROR: Maximum jump limit reached jumping to {target}\n\
         NOTE: If you want to disable this error use the '-no-jmp-limits' flag"
    )]
    JumpLimit { at: SourceRef, target: SourceRef },

    #[error("{at}: ERROR: RETURN without a preceding CALL")]
    ReturnWithoutCall { at: SourceRef },

    #[error("ERROR: No input files found")]
    NoInputFiles,

    #[error("ERROR: {0}")]
    Io(#[from] std::io::Error),
}

pub type AlaResult<T> = Result<T, AlaError>;
