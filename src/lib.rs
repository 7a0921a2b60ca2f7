#![warn(
    clippy::cargo,
    clippy::complexity,
    clippy::correctness,
    clippy::perf,
    clippy::style,
    clippy::suspicious,
    clippy::pedantic,
    clippy::nursery,
    clippy::arithmetic_side_effects,
    clippy::format_push_string,
    clippy::if_then_some_else_none,
    clippy::missing_asserts_for_indexing,
    clippy::redundant_type_annotations,
    clippy::unwrap_in_result
)]
mod address;
mod arena;
mod asm;
mod cpu;
mod inst;
mod program;
mod symbols;
mod types;

use std::io;

pub use address::{Access, Address, Target};
pub use arena::{Arena, Idx};
pub use asm::{assemble, parse_literal, Assembler, START_LABEL};
pub use cpu::{Alu, Cpu, Cu, ReturnSlot, JMP_LIMIT};
pub use inst::{Instruction, Mnemonic, Op, Operand, OperandClass, Reference, Register};
pub use program::{CellId, LineRecord, Program, SourceFile};
pub use symbols::{Symbol, SymbolId, SymbolTable};
pub use types::{AddressNote, AlaError, AlaResult, RunFlags, SourceRef, Word};

/// Assembles the sources and runs them against stdin and stdout.
///
/// # Errors
///
/// Will return an `Err` if the sources could not be assembled or the program
/// failed while running
pub fn run_sources(sources: &[(&str, &str)], flags: RunFlags) -> AlaResult<()> {
    let program = assemble(sources, flags)?;
    let mut cpu = Cpu::new(program, flags);
    cpu.run(&mut io::stdin().lock(), &mut io::stdout().lock())
}
