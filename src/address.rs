//! Translation from source-line addresses to data cells and instructions.
//!
//! Operands name a line of a file, not an instruction position. Data
//! instructions need that line to hold a data cell, jumps need it to hold
//! code, and both need it to exist.

use crate::inst::{Instruction, Reference};
use crate::program::{CellId, Program};
use crate::types::{AddressNote, AlaError, AlaResult, Word};

/// A line in a given file, as named by an operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Address {
    pub file: usize,
    pub line: Word,
}

impl Address {
    /// The same line number shifted by `offset`, in the same file.
    #[must_use]
    pub const fn offset(self, offset: Word) -> Self {
        Self {
            file: self.file,
            line: self.line.wrapping_add(offset),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

/// Where a jump lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    pub file: usize,
    pub line: usize,
    pub instruction: usize,
}

impl Program {
    /// Labels point into their own file, literals into the file of `at`.
    #[must_use]
    pub fn resolve(&self, at: &Instruction, reference: Reference) -> Address {
        match reference {
            Reference::Literal(line) => Address {
                file: at.file,
                line,
            },
            Reference::Label(id) => {
                let symbol = self.symbols.get(id);
                Address {
                    file: symbol.file,
                    line: Word::try_from(symbol.line).unwrap_or(Word::MAX),
                }
            }
        }
    }

    /// Checks that `address` names a line of its file.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the line is negative or past the end of the file
    pub fn locate(&self, at: &Instruction, address: Address, note: AddressNote) -> AlaResult<usize> {
        usize::try_from(address.line)
            .ok()
            .filter(|line| *line < self.files[address.file].lines.len())
            .ok_or_else(|| AlaError::AddressNotInProgram {
                at: self.origin(at),
                address: address.line,
                file: self.file_name(address.file).to_owned(),
                note,
            })
    }

    /// Finds the data cell an instruction reads or writes.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the address is outside the file or holds no data
    pub fn cell(
        &self,
        at: &Instruction,
        address: Address,
        access: Access,
        note: AddressNote,
    ) -> AlaResult<CellId> {
        let line = self.locate(at, address, note)?;
        self.line(address.file, line).data.ok_or_else(|| {
            let at = self.origin(at);
            let file = self.file_name(address.file).to_owned();
            match access {
                Access::Read => AlaError::NoData {
                    at,
                    address: line,
                    file,
                    note,
                },
                Access::Write => AlaError::InvalidStore {
                    at,
                    address: line,
                    file,
                    note,
                },
            }
        })
    }

    /// Follows an indirect operand: the cell at `address` holds a second
    /// address in the same file, whose cell is returned.
    ///
    /// # Errors
    ///
    /// Will return `Err` if either address is invalid or holds no data
    pub fn indirect_cell(&self, at: &Instruction, address: Address, access: Access) -> AlaResult<CellId> {
        let pointer = self.cell(at, address, Access::Read, AddressNote::None)?;
        let via = self.locate(at, address, AddressNote::None)?;
        let target = Address {
            file: address.file,
            line: self.cells[pointer],
        };
        self.cell(at, target, access, AddressNote::Indirect { cell: via })
    }

    /// Translates a jump or call operand into the instruction to continue at.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the line is outside the file, holds data, or holds
    /// no instruction
    pub fn jump_target(&self, at: &Instruction, address: Address) -> AlaResult<Target> {
        let line = self.locate(at, address, AddressNote::None)?;
        let record = self.line(address.file, line);
        let file = || self.file_name(address.file).to_owned();
        if record.data.is_some() {
            return Err(AlaError::JumpIntoData {
                at: self.origin(at),
                address: line,
                file: file(),
            });
        }
        let instruction = record.instruction.ok_or_else(|| AlaError::NoInstruction {
            at: self.origin(at),
            address: line,
            file: file(),
        })?;
        Ok(Target {
            file: address.file,
            line,
            instruction,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::assemble;
    use crate::types::RunFlags;

    fn program(text: &str) -> Program {
        assemble(&[("t.ala", text)], RunFlags::empty()).unwrap()
    }

    fn first(program: &Program) -> Instruction {
        program.instructions[0]
    }

    #[test]
    fn literal_addresses_stay_in_the_current_file() {
        let p = program("START: LDD 2\nEND\n7");
        let at = first(&p);
        let address = p.resolve(&at, Reference::Literal(2));
        assert_eq!(address, Address { file: 0, line: 2 });
        let cell = p.cell(&at, address, Access::Read, AddressNote::None).unwrap();
        assert_eq!(p.cells[cell], 7);
    }

    #[test]
    fn out_of_range_is_checked_first() {
        let p = program("START: END");
        let at = first(&p);
        for line in [-1, 1, 100] {
            let err = p
                .cell(&at, Address { file: 0, line }, Access::Read, AddressNote::None)
                .unwrap_err();
            assert!(matches!(err, AlaError::AddressNotInProgram { address, .. } if address == line));
        }
    }

    #[test]
    fn reads_and_writes_report_missing_data_differently() {
        let p = program("START: END\n// note");
        let at = first(&p);
        let code = Address { file: 0, line: 0 };
        assert!(matches!(
            p.cell(&at, code, Access::Read, AddressNote::None),
            Err(AlaError::NoData { address: 0, .. })
        ));
        assert!(matches!(
            p.cell(&at, code.offset(1), Access::Write, AddressNote::None),
            Err(AlaError::InvalidStore { address: 1, .. })
        ));
    }

    #[test]
    fn jumps_land_on_code_only() {
        let p = program("START: JMP 2\n5\nOUT\nSTOP:\nEND");
        let at = first(&p);
        let target = p.jump_target(&at, Address { file: 0, line: 2 }).unwrap();
        assert_eq!(
            target,
            Target {
                file: 0,
                line: 2,
                instruction: 1
            }
        );
        assert!(matches!(
            p.jump_target(&at, Address { file: 0, line: 1 }),
            Err(AlaError::JumpIntoData { address: 1, .. })
        ));
        assert!(matches!(
            p.jump_target(&at, Address { file: 0, line: 3 }),
            Err(AlaError::NoInstruction { address: 3, .. })
        ));
    }

    #[test]
    fn indirect_addresses_go_through_a_cell() {
        let p = program("START: LDI 1\n3\n0\n42");
        let at = first(&p);
        let cell = p
            .indirect_cell(&at, Address { file: 0, line: 1 }, Access::Read)
            .unwrap();
        assert_eq!(p.cells[cell], 42);

        let p = program("START: LDI 1\n9");
        let at = first(&p);
        let err = p
            .indirect_cell(&at, Address { file: 0, line: 1 }, Access::Read)
            .unwrap_err();
        assert!(matches!(
            err,
            AlaError::AddressNotInProgram {
                address: 9,
                note: AddressNote::Indirect { cell: 1 },
                ..
            }
        ));
    }
}
