use std::io::{self, Read, Write};

use log::{debug, trace};

use crate::address::{Access, Address, Target};
use crate::inst::{Instruction, Op, Operand, Reference};
use crate::program::{CellId, Program};
use crate::types::{AddressNote, AlaError, AlaResult, RunFlags, Word};

/// Jumps a single line may receive before the run is considered runaway.
pub const JMP_LIMIT: u32 = 100_000;

/// Control unit: where execution is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cu {
    pub pc: usize,
    pub file: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Alu {
    pub acc: Word,
    pub ix: Word,
    /// Result of the last `CMP`.
    pub compare: bool,
}

/// Saved by `CALL`. There is only one, so a nested `CALL` overwrites it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReturnSlot {
    pub pc: usize,
    pub file: usize,
}

enum Flow {
    Next,
    Jump { pc: usize, file: usize },
    Stop,
}

impl From<Target> for Flow {
    fn from(target: Target) -> Self {
        Self::Jump {
            pc: target.instruction,
            file: target.file,
        }
    }
}

#[derive(Debug)]
pub struct Cpu {
    pub cu: Cu,
    pub alu: Alu,
    pub ret: Option<ReturnSlot>,
    pub program: Program,
    flags: RunFlags,
}

impl Cpu {
    #[must_use]
    pub fn new(program: Program, flags: RunFlags) -> Self {
        let cu = Cu {
            pc: program.start,
            file: program
                .instructions
                .get(program.start)
                .map_or(0, |inst| inst.file),
        };
        Self {
            cu,
            alu: Alu::default(),
            ret: None,
            program,
            flags,
        }
    }

    /// Runs until `END` or until execution falls off the last instruction.
    ///
    /// # Errors
    ///
    /// Will return `Err` on the first invalid memory access or jump, when the
    /// jump limit is hit, or if reading input or writing output fails
    pub fn run<R: Read, W: Write>(&mut self, input: &mut R, output: &mut W) -> AlaResult<()> {
        debug!("running from instruction {}", self.cu.pc);
        while let Some(&inst) = self.program.instructions.get(self.cu.pc) {
            self.cu.file = inst.file;
            trace!(
                "{}: {:?} acc={} ix={} cmp={}",
                self.program.origin(&inst),
                inst.op,
                self.alu.acc,
                self.alu.ix,
                self.alu.compare
            );
            match self.step(&inst, input, output)? {
                Flow::Next => self.cu.pc = self.cu.pc.saturating_add(1),
                Flow::Jump { pc, file } => {
                    self.cu.pc = pc;
                    self.cu.file = file;
                }
                Flow::Stop => break,
            }
        }
        output.flush()?;
        debug!("stopped at instruction {}", self.cu.pc);
        Ok(())
    }

    fn step<R: Read, W: Write>(
        &mut self,
        inst: &Instruction,
        input: &mut R,
        output: &mut W,
    ) -> AlaResult<Flow> {
        match inst.op {
            Op::Ldm(n) => self.alu.acc = n,
            Op::Ldr(n) => self.alu.ix = n,
            Op::Ldd(r) => {
                let cell = self.direct(inst, r, Access::Read)?;
                self.alu.acc = self.program.cells[cell];
            }
            Op::Ldi(r) => {
                let cell = self.indirect(inst, r, Access::Read)?;
                self.alu.acc = self.program.cells[cell];
            }
            Op::Ldx(r) => {
                let cell = self.indexed(inst, r, Access::Read)?;
                self.alu.acc = self.program.cells[cell];
            }
            Op::Sto(r) => {
                let cell = self.direct(inst, r, Access::Write)?;
                self.program.cells[cell] = self.alu.acc;
            }
            Op::Stx(r) => {
                let cell = self.indexed(inst, r, Access::Write)?;
                self.program.cells[cell] = self.alu.acc;
            }
            Op::Sti(r) => {
                let cell = self.indirect(inst, r, Access::Write)?;
                self.program.cells[cell] = self.alu.acc;
            }
            Op::Add(r) => {
                let cell = self.direct(inst, r, Access::Read)?;
                self.alu.acc = self.alu.acc.wrapping_add(self.program.cells[cell]);
            }
            Op::Cmp(operand) => self.alu.compare = self.alu.acc == self.operand(inst, operand)?,
            Op::And(operand) => self.alu.acc &= self.operand(inst, operand)?,
            Op::Xor(operand) => self.alu.acc ^= self.operand(inst, operand)?,
            Op::Or(operand) => self.alu.acc |= self.operand(inst, operand)?,
            Op::Lsl(n) => self.alu.acc = shift_left(self.alu.acc, n),
            Op::Lsr(n) => self.alu.acc = shift_right(self.alu.acc, n),
            Op::IncAcc => self.alu.acc = self.alu.acc.wrapping_add(1),
            Op::DecAcc => self.alu.acc = self.alu.acc.wrapping_sub(1),
            Op::IncIx => self.alu.ix = self.alu.ix.wrapping_add(1),
            Op::DecIx => self.alu.ix = self.alu.ix.wrapping_sub(1),
            Op::Inp => {
                output.flush()?;
                self.alu.acc = read_char(input)?;
            }
            Op::Out => {
                if self.flags.contains(RunFlags::PRINT_NUMBERS) {
                    writeln!(output, "{}", self.alu.acc)?;
                } else {
                    output.write_all(&self.alu.acc.to_le_bytes()[..1])?;
                }
            }
            Op::Jmp(r) => return self.jump(inst, r),
            Op::Jpe(r) if self.alu.compare => return self.jump(inst, r),
            Op::Jpn(r) if !self.alu.compare => return self.jump(inst, r),
            Op::Jpe(_) | Op::Jpn(_) => {}
            Op::Call(id) => {
                let address = self.program.resolve(inst, Reference::Label(id));
                let target = self.land(inst, address)?;
                self.ret = Some(ReturnSlot {
                    pc: self.cu.pc,
                    file: self.cu.file,
                });
                return Ok(target.into());
            }
            Op::Return => {
                let slot = self.ret.ok_or_else(|| AlaError::ReturnWithoutCall {
                    at: self.program.origin(inst),
                })?;
                return Ok(Flow::Jump {
                    pc: slot.pc.saturating_add(1),
                    file: slot.file,
                });
            }
            Op::End => return Ok(Flow::Stop),
        }
        Ok(Flow::Next)
    }

    fn direct(&self, inst: &Instruction, r: Reference, access: Access) -> AlaResult<CellId> {
        let address = self.program.resolve(inst, r);
        self.program.cell(inst, address, access, AddressNote::None)
    }

    fn indirect(&self, inst: &Instruction, r: Reference, access: Access) -> AlaResult<CellId> {
        let address = self.program.resolve(inst, r);
        self.program.indirect_cell(inst, address, access)
    }

    fn indexed(&self, inst: &Instruction, r: Reference, access: Access) -> AlaResult<CellId> {
        let base = self.program.resolve(inst, r);
        let note = AddressNote::Indexed { base: base.line };
        self.program.cell(inst, base.offset(self.alu.ix), access, note)
    }

    fn operand(&self, inst: &Instruction, operand: Operand) -> AlaResult<Word> {
        match operand {
            Operand::Immediate(n) => Ok(n),
            Operand::Memory(r) => {
                let cell = self.direct(inst, r, Access::Read)?;
                Ok(self.program.cells[cell])
            }
        }
    }

    fn jump(&mut self, inst: &Instruction, r: Reference) -> AlaResult<Flow> {
        let address = self.program.resolve(inst, r);
        self.land(inst, address).map(Flow::from)
    }

    /// Validates a jump target and counts the jump against its line.
    fn land(&mut self, inst: &Instruction, address: Address) -> AlaResult<Target> {
        let target = self.program.jump_target(inst, address)?;
        let record = self.program.line_mut(target.file, target.line);
        record.jumps = record.jumps.saturating_add(1);
        if record.jumps > JMP_LIMIT && !self.flags.contains(RunFlags::NO_JMP_LIMITS) {
            return Err(AlaError::JumpLimit {
                at: self.program.origin(inst),
                target: self.program.source_ref(target.file, target.line),
            });
        }
        Ok(target)
    }
}

/// One byte of input, or -1 once input is exhausted.
fn read_char<R: Read>(input: &mut R) -> AlaResult<Word> {
    let mut byte = [0u8; 1];
    match input.read_exact(&mut byte) {
        Ok(()) => Ok(Word::from(byte[0])),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(-1),
        Err(e) => Err(e.into()),
    }
}

fn shift_left(acc: Word, n: Word) -> Word {
    u32::try_from(n)
        .ok()
        .and_then(|n| acc.checked_shl(n))
        .unwrap_or(0)
}

#[allow(clippy::cast_sign_loss, clippy::cast_possible_wrap)]
fn shift_right(acc: Word, n: Word) -> Word {
    u32::try_from(n)
        .ok()
        .and_then(|n| (acc as u64).checked_shr(n))
        .map_or(0, |bits| bits as Word)
}
