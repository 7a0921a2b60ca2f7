use log::{debug, trace};

use crate::arena::Arena;
use crate::inst::{Instruction, Mnemonic, Op, OperandClass, Operand, Reference, Register};
use crate::program::{LineRecord, Program, SourceFile};
use crate::symbols::{SymbolId, SymbolTable};
use crate::types::{AlaError, AlaResult, RunFlags, SourceRef, Word};

/// Name of the label execution starts at.
pub const START_LABEL: &str = "START";

const COMMENT: &str = "//";

#[derive(Debug, Clone, Copy)]
struct Start {
    file: usize,
    line: usize,
    instruction: usize,
}

/// Parses source files one after another into a single [`Program`].
///
/// Labels live in one namespace shared by every file, so a label declared in
/// one file can be used from any other.
pub struct Assembler {
    flags: RunFlags,
    files: Vec<SourceFile>,
    instructions: Vec<Instruction>,
    symbols: SymbolTable,
    cells: Arena<Word>,
    start: Option<Start>,
}

/// Assembles `(file name, source)` pairs in order.
///
/// # Errors
///
/// Will return `Err` at the first line that could not be parsed, or if the
/// files together do not form a complete program
pub fn assemble(sources: &[(&str, &str)], flags: RunFlags) -> AlaResult<Program> {
    let mut assembler = Assembler::new(flags);
    for (name, text) in sources {
        assembler.add_file(name, text)?;
    }
    assembler.finish()
}

/// Parses a decimal, `B` binary or `&` hexadecimal integer.
#[must_use]
pub fn parse_literal(token: &str) -> Option<Word> {
    if let Some(digits) = token.strip_prefix('B') {
        Word::from_str_radix(digits, 2).ok()
    } else if let Some(digits) = token.strip_prefix('&') {
        Word::from_str_radix(digits, 16).ok()
    } else {
        token.parse().ok()
    }
}

fn is_comment(s: &str) -> bool {
    s.starts_with(COMMENT)
}

/// Nothing left but whitespace or a comment.
fn is_blank(s: &str) -> bool {
    s.is_empty() || is_comment(s)
}

/// Splits off the first whitespace-delimited token.
fn chop(s: &str) -> (&str, &str) {
    s.split_once(char::is_whitespace)
        .map_or((s, ""), |(token, rest)| (token, rest.trim_start()))
}

fn expect_end(at: &SourceRef, rest: &str, token: &str) -> AlaResult<()> {
    if is_blank(rest) {
        Ok(())
    } else {
        Err(AlaError::TrailingTokens {
            at: at.clone(),
            trailing: rest.to_owned(),
            operand: token.to_owned(),
        })
    }
}

impl Assembler {
    #[must_use]
    pub fn new(flags: RunFlags) -> Self {
        Self {
            flags,
            files: Vec::new(),
            instructions: Vec::new(),
            symbols: SymbolTable::new(),
            cells: Arena::new(),
            start: None,
        }
    }

    /// Parses one file, appending its code to the program.
    ///
    /// # Errors
    ///
    /// Will return `Err` at the first line that could not be parsed
    pub fn add_file(&mut self, name: &str, text: &str) -> AlaResult<()> {
        let file = self.files.len();
        self.files.push(SourceFile {
            name: name.to_owned(),
            lines: Vec::new(),
        });
        let first_instruction = self.instructions.len();
        for (line, content) in text.lines().enumerate() {
            let record = self.line_to_record(file, line, content.trim())?;
            self.files[file].lines.push(record);
        }
        debug!(
            "parsed {name}: {} lines, {} instructions",
            self.files[file].lines.len(),
            self.instructions.len() - first_instruction
        );
        Ok(())
    }

    /// Checks the program as a whole once every file has been added.
    ///
    /// # Errors
    ///
    /// Will return `Err` if there is no `START` label or a referenced label
    /// was never declared
    pub fn finish(self) -> AlaResult<Program> {
        let start = self.start.ok_or(AlaError::MissingStart)?;
        if let Err(symbol) = self.symbols.validate_all() {
            return Err(AlaError::UndefinedLabel {
                at: SourceRef::new(&self.files[symbol.file].name, symbol.line),
                name: symbol.name.clone(),
            });
        }
        debug!(
            "assembled {} files: {} instructions, {} labels, {} data cells, start at {}",
            self.files.len(),
            self.instructions.len(),
            self.symbols.len(),
            self.cells.len(),
            start.instruction
        );
        Ok(Program {
            files: self.files,
            instructions: self.instructions,
            symbols: self.symbols,
            cells: self.cells,
            start: start.instruction,
        })
    }

    fn here(&self, file: usize, line: usize) -> SourceRef {
        SourceRef::new(&self.files[file].name, line)
    }

    fn line_to_record(&mut self, file: usize, line: usize, text: &str) -> AlaResult<LineRecord> {
        let mut record = LineRecord::default();
        if text.is_empty() {
            record.data = Some(self.cells.alloc(0));
            return Ok(record);
        }
        if is_comment(text) {
            return Ok(record);
        }

        let at = self.here(file, line);
        let (first, rest) = chop(text);
        if let Some(value) = parse_literal(first) {
            expect_end(&at, rest, first)?;
            record.data = Some(self.cells.alloc(value));
            return Ok(record);
        }
        if let Some(mnemonic) = Mnemonic::parse(first) {
            record.instruction = Some(self.push_instruction(file, line, mnemonic, rest)?);
            return Ok(record);
        }

        let label = first
            .strip_suffix(':')
            .filter(|label| !label.is_empty())
            .ok_or_else(|| AlaError::UnknownToken {
                at: at.clone(),
                token: first.to_owned(),
            })?;
        if Mnemonic::parse(label).is_some() {
            return Err(AlaError::ReservedLabel {
                at,
                name: label.to_owned(),
            });
        }

        let (value, after) = chop(rest);
        if is_blank(value) {
            trace!("{at}: bare label {label}");
        } else if let Some(n) = parse_literal(value) {
            expect_end(&at, after, value)?;
            record.data = Some(self.cells.alloc(n));
        } else if let Some(mnemonic) = Mnemonic::parse(value) {
            record.instruction = Some(self.push_instruction(file, line, mnemonic, after)?);
        } else {
            return Err(AlaError::InvalidLabelValue {
                at,
                label: label.to_owned(),
                value: value.to_owned(),
            });
        }

        record.label = Some(self.declare(file, line, label, record.instruction)?);
        Ok(record)
    }

    fn declare(
        &mut self,
        file: usize,
        line: usize,
        label: &str,
        instruction: Option<usize>,
    ) -> AlaResult<SymbolId> {
        let at = self.here(file, line);
        let is_start = label == START_LABEL;
        if is_start {
            if let Some(first) = self.start {
                return Err(AlaError::DuplicateStart {
                    at,
                    first: self.here(first.file, first.line),
                });
            }
        }
        let id = self
            .symbols
            .declare(label, file, line)
            .map_err(|first| AlaError::DuplicateLabel {
                at: at.clone(),
                name: label.to_owned(),
                first: self.here(first.file, first.line),
            })?;
        if is_start {
            let instruction = instruction.ok_or(AlaError::StartNotInstruction { at })?;
            self.start = Some(Start {
                file,
                line,
                instruction,
            });
        }
        Ok(id)
    }

    fn push_instruction(
        &mut self,
        file: usize,
        line: usize,
        mnemonic: Mnemonic,
        rest: &str,
    ) -> AlaResult<usize> {
        let at = self.here(file, line);
        if mnemonic.is_extra() && !self.flags.contains(RunFlags::EXTRA) {
            return Err(AlaError::ExtraInstruction { at, mnemonic });
        }
        let op = self.parse_op(&at, file, mnemonic, rest)?;
        trace!("{at}: {op:?}");
        self.instructions.push(Instruction { file, line, op });
        Ok(self.instructions.len() - 1)
    }

    fn parse_op(
        &mut self,
        at: &SourceRef,
        file: usize,
        mnemonic: Mnemonic,
        rest: &str,
    ) -> AlaResult<Op> {
        let (operand, trailing) = chop(rest);
        if mnemonic.class() == OperandClass::None {
            if !is_blank(operand) {
                return Err(AlaError::UnexpectedOperand {
                    at: at.clone(),
                    mnemonic,
                });
            }
        } else {
            if is_blank(operand) {
                return Err(AlaError::MissingOperand {
                    at: at.clone(),
                    mnemonic,
                });
            }
            expect_end(at, trailing, operand)?;
        }

        Ok(match mnemonic {
            Mnemonic::Inp => Op::Inp,
            Mnemonic::Out => Op::Out,
            Mnemonic::End => Op::End,
            Mnemonic::Return => Op::Return,
            Mnemonic::Ldm => Op::Ldm(immediate(at, mnemonic, operand)?),
            Mnemonic::Ldr => Op::Ldr(immediate(at, mnemonic, operand)?),
            Mnemonic::Lsl => Op::Lsl(immediate(at, mnemonic, operand)?),
            Mnemonic::Lsr => Op::Lsr(immediate(at, mnemonic, operand)?),
            Mnemonic::Ldd => Op::Ldd(self.address(at, file, mnemonic, operand)?),
            Mnemonic::Ldi => Op::Ldi(self.address(at, file, mnemonic, operand)?),
            Mnemonic::Ldx => Op::Ldx(self.address(at, file, mnemonic, operand)?),
            Mnemonic::Sto => Op::Sto(self.address(at, file, mnemonic, operand)?),
            Mnemonic::Stx => Op::Stx(self.address(at, file, mnemonic, operand)?),
            Mnemonic::Sti => Op::Sti(self.address(at, file, mnemonic, operand)?),
            Mnemonic::Add => Op::Add(self.address(at, file, mnemonic, operand)?),
            Mnemonic::Jmp => Op::Jmp(self.address(at, file, mnemonic, operand)?),
            Mnemonic::Jpe => Op::Jpe(self.address(at, file, mnemonic, operand)?),
            Mnemonic::Jpn => Op::Jpn(self.address(at, file, mnemonic, operand)?),
            Mnemonic::Cmp => Op::Cmp(self.dual(at, file, mnemonic, operand)?),
            Mnemonic::And => Op::And(self.dual(at, file, mnemonic, operand)?),
            Mnemonic::Xor => Op::Xor(self.dual(at, file, mnemonic, operand)?),
            Mnemonic::Or => Op::Or(self.dual(at, file, mnemonic, operand)?),
            Mnemonic::Inc => match register(at, mnemonic, operand)? {
                Register::Acc => Op::IncAcc,
                Register::Ix => Op::IncIx,
            },
            Mnemonic::Dec => match register(at, mnemonic, operand)? {
                Register::Acc => Op::DecAcc,
                Register::Ix => Op::DecIx,
            },
            Mnemonic::Call => Op::Call(self.label(at, file, mnemonic, operand)?),
        })
    }

    fn address(
        &mut self,
        at: &SourceRef,
        file: usize,
        mnemonic: Mnemonic,
        operand: &str,
    ) -> AlaResult<Reference> {
        if operand.starts_with('#') {
            return Err(AlaError::ImmediateNotAllowed {
                at: at.clone(),
                mnemonic,
                operand: operand.to_owned(),
            });
        }
        self.label_or_literal(at, file, operand)
    }

    fn dual(
        &mut self,
        at: &SourceRef,
        file: usize,
        mnemonic: Mnemonic,
        operand: &str,
    ) -> AlaResult<Operand> {
        if operand.starts_with('#') {
            immediate(at, mnemonic, operand).map(Operand::Immediate)
        } else {
            self.label_or_literal(at, file, operand)
                .map(Operand::Memory)
        }
    }

    fn label(
        &mut self,
        at: &SourceRef,
        file: usize,
        mnemonic: Mnemonic,
        operand: &str,
    ) -> AlaResult<SymbolId> {
        if operand.starts_with('#') || parse_literal(operand).is_some() {
            return Err(AlaError::LabelRequired {
                at: at.clone(),
                mnemonic,
                operand: operand.to_owned(),
            });
        }
        self.symbol(at, file, operand)
    }

    fn label_or_literal(&mut self, at: &SourceRef, file: usize, token: &str) -> AlaResult<Reference> {
        match parse_literal(token) {
            Some(n) => Ok(Reference::Literal(n)),
            None => self.symbol(at, file, token).map(Reference::Label),
        }
    }

    fn symbol(&mut self, at: &SourceRef, file: usize, name: &str) -> AlaResult<SymbolId> {
        if Mnemonic::parse(name).is_some() {
            return Err(AlaError::ReservedLabel {
                at: at.clone(),
                name: name.to_owned(),
            });
        }
        Ok(self.symbols.reference(name, file, at.line))
    }
}

fn immediate(at: &SourceRef, mnemonic: Mnemonic, operand: &str) -> AlaResult<Word> {
    let digits = operand
        .strip_prefix('#')
        .ok_or_else(|| AlaError::ImmediateRequired {
            at: at.clone(),
            mnemonic,
            operand: operand.to_owned(),
        })?;
    parse_literal(digits).ok_or_else(|| AlaError::InvalidNumber {
        at: at.clone(),
        mnemonic,
        operand: operand.to_owned(),
    })
}

fn register(at: &SourceRef, mnemonic: Mnemonic, operand: &str) -> AlaResult<Register> {
    Register::parse(operand).ok_or_else(|| AlaError::InvalidRegister {
        at: at.clone(),
        mnemonic,
        operand: operand.to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one(text: &str) -> AlaResult<Program> {
        assemble(&[("a.ala", text)], RunFlags::empty())
    }

    fn extra(text: &str) -> AlaResult<Program> {
        assemble(&[("a.ala", text)], RunFlags::EXTRA)
    }

    #[test]
    fn literals() {
        assert_eq!(parse_literal("42"), Some(42));
        assert_eq!(parse_literal("-7"), Some(-7));
        assert_eq!(parse_literal("B101"), Some(5));
        assert_eq!(parse_literal("&FF"), Some(255));
        assert_eq!(parse_literal("&"), None);
        assert_eq!(parse_literal("B2"), None);
        assert_eq!(parse_literal("LOOP"), None);
    }

    #[test]
    fn line_kinds() {
        let p = one("START: LDD VALUE\n\n// comment\n12\nVALUE: &10\nEMPTY:\nEND").unwrap();
        let lines = &p.files[0].lines;
        assert_eq!(lines.len(), 7);

        assert_eq!(lines[0].instruction, Some(0));
        assert!(lines[0].data.is_none());
        assert_eq!(p.data(0, 1), Some(0));
        assert_eq!(lines[2], LineRecord::default());
        assert_eq!(p.data(0, 3), Some(12));
        assert_eq!(p.data(0, 4), Some(16));
        assert!(lines[4].label.is_some());
        assert!(lines[5].label.is_some());
        assert!(lines[5].data.is_none() && lines[5].instruction.is_none());
        assert_eq!(lines[6].instruction, Some(1));
        assert_eq!(p.start, 0);
    }

    #[test]
    fn operands_by_class() {
        let p = extra(
            "START: LDM #B11\nLDD 7\nCMP #-2\nAND DATA\nINC IX\nDEC ACC\nCALL SUB\nSUB: RETURN\nDATA: 3",
        )
        .unwrap();
        let ops: Vec<_> = p.instructions.iter().map(|i| i.op).collect();
        let data = p.symbols.lookup("DATA").unwrap();
        let sub = p.symbols.lookup("SUB").unwrap();
        assert_eq!(
            ops,
            vec![
                Op::Ldm(3),
                Op::Ldd(Reference::Literal(7)),
                Op::Cmp(Operand::Immediate(-2)),
                Op::And(Operand::Memory(Reference::Label(data))),
                Op::IncIx,
                Op::DecAcc,
                Op::Call(sub),
                Op::Return,
            ]
        );
    }

    #[test]
    fn mnemonics_and_spacing_are_forgiving() {
        let p = one("START:  ldm   #1\n\tout  // shout\nEnd").unwrap();
        assert_eq!(p.instructions.len(), 3);
        assert_eq!(p.instructions[1].op, Op::Out);
    }

    #[test]
    fn comments_leave_no_data() {
        let p = one("START: END\n// nothing\n").unwrap();
        assert_eq!(p.files[0].lines.len(), 2);
        assert_eq!(p.data(0, 1), None);
    }

    #[test]
    fn grammar_errors() {
        let cases: [(&str, fn(&AlaError) -> bool); 12] = [
            ("START: END\nFOO", |e| matches!(e, AlaError::UnknownToken { .. })),
            ("START: END\n:", |e| matches!(e, AlaError::UnknownToken { .. })),
            ("START: END\nX: Y", |e| matches!(e, AlaError::InvalidLabelValue { .. })),
            ("START: OUT 5", |e| matches!(e, AlaError::UnexpectedOperand { .. })),
            ("START: LDD", |e| matches!(e, AlaError::MissingOperand { .. })),
            ("START: LDD // x", |e| matches!(e, AlaError::MissingOperand { .. })),
            ("START: LDD 1 2", |e| matches!(e, AlaError::TrailingTokens { .. })),
            ("START: LDM 5", |e| matches!(e, AlaError::ImmediateRequired { .. })),
            ("START: LDM #x", |e| matches!(e, AlaError::InvalidNumber { .. })),
            ("START: JMP #1", |e| matches!(e, AlaError::ImmediateNotAllowed { .. })),
            ("START: INC AX", |e| matches!(e, AlaError::InvalidRegister { .. })),
            ("START: JMP OUT", |e| matches!(e, AlaError::ReservedLabel { .. })),
        ];
        for (text, check) in cases {
            let err = one(text).unwrap_err();
            assert!(check(&err), "{text:?} gave {err}");
        }
    }

    #[test]
    fn data_lines_reject_trailing_tokens() {
        let err = one("START: END\n5 6").unwrap_err();
        assert!(matches!(err, AlaError::TrailingTokens { .. }));
        assert!(one("START: END\n5 // five\nX: 6 // six").is_ok());
    }

    #[test]
    fn reserved_names_cannot_be_labels() {
        let err = one("START: END\nLDM: 5").unwrap_err();
        assert!(matches!(err, AlaError::ReservedLabel { .. }));
    }

    #[test]
    fn extras_need_the_flag() {
        for text in ["START: CALL SUB\nSUB: END", "START: RETURN"] {
            let err = one(text).unwrap_err();
            assert!(matches!(err, AlaError::ExtraInstruction { .. }));
            assert!(err.to_string().contains("doesn't exist in A level assembly"));
        }
    }

    #[test]
    fn call_only_takes_labels() {
        for text in ["START: CALL 3", "START: CALL #3"] {
            let err = extra(text).unwrap_err();
            assert!(matches!(err, AlaError::LabelRequired { .. }), "{text:?} gave {err}");
        }
    }

    #[test]
    fn start_must_exist_once_on_code() {
        assert!(matches!(one("END").unwrap_err(), AlaError::MissingStart));
        assert!(matches!(
            one("START: 5").unwrap_err(),
            AlaError::StartNotInstruction { .. }
        ));
        assert!(matches!(
            one("START:\nEND").unwrap_err(),
            AlaError::StartNotInstruction { .. }
        ));
        let err = assemble(
            &[("a.ala", "START: END"), ("b.ala", "OUT\nSTART: END")],
            RunFlags::empty(),
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "b.ala(1): ERROR: There can only be one START label\n\
             a.ala(0): NOTE: See first definition of the START label"
        );
    }

    #[test]
    fn duplicate_labels_across_files() {
        let err = assemble(
            &[("a.ala", "START: END\nX: 1"), ("b.ala", "\nX: 2")],
            RunFlags::empty(),
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "b.ala(1): ERROR: Label 'X' already declared.\n\
             a.ala(1): NOTE: See initial declaration of label"
        );
    }

    #[test]
    fn undefined_labels_are_reported_at_first_use() {
        let err = assemble(
            &[("a.ala", "START: LDD X\nEND"), ("b.ala", "JMP NOWHERE")],
            RunFlags::empty(),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "a.ala(0): ERROR: Undefined label 'X'");

        let err = assemble(
            &[("a.ala", "START: END\nX: 4"), ("b.ala", "LDD X\nJMP NOWHERE")],
            RunFlags::empty(),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "b.ala(1): ERROR: Undefined label 'NOWHERE'");
    }

    #[test]
    fn labels_are_shared_between_files() {
        let p = assemble(
            &[("a.ala", "START: JMP THERE"), ("b.ala", "LDM #1\nTHERE: OUT")],
            RunFlags::empty(),
        )
        .unwrap();
        let there = p.symbols.get(p.symbols.lookup("THERE").unwrap());
        assert_eq!((there.file, there.line), (1, 1));
        assert_eq!(p.files[1].lines[1].instruction, Some(2));
    }
}
