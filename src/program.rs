use crate::arena::{Arena, Idx};
use crate::inst::Instruction;
use crate::symbols::{SymbolId, SymbolTable};
use crate::types::{SourceRef, Word};

pub type CellId = Idx<Word>;

/// What the assembler learned about one physical source line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineRecord {
    /// Position in [`Program::instructions`] if the line holds code.
    pub instruction: Option<usize>,
    pub label: Option<SymbolId>,
    /// Times execution has jumped to this line.
    pub jumps: u32,
    pub data: Option<CellId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub name: String,
    pub lines: Vec<LineRecord>,
}

/// Every input file assembled into one instruction sequence.
#[derive(Debug)]
pub struct Program {
    pub files: Vec<SourceFile>,
    pub instructions: Vec<Instruction>,
    pub symbols: SymbolTable,
    pub cells: Arena<Word>,
    /// Instruction index of the `START` label.
    pub start: usize,
}

impl Program {
    #[must_use]
    pub fn source_ref(&self, file: usize, line: usize) -> SourceRef {
        SourceRef::new(&self.files[file].name, line)
    }

    /// Location of an instruction, for diagnostics.
    #[must_use]
    pub fn origin(&self, inst: &Instruction) -> SourceRef {
        self.source_ref(inst.file, inst.line)
    }

    #[must_use]
    pub fn file_name(&self, file: usize) -> &str {
        &self.files[file].name
    }

    #[must_use]
    pub fn line(&self, file: usize, line: usize) -> &LineRecord {
        &self.files[file].lines[line]
    }

    pub fn line_mut(&mut self, file: usize, line: usize) -> &mut LineRecord {
        &mut self.files[file].lines[line]
    }

    /// Value of the data cell on `file`/`line`, if the line holds data.
    #[must_use]
    pub fn data(&self, file: usize, line: usize) -> Option<Word> {
        self.files
            .get(file)
            .and_then(|f| f.lines.get(line))
            .and_then(|record| record.data)
            .map(|cell| self.cells[cell])
    }

    /// Looks up a declared label's data by name.
    #[must_use]
    pub fn label_data(&self, name: &str) -> Option<Word> {
        let symbol = self.symbols.get(self.symbols.lookup(name)?);
        self.data(symbol.file, symbol.line)
    }
}
