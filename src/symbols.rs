use crate::arena::{Arena, Idx};

/// Symbols per bucket in the table's chain.
pub const BUCKET_CAPACITY: usize = 1024;

pub type SymbolId = Idx<Symbol>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    /// Set once the label's declaring line has been parsed.
    pub declared: bool,
    /// Declaring line once declared, first reference before that.
    pub line: usize,
    pub file: usize,
}

/// The previous declaration of a label that was declared again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Redeclared {
    pub file: usize,
    pub line: usize,
}

/// One flat label namespace shared by every input file.
#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: Arena<Symbol, BUCKET_CAPACITY>,
}

impl SymbolTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<SymbolId> {
        self.symbols
            .iter()
            .find_map(|(id, symbol)| (symbol.name == name).then_some(id))
    }

    /// Returns the symbol for `name`, adding a forward reference if it is new.
    pub fn reference(&mut self, name: &str, file: usize, line: usize) -> SymbolId {
        self.lookup(name).unwrap_or_else(|| {
            self.symbols.alloc(Symbol {
                name: name.to_owned(),
                declared: false,
                line,
                file,
            })
        })
    }

    /// Marks `name` as declared at `file`/`line`.
    ///
    /// # Errors
    ///
    /// Will return `Err` with the first declaration if `name` was already declared
    pub fn declare(&mut self, name: &str, file: usize, line: usize) -> Result<SymbolId, Redeclared> {
        let id = self.reference(name, file, line);
        let symbol = &mut self.symbols[id];
        if symbol.declared {
            return Err(Redeclared {
                file: symbol.file,
                line: symbol.line,
            });
        }
        symbol.declared = true;
        symbol.file = file;
        symbol.line = line;
        Ok(id)
    }

    /// Checks that every referenced label was declared somewhere.
    ///
    /// # Errors
    ///
    /// Will return `Err` with the first undeclared symbol in chain order
    pub fn validate_all(&self) -> Result<(), &Symbol> {
        self.symbols
            .iter()
            .find(|(_, symbol)| !symbol.declared)
            .map_or(Ok(()), |(_, symbol)| Err(symbol))
    }

    #[must_use]
    pub fn get(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id]
    }

    #[must_use]
    pub(crate) const fn len(&self) -> usize {
        self.symbols.len()
    }
}
