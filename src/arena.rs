//! Append-only storage with stable indices.
//!
//! Values live in a chain of fixed-capacity blocks. A full block is never
//! reallocated; a new one is chained after it instead, so an [`Idx`] stays
//! valid for as long as the arena does. Nothing is freed individually.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Default number of values per block.
pub const BLOCK_CAPACITY: usize = 4096;

/// Typed index of a value stored in an [`Arena`].
pub struct Idx<T> {
    raw: usize,
    _ty: PhantomData<fn() -> T>,
}

impl<T> Idx<T> {
    const fn from_raw(raw: usize) -> Self {
        Self {
            raw,
            _ty: PhantomData,
        }
    }

    /// Position in allocation order.
    #[must_use]
    pub const fn index(self) -> usize {
        self.raw
    }
}

impl<T> Clone for Idx<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Idx<T> {}

impl<T> PartialEq for Idx<T> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<T> Eq for Idx<T> {}

impl<T> Hash for Idx<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl<T> fmt::Debug for Idx<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Idx({})", self.raw)
    }
}

pub struct Arena<T, const BLOCK: usize = BLOCK_CAPACITY> {
    blocks: Vec<Vec<T>>,
    len: usize,
}

impl<T, const BLOCK: usize> Default for Arena<T, BLOCK> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug, const BLOCK: usize> fmt::Debug for Arena<T, BLOCK> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T, const BLOCK: usize> Arena<T, BLOCK> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            blocks: Vec::new(),
            len: 0,
        }
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of blocks chained so far.
    #[must_use]
    pub fn blocks(&self) -> usize {
        self.blocks.len()
    }

    pub fn alloc(&mut self, value: T) -> Idx<T> {
        match self.blocks.last_mut() {
            Some(block) if block.len() < BLOCK => block.push(value),
            _ => {
                let mut block = Vec::with_capacity(BLOCK);
                block.push(value);
                self.blocks.push(block);
            }
        }
        let idx = Idx::from_raw(self.len);
        self.len += 1;
        idx
    }

    #[must_use]
    pub fn get(&self, idx: Idx<T>) -> &T {
        &self.blocks[idx.raw / BLOCK][idx.raw % BLOCK]
    }

    pub fn get_mut(&mut self, idx: Idx<T>) -> &mut T {
        &mut self.blocks[idx.raw / BLOCK][idx.raw % BLOCK]
    }

    /// Walks the block chain in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = (Idx<T>, &T)> {
        self.blocks
            .iter()
            .flatten()
            .enumerate()
            .map(|(raw, value)| (Idx::from_raw(raw), value))
    }
}

impl<T, const BLOCK: usize> std::ops::Index<Idx<T>> for Arena<T, BLOCK> {
    type Output = T;

    fn index(&self, idx: Idx<T>) -> &T {
        self.get(idx)
    }
}

impl<T, const BLOCK: usize> std::ops::IndexMut<Idx<T>> for Arena<T, BLOCK> {
    fn index_mut(&mut self, idx: Idx<T>) -> &mut T {
        self.get_mut(idx)
    }
}
