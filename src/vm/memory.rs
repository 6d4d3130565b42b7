//! Sparse word-addressed memory.

use std::collections::HashMap;

/// Masks an arithmetic result into the 16-bit word width
pub fn mask(value: i64) -> u16 {
    (value & 0xFFFF) as u16
}

/// The machine's memory: a sparse map defaulting every address to zero.
/// Writing zero removes the entry; that is a storage optimization only and is
/// observably identical to storing zero.
#[derive(Debug, Clone, Default)]
pub struct Memory {
    cells: HashMap<u16, u16>,
}

impl Memory {
    pub fn new() -> Self {
        Memory::default()
    }

    /// Value at `addr`; unmapped addresses read as zero
    pub fn read(&self, addr: u16) -> u16 {
        self.cells.get(&addr).copied().unwrap_or(0)
    }

    /// Stores `value` at `addr`
    pub fn write(&mut self, addr: u16, value: u16) {
        if value == 0 {
            self.cells.remove(&addr);
        } else {
            self.cells.insert(addr, value);
        }
    }

    /// Count of non-zero cells
    pub fn occupied(&self) -> usize {
        self.cells.len()
    }

    /// Iterates the non-zero cells in arbitrary order
    pub fn iter(&self) -> impl Iterator<Item = (u16, u16)> + '_ {
        self.cells.iter().map(|(&addr, &value)| (addr, value))
    }
}
