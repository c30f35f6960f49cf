//! Register - general purpose register file
//!
//! Registers are addressed `R0..R{n-1}` and hold any [`Word`]. They start
//! out empty.

use super::word::Word;
use crate::error::RuntimeError;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct RegisterFile {
    regs: Vec<Word>,
}

impl RegisterFile {
    pub fn new(count: usize) -> Self {
        Self {
            regs: vec![Word::Empty; count],
        }
    }

    pub fn len(&self) -> usize {
        self.regs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regs.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<&Word, RuntimeError> {
        self.regs.get(index).ok_or(RuntimeError::InvalidRegister(index))
    }

    pub fn set(&mut self, index: usize, value: Word) -> Result<(), RuntimeError> {
        let reg = self
            .regs
            .get_mut(index)
            .ok_or(RuntimeError::InvalidRegister(index))?;
        *reg = value;
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Word> {
        self.regs.iter()
    }
}

/// Parse `R<n>` into a register index. Range is checked at access time.
pub fn parse_register(token: &str) -> Option<usize> {
    let digits = token.strip_prefix('R')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

impl fmt::Display for RegisterFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, reg) in self.regs.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", reg)?;
        }
        write!(f, "]")
    }
}
