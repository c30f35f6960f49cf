//! Word - the unit of storage in memory, registers and on the stack
//!
//! Only integers, reals and text can be written as assembler literals.
//! Capability cells are installed by the host; instructions are placed by
//! the loader.

use super::Instruction;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

/// A value stored in a memory slot, register, or on the stack.
#[derive(Debug, Clone, Default)]
pub enum Word {
    #[default]
    Empty,
    Int(i64),
    Real(f64),
    Text(String),
    /// Host-owned memory-mapped value
    Cell(CapabilityCell),
    Instruction(Instruction),
}

impl Word {
    pub fn is_empty(&self) -> bool {
        matches!(self, Word::Empty)
    }

    /// Integer payload, if this is an integer word.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Word::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_real(&self) -> Option<f64> {
        match self {
            Word::Int(v) => Some(*v as f64),
            Word::Real(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Word::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_instruction(&self) -> Option<&Instruction> {
        match self {
            Word::Instruction(i) => Some(i),
            _ => None,
        }
    }

    /// The value a program sees: cells yield a snapshot of their contents.
    pub fn into_value(self) -> Word {
        match self {
            Word::Cell(cell) => cell.get(),
            other => other,
        }
    }

    /// Short type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Word::Empty => "empty",
            Word::Int(_) => "int",
            Word::Real(_) => "real",
            Word::Text(_) => "text",
            Word::Cell(_) => "cell",
            Word::Instruction(_) => "instruction",
        }
    }

    /// Render as an `=` literal the assembler accepts back, if possible.
    pub fn literal(&self) -> Option<String> {
        match self {
            Word::Int(v) => Some(v.to_string()),
            // Debug keeps a decimal point on integral reals
            Word::Real(v) => Some(format!("{:?}", v)),
            Word::Text(s) => Some(format!("'{}'", s)),
            Word::Empty | Word::Cell(_) | Word::Instruction(_) => None,
        }
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Word::Empty => write!(f, "empty"),
            Word::Int(v) => write!(f, "{}", v),
            Word::Real(v) => write!(f, "{:?}", v),
            Word::Text(s) => write!(f, "{}", s),
            Word::Cell(cell) => write!(f, "{}", cell),
            Word::Instruction(i) => write!(f, "{}", i),
        }
    }
}

impl PartialEq for Word {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Word::Empty, Word::Empty) => true,
            (Word::Int(a), Word::Int(b)) => a == b,
            (Word::Real(a), Word::Real(b)) => a == b,
            (Word::Int(a), Word::Real(b)) | (Word::Real(b), Word::Int(a)) => (*a as f64) == *b,
            (Word::Text(a), Word::Text(b)) => a == b,
            (Word::Cell(a), Word::Cell(b)) => a == b,
            (Word::Instruction(a), Word::Instruction(b)) => a == b,
            _ => false,
        }
    }
}

impl From<i64> for Word {
    fn from(v: i64) -> Self {
        Word::Int(v)
    }
}

impl From<i32> for Word {
    fn from(v: i32) -> Self {
        Word::Int(v.into())
    }
}

impl From<f64> for Word {
    fn from(v: f64) -> Self {
        Word::Real(v)
    }
}

impl From<&str> for Word {
    fn from(v: &str) -> Self {
        Word::Text(v.to_string())
    }
}

impl From<String> for Word {
    fn from(v: String) -> Self {
        Word::Text(v)
    }
}

impl From<Instruction> for Word {
    fn from(v: Instruction) -> Self {
        Word::Instruction(v)
    }
}

impl From<CapabilityCell> for Word {
    fn from(v: CapabilityCell) -> Self {
        Word::Cell(v)
    }
}

/// What a program may do with a capability cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    ReadOnly,
    ReadWrite,
}

impl Access {
    pub const fn name(&self) -> &'static str {
        match self {
            Access::ReadOnly => "read-only",
            Access::ReadWrite => "read-write",
        }
    }
}

/// Host-owned memory-mapped value.
///
/// Clones share the same storage: the host keeps a clone and observes
/// every write the program makes through a [`Access::ReadWrite`] cell.
/// The access variant is fixed for the lifetime of the cell.
#[derive(Debug, Clone)]
pub struct CapabilityCell {
    access: Access,
    value: Arc<Mutex<Word>>,
}

impl CapabilityCell {
    pub fn new(access: Access, value: impl Into<Word>) -> Self {
        Self {
            access,
            value: Arc::new(Mutex::new(value.into().into_value())),
        }
    }

    /// Sensor-style cell: the program can only read it.
    pub fn read_only(value: impl Into<Word>) -> Self {
        Self::new(Access::ReadOnly, value)
    }

    /// Actuator-style cell: the program can read and write it.
    pub fn read_write(value: impl Into<Word>) -> Self {
        Self::new(Access::ReadWrite, value)
    }

    pub fn access(&self) -> Access {
        self.access
    }

    pub fn is_writable(&self) -> bool {
        self.access == Access::ReadWrite
    }

    /// Current inner value.
    pub fn get(&self) -> Word {
        self.lock().clone()
    }

    /// Replace the inner value. Host-side: ignores the access variant.
    /// A cell passed as the value is flattened to its contents.
    pub fn set(&self, value: impl Into<Word>) {
        let value = value.into().into_value();
        *self.lock() = value;
    }

    /// Whether both handles refer to the same cell.
    pub fn same_cell(&self, other: &CapabilityCell) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }

    /// Independent cell with the same access and current value.
    pub fn detached(&self) -> Self {
        Self::new(self.access, self.get())
    }

    fn lock(&self) -> MutexGuard<'_, Word> {
        // A poisoned cell still holds a complete word
        self.value.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl PartialEq for CapabilityCell {
    fn eq(&self, other: &Self) -> bool {
        if self.same_cell(other) {
            return true;
        }
        self.access == other.access && self.get() == other.get()
    }
}

impl fmt::Display for CapabilityCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} cell({})", self.access.name(), self.get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_clones_share_storage() {
        let cell = CapabilityCell::read_write(1);
        let host_handle = cell.clone();

        cell.set(42);
        assert_eq!(host_handle.get(), Word::Int(42));
        assert!(cell.same_cell(&host_handle));
    }

    #[test]
    fn test_detached_cell_is_independent() {
        let cell = CapabilityCell::read_write(1);
        let copy = cell.detached();

        copy.set(2);
        assert_eq!(cell.get(), Word::Int(1));
        assert!(!cell.same_cell(&copy));
        assert_eq!(copy.access(), Access::ReadWrite);
    }

    #[test]
    fn test_numeric_equality_crosses_int_and_real() {
        assert_eq!(Word::Int(3), Word::Real(3.0));
        assert_ne!(Word::Int(3), Word::Text("3".into()));
    }

    #[test]
    fn test_literal_rendering() {
        assert_eq!(Word::Int(-5).literal().as_deref(), Some("-5"));
        assert_eq!(Word::Real(2.0).literal().as_deref(), Some("2.0"));
        assert_eq!(Word::from("a b").literal().as_deref(), Some("'a b'"));
        assert_eq!(Word::Empty.literal(), None);
    }
}
