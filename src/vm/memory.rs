//! Memory - fixed-size word store with capability checks
//!
//! Reading a capability cell yields its inner value; callers never see the
//! cell wrapper. Writing a read-write cell mutates it in place so host-held
//! handles observe the change; writing a read-only cell is an error.

use super::word::{CapabilityCell, Word};
use crate::error::RuntimeError;

#[derive(Debug, Clone)]
pub struct Memory {
    slots: Vec<Word>,
}

impl Memory {
    pub fn new(size: usize) -> Self {
        Self {
            slots: vec![Word::Empty; size],
        }
    }

    pub fn size(&self) -> usize {
        self.slots.len()
    }

    /// Bounds-check a signed address coming from the program.
    pub fn check(&self, address: i64, indirect: bool) -> Result<usize, RuntimeError> {
        if address < 0 || address as u64 >= self.slots.len() as u64 {
            return Err(RuntimeError::AddressOutOfBounds { address, indirect });
        }
        Ok(address as usize)
    }

    /// Program-level read.
    pub fn read(&self, address: usize) -> Result<Word, RuntimeError> {
        match self.slot(address)? {
            Word::Cell(cell) => Ok(cell.get()),
            word => Ok(word.clone()),
        }
    }

    /// Program-level write.
    pub fn write(&mut self, address: usize, value: Word) -> Result<(), RuntimeError> {
        // Writes store values; cells are installed with `install_cell`
        let value = value.into_value();
        let slot = self.slot_mut(address)?;
        match slot {
            Word::Cell(cell) if cell.is_writable() => {
                cell.set(value);
                Ok(())
            }
            Word::Cell(_) => Err(RuntimeError::ReadOnlyCell { address }),
            _ => {
                *slot = value;
                Ok(())
            }
        }
    }

    /// Raw slot contents, cells included.
    pub fn slot(&self, address: usize) -> Result<&Word, RuntimeError> {
        self.slots.get(address).ok_or(RuntimeError::AddressOutOfBounds {
            address: address as i64,
            indirect: false,
        })
    }

    fn slot_mut(&mut self, address: usize) -> Result<&mut Word, RuntimeError> {
        self.slots.get_mut(address).ok_or(RuntimeError::AddressOutOfBounds {
            address: address as i64,
            indirect: false,
        })
    }

    /// Replace a slot outright, bypassing capability checks. Host and
    /// loader only.
    pub fn poke(&mut self, address: usize, value: Word) -> Result<Word, RuntimeError> {
        let slot = self.slot_mut(address)?;
        Ok(std::mem::replace(slot, value))
    }

    pub fn install_cell(&mut self, address: usize, cell: CapabilityCell) -> Result<(), RuntimeError> {
        self.poke(address, Word::Cell(cell)).map(|_| ())
    }

    /// Take a cell out of memory, leaving the slot empty.
    pub fn remove_cell(&mut self, address: usize) -> Result<Option<CapabilityCell>, RuntimeError> {
        let slot = self.slot_mut(address)?;
        if matches!(slot, Word::Cell(_)) {
            if let Word::Cell(cell) = std::mem::take(slot) {
                return Ok(Some(cell));
            }
        }
        Ok(None)
    }

    pub fn as_slice(&self) -> &[Word] {
        &self.slots
    }

    /// Deep copy: capability cells are replaced by detached copies so that
    /// writes to the copy never reach host-held cells.
    pub fn detached(&self) -> Self {
        let slots = self
            .slots
            .iter()
            .map(|word| match word {
                Word::Cell(cell) => Word::Cell(cell.detached()),
                other => other.clone(),
            })
            .collect();
        Self { slots }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_write_replaces_slot() {
        let mut mem = Memory::new(4);
        mem.write(1, Word::Int(7)).unwrap();
        assert_eq!(mem.read(1).unwrap(), Word::Int(7));
    }

    #[test]
    fn test_read_only_cell_rejects_write() {
        let mut mem = Memory::new(4);
        let cell = CapabilityCell::read_only(100);
        mem.install_cell(2, cell.clone()).unwrap();

        let err = mem.write(2, Word::Int(0)).unwrap_err();
        assert_eq!(err, RuntimeError::ReadOnlyCell { address: 2 });
        assert_eq!(cell.get(), Word::Int(100));
        assert_eq!(mem.read(2).unwrap(), Word::Int(100));
    }

    #[test]
    fn test_read_write_cell_mutated_in_place() {
        let mut mem = Memory::new(4);
        let cell = CapabilityCell::read_write(0);
        mem.install_cell(0, cell.clone()).unwrap();

        mem.write(0, Word::Int(9)).unwrap();
        assert_eq!(cell.get(), Word::Int(9));
        // Slot still holds the same cell
        match mem.slot(0).unwrap() {
            Word::Cell(inner) => assert!(inner.same_cell(&cell)),
            other => panic!("expected cell, got {:?}", other),
        }
    }

    #[test]
    fn test_writing_a_cell_stores_its_value() {
        let mut mem = Memory::new(4);
        let actuator = CapabilityCell::read_write(0);
        mem.install_cell(0, actuator.clone()).unwrap();

        mem.write(0, Word::Cell(CapabilityCell::read_only(42))).unwrap();
        assert_eq!(actuator.get(), Word::Int(42));
        assert_eq!(mem.read(0).unwrap(), Word::Int(42));

        // A cell written into itself keeps a plain value
        mem.write(0, Word::Cell(actuator.clone())).unwrap();
        assert_eq!(actuator.get(), Word::Int(42));

        mem.write(1, Word::Cell(CapabilityCell::read_only('x'.to_string()))).unwrap();
        assert_eq!(mem.slot(1).unwrap(), &Word::Text("x".into()));
    }

    #[test]
    fn test_bounds() {
        let mem = Memory::new(4);
        assert!(mem.check(3, false).is_ok());
        assert_eq!(
            mem.check(4, false),
            Err(RuntimeError::AddressOutOfBounds { address: 4, indirect: false })
        );
        assert!(mem.check(-1, true).is_err());
        assert!(mem.read(10).is_err());
    }

    #[test]
    fn test_detached_copy_isolates_cells() {
        let mut mem = Memory::new(2);
        let cell = CapabilityCell::read_write(1);
        mem.install_cell(0, cell.clone()).unwrap();

        let mut copy = mem.detached();
        copy.write(0, Word::Int(5)).unwrap();
        assert_eq!(cell.get(), Word::Int(1));
        assert_eq!(copy.read(0).unwrap(), Word::Int(5));
    }

    #[test]
    fn test_remove_cell() {
        let mut mem = Memory::new(2);
        mem.install_cell(1, CapabilityCell::read_only(3)).unwrap();
        assert!(mem.remove_cell(1).unwrap().is_some());
        assert!(mem.slot(1).unwrap().is_empty());
        assert!(mem.remove_cell(1).unwrap().is_none());
    }
}
