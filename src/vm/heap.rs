use rustc_hash::FxHashMap;

use super::{RuntimeError, StackEntry};

/// Sparse address space with explicit allocation.
///
/// Only live addresses can be read or written. Releasing an address that is
/// not live faults, which covers both double release and release of an
/// address that was never allocated.
#[derive(Debug, Default)]
pub struct Heap {
    slots: FxHashMap<usize, StackEntry>,
}

impl Heap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self, address: usize) -> Result<(), RuntimeError> {
        if self.slots.contains_key(&address) {
            return Err(RuntimeError::DoubleAllocation(address));
        }
        self.slots.insert(address, StackEntry::Number(0.0));
        Ok(())
    }

    pub fn release(&mut self, address: usize) -> Result<(), RuntimeError> {
        self.slots
            .remove(&address)
            .map(|_| ())
            .ok_or(RuntimeError::InvalidRelease(address))
    }

    pub fn load(&self, address: usize) -> Result<&StackEntry, RuntimeError> {
        self.slots
            .get(&address)
            .ok_or(RuntimeError::UseAfterRelease(address))
    }

    pub fn store(&mut self, address: usize, value: StackEntry) -> Result<(), RuntimeError> {
        let slot = self
            .slots
            .get_mut(&address)
            .ok_or(RuntimeError::UseAfterRelease(address))?;
        *slot = value;
        Ok(())
    }

    pub fn live(&self) -> usize {
        self.slots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle() {
        let mut heap = Heap::new();
        heap.allocate(3).unwrap();
        heap.store(3, StackEntry::String("abc".to_string())).unwrap();
        assert_eq!(heap.load(3), Ok(&StackEntry::String("abc".to_string())));
        assert_eq!(heap.allocate(3), Err(RuntimeError::DoubleAllocation(3)));

        heap.release(3).unwrap();
        assert_eq!(heap.live(), 0);
        assert_eq!(heap.release(3), Err(RuntimeError::InvalidRelease(3)));
        assert_eq!(heap.load(3), Err(RuntimeError::UseAfterRelease(3)));
        assert_eq!(
            heap.store(3, StackEntry::Number(1.0)),
            Err(RuntimeError::UseAfterRelease(3))
        );
    }

    #[test]
    fn test_release_never_allocated() {
        let mut heap = Heap::new();
        assert_eq!(heap.release(0), Err(RuntimeError::InvalidRelease(0)));
    }
}
