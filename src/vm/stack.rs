use std::fmt::Display;

use super::{RuntimeError, StackEntry};

pub const DEFAULT_STACK_SIZE: usize = 1024;

/// Value stack addressed relative to a frame base.
///
/// Frame bases of suspended callers are kept on `frames`; popping a frame
/// truncates the stack back to the current base and restores the caller's.
/// Saved frames count against the same limit as values.
#[derive(Debug)]
pub struct Stack {
    storage: Vec<StackEntry>,
    bp: usize,
    frames: Vec<usize>,
    limit: usize,
}

impl Stack {
    pub fn new(limit: usize) -> Self {
        Stack {
            storage: Vec::with_capacity(limit.min(DEFAULT_STACK_SIZE)),
            bp: 0,
            frames: Vec::new(),
            limit,
        }
    }

    pub fn bp(&self) -> usize {
        self.bp
    }

    pub fn sp(&self) -> usize {
        self.storage.len()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    fn ensure_room(&self) -> Result<(), RuntimeError> {
        if self.storage.len() + self.depth() >= self.limit {
            return Err(RuntimeError::StackOverflow(self.limit));
        }
        Ok(())
    }

    pub fn push(&mut self, value: StackEntry) -> Result<(), RuntimeError> {
        self.ensure_room()?;
        self.storage.push(value);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<StackEntry, RuntimeError> {
        if self.storage.len() <= self.bp {
            return Err(RuntimeError::StackUnderflow);
        }
        self.storage.pop().ok_or(RuntimeError::StackUnderflow)
    }

    pub fn drop(&mut self, n: usize) -> Result<(), RuntimeError> {
        if self.storage.len() < self.bp + n {
            return Err(RuntimeError::StackUnderflow);
        }
        self.storage.truncate(self.storage.len() - n);
        Ok(())
    }

    pub fn get(&self, offset: isize) -> Result<&StackEntry, RuntimeError> {
        let index = self.index(offset)?;
        Ok(&self.storage[index])
    }

    pub fn set(&mut self, offset: isize, value: StackEntry) -> Result<(), RuntimeError> {
        let index = self.index(offset)?;
        self.storage[index] = value;
        Ok(())
    }

    fn index(&self, offset: isize) -> Result<usize, RuntimeError> {
        self.bp
            .checked_add_signed(offset)
            .filter(|index| *index < self.storage.len())
            .ok_or(RuntimeError::StackOutOfBounds(offset))
    }

    pub fn push_frame(&mut self) -> Result<(), RuntimeError> {
        self.ensure_room()?;
        self.frames.push(self.bp);
        self.bp = self.storage.len();
        Ok(())
    }

    pub fn pop_frame(&mut self) -> Result<(), RuntimeError> {
        let bp = self.frames.pop().ok_or(RuntimeError::StackUnderflow)?;
        self.storage.truncate(self.bp);
        self.bp = bp;
        Ok(())
    }
}

impl Display for Stack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (index, value) in self.storage.iter().enumerate() {
            if index == self.bp {
                write!(f, "| ")?;
            }
            write!(f, "[ {} ]", value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_round_trip() {
        let mut stack = Stack::new(16);
        stack.push(StackEntry::Number(1.0)).unwrap();
        stack.push(StackEntry::Number(2.0)).unwrap();
        let (bp, sp) = (stack.bp(), stack.sp());

        stack.push_frame().unwrap();
        assert_eq!(stack.bp(), sp);
        stack.push(StackEntry::Number(3.0)).unwrap();
        assert_eq!(stack.get(-1), Ok(&StackEntry::Number(2.0)));
        assert_eq!(stack.get(0), Ok(&StackEntry::Number(3.0)));
        stack.pop_frame().unwrap();

        assert_eq!((stack.bp(), stack.sp()), (bp, sp));
    }

    #[test]
    fn test_pop_stops_at_frame_base() {
        let mut stack = Stack::new(16);
        stack.push(StackEntry::Number(1.0)).unwrap();
        stack.push_frame().unwrap();

        assert_eq!(stack.pop(), Err(RuntimeError::StackUnderflow));
        assert_eq!(stack.drop(1), Err(RuntimeError::StackUnderflow));
        stack.pop_frame().unwrap();
        assert_eq!(stack.pop_frame(), Err(RuntimeError::StackUnderflow));
    }

    #[test]
    fn test_bounds() {
        let mut stack = Stack::new(2);
        stack.push(StackEntry::Number(1.0)).unwrap();
        stack.push(StackEntry::Number(2.0)).unwrap();

        assert_eq!(
            stack.push(StackEntry::Number(3.0)),
            Err(RuntimeError::StackOverflow(2))
        );
        assert_eq!(stack.get(2), Err(RuntimeError::StackOutOfBounds(2)));
        assert_eq!(stack.get(-1), Err(RuntimeError::StackOutOfBounds(-1)));
    }

    #[test]
    fn test_frames_count_against_limit() {
        let mut stack = Stack::new(3);
        stack.push(StackEntry::Number(1.0)).unwrap();
        stack.push_frame().unwrap();
        stack.push_frame().unwrap();

        assert_eq!(stack.depth(), 2);
        assert_eq!(stack.push_frame(), Err(RuntimeError::StackOverflow(3)));
        assert_eq!(
            stack.push(StackEntry::Number(2.0)),
            Err(RuntimeError::StackOverflow(3))
        );

        stack.pop_frame().unwrap();
        stack.push(StackEntry::Number(2.0)).unwrap();
    }
}
