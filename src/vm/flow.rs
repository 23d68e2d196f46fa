use super::RuntimeError;

/// Program counter and return addresses.
#[derive(Debug, Default)]
pub struct Flow {
    pc: usize,
    returns: Vec<usize>,
}

impl Flow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn advance(&mut self) {
        self.pc += 1;
    }

    pub fn jump(&mut self, address: usize) {
        self.pc = address;
    }

    /// Saves the current pc as the return address and jumps to `address`.
    pub fn call(&mut self, address: usize) {
        self.returns.push(self.pc);
        self.pc = address;
    }

    pub fn ret(&mut self) -> Result<(), RuntimeError> {
        self.pc = self
            .returns
            .pop()
            .ok_or(RuntimeError::ReturnOutsideFunction)?;
        Ok(())
    }

    pub fn depth(&self) -> usize {
        self.returns.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_and_return() {
        let mut flow = Flow::new();
        flow.advance();
        flow.call(10);
        assert_eq!(flow.pc(), 10);
        assert_eq!(flow.depth(), 1);

        flow.ret().unwrap();
        assert_eq!(flow.pc(), 1);
        assert_eq!(flow.ret(), Err(RuntimeError::ReturnOutsideFunction));
    }
}
