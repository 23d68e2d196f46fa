use rustc_hash::FxHashMap;

use crate::bytecode::{Code, Instruction};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LinkError {
    #[error("Call to {0} could not be resolved")]
    Unresolved(String),
    #[error("Instruction at {0:04} is not a call")]
    NotACall(usize),
}

/// Resolves function names to code addresses.
///
/// Calls are emitted with a placeholder target and remembered; `link`
/// rewrites every recorded call once all functions have been placed.
#[derive(Debug, Default)]
pub struct Linker {
    addresses: FxHashMap<String, usize>,
    call_sites: Vec<(usize, String)>,
}

impl Linker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, name: &str, address: usize) {
        self.addresses.insert(name.to_string(), address);
    }

    pub fn address(&self, name: &str) -> Option<usize> {
        self.addresses.get(name).copied()
    }

    pub fn call(&mut self, code: &mut Code, name: &str) -> usize {
        let address = code.emit(Instruction::Call(0));
        self.call_sites.push((address, name.to_string()));
        address
    }

    pub fn link(&mut self, code: &mut Code) -> Result<(), LinkError> {
        for (site, name) in self.call_sites.drain(..) {
            let target = self
                .addresses
                .get(&name)
                .copied()
                .ok_or_else(|| LinkError::Unresolved(name.clone()))?;
            if !code.patch(site, target) {
                return Err(LinkError::NotACall(site));
            }
        }
        Ok(())
    }
}
