use rustc_hash::FxHashMap;

use crate::linker::LinkError;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SemanticError {
    #[error("Undefined variable \"{0}\"")]
    UndefinedVariable(String),
    #[error("Function not found: {0}")]
    UnknownFunction(String),
    #[error("Function not found: {name} takes {expected} arguments but was called with {found}")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("Function {0} is declared more than once")]
    FunctionRedeclared(String),
    #[error("Variable {0} is bound more than once in the same scope")]
    DuplicateBinding(String),
    #[error("Left side of {0} must be a variable")]
    InvalidAssignTarget(String),
    #[error(transparent)]
    Link(#[from] LinkError),
}

/// Function signatures plus a stack of lexical scopes.
///
/// Every id handed out, for functions and variables alike, comes from one
/// counter, so ids are unique and strictly increasing for the lifetime of the
/// table. Scopes map names to those ids; the compiler maps ids to frame slots.
#[derive(Debug, Default)]
pub struct SymbolTable {
    functions: FxHashMap<String, usize>,
    scopes: Vec<FxHashMap<String, usize>>,
    last_id: usize,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&mut self) -> usize {
        self.last_id += 1;
        self.last_id
    }

    pub fn register_function(&mut self, name: &str, arity: usize) -> Result<usize, SemanticError> {
        if self.functions.contains_key(name) {
            return Err(SemanticError::FunctionRedeclared(name.to_string()));
        }
        let id = self.next_id();
        self.functions.insert(name.to_string(), arity);
        Ok(id)
    }

    pub fn function_exists(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn function_arity(&self, name: &str) -> Option<usize> {
        self.functions.get(name).copied()
    }

    /// Opens a scope binding each name to a fresh id, returned in order.
    pub fn push_scope(&mut self, names: &[String]) -> Result<Vec<usize>, SemanticError> {
        let mut scope = FxHashMap::default();
        let mut ids = Vec::with_capacity(names.len());
        for name in names {
            if scope.contains_key(name) {
                return Err(SemanticError::DuplicateBinding(name.clone()));
            }
            let id = self.next_id();
            scope.insert(name.clone(), id);
            ids.push(id);
        }
        self.scopes.push(scope);
        Ok(ids)
    }

    pub fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn variable_id(&self, name: &str) -> Option<usize> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).copied())
    }

    pub fn variable_exists(&self, name: &str) -> bool {
        self.variable_id(name).is_some()
    }
}
