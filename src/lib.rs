pub mod ast;
pub mod bytecode;
pub mod compiler;
pub mod linker;
pub mod parser;
pub mod semantic;
pub mod span;
pub mod tokenizer;
pub mod vm;

use crate::{
    bytecode::Code,
    parser::SyntaxError,
    semantic::SemanticError,
    tokenizer::{Token, TokenizeError},
    vm::{RuntimeError, StackEntry, Vm, VmConfig},
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Lexical(#[from] TokenizeError),
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    #[error(transparent)]
    Semantic(#[from] SemanticError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Lexical,
    Syntax,
    Semantic,
    Runtime,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::Lexical => "lexical",
            ErrorKind::Syntax => "syntax",
            ErrorKind::Semantic => "semantic",
            ErrorKind::Runtime => "runtime",
        };
        write!(f, "{}", name)
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Lexical(_) => ErrorKind::Lexical,
            Error::Syntax(_) => ErrorKind::Syntax,
            Error::Semantic(_) => ErrorKind::Semantic,
            Error::Runtime(_) => ErrorKind::Runtime,
        }
    }
}

pub fn tokenize(source: &str) -> Result<Vec<Token>, Error> {
    let tokens = tokenizer::tokenize(source)?;
    tracing::debug!(tokens = tokens.len(), "tokenized");
    Ok(tokens)
}

pub fn parse(source: &str) -> Result<ast::Program, Error> {
    let tokens = tokenize(source)?;
    let program = parser::program(&tokens)?;
    tracing::debug!(functions = program.functions.len(), "parsed");
    Ok(program)
}

pub fn compile(source: &str) -> Result<Code, Error> {
    let program = parse(source)?;
    let code = compiler::compile(&program)?;

    #[cfg(feature = "disassemble")]
    tracing::debug!("disassembly:\n{}", code);

    Ok(code)
}

pub fn run(source: &str) -> Result<StackEntry, Error> {
    run_with_config(source, VmConfig::default())
}

pub fn run_with_config(source: &str, config: VmConfig) -> Result<StackEntry, Error> {
    let code = compile(source)?;
    let value = Vm::with_config(&code, config).run()?;
    Ok(value)
}
