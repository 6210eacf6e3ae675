pub mod ast;
pub mod interpreter;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod token;
pub mod value;

mod callable;
mod class;
mod environment;
mod instance;
mod iterator;
mod native;
mod shared_list;
mod stdlib;

use crate::interpreter::{Interpreter, RuntimeError};
use crate::parser::{ParseError, Parser};
use crate::resolver::{Resolver, ResolverError};
use crate::scanner::ScanError;
use std::io::Write;
use thiserror::Error;
use tracing::debug;

/// Everything that can stop a program. Scan, parse and static errors are
/// reported together, one per line, before anything runs.
#[derive(Debug, Error)]
pub enum LoxError {
    #[error("{}", lines(.0))]
    Scan(Vec<ScanError>),
    #[error("{}", lines(.0))]
    Parse(Vec<ParseError>),
    #[error("{}", lines(.0))]
    Resolve(Vec<ResolverError>),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

fn lines<E: ToString>(errors: &[E]) -> String {
    errors
        .iter()
        .map(|err| err.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

impl LoxError {
    /// Process exit status for a script that failed with this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoxError::Scan(_) | LoxError::Parse(_) | LoxError::Resolve(_) => 65,
            LoxError::Runtime(_) => 70,
        }
    }
}

/// One interpreter session. Globals, and functions defined by earlier runs,
/// stay available to later ones, so a prompt can feed it a line at a time.
pub struct Lox {
    interpreter: Interpreter,
    next_id: usize,
}

impl Lox {
    pub fn new() -> Lox {
        Lox {
            interpreter: Interpreter::new(),
            next_id: 0,
        }
    }
    pub fn with_output(out: Box<dyn Write>) -> Lox {
        Lox {
            interpreter: Interpreter::with_output(out),
            next_id: 0,
        }
    }
    pub fn run(&mut self, source: &str) -> Result<(), LoxError> {
        let tokens = scanner::scan_tokens(source).map_err(LoxError::Scan)?;
        let mut parser = Parser::with_first_id(&tokens, self.next_id);
        let parsed = parser.parse();
        let first_id = self.next_id;
        self.next_id = parser.next_id();
        let statements = parsed.map_err(LoxError::Parse)?;
        let resolutions = Resolver::new()
            .resolve(&statements)
            .map_err(LoxError::Resolve)?;
        debug!(
            statements = statements.len(),
            ids = self.next_id - first_id,
            "running program"
        );
        self.interpreter.interpret(&statements, resolutions)?;
        Ok(())
    }
}

impl Default for Lox {
    fn default() -> Lox {
        Lox::new()
    }
}
