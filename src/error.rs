use crate::{
    codegen::CodeGenError,
    language::errors::{Diagnostics, SyntaxError},
    runtime::{BindingError, EvalError},
};
use thiserror::Error;

pub type JiffleResult<T> = Result<T, JiffleError>;

/// Every failure the public API can report, one variant per pipeline concern.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum JiffleError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Syntax error: {0}")]
    Syntax(#[from] SyntaxError),
    #[error("Function validation failed:\n{0}")]
    Function(Diagnostics),
    #[error("Variable validation failed:\n{0}")]
    Variable(Diagnostics),
    #[error("Code generation failed: {0}")]
    CodeGen(#[from] CodeGenError),
    #[error("Binding error: {0}")]
    Binding(#[from] BindingError),
    #[error("Evaluation error: {0}")]
    Eval(#[from] EvalError),
}

impl JiffleError {
    /// Validation findings carried by the error, if any.
    pub fn diagnostics(&self) -> Option<&Diagnostics> {
        match self {
            JiffleError::Function(diagnostics) | JiffleError::Variable(diagnostics) => {
                Some(diagnostics)
            }
            _ => None,
        }
    }
}
