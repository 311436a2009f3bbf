//! Stage five: turns the final tree into an executable procedure.
//!
//! Procedures are bytecode for the stack machine in [`crate::runtime::vm`].
//! The same tree can be rendered as readable pseudo-source for inspection.

mod bytecode;
mod instr;
pub mod source;

pub use bytecode::generate;
pub use instr::Instr;

use crate::language::{roles::ImageRole, span::Span};
use serde::Deserialize;
use std::{fmt, str::FromStr};
use thiserror::Error;

/// How the generated procedure is driven.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationModel {
    /// The caller drives `evaluate(x, y)` per pixel, in any order.
    Direct,
    /// The procedure sweeps the whole domain itself, reporting progress.
    Indirect,
}

impl fmt::Display for EvaluationModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvaluationModel::Direct => f.write_str("direct"),
            EvaluationModel::Indirect => f.write_str("indirect"),
        }
    }
}

impl FromStr for EvaluationModel {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "direct" => Ok(EvaluationModel::Direct),
            "indirect" => Ok(EvaluationModel::Indirect),
            other => Err(format!("unknown evaluation model `{other}`")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageSlot {
    pub name: String,
    pub role: ImageRole,
}

/// Output of code generation. Immutable and shareable between evaluators.
#[derive(Clone, Debug)]
pub struct CompiledProcedure {
    pub model: EvaluationModel,
    pub instructions: Vec<Instr>,
    /// Image operands, indexed by the slot numbers in the instructions.
    pub images: Vec<ImageSlot>,
    /// Local slot names; hidden loop bounds use names containing `$`.
    pub locals: Vec<String>,
}

impl CompiledProcedure {
    pub fn image_index(&self, name: &str) -> Option<usize> {
        self.images.iter().position(|slot| slot.name == name)
    }

    pub fn dest_slots(&self) -> impl Iterator<Item = (usize, &ImageSlot)> {
        self.images
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.role == ImageRole::Dest)
    }
}

/// A construct reached code generation that only the primary tree may hold.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("cannot generate code for {construct}")]
pub struct CodeGenError {
    pub construct: String,
    pub span: Span,
}

impl CodeGenError {
    pub fn new(construct: impl Into<String>, span: Span) -> Self {
        Self {
            construct: construct.into(),
            span,
        }
    }
}

#[cfg(test)]
mod tests;
