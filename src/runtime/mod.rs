//! Stage six and execution: binding images to a compiled procedure and
//! running it.

mod binding;
pub mod error;
mod evaluator;
mod memory;
mod vm;

pub use binding::{Bindings, ImageAccess, ImageBinding};
pub use error::{BindingError, EvalError, EvalResult};
pub use evaluator::{DirectRuntime, EvalStatus, IndirectRuntime, Progress, RuntimeEvaluator};
pub use memory::MemoryImage;

use crate::{
    codegen::{CompiledProcedure, EvaluationModel},
    config::JiffleOptions,
};
use std::sync::Arc;
use tracing::debug;
use vm::Machine;

/// Validates `bindings` against the procedure's image parameters and builds
/// an evaluator of the procedure's model. Fails before any pixel is touched.
pub fn build(
    procedure: Arc<CompiledProcedure>,
    bindings: Bindings,
    options: &JiffleOptions,
) -> Result<RuntimeEvaluator, BindingError> {
    let bound = bindings.resolve(&procedure)?;
    debug!(
        model = %procedure.model,
        images = bound.images.len(),
        width = bound.width,
        height = bound.height,
        "runtime bound"
    );
    let model = procedure.model;
    let machine = Machine::new(procedure, bound, options.outside_value, options.progress_rows);
    Ok(match model {
        EvaluationModel::Direct => RuntimeEvaluator::Direct(DirectRuntime::new(machine)),
        EvaluationModel::Indirect => RuntimeEvaluator::Indirect(IndirectRuntime::new(machine)),
    })
}

#[cfg(test)]
mod tests;
