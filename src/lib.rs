//! Compiler and runtime for Jiffle, a small per-pixel raster algebra language.
//!
//! A [`Jiffle`] unit takes a script and a map of image parameters, compiles
//! them through parsing, function validation, variable classification and
//! tree rewriting, and then builds evaluators bound to concrete images:
//!
//! ```
//! use jiffle::{Bindings, EvaluationModel, ImageRole, Jiffle, JiffleContext, MemoryImage};
//!
//! let context = JiffleContext::new();
//! let mut unit = Jiffle::compiled(
//!     &context,
//!     "dest = src + 10;",
//!     [("src", ImageRole::Source), ("dest", ImageRole::Dest)],
//! )?;
//!
//! let src = MemoryImage::from_rows(&[&[1.0, 2.0], &[3.0, 4.0]]);
//! let dest = MemoryImage::new(2, 2, 1);
//! let bindings = Bindings::new().bind("src", src).bind("dest", dest.clone());
//! let mut runtime = unit
//!     .build_runtime(EvaluationModel::Direct, bindings)?
//!     .into_direct()
//!     .expect("direct runtime");
//! for y in 0..2 {
//!     for x in 0..2 {
//!         runtime.evaluate(x, y)?;
//!     }
//! }
//! assert_eq!(dest.band(0), vec![vec![11.0, 12.0], vec![13.0, 14.0]]);
//! # Ok::<(), jiffle::JiffleError>(())
//! ```

pub mod codegen;
pub mod config;
pub mod context;
pub mod diagnostics;
pub mod error;
pub mod jiffle;
pub mod language;
pub mod runtime;

pub use codegen::{CompiledProcedure, EvaluationModel};
pub use config::JiffleOptions;
pub use context::JiffleContext;
pub use error::{JiffleError, JiffleResult};
pub use jiffle::{CompileStage, Jiffle};
pub use language::{
    errors::{Diagnostic, Diagnostics, ErrorCode, Level, SyntaxError},
    roles::ImageRole,
};
pub use runtime::{
    BindingError, Bindings, DirectRuntime, EvalError, EvalStatus, ImageAccess, ImageBinding,
    IndirectRuntime, MemoryImage, Progress, RuntimeEvaluator,
};

#[cfg(test)]
mod tests;
