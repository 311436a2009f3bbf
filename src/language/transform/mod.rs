//! Tree rewriting from the primary tree to the final tree.
//!
//! Substitution runs first so that the temporaries introduced by ternary
//! lowering are already plain locals and need no classification.

mod ternary;
mod vars;

pub use ternary::lower_ternaries;
pub use vars::substitute_variables;

use crate::language::{ast::Script, roles::VarRoles};
use tracing::debug;

/// Produces the final tree. The input tree is left untouched.
pub fn transform(script: &Script, roles: &VarRoles) -> Script {
    let substituted = substitute_variables(script, roles);
    let lowered = lower_ternaries(&substituted);
    debug!(statements = lowered.statements.len(), "tree transformed");
    lowered
}

#[cfg(test)]
mod tests;
