//! Function validation: every call site must name a builtin overload.

use crate::language::{
    ast::{Expr, Script},
    errors::{Diagnostic, Diagnostics},
    functions,
    visit::{self, Visitor},
};
use tracing::debug;

/// Checks every call in `script`, reporting one finding per offending call site.
pub fn validate_functions(script: &Script) -> Diagnostics {
    let mut validator = FunctionValidator::default();
    visit::walk_script(&mut validator, script);
    debug!(
        calls = validator.calls,
        problems = validator.diagnostics.len(),
        "function calls validated"
    );
    validator.diagnostics
}

#[derive(Default)]
struct FunctionValidator {
    diagnostics: Diagnostics,
    calls: usize,
}

impl Visitor for FunctionValidator {
    fn visit_expr(&mut self, expr: &Expr) {
        if let Expr::Call { name, args, span } = expr {
            self.calls += 1;
            if let Err(code) = functions::lookup(&name.name, args.len()) {
                self.diagnostics
                    .push(Diagnostic::new(code, name.name.clone(), *span));
            }
        }
        visit::walk_expr(self, expr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::{errors::ErrorCode, parser::parse_script};

    fn validate(source: &str) -> Diagnostics {
        validate_functions(&parse_script(source).expect("parse"))
    }

    #[test]
    fn known_functions_pass() {
        let diagnostics = validate("dest = sqrt(abs(src)) + max(1, 2, 3) + con(src > 0, 1, 2);");
        assert!(diagnostics.is_empty(), "{diagnostics}");
    }

    #[test]
    fn undefined_function_is_reported_by_name() {
        let diagnostics = validate("dest = foo(1, 2);");
        let found: Vec<_> = diagnostics.iter().collect();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].code, ErrorCode::FuncUndefined);
        assert_eq!(found[0].name, "foo");
    }

    #[test]
    fn every_bad_call_site_is_reported() {
        let diagnostics = validate("a = foo(1);\nb = bar(2);\ndest = sqrt(1, 2) + foo(3);");
        let names: Vec<_> = diagnostics.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["foo", "bar", "sqrt", "foo"]);
        assert_eq!(
            diagnostics.iter().filter(|d| d.code == ErrorCode::FuncArity).count(),
            1
        );
        assert!(diagnostics.has_errors());
    }

    #[test]
    fn nested_calls_are_checked() {
        let diagnostics = validate("dest = sqrt(nope(src));");
        assert_eq!(diagnostics.len(), 1);
    }
}
