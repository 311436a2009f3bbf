use crate::{
    codegen::CodeGenError,
    error::JiffleError,
    language::{
        errors::{Diagnostic as Finding, ErrorCode, Level, SyntaxError},
        functions,
    },
};
use miette::{Diagnostic, NamedSource, Report, SourceSpan};
use thiserror::Error;

#[derive(Debug, Error, Diagnostic, Clone)]
#[error("{message}")]
#[diagnostic(code(jiffle::syntax))]
pub struct SyntaxDiagnostic {
    #[source_code]
    src: NamedSource<String>,
    #[label("here")]
    span: SourceSpan,
    #[help]
    help: Option<String>,
    message: String,
}

impl SyntaxDiagnostic {
    pub fn from_error(src: NamedSource<String>, err: &SyntaxError) -> Self {
        Self {
            src,
            span: err.span.into(),
            help: err.help.clone(),
            message: format!(
                "{} (line {}, column {})",
                err.message, err.line, err.column
            ),
        }
    }
}

#[derive(Debug, Error, Diagnostic, Clone)]
#[error("{level} {code}: {message} `{name}`")]
pub struct ValidationDiagnostic {
    #[source_code]
    src: NamedSource<String>,
    #[label("`{name}`")]
    span: SourceSpan,
    #[help]
    help: Option<String>,
    level: Level,
    code: &'static str,
    message: &'static str,
    name: String,
}

impl ValidationDiagnostic {
    pub fn from_finding(src: NamedSource<String>, finding: &Finding) -> Self {
        Self {
            src,
            span: finding.span.into(),
            help: arity_help(finding),
            level: finding.level(),
            code: finding.code.code(),
            message: finding.code.message(),
            name: finding.name.clone(),
        }
    }
}

fn arity_help(finding: &Finding) -> Option<String> {
    if finding.code != ErrorCode::FuncArity {
        return None;
    }
    let accepted: Vec<String> = functions::arities(&finding.name)
        .iter()
        .map(ToString::to_string)
        .collect();
    Some(format!(
        "`{}` takes {} argument(s)",
        finding.name,
        accepted.join(" or ")
    ))
}

#[derive(Debug, Error, Diagnostic, Clone)]
#[error("{message}")]
#[diagnostic(code(jiffle::codegen))]
pub struct CodeGenDiagnostic {
    #[source_code]
    src: NamedSource<String>,
    #[label("not supported here")]
    span: SourceSpan,
    message: String,
}

impl CodeGenDiagnostic {
    pub fn from_error(src: NamedSource<String>, err: &CodeGenError) -> Self {
        Self {
            src,
            span: err.span.into(),
            message: err.to_string(),
        }
    }
}

/// Source-annotated reports for an error, one per finding.
/// Errors without a location in the script become a single plain report.
pub fn reports(name: &str, source: &str, error: &JiffleError) -> Vec<Report> {
    let src = NamedSource::new(name, source.to_string());
    match error {
        JiffleError::Syntax(err) => vec![Report::new(SyntaxDiagnostic::from_error(src, err))],
        JiffleError::Function(findings) | JiffleError::Variable(findings) => findings
            .iter()
            .map(|finding| Report::new(ValidationDiagnostic::from_finding(src.clone(), finding)))
            .collect(),
        JiffleError::CodeGen(err) => vec![Report::new(CodeGenDiagnostic::from_error(src, err))],
        other => vec![Report::msg(other.to_string())],
    }
}

pub fn warning_reports<'a>(
    name: &str,
    source: &str,
    findings: impl IntoIterator<Item = &'a Finding>,
) -> Vec<Report> {
    let src = NamedSource::new(name, source.to_string());
    findings
        .into_iter()
        .filter(|finding| finding.level() == Level::Warning)
        .map(|finding| Report::new(ValidationDiagnostic::from_finding(src.clone(), finding)))
        .collect()
}

pub fn emit_error(name: &str, source: &str, error: &JiffleError) {
    for report in reports(name, source, error) {
        eprintln!("{report:?}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::{errors::Diagnostics, span::Span};

    #[test]
    fn one_report_per_finding() {
        let mut findings = Diagnostics::new();
        findings.push(Finding::new(ErrorCode::FuncUndefined, "foo", Span::new(7, 10)));
        findings.push(Finding::new(ErrorCode::FuncUndefined, "bar", Span::new(15, 18)));
        let source = "dest = foo(1) + bar(2);\n";
        let reports = reports("test", source, &JiffleError::Function(findings));
        assert_eq!(reports.len(), 2);
        assert!(reports[0].to_string().contains("FUNC_UNDEFINED"));
    }

    #[test]
    fn syntax_error_report_carries_position() {
        let source = "dest = ;\n";
        let err = SyntaxError::new("Expected expression", Span::new(7, 8), source);
        let reports = reports("test", source, &JiffleError::Syntax(err));
        assert_eq!(reports.len(), 1);
        assert!(reports[0].to_string().contains("line 1, column 8"));
    }

    #[test]
    fn arity_findings_list_accepted_counts() {
        let finding = Finding::new(ErrorCode::FuncArity, "round", Span::new(0, 5));
        assert_eq!(
            arity_help(&finding).as_deref(),
            Some("`round` takes 1 or 2 argument(s)")
        );
    }

    #[test]
    fn errors_without_location_are_plain_messages() {
        let reports = reports("test", "", &JiffleError::Config("No script".to_string()));
        assert_eq!(reports.len(), 1);
        assert!(reports[0].to_string().contains("No script"));
    }
}
