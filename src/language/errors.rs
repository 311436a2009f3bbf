use crate::language::span::Span;
use std::fmt;
use thiserror::Error;

/// First unrecoverable lexical or grammatical mismatch in a script.
#[derive(Clone, Debug, Error, PartialEq)]
#[error("{message} at line {line}, column {column}")]
pub struct SyntaxError {
    pub message: String,
    pub span: Span,
    pub line: usize,
    pub column: usize,
    pub help: Option<String>,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, span: Span, source: &str) -> Self {
        let (line, column) = span.line_col(source);
        Self {
            message: message.into(),
            span,
            line,
            column,
            help: None,
        }
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Warning,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Warning => f.write_str("warning"),
            Level::Error => f.write_str("error"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    FuncUndefined,
    FuncArity,
    AssignmentToSrcImage,
    ReadingFromDestImage,
    AssignmentToPositional,
    AssignmentToConstant,
    AssignmentToLoopVar,
    ImageAsLoopVar,
    UninitVar,
    NotAnImage,
    DestOffset,
    ImageNotUsed,
    ImplicitSource,
}

impl ErrorCode {
    pub fn level(self) -> Level {
        match self {
            ErrorCode::ImageNotUsed | ErrorCode::ImplicitSource => Level::Warning,
            _ => Level::Error,
        }
    }

    pub fn is_error(self) -> bool {
        self.level() == Level::Error
    }

    pub fn code(self) -> &'static str {
        match self {
            ErrorCode::FuncUndefined => "FUNC_UNDEFINED",
            ErrorCode::FuncArity => "FUNC_ARITY",
            ErrorCode::AssignmentToSrcImage => "ASSIGNMENT_TO_SRC_IMAGE",
            ErrorCode::ReadingFromDestImage => "READING_FROM_DEST_IMAGE",
            ErrorCode::AssignmentToPositional => "ASSIGNMENT_TO_POSITIONAL",
            ErrorCode::AssignmentToConstant => "ASSIGNMENT_TO_CONSTANT",
            ErrorCode::AssignmentToLoopVar => "ASSIGNMENT_TO_LOOP_VAR",
            ErrorCode::ImageAsLoopVar => "IMAGE_AS_LOOP_VAR",
            ErrorCode::UninitVar => "UNINIT_VAR",
            ErrorCode::NotAnImage => "NOT_AN_IMAGE",
            ErrorCode::DestOffset => "DEST_OFFSET",
            ErrorCode::ImageNotUsed => "IMAGE_NOT_USED",
            ErrorCode::ImplicitSource => "IMPLICIT_SOURCE",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            ErrorCode::FuncUndefined => "Undefined function",
            ErrorCode::FuncArity => "Wrong number of arguments for function",
            ErrorCode::AssignmentToSrcImage => "Cannot assign a value to a source image",
            ErrorCode::ReadingFromDestImage => {
                "Cannot read from a destination image before writing to it"
            }
            ErrorCode::AssignmentToPositional => "Cannot assign a value to a positional variable",
            ErrorCode::AssignmentToConstant => "Cannot assign a value to a constant",
            ErrorCode::AssignmentToLoopVar => "Cannot assign a value to a loop variable",
            ErrorCode::ImageAsLoopVar => "An image cannot be used as a loop variable",
            ErrorCode::UninitVar => "Variable used before being assigned a value",
            ErrorCode::NotAnImage => "Pixel reference to a variable that is not an image",
            ErrorCode::DestOffset => "Destination images can only be accessed at the current pixel",
            ErrorCode::ImageNotUsed => "Image parameter is not used in the script",
            ErrorCode::ImplicitSource => "Unassigned variable treated as a source image",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One validation finding, tied to the identifier or call it concerns.
#[derive(Clone, Debug, PartialEq)]
pub struct Diagnostic {
    pub code: ErrorCode,
    pub name: String,
    pub span: Span,
}

impl Diagnostic {
    pub fn new(code: ErrorCode, name: impl Into<String>, span: Span) -> Self {
        Self {
            code,
            name: name.into(),
            span,
        }
    }

    pub fn level(&self) -> Level {
        self.code.level()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}: {} `{}`",
            self.level(),
            self.code,
            self.code.message(),
            self.name
        )
    }
}

/// Findings accumulated over a whole validation pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    /// Adds the finding unless the same code was already raised for `name`.
    pub fn push_once(&mut self, diagnostic: Diagnostic) {
        let seen = self
            .items
            .iter()
            .any(|d| d.code == diagnostic.code && d.name == diagnostic.name);
        if !seen {
            self.items.push(diagnostic);
        }
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.items.extend(other.items);
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|d| d.code.is_error())
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(|d| d.code.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(|d| !d.code.is_error())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, diagnostic) in self.items.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            write!(f, "{diagnostic}")?;
        }
        Ok(())
    }
}
