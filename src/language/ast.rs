//! Syntax tree shared by the primary (parsed) and final (transformed) tree.
//!
//! A handful of nodes only ever appear in one of the two generations: parsing
//! produces `Variable`, `Pixel`, `Ternary` and compound assignments, while the
//! transformer replaces them with `Local`, `Positional`, `ReadImage`,
//! `ReadDest` and `WriteImage`.

use crate::language::span::Span;
use std::fmt;

#[derive(Clone, Debug, PartialEq)]
pub struct Identifier {
    pub name: String,
    pub span: Span,
}

impl Identifier {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Script {
    pub statements: Vec<Statement>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Statement {
    Assign(AssignStmt),
    Expr(ExprStmt),
    Block(Block),
    If(IfStmt),
    While(WhileStmt),
    Foreach(ForeachStmt),
    Break(Span),
    BreakIf(BreakIfStmt),
    WriteImage(WriteImageStmt),
}

impl Statement {
    pub fn span(&self) -> Span {
        match self {
            Statement::Assign(stmt) => stmt.span,
            Statement::Expr(stmt) => stmt.span,
            Statement::Block(block) => block.span,
            Statement::If(stmt) => stmt.span,
            Statement::While(stmt) => stmt.span,
            Statement::Foreach(stmt) => stmt.span,
            Statement::Break(span) => *span,
            Statement::BreakIf(stmt) => stmt.span,
            Statement::WriteImage(stmt) => stmt.span,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AssignStmt {
    pub target: AssignTarget,
    pub op: AssignOp,
    pub value: Expr,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum AssignTarget {
    Variable(Identifier),
    Pixel(PixelRef),
    Local(Identifier),
}

impl AssignTarget {
    pub fn name(&self) -> &Identifier {
        match self {
            AssignTarget::Variable(ident) | AssignTarget::Local(ident) => ident,
            AssignTarget::Pixel(pixel) => &pixel.image,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl AssignOp {
    /// The arithmetic applied by a compound assignment.
    pub fn binary(self) -> Option<BinaryOp> {
        match self {
            AssignOp::Assign => None,
            AssignOp::Add => Some(BinaryOp::Add),
            AssignOp::Sub => Some(BinaryOp::Sub),
            AssignOp::Mul => Some(BinaryOp::Mul),
            AssignOp::Div => Some(BinaryOp::Div),
            AssignOp::Rem => Some(BinaryOp::Rem),
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            AssignOp::Assign => "=",
            AssignOp::Add => "+=",
            AssignOp::Sub => "-=",
            AssignOp::Mul => "*=",
            AssignOp::Div => "/=",
            AssignOp::Rem => "%=",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExprStmt {
    pub expr: Expr,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    pub statements: Vec<Statement>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct IfStmt {
    pub condition: Expr,
    pub then_branch: Box<Statement>,
    pub else_branch: Option<Box<Statement>>,
    pub span: Span,
}

/// `while` loop; `until (c)` parses to `while (!c)`.
#[derive(Clone, Debug, PartialEq)]
pub struct WhileStmt {
    pub condition: Expr,
    pub body: Box<Statement>,
    pub span: Span,
}

/// `foreach (var in start:end)`, inclusive with a step of one.
#[derive(Clone, Debug, PartialEq)]
pub struct ForeachStmt {
    pub var: Identifier,
    pub start: Expr,
    pub end: Expr,
    pub body: Box<Statement>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BreakIfStmt {
    pub condition: Expr,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct WriteImageStmt {
    pub image: Identifier,
    pub band: Expr,
    pub value: Expr,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Number(f64, Span),
    Variable(Identifier),
    Pixel(PixelRef),
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
        span: Span,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
        span: Span,
    },
    Ternary {
        condition: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
        span: Span,
    },
    Call {
        name: Identifier,
        args: Vec<Expr>,
        span: Span,
    },
    Local(Identifier),
    Positional(Positional, Span),
    ReadImage {
        image: Identifier,
        band: Box<Expr>,
        x: Box<Expr>,
        y: Box<Expr>,
        span: Span,
    },
    ReadDest {
        image: Identifier,
        band: Box<Expr>,
        span: Span,
    },
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Number(_, span) | Expr::Positional(_, span) => *span,
            Expr::Variable(ident) | Expr::Local(ident) => ident.span,
            Expr::Pixel(pixel) => pixel.span,
            Expr::Unary { span, .. }
            | Expr::Binary { span, .. }
            | Expr::Ternary { span, .. }
            | Expr::Call { span, .. }
            | Expr::ReadImage { span, .. }
            | Expr::ReadDest { span, .. } => *span,
        }
    }
}

/// Pixel-reference syntax: `img[band]`, `img[dx, dy]` or `img[band][dx, dy]`.
#[derive(Clone, Debug, PartialEq)]
pub struct PixelRef {
    pub image: Identifier,
    pub band: Option<Box<Expr>>,
    pub position: Option<PixelPosition>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PixelPosition {
    pub x: Coord,
    pub y: Coord,
}

impl PixelPosition {
    pub fn is_current_pixel(&self) -> bool {
        self.x.is_zero_offset() && self.y.is_zero_offset()
    }
}

/// A coordinate written `$expr` is absolute; otherwise it offsets the current pixel.
#[derive(Clone, Debug, PartialEq)]
pub enum Coord {
    Relative(Box<Expr>),
    Absolute(Box<Expr>),
}

impl Coord {
    pub fn expr(&self) -> &Expr {
        match self {
            Coord::Relative(expr) | Coord::Absolute(expr) => expr,
        }
    }

    fn is_zero_offset(&self) -> bool {
        matches!(self, Coord::Relative(expr) if matches!(**expr, Expr::Number(v, _) if v == 0.0))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
    Xor,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Pow => "^",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Xor => "^|",
        }
    }

    /// `&&` and `||` skip their right operand when the left decides the result.
    pub fn is_short_circuit(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }
}

/// Reserved per-pixel names, always readable and never assignable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Positional {
    X,
    Y,
    Width,
    Height,
}

impl Positional {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "x" => Some(Positional::X),
            "y" => Some(Positional::Y),
            "width" => Some(Positional::Width),
            "height" => Some(Positional::Height),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Positional::X => "x",
            Positional::Y => "y",
            Positional::Width => "width",
            Positional::Height => "height",
        }
    }
}

impl fmt::Display for Positional {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
