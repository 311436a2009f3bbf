use crate::language::span::Span;

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    Identifier(String),
    Number(f64),

    If,
    Else,
    While,
    Until,
    Foreach,
    In,
    Break,
    BreakIf,
    True,
    False,

    AmpersandAmpersand,
    PipePipe,
    CaretPipe,
    Caret,
    Bang,
    BangEq,
    Eq,
    EqEq,
    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,
    PercentEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Comma,
    Colon,
    Semi,
    Question,
    Dollar,

    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,

    Eof,
}

impl TokenKind {
    /// Text used when a token appears in an error message.
    pub fn describe(&self) -> String {
        let text = match self {
            TokenKind::Identifier(name) => return format!("identifier `{name}`"),
            TokenKind::Number(value) => return format!("number `{value}`"),
            TokenKind::If => "if",
            TokenKind::Else => "else",
            TokenKind::While => "while",
            TokenKind::Until => "until",
            TokenKind::Foreach => "foreach",
            TokenKind::In => "in",
            TokenKind::Break => "break",
            TokenKind::BreakIf => "breakif",
            TokenKind::True => "true",
            TokenKind::False => "false",
            TokenKind::AmpersandAmpersand => "&&",
            TokenKind::PipePipe => "||",
            TokenKind::CaretPipe => "^|",
            TokenKind::Caret => "^",
            TokenKind::Bang => "!",
            TokenKind::BangEq => "!=",
            TokenKind::Eq => "=",
            TokenKind::EqEq => "==",
            TokenKind::PlusEq => "+=",
            TokenKind::MinusEq => "-=",
            TokenKind::StarEq => "*=",
            TokenKind::SlashEq => "/=",
            TokenKind::PercentEq => "%=",
            TokenKind::Lt => "<",
            TokenKind::LtEq => "<=",
            TokenKind::Gt => ">",
            TokenKind::GtEq => ">=",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::Comma => ",",
            TokenKind::Colon => ":",
            TokenKind::Semi => ";",
            TokenKind::Question => "?",
            TokenKind::Dollar => "$",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBrace => "{",
            TokenKind::RBrace => "}",
            TokenKind::LBracket => "[",
            TokenKind::RBracket => "]",
            TokenKind::Eof => return "end of script".to_string(),
        };
        format!("`{text}`")
    }
}
