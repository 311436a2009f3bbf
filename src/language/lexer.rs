use crate::language::{
    span::Span,
    token::{Token, TokenKind},
};
use nom::{
    branch::alt,
    character::complete::{char, digit1, one_of},
    combinator::{opt, recognize},
    sequence::{pair, tuple},
    IResult,
};

#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub message: String,
    pub span: Span,
}

pub fn lex(source: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(source).run()
}

fn fraction(input: &str) -> IResult<&str, &str> {
    recognize(pair(char('.'), digit1))(input)
}

fn exponent(input: &str) -> IResult<&str, &str> {
    recognize(tuple((one_of("eE"), opt(one_of("+-")), digit1)))(input)
}

/// Recognizes `12`, `1.5`, `.5`, `2e-3` and `1.5E+2`.
fn number_literal(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        alt((recognize(pair(digit1, opt(fraction))), fraction)),
        opt(exponent),
    ))(input)
}

struct Lexer<'a> {
    src: &'a str,
    chars: std::str::Chars<'a>,
    current: Option<char>,
    offset: usize,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        let mut chars = src.chars();
        let current = chars.next();
        Self {
            src,
            chars,
            current,
            offset: 0,
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Vec<Token>, LexError> {
        while let Some(ch) = self.current {
            match ch {
                '/' if self.peek() == Some('/') => self.eat_line_comment(),
                '/' if self.peek() == Some('*') => self.eat_block_comment()?,
                ch if ch.is_whitespace() => {
                    self.bump();
                }
                ch if ch.is_ascii_alphabetic() || ch == '_' => self.lex_identifier(),
                ch if ch.is_ascii_digit() => self.lex_number()?,
                '.' if self.peek().is_some_and(|next| next.is_ascii_digit()) => {
                    self.lex_number()?
                }
                _ => self.lex_symbol()?,
            }
        }
        self.push_token(TokenKind::Eof, self.offset, self.offset);
        Ok(self.tokens)
    }

    fn bump(&mut self) -> Option<char> {
        if let Some(ch) = self.current {
            self.offset += ch.len_utf8();
        }
        self.current = self.chars.next();
        self.current
    }

    fn peek(&self) -> Option<char> {
        self.chars.clone().next()
    }

    fn push_token(&mut self, kind: TokenKind, start: usize, end: usize) {
        self.tokens.push(Token {
            kind,
            span: Span::new(start, end),
        });
    }

    fn error(&self, start: usize, end: usize, message: impl Into<String>) -> LexError {
        LexError {
            message: message.into(),
            span: Span::new(start, end),
        }
    }

    fn eat_line_comment(&mut self) {
        self.bump();
        self.bump();
        while let Some(ch) = self.current {
            if ch == '\n' {
                break;
            }
            self.bump();
        }
    }

    fn eat_block_comment(&mut self) -> Result<(), LexError> {
        let start = self.offset;
        self.bump();
        self.bump();
        while let Some(ch) = self.current {
            if ch == '*' && self.peek() == Some('/') {
                self.bump();
                self.bump();
                return Ok(());
            }
            self.bump();
        }
        Err(self.error(start, self.offset, "Unterminated block comment"))
    }

    fn lex_identifier(&mut self) {
        let start = self.offset;
        while let Some(ch) = self.current {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                self.bump();
            } else {
                break;
            }
        }

        let end = self.offset;
        let slice = &self.src[start..end];
        let kind = match slice {
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            "until" => TokenKind::Until,
            "foreach" => TokenKind::Foreach,
            "in" => TokenKind::In,
            "break" => TokenKind::Break,
            "breakif" => TokenKind::BreakIf,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            _ => TokenKind::Identifier(slice.to_string()),
        };
        self.push_token(kind, start, end);
    }

    fn lex_number(&mut self) -> Result<(), LexError> {
        let start = self.offset;
        let text = match number_literal(&self.src[start..]) {
            Ok((_, text)) => text,
            Err(_) => return Err(self.error(start, start + 1, "Invalid number literal")),
        };
        // Number literals are ASCII, so one char per byte.
        for _ in 0..text.len() {
            self.bump();
        }
        let end = self.offset;
        match text.parse::<f64>() {
            Ok(value) => {
                self.push_token(TokenKind::Number(value), start, end);
                Ok(())
            }
            Err(_) => Err(self.error(start, end, "Invalid number literal")),
        }
    }

    fn lex_symbol(&mut self) -> Result<(), LexError> {
        let start = self.offset;
        match self.current {
            Some('(') => self.single(TokenKind::LParen),
            Some(')') => self.single(TokenKind::RParen),
            Some('{') => self.single(TokenKind::LBrace),
            Some('}') => self.single(TokenKind::RBrace),
            Some('[') => self.single(TokenKind::LBracket),
            Some(']') => self.single(TokenKind::RBracket),
            Some(',') => self.single(TokenKind::Comma),
            Some(':') => self.single(TokenKind::Colon),
            Some(';') => self.single(TokenKind::Semi),
            Some('?') => self.single(TokenKind::Question),
            Some('$') => self.single(TokenKind::Dollar),
            Some('+') => self.with_eq(TokenKind::Plus, TokenKind::PlusEq),
            Some('-') => self.with_eq(TokenKind::Minus, TokenKind::MinusEq),
            Some('*') => self.with_eq(TokenKind::Star, TokenKind::StarEq),
            Some('/') => self.with_eq(TokenKind::Slash, TokenKind::SlashEq),
            Some('%') => self.with_eq(TokenKind::Percent, TokenKind::PercentEq),
            Some('!') => self.with_eq(TokenKind::Bang, TokenKind::BangEq),
            Some('=') => self.with_eq(TokenKind::Eq, TokenKind::EqEq),
            Some('<') => self.with_eq(TokenKind::Lt, TokenKind::LtEq),
            Some('>') => self.with_eq(TokenKind::Gt, TokenKind::GtEq),
            Some('^') => {
                self.bump();
                if self.current == Some('|') {
                    self.bump();
                    self.push_token(TokenKind::CaretPipe, start, self.offset);
                } else {
                    self.push_token(TokenKind::Caret, start, self.offset);
                }
            }
            Some('&') => {
                self.bump();
                if self.current != Some('&') {
                    return Err(self.error(start, self.offset, "Expected '&&'"));
                }
                self.bump();
                self.push_token(TokenKind::AmpersandAmpersand, start, self.offset);
            }
            Some('|') => {
                self.bump();
                if self.current != Some('|') {
                    return Err(self.error(start, self.offset, "Expected '||'"));
                }
                self.bump();
                self.push_token(TokenKind::PipePipe, start, self.offset);
            }
            Some(ch) => {
                self.bump();
                return Err(self.error(start, self.offset, format!("Unexpected character '{ch}'")));
            }
            None => {}
        }
        Ok(())
    }

    fn single(&mut self, kind: TokenKind) {
        let start = self.offset;
        self.bump();
        self.push_token(kind, start, self.offset);
    }

    /// Pushes `with` when the next char is `=`, `plain` otherwise.
    fn with_eq(&mut self, plain: TokenKind, with: TokenKind) {
        let start = self.offset;
        self.bump();
        if self.current == Some('=') {
            self.bump();
            self.push_token(with, start, self.offset);
        } else {
            self.push_token(plain, start, self.offset);
        }
    }
}
