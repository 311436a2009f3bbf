use crate::language::{
    ast::*,
    errors::SyntaxError,
    lexer::lex,
    span::Span,
    token::{Token, TokenKind},
};

/// Parses script text into the primary syntax tree, stopping at the first error.
pub fn parse_script(source: &str) -> Result<Script, SyntaxError> {
    let tokens = lex(source).map_err(|err| SyntaxError::new(err.message, err.span, source))?;
    Parser::new(source, tokens).parse()
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    loop_depth: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str, tokens: Vec<Token>) -> Self {
        Self {
            source,
            tokens,
            pos: 0,
            loop_depth: 0,
        }
    }

    fn parse(mut self) -> Result<Script, SyntaxError> {
        let mut statements = Vec::new();
        while !self.is_eof() {
            if self.matches(TokenKind::Semi) {
                continue;
            }
            statements.push(self.parse_statement()?);
        }
        Ok(Script { statements })
    }

    fn parse_statement(&mut self) -> Result<Statement, SyntaxError> {
        let start = self.current_span().start;
        match self.peek_kind() {
            TokenKind::LBrace => self.parse_block().map(Statement::Block),
            TokenKind::If => {
                self.advance();
                self.parse_if(start)
            }
            TokenKind::While => {
                self.advance();
                let condition = self.parse_paren_expression()?;
                let body = self.parse_loop_body()?;
                Ok(Statement::While(WhileStmt {
                    condition,
                    span: Span::new(start, body.span().end),
                    body: Box::new(body),
                }))
            }
            TokenKind::Until => {
                self.advance();
                let condition = self.parse_paren_expression()?;
                let span = condition.span();
                let body = self.parse_loop_body()?;
                Ok(Statement::While(WhileStmt {
                    condition: Expr::Unary {
                        op: UnaryOp::Not,
                        expr: Box::new(condition),
                        span,
                    },
                    span: Span::new(start, body.span().end),
                    body: Box::new(body),
                }))
            }
            TokenKind::Foreach => {
                self.advance();
                self.parse_foreach(start)
            }
            TokenKind::Break => {
                self.ensure_in_loop("break")?;
                self.advance();
                let end = self.expect(TokenKind::Semi)?.span.end;
                Ok(Statement::Break(Span::new(start, end)))
            }
            TokenKind::BreakIf => {
                self.ensure_in_loop("breakif")?;
                self.advance();
                let condition = self.parse_paren_expression()?;
                let end = self.expect(TokenKind::Semi)?.span.end;
                Ok(Statement::BreakIf(BreakIfStmt {
                    condition,
                    span: Span::new(start, end),
                }))
            }
            _ => self.parse_simple_statement(start),
        }
    }

    /// Assignment or expression statement, both terminated by `;`.
    fn parse_simple_statement(&mut self, start: usize) -> Result<Statement, SyntaxError> {
        let expr = self.parse_expression()?;
        if let Some(op) = self.current_assign_op() {
            let target = match expr {
                Expr::Variable(ident) => AssignTarget::Variable(ident),
                Expr::Pixel(pixel) => AssignTarget::Pixel(pixel),
                other => {
                    return Err(self
                        .error_at("Invalid assignment target", other.span())
                        .with_help("only variables and image references can be assigned"))
                }
            };
            self.advance();
            let value = self.parse_expression()?;
            let end = self.expect(TokenKind::Semi)?.span.end;
            return Ok(Statement::Assign(AssignStmt {
                target,
                op,
                value,
                span: Span::new(start, end),
            }));
        }
        let end = self.expect(TokenKind::Semi)?.span.end;
        Ok(Statement::Expr(ExprStmt {
            expr,
            span: Span::new(start, end),
        }))
    }

    fn parse_block(&mut self) -> Result<Block, SyntaxError> {
        let start = self.expect(TokenKind::LBrace)?.span.start;
        let mut statements = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.is_eof() {
            if self.matches(TokenKind::Semi) {
                continue;
            }
            statements.push(self.parse_statement()?);
        }
        let end = self.expect(TokenKind::RBrace)?.span.end;
        Ok(Block {
            statements,
            span: Span::new(start, end),
        })
    }

    fn parse_body(&mut self) -> Result<Statement, SyntaxError> {
        if self.is_eof() {
            return Err(self.error_here("Expected statement"));
        }
        self.parse_statement()
    }

    fn parse_if(&mut self, start: usize) -> Result<Statement, SyntaxError> {
        let condition = self.parse_paren_expression()?;
        let then_branch = self.parse_body()?;
        let else_branch = if self.matches(TokenKind::Else) {
            Some(Box::new(self.parse_body()?))
        } else {
            None
        };
        let end = else_branch
            .as_ref()
            .map(|stmt| stmt.span().end)
            .unwrap_or_else(|| then_branch.span().end);
        Ok(Statement::If(IfStmt {
            condition,
            then_branch: Box::new(then_branch),
            else_branch,
            span: Span::new(start, end),
        }))
    }

    fn parse_foreach(&mut self, start: usize) -> Result<Statement, SyntaxError> {
        self.expect(TokenKind::LParen)?;
        let var = self.expect_identifier("Expected loop variable")?;
        self.expect(TokenKind::In)?;
        let range_start = self.parse_expression()?;
        self.expect(TokenKind::Colon)?;
        let range_end = self.parse_expression()?;
        self.expect(TokenKind::RParen)?;
        let body = self.parse_loop_body()?;
        Ok(Statement::Foreach(ForeachStmt {
            var,
            start: range_start,
            end: range_end,
            span: Span::new(start, body.span().end),
            body: Box::new(body),
        }))
    }

    fn parse_loop_body(&mut self) -> Result<Statement, SyntaxError> {
        self.loop_depth += 1;
        let body = self.parse_body();
        self.loop_depth -= 1;
        body
    }

    fn ensure_in_loop(&self, keyword: &str) -> Result<(), SyntaxError> {
        if self.loop_depth > 0 {
            return Ok(());
        }
        Err(self
            .error_here(&format!("`{keyword}` outside a loop"))
            .with_help("`break` and `breakif` may only appear inside while, until or foreach"))
    }

    fn parse_paren_expression(&mut self) -> Result<Expr, SyntaxError> {
        self.expect(TokenKind::LParen)?;
        let expr = self.parse_expression()?;
        self.expect(TokenKind::RParen)?;
        Ok(expr)
    }

    fn parse_expression(&mut self) -> Result<Expr, SyntaxError> {
        let condition = self.parse_binary(0)?;
        if !self.matches(TokenKind::Question) {
            return Ok(condition);
        }
        let then_expr = self.parse_expression()?;
        self.expect(TokenKind::Colon)?;
        let else_expr = self.parse_expression()?;
        let span = condition.span().union(else_expr.span());
        Ok(Expr::Ternary {
            condition: Box::new(condition),
            then_expr: Box::new(then_expr),
            else_expr: Box::new(else_expr),
            span,
        })
    }

    fn parse_binary(&mut self, min_prec: u8) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_unary()?;

        while let Some((op, prec)) = self.current_binary_op() {
            if prec < min_prec {
                break;
            }
            self.advance();
            let right = self.parse_binary(prec + 1)?;
            let span = left.span().union(right.span());
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
                span,
            };
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, SyntaxError> {
        let start = self.current_span().start;
        let op = match self.peek_kind() {
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Bang => Some(UnaryOp::Not),
            TokenKind::Plus => None,
            _ => return self.parse_power(),
        };
        self.advance();
        let expr = self.parse_unary()?;
        match op {
            Some(op) => {
                let span = Span::new(start, expr.span().end);
                Ok(Expr::Unary {
                    op,
                    expr: Box::new(expr),
                    span,
                })
            }
            None => Ok(expr),
        }
    }

    /// `^` binds tighter than unary minus and associates to the right.
    fn parse_power(&mut self) -> Result<Expr, SyntaxError> {
        let base = self.parse_primary()?;
        if !self.matches(TokenKind::Caret) {
            return Ok(base);
        }
        let exponent = self.parse_unary()?;
        let span = base.span().union(exponent.span());
        Ok(Expr::Binary {
            op: BinaryOp::Pow,
            left: Box::new(base),
            right: Box::new(exponent),
            span,
        })
    }

    fn parse_primary(&mut self) -> Result<Expr, SyntaxError> {
        match self.peek_kind() {
            TokenKind::Number(value) => {
                let span = self.advance().span;
                Ok(Expr::Number(value, span))
            }
            TokenKind::True => {
                let span = self.advance().span;
                Ok(Expr::Number(1.0, span))
            }
            TokenKind::False => {
                let span = self.advance().span;
                Ok(Expr::Number(0.0, span))
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(TokenKind::RParen)?;
                Ok(expr)
            }
            TokenKind::Identifier(_) => self.parse_identifier_expression(),
            _ => Err(self.error_here("Unexpected token in expression")),
        }
    }

    fn parse_identifier_expression(&mut self) -> Result<Expr, SyntaxError> {
        let ident = self.expect_identifier("Expected identifier")?;
        if self.matches(TokenKind::LParen) {
            let mut args = Vec::new();
            if !self.check(&TokenKind::RParen) {
                loop {
                    args.push(self.parse_expression()?);
                    if self.matches(TokenKind::Comma) {
                        continue;
                    }
                    break;
                }
            }
            let end = self.expect(TokenKind::RParen)?.span.end;
            let span = Span::new(ident.span.start, end);
            return Ok(Expr::Call {
                name: ident,
                args,
                span,
            });
        }
        if self.check(&TokenKind::LBracket) {
            return self.parse_pixel_ref(ident).map(Expr::Pixel);
        }
        Ok(Expr::Variable(ident))
    }

    fn parse_pixel_ref(&mut self, image: Identifier) -> Result<PixelRef, SyntaxError> {
        let start = image.span.start;
        let (first, end) = self.parse_bracket_list()?;
        let mut band = None;
        let mut position = None;
        match first.len() {
            1 => {
                let (absolute, expr) = first.into_iter().next().ok_or_else(|| {
                    self.error_here("Expected band index")
                })?;
                if absolute {
                    return Err(self.error_at("Band index cannot be absolute", expr.span()));
                }
                band = Some(Box::new(expr));
            }
            2 => position = Some(self.position_from(first)?),
            _ => {
                return Err(self
                    .error_at("Expected band index or x, y offsets", Span::new(start, end))
                    .with_help("use img[band], img[dx, dy] or img[band][dx, dy]"))
            }
        }
        let mut end = end;
        if band.is_some() && self.check(&TokenKind::LBracket) {
            let (second, second_end) = self.parse_bracket_list()?;
            if second.len() != 2 {
                return Err(self.error_at("Expected x, y offsets", Span::new(start, second_end)));
            }
            position = Some(self.position_from(second)?);
            end = second_end;
        }
        Ok(PixelRef {
            image,
            band,
            position,
            span: Span::new(start, end),
        })
    }

    /// `[a, $b, ...]`, returning each element with its absolute marker.
    fn parse_bracket_list(&mut self) -> Result<(Vec<(bool, Expr)>, usize), SyntaxError> {
        self.expect(TokenKind::LBracket)?;
        let mut items = Vec::new();
        loop {
            let absolute = self.matches(TokenKind::Dollar);
            items.push((absolute, self.parse_expression()?));
            if self.matches(TokenKind::Comma) {
                continue;
            }
            break;
        }
        let end = self.expect(TokenKind::RBracket)?.span.end;
        Ok((items, end))
    }

    fn position_from(&self, items: Vec<(bool, Expr)>) -> Result<PixelPosition, SyntaxError> {
        let mut coords = items.into_iter().map(|(absolute, expr)| {
            if absolute {
                Coord::Absolute(Box::new(expr))
            } else {
                Coord::Relative(Box::new(expr))
            }
        });
        match (coords.next(), coords.next()) {
            (Some(x), Some(y)) => Ok(PixelPosition { x, y }),
            _ => Err(self.error_here("Expected x, y offsets")),
        }
    }

    fn current_binary_op(&self) -> Option<(BinaryOp, u8)> {
        match self.peek_kind() {
            TokenKind::PipePipe => Some((BinaryOp::Or, 1)),
            TokenKind::CaretPipe => Some((BinaryOp::Xor, 2)),
            TokenKind::AmpersandAmpersand => Some((BinaryOp::And, 3)),
            TokenKind::EqEq => Some((BinaryOp::Eq, 4)),
            TokenKind::BangEq => Some((BinaryOp::NotEq, 4)),
            TokenKind::Lt => Some((BinaryOp::Lt, 5)),
            TokenKind::LtEq => Some((BinaryOp::LtEq, 5)),
            TokenKind::Gt => Some((BinaryOp::Gt, 5)),
            TokenKind::GtEq => Some((BinaryOp::GtEq, 5)),
            TokenKind::Plus => Some((BinaryOp::Add, 6)),
            TokenKind::Minus => Some((BinaryOp::Sub, 6)),
            TokenKind::Star => Some((BinaryOp::Mul, 7)),
            TokenKind::Slash => Some((BinaryOp::Div, 7)),
            TokenKind::Percent => Some((BinaryOp::Rem, 7)),
            _ => None,
        }
    }

    fn current_assign_op(&self) -> Option<AssignOp> {
        match self.peek_kind() {
            TokenKind::Eq => Some(AssignOp::Assign),
            TokenKind::PlusEq => Some(AssignOp::Add),
            TokenKind::MinusEq => Some(AssignOp::Sub),
            TokenKind::StarEq => Some(AssignOp::Mul),
            TokenKind::SlashEq => Some(AssignOp::Div),
            TokenKind::PercentEq => Some(AssignOp::Rem),
            _ => None,
        }
    }

    fn expect_identifier(&mut self, msg: &str) -> Result<Identifier, SyntaxError> {
        match self.peek_kind() {
            TokenKind::Identifier(name) => {
                let span = self.advance().span;
                Ok(Identifier { name, span })
            }
            _ => Err(self.error_here(msg)),
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<&Token, SyntaxError> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            let found = self.peek_kind().describe();
            Err(self.error_here(&format!("Expected {} but found {found}", kind.describe())))
        }
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if self.check(&kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == *kind
    }

    fn peek_kind(&self) -> TokenKind {
        self.tokens
            .get(self.pos)
            .map(|t| t.kind.clone())
            .unwrap_or(TokenKind::Eof)
    }

    fn advance(&mut self) -> &Token {
        let index = self.pos.min(self.tokens.len().saturating_sub(1));
        self.pos = (self.pos + 1).min(self.tokens.len());
        &self.tokens[index]
    }

    fn is_eof(&self) -> bool {
        self.check(&TokenKind::Eof)
    }

    fn current_span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|t| t.span)
            .unwrap_or_default()
    }

    fn error_here(&self, message: &str) -> SyntaxError {
        self.error_at(message, self.current_span())
    }

    fn error_at(&self, message: &str, span: Span) -> SyntaxError {
        SyntaxError::new(message, span, self.source)
    }
}
