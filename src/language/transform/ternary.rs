use crate::language::{ast::*, span::Span};

/// Rewrites every `c ? a : b` into an `if`/`else` that assigns a fresh local,
/// hoisted in front of the statement that contained the ternary.
///
/// Only the selected branch is evaluated. Hoisting out of the right operand
/// of `&&` or `||` keeps the short-circuit by guarding the hoisted
/// statements with the left operand, and a loop condition that needed
/// hoisting is re-evaluated at the top of every iteration.
pub fn lower_ternaries(script: &Script) -> Script {
    let mut lowering = TernaryLowering::default();
    Script {
        statements: lowering.statements(&script.statements),
    }
}

#[derive(Default)]
struct TernaryLowering {
    next_temp: usize,
}

impl TernaryLowering {
    fn statements(&mut self, statements: &[Statement]) -> Vec<Statement> {
        let mut out = Vec::with_capacity(statements.len());
        for stmt in statements {
            self.statement(stmt, &mut out);
        }
        out
    }

    /// Lowers a nested statement; hoisted code stays inside the branch.
    fn branch(&mut self, stmt: &Statement) -> Statement {
        let mut out = Vec::new();
        self.statement(stmt, &mut out);
        if out.len() == 1 {
            out.remove(0)
        } else {
            Statement::Block(Block {
                statements: out,
                span: stmt.span(),
            })
        }
    }

    fn statement(&mut self, stmt: &Statement, out: &mut Vec<Statement>) {
        match stmt {
            Statement::Assign(assign) => {
                let value = self.expr(&assign.value, out);
                out.push(Statement::Assign(AssignStmt {
                    target: assign.target.clone(),
                    op: assign.op,
                    value,
                    span: assign.span,
                }));
            }
            Statement::Expr(stmt) => {
                let expr = self.expr(&stmt.expr, out);
                out.push(Statement::Expr(ExprStmt {
                    expr,
                    span: stmt.span,
                }));
            }
            Statement::Block(block) => out.push(Statement::Block(Block {
                statements: self.statements(&block.statements),
                span: block.span,
            })),
            Statement::If(stmt) => {
                let condition = self.expr(&stmt.condition, out);
                let then_branch = Box::new(self.branch(&stmt.then_branch));
                let else_branch = stmt
                    .else_branch
                    .as_ref()
                    .map(|branch| Box::new(self.branch(branch)));
                out.push(Statement::If(IfStmt {
                    condition,
                    then_branch,
                    else_branch,
                    span: stmt.span,
                }));
            }
            Statement::While(stmt) => {
                let mut hoisted = Vec::new();
                let condition = self.expr(&stmt.condition, &mut hoisted);
                let body = self.branch(&stmt.body);
                if hoisted.is_empty() {
                    out.push(Statement::While(WhileStmt {
                        condition,
                        body: Box::new(body),
                        span: stmt.span,
                    }));
                    return;
                }

                let span = stmt.span;
                hoisted.push(Statement::BreakIf(BreakIfStmt {
                    condition: Expr::Unary {
                        op: UnaryOp::Not,
                        expr: Box::new(condition),
                        span,
                    },
                    span,
                }));
                hoisted.push(body);
                out.push(Statement::While(WhileStmt {
                    condition: Expr::Number(1.0, span),
                    body: Box::new(Statement::Block(Block {
                        statements: hoisted,
                        span,
                    })),
                    span,
                }));
            }
            Statement::Foreach(stmt) => {
                let start = self.expr(&stmt.start, out);
                let end = self.expr(&stmt.end, out);
                let body = Box::new(self.branch(&stmt.body));
                out.push(Statement::Foreach(ForeachStmt {
                    var: stmt.var.clone(),
                    start,
                    end,
                    body,
                    span: stmt.span,
                }));
            }
            Statement::Break(span) => out.push(Statement::Break(*span)),
            Statement::BreakIf(stmt) => {
                let condition = self.expr(&stmt.condition, out);
                out.push(Statement::BreakIf(BreakIfStmt {
                    condition,
                    span: stmt.span,
                }));
            }
            Statement::WriteImage(stmt) => {
                let band = self.expr(&stmt.band, out);
                let value = self.expr(&stmt.value, out);
                out.push(Statement::WriteImage(WriteImageStmt {
                    image: stmt.image.clone(),
                    band,
                    value,
                    span: stmt.span,
                }));
            }
        }
    }

    fn expr(&mut self, expr: &Expr, out: &mut Vec<Statement>) -> Expr {
        match expr {
            Expr::Ternary {
                condition,
                then_expr,
                else_expr,
                span,
            } => {
                let condition = self.expr(condition, out);
                let temp = self.temp(*span);

                let mut then_block = Vec::new();
                let value = self.expr(then_expr, &mut then_block);
                then_block.push(assign_local(&temp, value));

                let mut else_block = Vec::new();
                let value = self.expr(else_expr, &mut else_block);
                else_block.push(assign_local(&temp, value));

                out.push(Statement::If(IfStmt {
                    condition,
                    then_branch: Box::new(block(then_block, *span)),
                    else_branch: Some(Box::new(block(else_block, *span))),
                    span: *span,
                }));
                Expr::Local(temp)
            }
            Expr::Binary {
                op,
                left,
                right,
                span,
            } => {
                let left = self.expr(left, out);
                let mut guarded = Vec::new();
                let right = self.expr(right, &mut guarded);
                if guarded.is_empty() || !op.is_short_circuit() {
                    out.append(&mut guarded);
                    return Expr::Binary {
                        op: *op,
                        left: Box::new(left),
                        right: Box::new(right),
                        span: *span,
                    };
                }

                // `l && r` becomes `t = 0; if (l) { ..; t = r != 0; }`,
                // `l || r` becomes `t = 1; if (!l) { ..; t = r != 0; }`.
                let span = *span;
                let temp = self.temp(span);
                let (initial, condition) = match op {
                    BinaryOp::And => (0.0, left),
                    _ => (
                        1.0,
                        Expr::Unary {
                            op: UnaryOp::Not,
                            expr: Box::new(left),
                            span,
                        },
                    ),
                };
                out.push(assign_local(&temp, Expr::Number(initial, span)));
                guarded.push(assign_local(
                    &temp,
                    Expr::Binary {
                        op: BinaryOp::NotEq,
                        left: Box::new(right),
                        right: Box::new(Expr::Number(0.0, span)),
                        span,
                    },
                ));
                out.push(Statement::If(IfStmt {
                    condition,
                    then_branch: Box::new(block(guarded, span)),
                    else_branch: None,
                    span,
                }));
                Expr::Local(temp)
            }
            Expr::Unary { op, expr, span } => Expr::Unary {
                op: *op,
                expr: Box::new(self.expr(expr, out)),
                span: *span,
            },
            Expr::Call { name, args, span } => Expr::Call {
                name: name.clone(),
                args: args.iter().map(|arg| self.expr(arg, out)).collect(),
                span: *span,
            },
            Expr::ReadImage {
                image,
                band,
                x,
                y,
                span,
            } => Expr::ReadImage {
                image: image.clone(),
                band: Box::new(self.expr(band, out)),
                x: Box::new(self.expr(x, out)),
                y: Box::new(self.expr(y, out)),
                span: *span,
            },
            Expr::ReadDest { image, band, span } => Expr::ReadDest {
                image: image.clone(),
                band: Box::new(self.expr(band, out)),
                span: *span,
            },
            Expr::Number(..)
            | Expr::Variable(_)
            | Expr::Pixel(_)
            | Expr::Local(_)
            | Expr::Positional(..) => expr.clone(),
        }
    }

    /// `$` cannot appear in an identifier token, so temporaries never clash
    /// with script variables.
    fn temp(&mut self, span: Span) -> Identifier {
        let name = format!("ternary${}", self.next_temp);
        self.next_temp += 1;
        Identifier::new(name, span)
    }
}

fn assign_local(target: &Identifier, value: Expr) -> Statement {
    let span = value.span();
    Statement::Assign(AssignStmt {
        target: AssignTarget::Local(target.clone()),
        op: AssignOp::Assign,
        value,
        span,
    })
}

fn block(statements: Vec<Statement>, span: Span) -> Statement {
    Statement::Block(Block { statements, span })
}
