use crate::language::{ast::*, functions, roles::VarRole, roles::VarRoles, span::Span};

/// Replaces identifier references with explicit image, positional and local
/// accesses, and expands compound assignments into plain ones.
///
/// Identifiers without a role are left as they are; code generation rejects them.
pub fn substitute_variables(script: &Script, roles: &VarRoles) -> Script {
    let substitution = Substitution { roles };
    Script {
        statements: script
            .statements
            .iter()
            .map(|stmt| substitution.statement(stmt))
            .collect(),
    }
}

struct Substitution<'a> {
    roles: &'a VarRoles,
}

impl Substitution<'_> {
    fn statement(&self, stmt: &Statement) -> Statement {
        match stmt {
            Statement::Assign(assign) => self.assign(assign),
            Statement::Expr(stmt) => Statement::Expr(ExprStmt {
                expr: self.expr(&stmt.expr),
                span: stmt.span,
            }),
            Statement::Block(block) => Statement::Block(self.block(block)),
            Statement::If(stmt) => Statement::If(IfStmt {
                condition: self.expr(&stmt.condition),
                then_branch: Box::new(self.statement(&stmt.then_branch)),
                else_branch: stmt
                    .else_branch
                    .as_ref()
                    .map(|branch| Box::new(self.statement(branch))),
                span: stmt.span,
            }),
            Statement::While(stmt) => Statement::While(WhileStmt {
                condition: self.expr(&stmt.condition),
                body: Box::new(self.statement(&stmt.body)),
                span: stmt.span,
            }),
            Statement::Foreach(stmt) => Statement::Foreach(ForeachStmt {
                var: stmt.var.clone(),
                start: self.expr(&stmt.start),
                end: self.expr(&stmt.end),
                body: Box::new(self.statement(&stmt.body)),
                span: stmt.span,
            }),
            Statement::Break(span) => Statement::Break(*span),
            Statement::BreakIf(stmt) => Statement::BreakIf(BreakIfStmt {
                condition: self.expr(&stmt.condition),
                span: stmt.span,
            }),
            Statement::WriteImage(stmt) => Statement::WriteImage(WriteImageStmt {
                image: stmt.image.clone(),
                band: self.expr(&stmt.band),
                value: self.expr(&stmt.value),
                span: stmt.span,
            }),
        }
    }

    fn block(&self, block: &Block) -> Block {
        Block {
            statements: block
                .statements
                .iter()
                .map(|stmt| self.statement(stmt))
                .collect(),
            span: block.span,
        }
    }

    fn assign(&self, assign: &AssignStmt) -> Statement {
        let mut value = self.expr(&assign.value);
        if let Some(op) = assign.op.binary() {
            let current = match &assign.target {
                AssignTarget::Variable(ident) => self.expr(&Expr::Variable(ident.clone())),
                AssignTarget::Local(ident) => Expr::Local(ident.clone()),
                AssignTarget::Pixel(pixel) => self.expr(&Expr::Pixel(pixel.clone())),
            };
            value = Expr::Binary {
                op,
                left: Box::new(current),
                right: Box::new(value),
                span: assign.span,
            };
        }

        let target = assign.target.name();
        match self.roles.get(&target.name) {
            Some(VarRole::Dest) => {
                let band = match &assign.target {
                    AssignTarget::Pixel(PixelRef {
                        band: Some(band), ..
                    }) => self.expr(band),
                    _ => zero(target.span),
                };
                Statement::WriteImage(WriteImageStmt {
                    image: target.clone(),
                    band,
                    value,
                    span: assign.span,
                })
            }
            Some(VarRole::Local) if !matches!(assign.target, AssignTarget::Pixel(_)) => {
                Statement::Assign(AssignStmt {
                    target: AssignTarget::Local(target.clone()),
                    op: AssignOp::Assign,
                    value,
                    span: assign.span,
                })
            }
            _ => Statement::Assign(assign.clone()),
        }
    }

    fn expr(&self, expr: &Expr) -> Expr {
        match expr {
            Expr::Number(..) | Expr::Local(_) | Expr::Positional(..) => expr.clone(),
            Expr::Variable(ident) => self.variable(ident),
            Expr::Pixel(pixel) => self.pixel(pixel),
            Expr::Unary { op, expr, span } => Expr::Unary {
                op: *op,
                expr: Box::new(self.expr(expr)),
                span: *span,
            },
            Expr::Binary {
                op,
                left,
                right,
                span,
            } => Expr::Binary {
                op: *op,
                left: Box::new(self.expr(left)),
                right: Box::new(self.expr(right)),
                span: *span,
            },
            Expr::Ternary {
                condition,
                then_expr,
                else_expr,
                span,
            } => Expr::Ternary {
                condition: Box::new(self.expr(condition)),
                then_expr: Box::new(self.expr(then_expr)),
                else_expr: Box::new(self.expr(else_expr)),
                span: *span,
            },
            Expr::Call { name, args, span } => Expr::Call {
                name: name.clone(),
                args: args.iter().map(|arg| self.expr(arg)).collect(),
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
                band: Box::new(self.expr(band)),
                x: Box::new(self.expr(x)),
                y: Box::new(self.expr(y)),
                span: *span,
            },
            Expr::ReadDest { image, band, span } => Expr::ReadDest {
                image: image.clone(),
                band: Box::new(self.expr(band)),
                span: *span,
            },
        }
    }

    fn variable(&self, ident: &Identifier) -> Expr {
        let span = ident.span;
        match self.roles.get(&ident.name) {
            Some(VarRole::Source) => Expr::ReadImage {
                image: ident.clone(),
                band: Box::new(zero(span)),
                x: Box::new(Expr::Positional(Positional::X, span)),
                y: Box::new(Expr::Positional(Positional::Y, span)),
                span,
            },
            Some(VarRole::Dest) => Expr::ReadDest {
                image: ident.clone(),
                band: Box::new(zero(span)),
                span,
            },
            Some(VarRole::Positional(positional)) => Expr::Positional(positional, span),
            Some(VarRole::Constant) => match functions::constant(&ident.name) {
                Some(value) => Expr::Number(value, span),
                None => Expr::Variable(ident.clone()),
            },
            Some(VarRole::Local) => Expr::Local(ident.clone()),
            None => Expr::Variable(ident.clone()),
        }
    }

    fn pixel(&self, pixel: &PixelRef) -> Expr {
        let span = pixel.span;
        let band = pixel
            .band
            .as_deref()
            .map(|band| self.expr(band))
            .unwrap_or_else(|| zero(span));
        match self.roles.get(&pixel.image.name) {
            Some(VarRole::Source) => {
                let (x, y) = match &pixel.position {
                    Some(position) => (
                        self.coord(&position.x, Positional::X),
                        self.coord(&position.y, Positional::Y),
                    ),
                    None => (
                        Expr::Positional(Positional::X, span),
                        Expr::Positional(Positional::Y, span),
                    ),
                };
                Expr::ReadImage {
                    image: pixel.image.clone(),
                    band: Box::new(band),
                    x: Box::new(x),
                    y: Box::new(y),
                    span,
                }
            }
            Some(VarRole::Dest) => Expr::ReadDest {
                image: pixel.image.clone(),
                band: Box::new(band),
                span,
            },
            _ => Expr::Pixel(pixel.clone()),
        }
    }

    /// Absolute coordinates pass through; relative ones offset the current pixel.
    fn coord(&self, coord: &Coord, axis: Positional) -> Expr {
        match coord {
            Coord::Absolute(expr) => self.expr(expr),
            Coord::Relative(expr) => {
                let span = expr.span();
                Expr::Binary {
                    op: BinaryOp::Add,
                    left: Box::new(Expr::Positional(axis, span)),
                    right: Box::new(self.expr(expr)),
                    span,
                }
            }
        }
    }
}

fn zero(span: Span) -> Expr {
    Expr::Number(0.0, span)
}
