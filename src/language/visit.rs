//! Read-only traversal of the syntax tree in evaluation order.

use crate::language::ast::*;

pub trait Visitor {
    fn visit_statement(&mut self, stmt: &Statement) {
        walk_statement(self, stmt);
    }

    fn visit_expr(&mut self, expr: &Expr) {
        walk_expr(self, expr);
    }
}

pub fn walk_script<V: Visitor + ?Sized>(visitor: &mut V, script: &Script) {
    for stmt in &script.statements {
        visitor.visit_statement(stmt);
    }
}

pub fn walk_statement<V: Visitor + ?Sized>(visitor: &mut V, stmt: &Statement) {
    match stmt {
        Statement::Assign(assign) => {
            visitor.visit_expr(&assign.value);
            if let AssignTarget::Pixel(pixel) = &assign.target {
                walk_pixel(visitor, pixel);
            }
        }
        Statement::Expr(stmt) => visitor.visit_expr(&stmt.expr),
        Statement::Block(block) => {
            for stmt in &block.statements {
                visitor.visit_statement(stmt);
            }
        }
        Statement::If(stmt) => {
            visitor.visit_expr(&stmt.condition);
            visitor.visit_statement(&stmt.then_branch);
            if let Some(else_branch) = &stmt.else_branch {
                visitor.visit_statement(else_branch);
            }
        }
        Statement::While(stmt) => {
            visitor.visit_expr(&stmt.condition);
            visitor.visit_statement(&stmt.body);
        }
        Statement::Foreach(stmt) => {
            visitor.visit_expr(&stmt.start);
            visitor.visit_expr(&stmt.end);
            visitor.visit_statement(&stmt.body);
        }
        Statement::Break(_) => {}
        Statement::BreakIf(stmt) => visitor.visit_expr(&stmt.condition),
        Statement::WriteImage(stmt) => {
            visitor.visit_expr(&stmt.band);
            visitor.visit_expr(&stmt.value);
        }
    }
}

pub fn walk_expr<V: Visitor + ?Sized>(visitor: &mut V, expr: &Expr) {
    match expr {
        Expr::Number(..) | Expr::Variable(_) | Expr::Local(_) | Expr::Positional(..) => {}
        Expr::Pixel(pixel) => walk_pixel(visitor, pixel),
        Expr::Unary { expr, .. } => visitor.visit_expr(expr),
        Expr::Binary { left, right, .. } => {
            visitor.visit_expr(left);
            visitor.visit_expr(right);
        }
        Expr::Ternary {
            condition,
            then_expr,
            else_expr,
            ..
        } => {
            visitor.visit_expr(condition);
            visitor.visit_expr(then_expr);
            visitor.visit_expr(else_expr);
        }
        Expr::Call { args, .. } => {
            for arg in args {
                visitor.visit_expr(arg);
            }
        }
        Expr::ReadImage { band, x, y, .. } => {
            visitor.visit_expr(band);
            visitor.visit_expr(x);
            visitor.visit_expr(y);
        }
        Expr::ReadDest { band, .. } => visitor.visit_expr(band),
    }
}

pub fn walk_pixel<V: Visitor + ?Sized>(visitor: &mut V, pixel: &PixelRef) {
    if let Some(band) = &pixel.band {
        visitor.visit_expr(band);
    }
    if let Some(position) = &pixel.position {
        visitor.visit_expr(position.x.expr());
        visitor.visit_expr(position.y.expr());
    }
}
