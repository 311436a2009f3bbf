//! Variable classification: assigns every identifier a role and checks that
//! images, positionals and locals are used the way their role allows.
//!
//! Statements are walked in source order. An identifier counts as assigned
//! from the first assignment that precedes it textually, so a read inside a
//! branch after an assignment in an earlier branch is accepted here and left
//! to the runtime to catch.

use crate::language::{
    ast::*,
    errors::{Diagnostic, Diagnostics, ErrorCode},
    functions,
    roles::{ImageRole, VarRole, VarRoles},
    span::Span,
};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

#[derive(Clone, Debug, Default)]
pub struct Classification {
    pub roles: VarRoles,
    pub diagnostics: Diagnostics,
}

/// Classifies every identifier in `script` against the declared image parameters.
///
/// With `implicit_sources` set, an identifier read before any assignment is
/// taken to be an undeclared source image instead of an error.
pub fn classify_variables(
    script: &Script,
    image_params: &BTreeMap<String, ImageRole>,
    implicit_sources: bool,
) -> Classification {
    let mut classifier = VarClassifier::new(image_params, implicit_sources);
    for stmt in &script.statements {
        classifier.statement(stmt);
    }
    classifier.finish()
}

struct VarClassifier<'a> {
    image_params: &'a BTreeMap<String, ImageRole>,
    implicit_sources: bool,
    roles: VarRoles,
    diagnostics: Diagnostics,
    assigned: HashSet<String>,
    dest_written: HashSet<String>,
    used_images: HashSet<String>,
    loop_vars: Vec<String>,
}

impl<'a> VarClassifier<'a> {
    fn new(image_params: &'a BTreeMap<String, ImageRole>, implicit_sources: bool) -> Self {
        let mut roles = VarRoles::new();
        for (name, role) in image_params {
            roles.insert(name.clone(), VarRole::from(*role));
        }
        Self {
            image_params,
            implicit_sources,
            roles,
            diagnostics: Diagnostics::new(),
            assigned: HashSet::new(),
            dest_written: HashSet::new(),
            used_images: HashSet::new(),
            loop_vars: Vec::new(),
        }
    }

    fn finish(mut self) -> Classification {
        for name in self.image_params.keys() {
            if !self.used_images.contains(name) {
                warn!(image = %name, "image parameter not used in script");
                self.report(ErrorCode::ImageNotUsed, name, Span::default());
            }
        }
        debug!(
            identifiers = self.roles.iter().count(),
            problems = self.diagnostics.len(),
            "variables classified"
        );
        Classification {
            roles: self.roles,
            diagnostics: self.diagnostics,
        }
    }

    fn report(&mut self, code: ErrorCode, name: &str, span: Span) {
        self.diagnostics.push_once(Diagnostic::new(code, name, span));
    }

    fn statement(&mut self, stmt: &Statement) {
        match stmt {
            Statement::Assign(assign) => {
                self.expr(&assign.value);
                if let AssignTarget::Pixel(pixel) = &assign.target {
                    self.pixel_indices(pixel);
                }
                if assign.op != AssignOp::Assign {
                    self.read_target(&assign.target);
                }
                self.write(&assign.target);
            }
            Statement::Expr(stmt) => self.expr(&stmt.expr),
            Statement::Block(block) => {
                for stmt in &block.statements {
                    self.statement(stmt);
                }
            }
            Statement::If(stmt) => {
                self.expr(&stmt.condition);
                self.statement(&stmt.then_branch);
                if let Some(else_branch) = &stmt.else_branch {
                    self.statement(else_branch);
                }
            }
            Statement::While(stmt) => {
                self.expr(&stmt.condition);
                self.statement(&stmt.body);
            }
            Statement::Foreach(stmt) => {
                self.expr(&stmt.start);
                self.expr(&stmt.end);
                self.loop_variable(&stmt.var);
                self.loop_vars.push(stmt.var.name.clone());
                self.statement(&stmt.body);
                self.loop_vars.pop();
            }
            Statement::Break(_) => {}
            Statement::BreakIf(stmt) => self.expr(&stmt.condition),
            // final-tree node, never produced by the parser
            Statement::WriteImage(stmt) => {
                self.expr(&stmt.band);
                self.expr(&stmt.value);
            }
        }
    }

    fn expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Number(..) | Expr::Local(_) | Expr::Positional(..) => {}
            Expr::Variable(ident) => self.read(ident, None),
            Expr::Pixel(pixel) => {
                self.pixel_indices(pixel);
                self.read(&pixel.image, Some(pixel));
            }
            Expr::Unary { expr, .. } => self.expr(expr),
            Expr::Binary { left, right, .. } => {
                self.expr(left);
                self.expr(right);
            }
            Expr::Ternary {
                condition,
                then_expr,
                else_expr,
                ..
            } => {
                self.expr(condition);
                self.expr(then_expr);
                self.expr(else_expr);
            }
            Expr::Call { args, .. } => {
                for arg in args {
                    self.expr(arg);
                }
            }
            Expr::ReadImage { band, x, y, .. } => {
                self.expr(band);
                self.expr(x);
                self.expr(y);
            }
            Expr::ReadDest { band, .. } => self.expr(band),
        }
    }

    fn pixel_indices(&mut self, pixel: &PixelRef) {
        if let Some(band) = &pixel.band {
            self.expr(band);
        }
        if let Some(position) = &pixel.position {
            self.expr(position.x.expr());
            self.expr(position.y.expr());
        }
    }

    fn read_target(&mut self, target: &AssignTarget) {
        match target {
            AssignTarget::Variable(ident) | AssignTarget::Local(ident) => self.read(ident, None),
            AssignTarget::Pixel(pixel) => self.read(&pixel.image, Some(pixel)),
        }
    }

    fn read(&mut self, ident: &Identifier, pixel: Option<&PixelRef>) {
        let name = ident.name.as_str();
        if let Some(role) = self.image_params.get(name).copied() {
            self.used_images.insert(name.to_string());
            if role == ImageRole::Dest {
                if !self.dest_written.contains(name) {
                    self.report(ErrorCode::ReadingFromDestImage, name, ident.span);
                }
                self.check_dest_position(name, pixel);
            }
            return;
        }

        if let Some(VarRole::Source) = self.roles.get(name) {
            // already inferred as an implicit source
            return;
        }

        if let Some(positional) = Positional::from_name(name) {
            self.roles.insert(name, VarRole::Positional(positional));
            self.reject_pixel_syntax(name, pixel);
            return;
        }
        if functions::constant(name).is_some() {
            self.roles.insert(name, VarRole::Constant);
            self.reject_pixel_syntax(name, pixel);
            return;
        }
        if self.assigned.contains(name) {
            self.reject_pixel_syntax(name, pixel);
            return;
        }

        if self.implicit_sources {
            warn!(variable = %name, "unassigned variable treated as a source image");
            self.roles.insert(name, VarRole::Source);
            self.report(ErrorCode::ImplicitSource, name, ident.span);
        } else if pixel.is_some() {
            self.report(ErrorCode::NotAnImage, name, ident.span);
        } else {
            self.report(ErrorCode::UninitVar, name, ident.span);
        }
    }

    fn write(&mut self, target: &AssignTarget) {
        match target {
            AssignTarget::Variable(ident) | AssignTarget::Local(ident) => {
                self.write_variable(ident)
            }
            AssignTarget::Pixel(pixel) => {
                let name = pixel.image.name.as_str();
                match self.image_params.get(name) {
                    Some(ImageRole::Dest) => {
                        self.check_dest_position(name, Some(pixel));
                        self.mark_dest_written(name);
                    }
                    Some(ImageRole::Source) => {
                        self.used_images.insert(name.to_string());
                        self.report(ErrorCode::AssignmentToSrcImage, name, pixel.image.span);
                    }
                    None if self.roles.get(name) == Some(VarRole::Source) => {
                        self.report(ErrorCode::AssignmentToSrcImage, name, pixel.image.span);
                    }
                    None => self.report(ErrorCode::NotAnImage, name, pixel.image.span),
                }
            }
        }
    }

    fn loop_variable(&mut self, ident: &Identifier) {
        let name = ident.name.as_str();
        if self.image_params.contains_key(name) {
            self.used_images.insert(name.to_string());
        } else if self.roles.get(name) != Some(VarRole::Source) {
            self.write_variable(ident);
            return;
        }
        self.report(ErrorCode::ImageAsLoopVar, name, ident.span);
    }

    fn write_variable(&mut self, ident: &Identifier) {
        let name = ident.name.as_str();
        match self.image_params.get(name) {
            Some(ImageRole::Dest) => {
                self.mark_dest_written(name);
                return;
            }
            Some(ImageRole::Source) => {
                self.used_images.insert(name.to_string());
                self.report(ErrorCode::AssignmentToSrcImage, name, ident.span);
                return;
            }
            None => {}
        }

        if let Some(positional) = Positional::from_name(name) {
            self.roles.insert(name, VarRole::Positional(positional));
            self.report(ErrorCode::AssignmentToPositional, name, ident.span);
        } else if functions::constant(name).is_some() {
            self.roles.insert(name, VarRole::Constant);
            self.report(ErrorCode::AssignmentToConstant, name, ident.span);
        } else if self.roles.get(name) == Some(VarRole::Source) {
            self.report(ErrorCode::AssignmentToSrcImage, name, ident.span);
        } else if self.loop_vars.iter().any(|var| var == name) {
            self.report(ErrorCode::AssignmentToLoopVar, name, ident.span);
        } else {
            self.roles.insert(name, VarRole::Local);
            self.assigned.insert(name.to_string());
        }
    }

    fn mark_dest_written(&mut self, name: &str) {
        self.used_images.insert(name.to_string());
        self.dest_written.insert(name.to_string());
    }

    fn check_dest_position(&mut self, name: &str, pixel: Option<&PixelRef>) {
        let offset = pixel
            .and_then(|pixel| pixel.position.as_ref())
            .filter(|position| !position.is_current_pixel());
        if let (Some(pixel), Some(_)) = (pixel, offset) {
            self.report(ErrorCode::DestOffset, name, pixel.span);
        }
    }

    fn reject_pixel_syntax(&mut self, name: &str, pixel: Option<&PixelRef>) {
        if let Some(pixel) = pixel {
            self.report(ErrorCode::NotAnImage, name, pixel.span);
        }
    }
}

#[cfg(test)]
mod tests;
