use super::{CodeGenError, CompiledProcedure, EvaluationModel, ImageSlot, Instr};
use crate::language::{ast::*, functions, roles::ImageRole, span::Span};
use std::collections::HashMap;
use tracing::debug;

struct LoopLabels {
    break_jumps: Vec<usize>,
}

struct Emitter {
    instructions: Vec<Instr>,
    images: Vec<ImageSlot>,
    locals: Vec<String>,
    local_slots: HashMap<String, usize>,
    loop_stack: Vec<LoopLabels>,
    hidden: usize,
}

/// Generates the procedure for `model` from a final tree.
///
/// Direct procedures evaluate the current pixel and halt. Indirect ones wrap
/// the same body in a sweep over the domain.
pub fn generate(
    tree: &Script,
    model: EvaluationModel,
    images: Vec<ImageSlot>,
) -> Result<CompiledProcedure, CodeGenError> {
    let mut emitter = Emitter {
        instructions: Vec::new(),
        images,
        locals: Vec::new(),
        local_slots: HashMap::new(),
        loop_stack: Vec::new(),
        hidden: 0,
    };

    let sweep = match model {
        EvaluationModel::Direct => None,
        EvaluationModel::Indirect => Some(emitter.emit(Instr::SweepBegin(0))),
    };
    let body_start = emitter.instructions.len();
    for stmt in &tree.statements {
        emitter.statement(stmt)?;
    }
    if let Some(begin) = sweep {
        emitter.emit(Instr::SweepNext(body_start));
        let end = emitter.instructions.len();
        emitter.patch(begin, end);
    }
    emitter.emit(Instr::Halt);

    debug!(
        %model,
        instructions = emitter.instructions.len(),
        locals = emitter.locals.len(),
        "procedure generated"
    );
    Ok(CompiledProcedure {
        model,
        instructions: emitter.instructions,
        images: emitter.images,
        locals: emitter.locals,
    })
}

impl Emitter {
    fn emit(&mut self, instr: Instr) -> usize {
        self.instructions.push(instr);
        self.instructions.len() - 1
    }

    fn here(&self) -> usize {
        self.instructions.len()
    }

    fn patch(&mut self, at: usize, target: usize) {
        match &mut self.instructions[at] {
            Instr::Jump(t) | Instr::JumpIfFalse(t) | Instr::SweepBegin(t) | Instr::SweepNext(t) => {
                *t = target
            }
            _ => {}
        }
    }

    fn local(&mut self, name: &str) -> usize {
        if let Some(slot) = self.local_slots.get(name) {
            return *slot;
        }
        let slot = self.locals.len();
        self.locals.push(name.to_string());
        self.local_slots.insert(name.to_string(), slot);
        slot
    }

    fn hidden_local(&mut self, label: &str) -> usize {
        let name = format!("{label}${}", self.hidden);
        self.hidden += 1;
        self.local(&name)
    }

    fn image(&self, ident: &Identifier, role: ImageRole) -> Result<usize, CodeGenError> {
        match self.images.iter().position(|slot| slot.name == ident.name) {
            Some(index) if self.images[index].role == role => Ok(index),
            Some(_) => Err(CodeGenError::new(
                format!("{} access to image `{}`", role, ident.name),
                ident.span,
            )),
            None => Err(CodeGenError::new(
                format!("unknown image `{}`", ident.name),
                ident.span,
            )),
        }
    }

    fn statement(&mut self, stmt: &Statement) -> Result<(), CodeGenError> {
        match stmt {
            Statement::Assign(assign) => match (&assign.target, assign.op) {
                (AssignTarget::Local(ident), AssignOp::Assign) => {
                    self.expr(&assign.value)?;
                    let slot = self.local(&ident.name);
                    self.emit(Instr::StoreLocal(slot));
                }
                (target, op) => {
                    return Err(CodeGenError::new(
                        format!("assignment `{} {}`", target.name().name, op.symbol()),
                        assign.span,
                    ))
                }
            },
            Statement::Expr(stmt) => {
                self.expr(&stmt.expr)?;
                self.emit(Instr::Pop);
            }
            Statement::Block(block) => {
                for stmt in &block.statements {
                    self.statement(stmt)?;
                }
            }
            Statement::If(stmt) => {
                self.expr(&stmt.condition)?;
                let skip_then = self.emit(Instr::JumpIfFalse(0));
                self.statement(&stmt.then_branch)?;
                match &stmt.else_branch {
                    Some(else_branch) => {
                        let skip_else = self.emit(Instr::Jump(0));
                        let else_start = self.here();
                        self.patch(skip_then, else_start);
                        self.statement(else_branch)?;
                        let end = self.here();
                        self.patch(skip_else, end);
                    }
                    None => {
                        let end = self.here();
                        self.patch(skip_then, end);
                    }
                }
            }
            Statement::While(stmt) => {
                let start = self.here();
                self.expr(&stmt.condition)?;
                let exit = self.emit(Instr::JumpIfFalse(0));
                self.loop_body(&stmt.body, start, exit)?;
            }
            Statement::Foreach(stmt) => {
                let var = self.local(&stmt.var.name);
                let bound = self.hidden_local("foreach");
                self.expr(&stmt.start)?;
                self.emit(Instr::StoreLocal(var));
                self.expr(&stmt.end)?;
                self.emit(Instr::StoreLocal(bound));

                let test = self.here();
                self.emit(Instr::LoadLocal(var));
                self.emit(Instr::LoadLocal(bound));
                self.emit(Instr::Binary(BinaryOp::LtEq));
                let exit = self.emit(Instr::JumpIfFalse(0));

                self.loop_stack.push(LoopLabels {
                    break_jumps: Vec::new(),
                });
                self.statement(&stmt.body)?;
                let labels = self.pop_loop();
                self.emit(Instr::LoadLocal(var));
                self.emit(Instr::Const(1.0));
                self.emit(Instr::Binary(BinaryOp::Add));
                self.emit(Instr::StoreLocal(var));
                self.emit(Instr::Jump(test));
                self.close_loop(exit, labels);
            }
            Statement::Break(span) => {
                let jump = self.emit(Instr::Jump(0));
                self.break_from(jump, *span)?;
            }
            Statement::BreakIf(stmt) => {
                self.expr(&stmt.condition)?;
                self.emit(Instr::Unary(UnaryOp::Not));
                let jump = self.emit(Instr::JumpIfFalse(0));
                self.break_from(jump, stmt.span)?;
            }
            Statement::WriteImage(stmt) => {
                let slot = self.image(&stmt.image, ImageRole::Dest)?;
                self.expr(&stmt.band)?;
                self.expr(&stmt.value)?;
                self.emit(Instr::WriteImage(slot));
            }
        }
        Ok(())
    }

    fn loop_body(
        &mut self,
        body: &Statement,
        start: usize,
        exit: usize,
    ) -> Result<(), CodeGenError> {
        self.loop_stack.push(LoopLabels {
            break_jumps: Vec::new(),
        });
        self.statement(body)?;
        let labels = self.pop_loop();
        self.emit(Instr::Jump(start));
        self.close_loop(exit, labels);
        Ok(())
    }

    fn pop_loop(&mut self) -> LoopLabels {
        self.loop_stack.pop().unwrap_or(LoopLabels {
            break_jumps: Vec::new(),
        })
    }

    fn close_loop(&mut self, exit: usize, labels: LoopLabels) {
        let end = self.here();
        self.patch(exit, end);
        for jump in labels.break_jumps {
            self.patch(jump, end);
        }
    }

    fn break_from(&mut self, jump: usize, span: Span) -> Result<(), CodeGenError> {
        match self.loop_stack.last_mut() {
            Some(labels) => {
                labels.break_jumps.push(jump);
                Ok(())
            }
            None => Err(CodeGenError::new("`break` outside a loop", span)),
        }
    }

    fn expr(&mut self, expr: &Expr) -> Result<(), CodeGenError> {
        match expr {
            Expr::Number(value, _) => {
                self.emit(Instr::Const(*value));
            }
            Expr::Local(ident) => {
                let slot = self.local(&ident.name);
                self.emit(Instr::LoadLocal(slot));
            }
            Expr::Positional(positional, _) => {
                self.emit(Instr::LoadPos(*positional));
            }
            Expr::ReadImage {
                image, band, x, y, ..
            } => {
                let slot = self.image(image, ImageRole::Source)?;
                self.expr(band)?;
                self.expr(x)?;
                self.expr(y)?;
                self.emit(Instr::ReadImage(slot));
            }
            Expr::ReadDest { image, band, .. } => {
                let slot = self.image(image, ImageRole::Dest)?;
                self.expr(band)?;
                self.emit(Instr::ReadDest(slot));
            }
            Expr::Unary { op, expr, .. } => {
                self.expr(expr)?;
                self.emit(Instr::Unary(*op));
            }
            Expr::Binary {
                op: BinaryOp::And,
                left,
                right,
                ..
            } => {
                self.expr(left)?;
                let left_false = self.emit(Instr::JumpIfFalse(0));
                self.expr(right)?;
                let right_false = self.emit(Instr::JumpIfFalse(0));
                self.select_flag(&[left_false, right_false], 1.0, 0.0);
            }
            Expr::Binary {
                op: BinaryOp::Or,
                left,
                right,
                ..
            } => {
                self.expr(left)?;
                self.emit(Instr::Unary(UnaryOp::Not));
                let left_true = self.emit(Instr::JumpIfFalse(0));
                self.expr(right)?;
                self.emit(Instr::Unary(UnaryOp::Not));
                let right_true = self.emit(Instr::JumpIfFalse(0));
                self.select_flag(&[left_true, right_true], 0.0, 1.0);
            }
            Expr::Binary {
                op, left, right, ..
            } => {
                self.expr(left)?;
                self.expr(right)?;
                self.emit(Instr::Binary(*op));
            }
            Expr::Call { name, args, span } => {
                let info = functions::lookup(&name.name, args.len()).map_err(|code| {
                    CodeGenError::new(
                        format!("call to `{}` ({})", name.name, code.message()),
                        *span,
                    )
                })?;
                for arg in args {
                    self.expr(arg)?;
                }
                self.emit(Instr::Call(info, args.len()));
            }
            Expr::Variable(ident) => {
                return Err(CodeGenError::new(
                    format!("unresolved variable `{}`", ident.name),
                    ident.span,
                ))
            }
            Expr::Pixel(pixel) => {
                return Err(CodeGenError::new(
                    format!("unresolved pixel reference `{}[..]`", pixel.image.name),
                    pixel.span,
                ))
            }
            Expr::Ternary { span, .. } => {
                return Err(CodeGenError::new("unlowered ternary expression", *span))
            }
        }
        Ok(())
    }

    /// Pushes `fallthrough` when no jump in `jumps` was taken, else `jumped`.
    fn select_flag(&mut self, jumps: &[usize], fallthrough: f64, jumped: f64) {
        self.emit(Instr::Const(fallthrough));
        let skip = self.emit(Instr::Jump(0));
        let target = self.here();
        for jump in jumps {
            self.patch(*jump, target);
        }
        self.emit(Instr::Const(jumped));
        let end = self.here();
        self.patch(skip, end);
    }
}
