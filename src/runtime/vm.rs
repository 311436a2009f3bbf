//! Stack machine executing a [`CompiledProcedure`] against bound images.

use super::{
    binding::{BoundImages, ImageBinding},
    error::{EvalError, EvalResult},
    evaluator::{EvalStatus, Progress},
};
use crate::codegen::{CompiledProcedure, Instr};
use crate::language::{
    ast::{BinaryOp, Positional, UnaryOp},
    functions::{flag, is_true},
};
use std::sync::Arc;
use tracing::trace;

pub(crate) struct Machine {
    procedure: Arc<CompiledProcedure>,
    images: Vec<Box<dyn ImageBinding>>,
    width: usize,
    height: usize,
    outside_value: Option<f64>,
    progress_rows: usize,
    stack: Vec<f64>,
    locals: Vec<Option<f64>>,
    // (image slot, band, value) written during the current pixel
    written: Vec<(usize, usize, f64)>,
    x: usize,
    y: usize,
}

impl Machine {
    pub fn new(
        procedure: Arc<CompiledProcedure>,
        bound: BoundImages,
        outside_value: Option<f64>,
        progress_rows: usize,
    ) -> Self {
        let locals = vec![None; procedure.locals.len()];
        Self {
            procedure,
            images: bound.images,
            width: bound.width,
            height: bound.height,
            outside_value,
            progress_rows: progress_rows.max(1),
            stack: Vec::with_capacity(16),
            locals,
            written: Vec::new(),
            x: 0,
            y: 0,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Positions the machine on a pixel with fresh per-pixel state.
    pub fn enter_pixel(&mut self, x: usize, y: usize) {
        self.x = x;
        self.y = y;
        self.locals.iter_mut().for_each(|local| *local = None);
        self.written.clear();
        self.stack.clear();
    }

    pub fn run(&mut self, progress: &mut dyn FnMut(f64) -> Progress) -> EvalResult<EvalStatus> {
        let procedure = Arc::clone(&self.procedure);
        let instructions = &procedure.instructions;
        let mut pc = 0;
        while let Some(instr) = instructions.get(pc) {
            pc += 1;
            match *instr {
                Instr::Const(value) => self.stack.push(value),
                Instr::LoadLocal(slot) => {
                    let value = self.locals.get(slot).copied().flatten().ok_or_else(|| {
                        EvalError::UnsetLocal {
                            name: procedure.locals.get(slot).cloned().unwrap_or_default(),
                        }
                    })?;
                    self.stack.push(value);
                }
                Instr::StoreLocal(slot) => {
                    let value = self.pop()?;
                    match self.locals.get_mut(slot) {
                        Some(local) => *local = Some(value),
                        None => return Err(internal(format!("no local slot {slot}"))),
                    }
                }
                Instr::LoadPos(positional) => {
                    let value = match positional {
                        Positional::X => self.x,
                        Positional::Y => self.y,
                        Positional::Width => self.width,
                        Positional::Height => self.height,
                    };
                    self.stack.push(value as f64);
                }
                Instr::ReadImage(slot) => {
                    let y = self.pop()?;
                    let x = self.pop()?;
                    let band = self.pop()?;
                    let value = self.read_image(slot, band, x, y)?;
                    self.stack.push(value);
                }
                Instr::ReadDest(slot) => {
                    let band = self.pop()?;
                    let band = self.band_index(slot, band)?;
                    let value = self
                        .written
                        .iter()
                        .rev()
                        .find(|(image, b, _)| *image == slot && *b == band)
                        .map(|(_, _, value)| *value)
                        .ok_or_else(|| EvalError::DestNotWritten {
                            name: self.image_name(slot),
                            band,
                        })?;
                    self.stack.push(value);
                }
                Instr::WriteImage(slot) => {
                    let value = self.pop()?;
                    let band = self.pop()?;
                    let band = self.band_index(slot, band)?;
                    let (x, y) = (self.x, self.y);
                    self.image_mut(slot)?.write(x, y, band, value);
                    self.written.push((slot, band, value));
                }
                Instr::Unary(op) => {
                    let value = self.pop()?;
                    self.stack.push(apply_unary(op, value));
                }
                Instr::Binary(op) => {
                    let right = self.pop()?;
                    let left = self.pop()?;
                    self.stack.push(apply_binary(op, left, right));
                }
                Instr::Call(function, argc) => {
                    let start = self
                        .stack
                        .len()
                        .checked_sub(argc)
                        .ok_or_else(|| internal("stack underflow in call"))?;
                    let result = (function.eval)(&self.stack[start..]);
                    self.stack.truncate(start);
                    self.stack.push(result);
                }
                Instr::Jump(target) => pc = target,
                Instr::JumpIfFalse(target) => {
                    if !is_true(self.pop()?) {
                        pc = target;
                    }
                }
                Instr::Pop => {
                    self.pop()?;
                }
                Instr::SweepBegin(end) => {
                    if self.width == 0 || self.height == 0 {
                        trace!(fraction = 1.0, "empty sweep");
                        progress(1.0);
                        pc = end;
                    } else {
                        self.enter_pixel(0, 0);
                    }
                }
                Instr::SweepNext(body) => {
                    let mut x = self.x + 1;
                    let mut y = self.y;
                    if x == self.width {
                        x = 0;
                        y += 1;
                        let report = y % self.progress_rows == 0 || y == self.height;
                        if report {
                            let fraction = y as f64 / self.height as f64;
                            trace!(row = y, fraction, "sweep progress");
                            if progress(fraction) == Progress::Stop && y < self.height {
                                return Ok(EvalStatus::Stopped);
                            }
                        }
                    }
                    if y < self.height {
                        self.enter_pixel(x, y);
                        pc = body;
                    }
                }
                Instr::Halt => return Ok(EvalStatus::Completed),
            }
        }
        Err(internal("procedure ended without halting"))
    }

    fn pop(&mut self) -> EvalResult<f64> {
        self.stack.pop().ok_or_else(|| internal("stack underflow"))
    }

    fn image(&self, slot: usize) -> EvalResult<&dyn ImageBinding> {
        self.images
            .get(slot)
            .map(|image| &**image)
            .ok_or_else(|| internal(format!("no image slot {slot}")))
    }

    fn image_mut(&mut self, slot: usize) -> EvalResult<&mut Box<dyn ImageBinding>> {
        self.images
            .get_mut(slot)
            .ok_or_else(|| internal(format!("no image slot {slot}")))
    }

    fn image_name(&self, slot: usize) -> String {
        self.procedure
            .images
            .get(slot)
            .map(|image| image.name.clone())
            .unwrap_or_default()
    }

    fn band_index(&self, slot: usize, band: f64) -> EvalResult<usize> {
        let bands = self.image(slot)?.band_count();
        let index = band.floor();
        if index.is_nan() || index < 0.0 || index >= bands as f64 {
            return Err(EvalError::BandOutOfRange {
                name: self.image_name(slot),
                band,
                bands,
            });
        }
        Ok(index as usize)
    }

    /// Coordinates are floored. Reads outside the image use the configured
    /// outside value when there is one.
    fn read_image(&self, slot: usize, band: f64, x: f64, y: f64) -> EvalResult<f64> {
        let band = self.band_index(slot, band)?;
        let image = self.image(slot)?;
        let (fx, fy) = (x.floor(), y.floor());
        let inside = fx >= 0.0
            && fy >= 0.0
            && fx < image.width() as f64
            && fy < image.height() as f64;
        if inside {
            return Ok(image.read(fx as usize, fy as usize, band));
        }
        self.outside_value.ok_or_else(|| EvalError::OutsideImage {
            name: self.image_name(slot),
            x,
            y,
        })
    }
}

fn internal(message: impl Into<String>) -> EvalError {
    EvalError::Internal {
        message: message.into(),
    }
}

pub(crate) fn apply_unary(op: UnaryOp, value: f64) -> f64 {
    match op {
        UnaryOp::Neg => -value,
        UnaryOp::Not => flag(!is_true(value)),
    }
}

pub(crate) fn apply_binary(op: BinaryOp, left: f64, right: f64) -> f64 {
    match op {
        BinaryOp::Add => left + right,
        BinaryOp::Sub => left - right,
        BinaryOp::Mul => left * right,
        BinaryOp::Div => left / right,
        BinaryOp::Rem => left % right,
        BinaryOp::Pow => left.powf(right),
        BinaryOp::Eq => flag(left == right),
        BinaryOp::NotEq => flag(left != right),
        BinaryOp::Lt => flag(left < right),
        BinaryOp::LtEq => flag(left <= right),
        BinaryOp::Gt => flag(left > right),
        BinaryOp::GtEq => flag(left >= right),
        BinaryOp::And => flag(is_true(left) && is_true(right)),
        BinaryOp::Or => flag(is_true(left) || is_true(right)),
        BinaryOp::Xor => flag(is_true(left) != is_true(right)),
    }
}
