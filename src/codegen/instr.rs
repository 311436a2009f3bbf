use crate::language::{
    ast::{BinaryOp, Positional, UnaryOp},
    functions::FunctionInfo,
};

/// Stack machine instructions. Jump targets are absolute instruction indices.
#[derive(Debug, Clone, Copy)]
pub enum Instr {
    Const(f64),
    LoadLocal(usize),
    StoreLocal(usize),
    LoadPos(Positional),
    // pops band, x, y (pushed in that order)
    ReadImage(usize),
    // pops band
    ReadDest(usize),
    // pops band, value
    WriteImage(usize),
    Unary(UnaryOp),
    Binary(BinaryOp),
    Call(&'static FunctionInfo, usize),
    Jump(usize),
    JumpIfFalse(usize),
    Pop,
    /// Positions the sweep on the first pixel, or jumps past it on an empty domain.
    SweepBegin(usize),
    /// Advances to the next pixel and jumps back to the body while pixels remain.
    SweepNext(usize),
    Halt,
}

impl Instr {
    pub fn jump_target(&self) -> Option<usize> {
        match self {
            Instr::Jump(target)
            | Instr::JumpIfFalse(target)
            | Instr::SweepBegin(target)
            | Instr::SweepNext(target) => Some(*target),
            _ => None,
        }
    }
}
