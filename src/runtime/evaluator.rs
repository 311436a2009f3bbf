use super::{
    error::{EvalError, EvalResult},
    vm::Machine,
};
use crate::codegen::EvaluationModel;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EvalStatus {
    Completed,
    /// The progress callback asked the sweep to stop; finished rows are kept.
    Stopped,
}

/// Returned by the progress callback of [`IndirectRuntime::evaluate_all`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Progress {
    Continue,
    Stop,
}

/// Evaluates single pixels on request. Callers tile and parallelise by
/// building one runtime per worker.
pub struct DirectRuntime {
    machine: Machine,
}

impl DirectRuntime {
    pub(crate) fn new(machine: Machine) -> Self {
        Self { machine }
    }

    pub fn width(&self) -> usize {
        self.machine.width()
    }

    pub fn height(&self) -> usize {
        self.machine.height()
    }

    pub fn evaluate(&mut self, x: usize, y: usize) -> EvalResult<EvalStatus> {
        let (width, height) = (self.width(), self.height());
        if x >= width || y >= height {
            return Err(EvalError::PixelOutsideDomain {
                x,
                y,
                width,
                height,
            });
        }
        self.machine.enter_pixel(x, y);
        self.machine.run(&mut |_| Progress::Continue)
    }
}

/// Sweeps the whole domain in row-major order in one call.
pub struct IndirectRuntime {
    machine: Machine,
}

impl IndirectRuntime {
    pub(crate) fn new(machine: Machine) -> Self {
        Self { machine }
    }

    pub fn width(&self) -> usize {
        self.machine.width()
    }

    pub fn height(&self) -> usize {
        self.machine.height()
    }

    /// `progress` receives the completed fraction of rows and may stop the
    /// sweep between rows.
    pub fn evaluate_all<F>(&mut self, mut progress: F) -> EvalResult<EvalStatus>
    where
        F: FnMut(f64) -> Progress,
    {
        self.machine.run(&mut progress)
    }
}

pub enum RuntimeEvaluator {
    Direct(DirectRuntime),
    Indirect(IndirectRuntime),
}

impl RuntimeEvaluator {
    pub fn model(&self) -> EvaluationModel {
        match self {
            RuntimeEvaluator::Direct(_) => EvaluationModel::Direct,
            RuntimeEvaluator::Indirect(_) => EvaluationModel::Indirect,
        }
    }

    pub fn into_direct(self) -> Option<DirectRuntime> {
        match self {
            RuntimeEvaluator::Direct(runtime) => Some(runtime),
            RuntimeEvaluator::Indirect(_) => None,
        }
    }

    pub fn into_indirect(self) -> Option<IndirectRuntime> {
        match self {
            RuntimeEvaluator::Indirect(runtime) => Some(runtime),
            RuntimeEvaluator::Direct(_) => None,
        }
    }
}
