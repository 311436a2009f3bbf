use crate::config::JiffleOptions;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Process-level state shared by compilation units: the options and the
/// counter behind default unit names.
///
/// Applications create one context and pass it to every [`crate::Jiffle`].
#[derive(Debug, Default)]
pub struct JiffleContext {
    options: JiffleOptions,
    names: AtomicUsize,
}

impl JiffleContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: JiffleOptions) -> Self {
        Self {
            options,
            names: AtomicUsize::new(0),
        }
    }

    pub fn options(&self) -> &JiffleOptions {
        &self.options
    }

    pub fn next_name(&self) -> String {
        let n = self.names.fetch_add(1, Ordering::Relaxed);
        format!("{}{n}", self.options.name_prefix)
    }

    pub fn reset(&self) {
        self.names.store(0, Ordering::Relaxed);
    }
}
