use super::compute::ComputeBackend;
use super::progress::ProgressReporter;
use std::sync::atomic::{AtomicBool, Ordering};

/// Collaborators shared by every conformer task of a stage run.
#[derive(Clone, Copy)]
pub struct ExecutionContext<'a> {
    pub backend: &'a dyn ComputeBackend,
    pub reporter: &'a ProgressReporter<'a>,
    /// Caller-owned flag; once set, no further compute calls are issued.
    pub cancel: Option<&'a AtomicBool>,
}

impl<'a> ExecutionContext<'a> {
    pub fn new(backend: &'a dyn ComputeBackend, reporter: &'a ProgressReporter<'a>) -> Self {
        Self {
            backend,
            reporter,
            cancel: None,
        }
    }

    pub fn with_cancel_flag(mut self, flag: &'a AtomicBool) -> Self {
        self.cancel = Some(flag);
        self
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_some_and(|flag| flag.load(Ordering::SeqCst))
    }
}
