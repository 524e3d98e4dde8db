/// Events emitted while a stage works through an ensemble.
///
/// A stage run reports `StageStart`, then `TaskStart` with one step per
/// conformer, a `TaskIncrement` as each conformer's jobs finish (from worker
/// threads, in completion order), `TaskFinish`, and `StageFinish` once the
/// survivors are committed. The runner adds a `Message` naming the snapshot.
#[derive(Debug, Clone)]
pub enum Progress {
    /// A stage begins on `conformers` active conformers.
    StageStart { name: &'static str, conformers: usize },
    /// The stage committed; `survivors` remain active.
    StageFinish { survivors: usize },

    TaskStart { total_steps: u64 },
    /// One conformer finished all its jobs, successfully or not.
    TaskIncrement,
    TaskFinish,

    Message(String),
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

/// Forwards stage and per-conformer [`Progress`] events to an optional callback.
///
/// Conformer workers report from several threads at once, so the callback must
/// be `Send + Sync`.
#[derive(Default)]
pub struct ProgressReporter<'a> {
    callback: Option<ProgressCallback<'a>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: ProgressCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }
}
