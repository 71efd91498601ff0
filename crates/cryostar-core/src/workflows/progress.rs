//! Progress reporting for long-running workflows. The core stays agnostic
//! of presentation; callers install a callback and render events however
//! they like (progress bars, plain logs, nothing).

/// A presentation-neutral progress event.
#[derive(Debug, Clone)]
pub enum Progress {
    /// A named phase of a workflow began, e.g. reading input or expanding
    /// symmetry copies.
    PhaseStart { name: &'static str },
    PhaseFinish,

    /// A countable task began within the current phase.
    TaskStart { total_steps: u64 },
    TaskIncrement,
    TaskFinish,

    /// Free-form status, e.g. the resolved output path.
    Message(String),
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

/// Forwards events to an optional callback. A reporter without a callback
/// is a no-op, so library code reports unconditionally.
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
    fn emit(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }

    pub fn start_phase(&self, name: &'static str) {
        self.emit(Progress::PhaseStart { name });
    }

    pub fn finish_phase(&self) {
        self.emit(Progress::PhaseFinish);
    }

    pub fn start_task(&self, total_steps: u64) {
        self.emit(Progress::TaskStart { total_steps });
    }

    pub fn step(&self) {
        self.emit(Progress::TaskIncrement);
    }

    pub fn finish_task(&self) {
        self.emit(Progress::TaskFinish);
    }

    pub fn message(&self, text: impl Into<String>) {
        self.emit(Progress::Message(text.into()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn reporter_without_callback_is_a_noop() {
        let reporter = ProgressReporter::new();
        reporter.start_phase("anything");
        reporter.step();
        reporter.finish_phase();
    }

    #[test]
    fn events_reach_the_callback_in_order() {
        let seen = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            seen.lock().unwrap().push(format!("{event:?}"));
        }));
        reporter.start_phase("Expanding particles");
        reporter.start_task(3);
        reporter.step();
        reporter.finish_task();
        reporter.message("wrote subparticles.star");
        reporter.finish_phase();
        drop(reporter);

        let seen = seen.into_inner().unwrap();
        assert_eq!(seen.len(), 6);
        assert!(seen[0].contains("PhaseStart"));
        assert!(seen[4].contains("wrote subparticles.star"));
        assert!(seen[5].contains("PhaseFinish"));
    }
}
