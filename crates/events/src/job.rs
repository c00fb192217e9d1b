use std::time::Instant;

/// A unit of deferred work: an opaque closure plus an optional earliest start.
pub struct Job {
    task: Box<dyn FnOnce() + Send + 'static>,
    not_before: Option<Instant>,
}

impl Job {
    pub fn new<F>(task: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            task: Box::new(task),
            not_before: None,
        }
    }

    /// A job that must not be handed to a worker before `at`.
    pub fn not_before<F>(task: F, at: Instant) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            task: Box::new(task),
            not_before: Some(at),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.not_before
    }

    /// Execute the closure on the current thread.
    pub fn run(self) {
        (self.task)()
    }
}

impl core::fmt::Debug for Job {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Job")
            .field("not_before", &self.not_before)
            .finish_non_exhaustive()
    }
}
