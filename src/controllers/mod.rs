pub mod call;
pub mod knowledge;

pub use call::{CallRequestController, CallStatus, CallView, ResubmitPolicy, TranscriptState};
pub use knowledge::{KnowledgeEditController, KnowledgeMode, KnowledgeView};

use std::sync::{Mutex, MutexGuard, PoisonError};

pub(crate) fn lock<S>(state: &Mutex<S>) -> MutexGuard<'_, S> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Runs its cleanup when dropped: on success, on error, or when the owning
/// future is dropped mid-request. Busy flags are cleared here and nowhere
/// else.
pub(crate) struct InFlight<'a, S, F>
where
    F: FnOnce(&mut S),
{
    state: &'a Mutex<S>,
    cleanup: Option<F>,
}

impl<'a, S, F> InFlight<'a, S, F>
where
    F: FnOnce(&mut S),
{
    pub(crate) fn new(state: &'a Mutex<S>, cleanup: F) -> Self {
        Self { state, cleanup: Some(cleanup) }
    }
}

impl<S, F> Drop for InFlight<'_, S, F>
where
    F: FnOnce(&mut S),
{
    fn drop(&mut self) {
        if let Some(cleanup) = self.cleanup.take() {
            cleanup(&mut lock(self.state));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleanup_runs_on_panic() {
        let state = Mutex::new(true);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = InFlight::new(&state, |busy: &mut bool| *busy = false);
            panic!("malformed response");
        }));
        assert!(result.is_err());
        assert!(!*lock(&state));
    }
}
