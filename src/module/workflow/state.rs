//! Run state shared between the workflow and its background tasks.

use std::sync::{Arc, PoisonError, RwLock};

/// What the appliance is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// No camera, no background task.
    Idle,
    /// Camera streaming, preview task running.
    Live,
    /// Camera stopped, blink task running, waiting for the classifier.
    Processing,
}

/// The only handle that can change the run state. Owned by the workflow.
#[derive(Debug)]
pub struct StateWriter {
    inner: Arc<RwLock<RunState>>,
}

/// Read-only view handed to background tasks.
#[derive(Debug, Clone)]
pub struct StateReader {
    inner: Arc<RwLock<RunState>>,
}

impl StateWriter {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(RunState::Idle)),
        }
    }

    pub fn get(&self) -> RunState {
        *self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set(&self, next: RunState) {
        let mut state = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if *state != next {
            log::debug!("RunState {:?} -> {:?}", *state, next);
            *state = next;
        }
    }

    pub fn reader(&self) -> StateReader {
        StateReader {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Default for StateWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl StateReader {
    pub fn get(&self) -> RunState {
        *self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readers_follow_the_writer() {
        let writer = StateWriter::new();
        let reader = writer.reader();
        assert_eq!(reader.get(), RunState::Idle);
        writer.set(RunState::Live);
        assert_eq!(reader.get(), RunState::Live);
        assert_eq!(reader.clone().get(), RunState::Live);
        writer.set(RunState::Processing);
        assert_eq!(writer.get(), RunState::Processing);
        assert_eq!(reader.get(), RunState::Processing);
    }
}
