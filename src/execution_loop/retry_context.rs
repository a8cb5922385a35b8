//! Per-question retry state.
//!
//! One `RetryContext` is created for each question and threaded through its
//! attempts; nothing about a question's failures lives on shared objects.

use crate::intent::ErrorRecord;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairState {
    Fresh,
    AwaitingRetry,
    Succeeded,
    /// Every permitted attempt failed in the engine.
    Exhausted,
    /// A non-retryable failure ended the question early.
    Aborted,
}

#[derive(Debug)]
pub struct RetryContext {
    request_id: Uuid,
    max_attempts: u8,
    attempt: u8,
    errors: Vec<ErrorRecord>,
    state: RepairState,
}

impl RetryContext {
    pub fn new(max_attempts: u8) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            max_attempts,
            attempt: 0,
            errors: Vec::new(),
            state: RepairState::Fresh,
        }
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn state(&self) -> RepairState {
        self.state
    }

    pub fn begin_attempt(&mut self) -> u8 {
        self.attempt += 1;
        self.attempt
    }

    pub fn has_remaining(&self) -> bool {
        self.attempt < self.max_attempts
    }

    /// Failures so far, oldest first.
    pub fn history(&self) -> &[ErrorRecord] {
        &self.errors
    }

    pub fn record_failure(&mut self, message: String) {
        self.errors.push(ErrorRecord {
            attempt_index: self.attempt,
            message,
        });
        self.state = RepairState::AwaitingRetry;
    }

    /// Returns how many repair attempts were needed.
    pub fn succeed(&mut self) -> u8 {
        self.errors.clear();
        self.state = RepairState::Succeeded;
        self.attempt.saturating_sub(1)
    }

    pub fn exhaust(&mut self) {
        self.errors.clear();
        self.state = RepairState::Exhausted;
    }

    pub fn abort(&mut self) {
        self.errors.clear();
        self.state = RepairState::Aborted;
    }
}
