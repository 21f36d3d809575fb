//! Email classification abstractions.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use onebox_core::Classification;
use thiserror::Error;

pub mod process;

pub use process::ProcessClassifier;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClassifierError {
    #[error("failed to start classifier: {0}")]
    Spawn(String),
    #[error("classifier i/o error: {0}")]
    Io(String),
    #[error("classifier timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },
    #[error("classifier exited with status {code:?}: {stderr}")]
    ExitStatus { code: Option<i32>, stderr: String },
    #[error("unparsable classifier output: {0}")]
    Decode(String),
    #[error("classifier reported: {0}")]
    Reported(String),
    #[error("mock classifier has no queued response")]
    MockQueueEmpty,
}

pub type ClassifierResult<T> = Result<T, ClassifierError>;

/// Assigns a category to email text.
///
/// Callers treat every error as "classification unavailable" and carry on.
#[async_trait]
pub trait Classifier: Send + Sync {
    fn name(&self) -> &'static str;

    async fn classify(&self, text: &str) -> ClassifierResult<Classification>;
}

/// Queue-backed classifier for tests. Records every text it was asked about.
#[derive(Debug, Default)]
pub struct MockClassifier {
    queue: Mutex<VecDeque<ClassifierResult<Classification>>>,
    seen: Mutex<Vec<String>>,
}

impl MockClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&self, result: ClassifierResult<Classification>) {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(result);
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl Classifier for MockClassifier {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn classify(&self, text: &str) -> ClassifierResult<Classification> {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(text.to_string());
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or(Err(ClassifierError::MockQueueEmpty))
    }
}
