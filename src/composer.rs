use crate::error::Result;
use crate::intent::{Advisory, ExecutionResult};
use async_trait::async_trait;

/// Turns the final execution result into prose. A pure consumer: its
/// failures are reported as-is and never retried.
#[async_trait]
pub trait AnswerComposer: Send + Sync {
    async fn compose(&self, question: &str, execution: &ExecutionResult, advisories: &[Advisory]) -> Result<String>;
}
