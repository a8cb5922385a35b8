//! Repair Loop
//!
//! Bounded plan -> validate -> sanitize -> execute loop. Only engine faults are
//! fed back to the planner; gate rejections, format faults and collaborator
//! faults end the question immediately.

use crate::error::{QnaError, Result};
use crate::execution::ExecutionGateway;
use crate::execution_loop::error_classifier::{ErrorClassifier, FailureClass};
use crate::execution_loop::retry_context::RetryContext;
use crate::intent::{Advisory, ErrorRecord, ExecutionResult, IntentModel};
use crate::planner::{snippet, MalformedEnvelope, PlannerReply, QueryPlanner};
use crate::sanitizer::ParameterSanitizer;
use crate::security::SafetyValidator;
use std::sync::Arc;
use tracing::{debug, info, info_span, warn, Instrument};

/// Successful end of a question's loop.
#[derive(Debug, Clone, PartialEq)]
pub struct RepairOutcome {
    pub execution: ExecutionResult,
    pub advisories: Vec<Advisory>,
    /// Attempt (1-based) that produced the result.
    pub attempts: u8,
}

pub struct RepairOrchestrator {
    max_attempts: u8,
    validator: SafetyValidator,
    sanitizer: ParameterSanitizer,
    planner: Arc<dyn QueryPlanner>,
    gateway: Arc<dyn ExecutionGateway>,
    classifier: ErrorClassifier,
}

impl RepairOrchestrator {
    pub fn new(
        planner: Arc<dyn QueryPlanner>,
        gateway: Arc<dyn ExecutionGateway>,
        validator: SafetyValidator,
        sanitizer: ParameterSanitizer,
        max_attempts: u8,
    ) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            validator,
            sanitizer,
            planner,
            gateway,
            classifier: ErrorClassifier::new(),
        }
    }

    pub async fn run(&self, question: &str) -> Result<RepairOutcome> {
        let mut ctx = RetryContext::new(self.max_attempts);
        let span = info_span!("question", request_id = %ctx.request_id());

        async move {
            info!("Planning query for question: {}", question);
            loop {
                let attempt = ctx.begin_attempt();
                info!("Query attempt {} of {}", attempt, self.max_attempts);

                let error = match self.attempt(question, ctx.history()).await {
                    Ok((execution, mut advisories)) => {
                        let repairs = ctx.succeed();
                        if repairs > 0 {
                            advisories.push(format!(
                                "Query corrected after {} attempt{}.",
                                repairs,
                                if repairs == 1 { "" } else { "s" }
                            ));
                        }
                        info!("Query succeeded on attempt {} ({} rows)", attempt, execution.row_count);
                        return Ok(RepairOutcome {
                            execution,
                            advisories,
                            attempts: attempt,
                        });
                    }
                    Err(error) => error,
                };

                match self.classifier.classify(&error) {
                    FailureClass::ExecutionError(message) if ctx.has_remaining() => {
                        warn!("Attempt {} failed in the engine, asking for a repair: {}", attempt, message);
                        ctx.record_failure(message);
                    }
                    FailureClass::ExecutionError(message) => {
                        warn!("Attempts exhausted after {}: {}", attempt, message);
                        ctx.exhaust();
                        return Err(error);
                    }
                    class => {
                        warn!("Attempt {} ended with non-retryable {}", attempt, class);
                        ctx.abort();
                        return Err(error);
                    }
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn attempt(&self, question: &str, history: &[ErrorRecord]) -> Result<(ExecutionResult, Vec<Advisory>)> {
        let intent = self.resolve_intent(question, history).await?;
        if intent.sql.trim().is_empty() {
            return Err(QnaError::Format {
                message: "Planner did not produce a SQL query for the question".to_string(),
                snippet: snippet(intent.rationale.as_deref().unwrap_or_default()),
            });
        }

        let validated = self.validator.validate(&intent.sql)?;
        debug!(tables = ?validated.tables, "Statement accepted by the safety gate");

        let sanitized = self.sanitizer.sanitize(&validated.sql, &intent.parameters);
        let fetched = self.gateway.fetch(&sanitized.sql, &sanitized.parameters).await?;

        let mut advisories = sanitized.advisories;
        if fetched.limit_applied {
            advisories.push(format!(
                "Result truncated to the first {} rows.",
                fetched.rows.len()
            ));
        }

        let row_count = fetched.rows.len();
        Ok((
            ExecutionResult {
                sql: sanitized.sql,
                parameters: sanitized.parameters,
                rows: fetched.rows,
                row_count,
                limit_applied: fetched.limit_applied,
            },
            advisories,
        ))
    }

    /// Format sub-loop: decode, then one structural repair pass. Does not
    /// consume a repair attempt.
    async fn resolve_intent(&self, question: &str, history: &[ErrorRecord]) -> Result<IntentModel> {
        let reply = self
            .planner
            .plan(question, history, self.sanitizer.default_limit())
            .await?;

        let envelope = match reply {
            PlannerReply::Parsed(intent) => return Ok(intent),
            PlannerReply::Malformed(envelope) => envelope,
        };
        warn!("Planner reply is malformed, cleaning it up: {}", envelope.reason);

        match envelope.repaired() {
            PlannerReply::Parsed(intent) => Ok(intent),
            PlannerReply::Malformed(second) => Err(MalformedEnvelope {
                raw: envelope.raw,
                reason: second.reason,
            }
            .into_error()),
        }
    }
}
