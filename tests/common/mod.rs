#![allow(dead_code)]

use async_trait::async_trait;
use qna_engine::composer::AnswerComposer;
use qna_engine::execution::{ExecutionGateway, FetchedRows};
use qna_engine::execution_loop::RepairOrchestrator;
use qna_engine::intent::{Advisory, ErrorRecord, ExecutionResult, IntentModel, Parameters, Row};
use qna_engine::planner::{PlannerReply, QueryPlanner};
use qna_engine::sanitizer::ParameterSanitizer;
use qna_engine::security::SafetyValidator;
use qna_engine::{QnaError, Result};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

pub const DEFAULT_LIMIT: usize = 50;

/// Planner that replays scripted replies and records the history it was given.
#[derive(Default)]
pub struct ScriptedPlanner {
    replies: Mutex<VecDeque<Result<PlannerReply>>>,
    pub histories: Mutex<Vec<Vec<ErrorRecord>>>,
}

impl ScriptedPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intent(self, sql: &str) -> Self {
        self.reply(Ok(PlannerReply::Parsed(IntentModel::new(sql))))
    }

    pub fn raw(self, text: &str) -> Self {
        self.reply(Ok(PlannerReply::decode(text)))
    }

    pub fn reply(self, reply: Result<PlannerReply>) -> Self {
        self.replies.lock().unwrap().push_back(reply);
        self
    }

    pub fn calls(&self) -> usize {
        self.histories.lock().unwrap().len()
    }

    pub fn history_at(&self, call: usize) -> Vec<ErrorRecord> {
        self.histories.lock().unwrap()[call].clone()
    }
}

#[async_trait]
impl QueryPlanner for ScriptedPlanner {
    async fn plan(&self, _question: &str, history: &[ErrorRecord], _default_limit: usize) -> Result<PlannerReply> {
        self.histories.lock().unwrap().push(history.to_vec());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(QnaError::Llm("no scripted reply left".to_string())))
    }
}

/// Gateway that replays scripted outcomes and records what it was asked to run.
#[derive(Default)]
pub struct ScriptedGateway {
    outcomes: Mutex<VecDeque<Result<FetchedRows>>>,
    pub calls: Mutex<Vec<(String, Parameters)>>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(self, rows: Vec<Row>) -> Self {
        self.outcome(Ok(FetchedRows { rows, limit_applied: false }))
    }

    pub fn truncated(self, rows: Vec<Row>) -> Self {
        self.outcome(Ok(FetchedRows { rows, limit_applied: true }))
    }

    pub fn engine_error(self, message: &str) -> Self {
        self.outcome(Err(QnaError::Execution(message.to_string())))
    }

    pub fn outcome(self, outcome: Result<FetchedRows>) -> Self {
        self.outcomes.lock().unwrap().push_back(outcome);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn last_call(&self) -> (String, Parameters) {
        self.calls.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl ExecutionGateway for ScriptedGateway {
    async fn fetch(&self, sql: &str, parameters: &Parameters) -> Result<FetchedRows> {
        self.calls.lock().unwrap().push((sql.to_string(), parameters.clone()));
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(FetchedRows::default()))
    }
}

/// Composer that summarises the row count.
pub struct CountingComposer;

#[async_trait]
impl AnswerComposer for CountingComposer {
    async fn compose(&self, _question: &str, execution: &ExecutionResult, _advisories: &[Advisory]) -> Result<String> {
        Ok(format!("{} rows found", execution.row_count))
    }
}

pub fn row(id: i64, name: &str) -> Row {
    json!({ "id": id, "razao_social": name }).as_object().cloned().unwrap()
}

pub fn orchestrator(planner: Arc<ScriptedPlanner>, gateway: Arc<ScriptedGateway>, max_attempts: u8) -> RepairOrchestrator {
    RepairOrchestrator::new(
        planner,
        gateway,
        SafetyValidator::default(),
        ParameterSanitizer::new(DEFAULT_LIMIT),
        max_attempts,
    )
}
