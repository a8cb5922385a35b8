pub mod agent_prompts;
pub mod composer;
pub mod config;
pub mod db;
pub mod error;
pub mod execution;
pub mod execution_loop;
pub mod intent;
pub mod llm;
pub mod pipeline;
pub mod planner;
pub mod sanitizer;
pub mod security;
pub mod server;

pub use composer::AnswerComposer;
pub use config::Settings;
pub use error::{QnaError, RejectReason, Result, ValidationError};
pub use execution::{ExecutionGateway, FetchedRows};
pub use execution_loop::{RepairOrchestrator, RepairOutcome};
pub use intent::{AnswerResponse, ErrorRecord, ExecutionResult, IntentModel, Parameters, Row};
pub use pipeline::QaPipeline;
pub use planner::{PlannerReply, QueryPlanner};
pub use sanitizer::ParameterSanitizer;
pub use security::{GuardPolicy, SafetyValidator, ValidatedQuery};
