//! Question -> answer pipeline: repair loop first, then the composer.

use crate::composer::AnswerComposer;
use crate::config::Settings;
use crate::db::init_pool;
use crate::error::{QnaError, Result};
use crate::execution::{ExecutionGateway, PostgresGateway};
use crate::execution_loop::RepairOrchestrator;
use crate::intent::AnswerResponse;
use crate::llm::{LlmClient, LlmComposer, LlmPlanner};
use crate::planner::QueryPlanner;
use crate::sanitizer::ParameterSanitizer;
use crate::security::SafetyValidator;
use std::sync::Arc;
use tracing::info;

pub struct QaPipeline {
    orchestrator: RepairOrchestrator,
    composer: Arc<dyn AnswerComposer>,
}

impl QaPipeline {
    pub fn new(orchestrator: RepairOrchestrator, composer: Arc<dyn AnswerComposer>) -> Self {
        Self { orchestrator, composer }
    }

    /// Wire the production collaborators: PostgreSQL pool, chat-model planner
    /// and composer.
    pub async fn from_settings(settings: &Settings) -> Result<Self> {
        let pool = init_pool(
            &settings.database_url,
            settings.postgres_min_pool_size,
            settings.postgres_max_pool_size,
        )
        .await
        .map_err(|e| QnaError::Database(format!("Failed to connect to PostgreSQL: {}", e)))?;
        let gateway: Arc<dyn ExecutionGateway> = Arc::new(PostgresGateway::new(
            pool,
            settings.max_rows,
            settings.statement_timeout_ms,
        ));

        let client = LlmClient::new(
            &settings.llm_base_url,
            &settings.llm_model,
            settings.llm_api_key.clone(),
            settings.llm_timeout,
        )?;
        let policy = settings.guard_policy();
        let planner: Arc<dyn QueryPlanner> = Arc::new(LlmPlanner::new(client.clone(), policy.clone()));
        let composer: Arc<dyn AnswerComposer> = Arc::new(LlmComposer::new(client));

        let orchestrator = RepairOrchestrator::new(
            planner,
            gateway,
            SafetyValidator::new(policy),
            ParameterSanitizer::new(settings.max_rows),
            settings.max_attempts,
        );
        info!(
            "Pipeline ready (model {}, max {} attempts, max {} rows)",
            settings.llm_model, settings.max_attempts, settings.max_rows
        );

        Ok(Self::new(orchestrator, composer))
    }

    pub async fn run(&self, question: &str) -> Result<AnswerResponse> {
        let outcome = self.orchestrator.run(question).await?;
        let composed_answer = self
            .composer
            .compose(question, &outcome.execution, &outcome.advisories)
            .await?;

        Ok(AnswerResponse {
            original_question: question.to_string(),
            composed_answer,
            query_summary: outcome.execution,
            advisories: outcome.advisories,
        })
    }
}
