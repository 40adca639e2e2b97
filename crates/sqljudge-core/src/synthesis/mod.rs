//! Language-model flows: question generation, submission feedback and the
//! administrator assistant. Every completion-service invocation produces
//! exactly one [`LlmCallRecord`], whatever the outcome.

pub mod contract;
pub mod prompt;

use crate::errors::CoreError;
use crate::model::{CallPurpose, CallStatus, Difficulty, GeneratedQuestionDraft, LlmCallRecord};
use crate::providers::llm::LlmClient;
use crate::storage::CallLog;
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;

pub use contract::{parse_question, strip_code_fence};
pub use prompt::{ExplainContext, Prompt, QuestionHints};

pub const GENERATION_TEMPERATURE: f32 = 0.3;
pub const EXPLANATION_TEMPERATURE: f32 = 0.4;
pub const ASSISTANT_TEMPERATURE: f32 = 0.3;

/// Which dataset a call concerns, for the call log.
#[derive(Debug, Clone, Default)]
pub struct DatasetRef {
    pub key: Option<String>,
    pub id: Option<i64>,
}

impl DatasetRef {
    pub fn new(key: impl Into<String>, id: i64) -> Self {
        Self {
            key: Some(key.into()),
            id: Some(id),
        }
    }
}

#[derive(Clone)]
pub struct QuestionSynthesizer {
    client: Arc<dyn LlmClient>,
    call_log: Arc<dyn CallLog>,
}

impl QuestionSynthesizer {
    pub fn new(client: Arc<dyn LlmClient>, call_log: Arc<dyn CallLog>) -> Self {
        Self { client, call_log }
    }

    pub async fn generate_question(
        &self,
        dataset: &DatasetRef,
        schema_text: &str,
        difficulty: Option<Difficulty>,
        hints: &QuestionHints,
    ) -> Result<GeneratedQuestionDraft, CoreError> {
        let dataset_key = dataset.key.clone().unwrap_or_default();
        let hint = hints.compose();
        let prompt = prompt::generation_prompt(&dataset_key, schema_text, difficulty, hint.as_deref());

        let started = Instant::now();
        let outcome = match self.client.complete(&prompt.messages(), GENERATION_TEMPERATURE).await {
            Ok(resp) => parse_question(&resp.text, &dataset_key, difficulty),
            Err(e) => Err(e),
        };
        self.record(CallPurpose::Generate, dataset, difficulty, &prompt, started, &outcome);

        if let Ok(draft) = &outcome {
            tracing::info!(
                event = "synthesis.question_generated",
                dataset = %dataset_key,
                difficulty = draft.difficulty.as_str(),
                score = draft.score
            );
        }
        outcome
    }

    /// Free-text feedback on one submission. Blank `user_sql` is rejected
    /// before any call is made.
    pub async fn explain_submission(
        &self,
        dataset: &DatasetRef,
        ctx: &ExplainContext<'_>,
    ) -> Result<String, CoreError> {
        if ctx.user_sql.trim().is_empty() {
            return Err(CoreError::InvalidRequest(
                "user_sql must not be empty to explain a submission".into(),
            ));
        }
        let prompt = prompt::explanation_prompt(ctx);

        let started = Instant::now();
        let outcome = self
            .client
            .complete(&prompt.messages(), EXPLANATION_TEMPERATURE)
            .await
            .map(|resp| resp.text.trim().to_string());
        self.record(CallPurpose::Explain, dataset, None, &prompt, started, &outcome);
        outcome
    }

    pub async fn assistant_reply(
        &self,
        message: &str,
        context: Option<&str>,
    ) -> Result<String, CoreError> {
        if message.trim().is_empty() {
            return Err(CoreError::InvalidRequest("message must not be empty".into()));
        }
        let prompt = prompt::assistant_prompt(message, context);

        let started = Instant::now();
        let outcome = self
            .client
            .complete(&prompt.messages(), ASSISTANT_TEMPERATURE)
            .await
            .map(|resp| resp.text.trim().to_string());
        self.record(
            CallPurpose::Assistant,
            &DatasetRef::default(),
            None,
            &prompt,
            started,
            &outcome,
        );
        outcome
    }

    fn record<T>(
        &self,
        purpose: CallPurpose,
        dataset: &DatasetRef,
        difficulty: Option<Difficulty>,
        prompt: &Prompt,
        started: Instant,
        outcome: &Result<T, CoreError>,
    ) {
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
        let (status, error_message) = match outcome {
            Ok(_) => (CallStatus::Success, None),
            Err(e) => (CallStatus::Error, Some(e.to_string())),
        };
        let record = LlmCallRecord {
            dataset_key: dataset.key.clone(),
            dataset_id: dataset.id,
            purpose,
            difficulty,
            status,
            error_message,
            latency_ms,
            prompt_sha256: prompt.sha256(),
            created_at: Utc::now(),
        };

        match outcome {
            Ok(_) => tracing::info!(
                event = "llm.call",
                purpose = purpose.as_str(),
                status = status.as_str(),
                latency_ms = latency_ms
            ),
            Err(e) => tracing::warn!(
                event = "llm.call",
                purpose = purpose.as_str(),
                status = status.as_str(),
                error_kind = e.kind(),
                latency_ms = latency_ms
            ),
        }

        if let Err(e) = self.call_log.append(&record) {
            tracing::warn!(
                event = "llm.call_log_failed",
                purpose = purpose.as_str(),
                error = %e,
                "dropping call record"
            );
        }
    }
}
