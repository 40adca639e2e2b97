//! Orchestration of the request flows over the store, the dataset registry,
//! the judge and the synthesizer.

use crate::config::AppConfig;
use crate::dataset::{DatasetRegistry, SchemaIntrospector, SchemaResolution, TablePreview};
use crate::errors::CoreError;
use crate::judge::{JudgeEngine, JudgeOptions};
use crate::model::{
    Dataset, Difficulty, GeneratedQuestionDraft, NewQuestion, Question, SubmissionOutcome,
    SubmissionRecord, Verdict, VerdictStatus,
};
use crate::providers::llm::{LlmClient, OpenAIClient};
use crate::request::{ExplainRequest, GenerationRequest, JudgeRequest};
use crate::storage::{CallLog, Store, StoreCallLog};
use crate::synthesis::{prompt, DatasetRef, ExplainContext, QuestionSynthesizer};
use serde::Serialize;
use std::sync::Arc;

/// User id recorded for anonymous learners.
pub const ANONYMOUS_USER: i64 = 0;

#[derive(Debug, Clone, Serialize)]
pub struct GenerationOutcome {
    pub draft: GeneratedQuestionDraft,
    /// Set when the draft was saved to the catalog.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question_id: Option<i64>,
}

#[derive(Clone)]
pub struct ExerciseService {
    store: Store,
    registry: Arc<DatasetRegistry>,
    judge: JudgeEngine,
    schema: SchemaIntrospector,
    synthesizer: QuestionSynthesizer,
}

impl ExerciseService {
    pub fn new(
        store: Store,
        registry: Arc<DatasetRegistry>,
        judge_options: JudgeOptions,
        client: Arc<dyn LlmClient>,
    ) -> Self {
        let call_log: Arc<dyn CallLog> = Arc::new(StoreCallLog::new(store.clone()));
        Self {
            judge: JudgeEngine::new(registry.clone(), judge_options),
            schema: SchemaIntrospector::new(registry.clone()),
            synthesizer: QuestionSynthesizer::new(client, call_log),
            store,
            registry,
        }
    }

    /// Opens the store (creating its schema) and wires the HTTP completion client.
    pub fn from_config(cfg: &AppConfig) -> anyhow::Result<Self> {
        let store = Store::open(&cfg.store.path)?;
        store.init_schema()?;
        let registry = Arc::new(DatasetRegistry::from_settings(&cfg.datasets));
        let client: Arc<dyn LlmClient> = Arc::new(OpenAIClient::from_settings(&cfg.llm)?);
        Ok(Self::new(
            store,
            registry,
            JudgeOptions::from(&cfg.judge),
            client,
        ))
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn registry(&self) -> &Arc<DatasetRegistry> {
        &self.registry
    }

    /// Judges a learner query for a catalog question and appends the
    /// submission record.
    pub async fn submit(&self, req: JudgeRequest) -> Result<SubmissionOutcome, CoreError> {
        let question = self.question(req.question_id)?;
        let dataset = self.dataset_for(&question)?;

        let verdict = self
            .judge
            .judge(&req.user_sql, &question.standard_sql, &dataset.db_name)
            .await?;

        let score = match verdict.status() {
            VerdictStatus::Pass => question.score,
            _ => 0,
        };
        let record = SubmissionRecord {
            user_id: req.user_id.unwrap_or(ANONYMOUS_USER),
            question_id: question.id,
            dataset_id: dataset.id,
            user_sql: req.user_sql.clone(),
            result: verdict.status(),
            score,
            exec_time_secs: verdict.elapsed().as_secs_f64(),
            error_log: match &verdict {
                Verdict::Error { message, .. } => Some(message.clone()),
                _ => None,
            },
        };
        self.store
            .insert_submission(&record)
            .map_err(CoreError::Storage)?;

        tracing::info!(
            event = "submission.recorded",
            question_id = question.id,
            user_id = record.user_id,
            status = verdict.status().as_str(),
            score = score
        );
        Ok(outcome_for(&verdict, score))
    }

    /// Judges an ad hoc pair against a dataset key, without recording anything.
    pub async fn judge_sql(
        &self,
        dataset_key: &str,
        standard_sql: &str,
        user_sql: &str,
    ) -> Result<Verdict, CoreError> {
        let dataset = self.dataset_by_key(dataset_key)?;
        self.judge
            .judge(user_sql, standard_sql, &dataset.db_name)
            .await
    }

    pub async fn generate(&self, req: GenerationRequest) -> Result<GenerationOutcome, CoreError> {
        let dataset = self.dataset_by_key(&req.dataset_key)?;
        let schema_text = self.schema.resolve_schema_text(&dataset).await?.into_text();

        let draft = self
            .synthesizer
            .generate_question(
                &DatasetRef::new(&dataset.key, dataset.id),
                &schema_text,
                req.difficulty,
                &req.hints,
            )
            .await?;

        let question_id = if req.persist {
            let id = self
                .store
                .insert_question(&NewQuestion::from_draft(&draft, dataset.id))
                .map_err(CoreError::Storage)?;
            tracing::info!(event = "question.persisted", question_id = id, dataset = %dataset.key);
            Some(id)
        } else {
            None
        };
        Ok(GenerationOutcome { draft, question_id })
    }

    pub async fn explain(&self, req: ExplainRequest) -> Result<String, CoreError> {
        let question = self.question(req.question_id)?;

        // Feedback still works without a schema; the model judges from the SQL.
        let (dataset_ref, schema_text) = match self.dataset_for(&question) {
            Ok(ds) => {
                let text = match self.schema.resolve_schema_text(&ds).await {
                    Ok(res) => res.into_text(),
                    Err(e) => {
                        tracing::warn!(event = "explain.schema_unavailable", error = %e);
                        String::new()
                    }
                };
                (DatasetRef::new(&ds.key, ds.id), text)
            }
            Err(e) => {
                tracing::warn!(event = "explain.dataset_unavailable", error = %e);
                (
                    DatasetRef {
                        key: None,
                        id: Some(question.dataset_id),
                    },
                    String::new(),
                )
            }
        };

        let ctx = ExplainContext {
            schema_text: &schema_text,
            title: &question.title,
            standard_sql: &question.standard_sql,
            user_sql: &req.user_sql,
            result: &req.result,
            judge_message: req.judge_message.as_deref(),
        };
        self.synthesizer.explain_submission(&dataset_ref, &ctx).await
    }

    /// Reveals the reference SQL once the question allows it and the user has
    /// submitted at least once.
    pub fn reveal_answer(&self, question_id: i64, user_id: Option<i64>) -> Result<String, CoreError> {
        let question = self.question(question_id)?;
        if !question.allow_view_answer {
            return Err(CoreError::Forbidden(
                "The reference answer is not available for this question.".into(),
            ));
        }
        let attempts = self
            .store
            .count_submissions(user_id.unwrap_or(ANONYMOUS_USER), question_id)
            .map_err(CoreError::Storage)?;
        if attempts == 0 {
            return Err(CoreError::Forbidden(
                "Submit an answer before viewing the reference solution.".into(),
            ));
        }
        Ok(question.standard_sql)
    }

    pub async fn dataset_schema(&self, dataset_key: &str) -> Result<SchemaResolution, CoreError> {
        let dataset = self.dataset_by_key(dataset_key)?;
        self.schema.resolve_schema_text(&dataset).await
    }

    pub async fn preview_dataset(&self, dataset_key: &str) -> Result<Vec<TablePreview>, CoreError> {
        let dataset = self.dataset_by_key(dataset_key)?;
        self.schema.preview_tables(&dataset.db_name).await
    }

    /// A random catalog question for the dataset, optionally of one difficulty.
    pub fn draw_question(
        &self,
        dataset_key: &str,
        difficulty: Option<Difficulty>,
    ) -> Result<Question, CoreError> {
        let dataset = self.dataset_by_key(dataset_key)?;
        self.store
            .random_question(Some(dataset.id), difficulty)
            .map_err(CoreError::Storage)?
            .ok_or_else(|| {
                CoreError::NotFound(format!(
                    "no questions for dataset '{}'{}",
                    dataset.key,
                    difficulty.map(|d| format!(" at difficulty {d}")).unwrap_or_default()
                ))
            })
    }

    /// Administrator assistant, with platform statistics as context when the
    /// store can provide them.
    pub async fn assistant(&self, message: &str) -> Result<String, CoreError> {
        let context = match self.store.system_stats() {
            Ok(stats) => Some(prompt::stats_context(&stats)),
            Err(e) => {
                tracing::warn!(event = "assistant.stats_unavailable", error = %e);
                None
            }
        };
        self.synthesizer
            .assistant_reply(message, context.as_deref())
            .await
    }

    fn question(&self, id: i64) -> Result<Question, CoreError> {
        self.store
            .question(id)
            .map_err(CoreError::Storage)?
            .ok_or_else(|| CoreError::NotFound(format!("question {id} does not exist")))
    }

    fn dataset_by_key(&self, key: &str) -> Result<Dataset, CoreError> {
        self.store
            .dataset_by_key(key)
            .map_err(CoreError::Storage)?
            .ok_or_else(|| CoreError::NotFound(format!("dataset '{key}' does not exist")))
    }

    fn dataset_for(&self, question: &Question) -> Result<Dataset, CoreError> {
        self.store
            .dataset_by_id(question.dataset_id)
            .map_err(CoreError::Storage)?
            .ok_or_else(|| {
                CoreError::dataset_unavailable(
                    format!("#{}", question.dataset_id),
                    "dataset is missing or inactive",
                )
            })
    }
}

pub fn outcome_for(verdict: &Verdict, score: u32) -> SubmissionOutcome {
    SubmissionOutcome {
        result: verdict.status(),
        message: verdict.message().to_string(),
        score,
        execution_time_seconds: verdict.elapsed().as_secs_f64(),
        preview: verdict.preview().cloned(),
    }
}
