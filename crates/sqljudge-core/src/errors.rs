//! Error taxonomy shared by every component boundary.
//!
//! Expected failure modes (bad learner SQL, an unreachable dataset, a model that
//! ignores its output contract) are values of [`CoreError`], never panics. The
//! request layer decides how to render them; [`CoreError::public_message`] is the
//! display-safe text and [`CoreError::http_status`] the suggested status class.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// Dataset store unreachable or misconfigured. Never cached by the registry.
    #[error("dataset '{db_name}' unavailable: {reason}")]
    DatasetUnavailable { db_name: String, reason: String },

    /// Driver-level fault while executing a query. The judge folds this into a
    /// `Verdict::Error`; it only escapes from lower-level helpers.
    #[error("{0}")]
    QueryExecutionFault(String),

    /// Network, auth or configuration failure talking to the completion service.
    #[error("completion service unavailable: {0}")]
    CompletionServiceUnavailable(String),

    /// Model text was not a JSON object.
    #[error("malformed model output ({reason}); raw output: {raw}")]
    MalformedModelOutput { reason: String, raw: String },

    /// Model returned JSON but a required field was empty or missing.
    #[error("incomplete model output (missing {missing}); raw output: {raw}")]
    IncompleteModelOutput { missing: String, raw: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("storage error: {0:#}")]
    Storage(anyhow::Error),
}

impl CoreError {
    pub fn dataset_unavailable(db_name: impl Into<String>, reason: impl ToString) -> Self {
        CoreError::DatasetUnavailable {
            db_name: db_name.into(),
            reason: reason.to_string(),
        }
    }

    /// Message that is safe to show to a learner or an administrator.
    ///
    /// Driver errors for learner queries are shown verbatim since they only
    /// describe the learner's own SQL. Everything touching credentials, paths or
    /// provider internals is replaced by a generic sentence.
    pub fn public_message(&self) -> String {
        match self {
            CoreError::DatasetUnavailable { .. } => {
                "The dataset for this exercise is temporarily unavailable.".to_string()
            }
            CoreError::QueryExecutionFault(msg) => msg.clone(),
            CoreError::CompletionServiceUnavailable(_) => {
                "The language model service is unavailable, please try again later.".to_string()
            }
            CoreError::MalformedModelOutput { .. } | CoreError::IncompleteModelOutput { .. } => {
                "The language model returned an unusable answer, please try again.".to_string()
            }
            CoreError::InvalidRequest(msg) | CoreError::NotFound(msg) | CoreError::Forbidden(msg) => {
                msg.clone()
            }
            CoreError::Storage(_) => "Internal storage error.".to_string(),
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            CoreError::InvalidRequest(_) => 400,
            CoreError::Forbidden(_) => 403,
            CoreError::NotFound(_) => 404,
            CoreError::QueryExecutionFault(_) => 422,
            CoreError::CompletionServiceUnavailable(_)
            | CoreError::MalformedModelOutput { .. }
            | CoreError::IncompleteModelOutput { .. } => 502,
            CoreError::DatasetUnavailable { .. } => 503,
            CoreError::Storage(_) => 500,
        }
    }

    /// Stable short code, used as the `error_kind` field in structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::DatasetUnavailable { .. } => "dataset_unavailable",
            CoreError::QueryExecutionFault(_) => "query_execution_fault",
            CoreError::CompletionServiceUnavailable(_) => "completion_service_unavailable",
            CoreError::MalformedModelOutput { .. } => "malformed_model_output",
            CoreError::IncompleteModelOutput { .. } => "incomplete_model_output",
            CoreError::InvalidRequest(_) => "invalid_request",
            CoreError::NotFound(_) => "not_found",
            CoreError::Forbidden(_) => "forbidden",
            CoreError::Storage(_) => "storage",
        }
    }
}

#[derive(Debug, Error)]
#[error("{0}")]
pub struct ConfigError(pub String);
