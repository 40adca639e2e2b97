//! Inbound request contracts. Raw payloads are deserialized loosely and then
//! validated into fixed-shape requests before any I/O happens.

use crate::errors::CoreError;
use crate::model::Difficulty;
use crate::synthesis::QuestionHints;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawJudgeRequest {
    #[serde(default)]
    pub question_id: Option<Value>,
    #[serde(default)]
    pub user_sql: Option<String>,
    #[serde(default)]
    pub user_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JudgeRequest {
    pub question_id: i64,
    pub user_sql: String,
    /// `None` for anonymous learners; recorded as user 0.
    pub user_id: Option<i64>,
}

impl TryFrom<RawJudgeRequest> for JudgeRequest {
    type Error = CoreError;

    fn try_from(raw: RawJudgeRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            question_id: parse_id(raw.question_id.as_ref(), "question_id")?,
            user_sql: required_sql(raw.user_sql)?,
            user_id: raw.user_id,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawGenerationRequest {
    #[serde(default)]
    pub dataset_key: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(flatten)]
    pub hints: QuestionHints,
    #[serde(default)]
    pub persist: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub dataset_key: String,
    pub difficulty: Option<Difficulty>,
    pub hints: QuestionHints,
    /// Insert the validated draft into the question catalog.
    pub persist: bool,
}

impl TryFrom<RawGenerationRequest> for GenerationRequest {
    type Error = CoreError;

    fn try_from(raw: RawGenerationRequest) -> Result<Self, Self::Error> {
        let dataset_key = raw
            .dataset_key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| CoreError::InvalidRequest("dataset_key is required".into()))?;
        Ok(Self {
            dataset_key,
            difficulty: parse_difficulty(raw.difficulty.as_deref())?,
            hints: raw.hints,
            persist: raw.persist,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawExplainRequest {
    #[serde(default)]
    pub question_id: Option<Value>,
    #[serde(default)]
    pub user_sql: Option<String>,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub judge_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplainRequest {
    pub question_id: i64,
    pub user_sql: String,
    /// Free text as the caller saw it; usually a verdict label.
    pub result: String,
    pub judge_message: Option<String>,
}

impl TryFrom<RawExplainRequest> for ExplainRequest {
    type Error = CoreError;

    fn try_from(raw: RawExplainRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            question_id: parse_id(raw.question_id.as_ref(), "question_id")?,
            user_sql: required_sql(raw.user_sql)?,
            result: raw.result.unwrap_or_default().trim().to_string(),
            judge_message: raw
                .judge_message
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty()),
        })
    }
}

/// Accepts a positive integer or a string holding one.
pub fn parse_id(v: Option<&Value>, field: &str) -> Result<i64, CoreError> {
    let id = match v {
        None | Some(Value::Null) => {
            return Err(CoreError::InvalidRequest(format!("{field} is required")));
        }
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        Some(_) => None,
    };
    match id {
        Some(id) if id > 0 => Ok(id),
        _ => Err(CoreError::InvalidRequest(format!(
            "{field} must be a positive integer"
        ))),
    }
}

fn required_sql(sql: Option<String>) -> Result<String, CoreError> {
    match sql {
        Some(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        _ => Err(CoreError::InvalidRequest("user_sql must not be empty".into())),
    }
}

fn parse_difficulty(raw: Option<&str>) -> Result<Option<Difficulty>, CoreError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => Difficulty::parse(s).map(Some).ok_or_else(|| {
            CoreError::InvalidRequest(format!("difficulty must be Easy, Medium or Hard, got '{s}'"))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn judge(v: Value) -> Result<JudgeRequest, CoreError> {
        let raw: RawJudgeRequest = serde_json::from_value(v).unwrap();
        JudgeRequest::try_from(raw)
    }

    #[test]
    fn question_id_accepts_numeric_string() {
        let req = judge(json!({"question_id": "42", "user_sql": " SELECT 1 "})).unwrap();
        assert_eq!(req.question_id, 42);
        assert_eq!(req.user_sql, "SELECT 1");
        assert_eq!(req.user_id, None);
    }

    #[test]
    fn bad_ids_are_invalid_requests() {
        for bad in [json!("abc"), json!(0), json!(-3), json!(1.5), json!([1]), json!(null)] {
            let err = judge(json!({"question_id": bad, "user_sql": "SELECT 1"})).unwrap_err();
            assert!(matches!(err, CoreError::InvalidRequest(_)), "{bad}");
        }
        let err = judge(json!({"user_sql": "SELECT 1"})).unwrap_err();
        assert!(err.to_string().contains("question_id is required"));
    }

    #[test]
    fn blank_sql_is_rejected() {
        let err = judge(json!({"question_id": 1, "user_sql": "   "})).unwrap_err();
        assert!(matches!(err, CoreError::InvalidRequest(_)));
    }

    #[test]
    fn generation_request_reads_flat_hints() {
        let raw: RawGenerationRequest = serde_json::from_value(json!({
            "dataset_key": "scores",
            "difficulty": "easy",
            "require_join": true,
            "business_hint": "grading"
        }))
        .unwrap();
        let req = GenerationRequest::try_from(raw).unwrap();
        assert_eq!(req.difficulty, Some(Difficulty::Easy));
        assert!(req.hints.require_join);
        assert_eq!(req.hints.business_hint.as_deref(), Some("grading"));
        assert!(!req.persist);
    }

    #[test]
    fn generation_request_rejects_unknown_difficulty() {
        let raw = RawGenerationRequest {
            dataset_key: Some("scores".into()),
            difficulty: Some("brutal".into()),
            ..Default::default()
        };
        assert!(GenerationRequest::try_from(raw).is_err());
    }
}
