//! The JSON output contract for generated questions.
//!
//! The model must answer with one object `{title, standard_sql, difficulty, score}`.
//! Everything is checked here, right after parsing; only a
//! [`GeneratedQuestionDraft`] leaves this module.

use crate::errors::CoreError;
use crate::model::{Difficulty, GeneratedQuestionDraft};
use serde::Deserialize;
use serde_json::Value;

pub const DEFAULT_SCORE: u32 = 10;

#[derive(Debug, Deserialize)]
struct RawQuestion {
    #[serde(default)]
    title: Option<Value>,
    #[serde(default)]
    standard_sql: Option<Value>,
    #[serde(default)]
    difficulty: Option<Value>,
    #[serde(default)]
    score: Option<Value>,
}

/// Removes a surrounding ```` ``` ```` / ```` ```json ```` fence, if any.
pub fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    if !text.starts_with("```") {
        return text;
    }
    let Some(first_newline) = text.find('\n') else {
        return text;
    };
    let body = &text[first_newline + 1..];
    match body.rfind('\n') {
        Some(last_newline) if body[last_newline + 1..].trim_start().starts_with("```") => {
            body[..last_newline].trim()
        }
        _ => text,
    }
}

/// Parses raw model text into a draft. `requested` is the difficulty the caller
/// asked for; it fills in when the model omits or garbles its own.
pub fn parse_question(
    raw: &str,
    dataset_key: &str,
    requested: Option<Difficulty>,
) -> Result<GeneratedQuestionDraft, CoreError> {
    let body = strip_code_fence(raw);

    let value: Value = serde_json::from_str(body).map_err(|e| CoreError::MalformedModelOutput {
        reason: format!("invalid JSON: {e}"),
        raw: raw.to_string(),
    })?;
    if !value.is_object() {
        return Err(CoreError::MalformedModelOutput {
            reason: "expected a JSON object".into(),
            raw: raw.to_string(),
        });
    }
    let fields: RawQuestion =
        serde_json::from_value(value).map_err(|e| CoreError::MalformedModelOutput {
            reason: e.to_string(),
            raw: raw.to_string(),
        })?;

    let title = required_text(fields.title.as_ref()).ok_or_else(|| incomplete("title", raw))?;
    let standard_sql =
        required_text(fields.standard_sql.as_ref()).ok_or_else(|| incomplete("standard_sql", raw))?;

    let difficulty = fields
        .difficulty
        .as_ref()
        .and_then(Value::as_str)
        .and_then(Difficulty::parse)
        .or(requested)
        .unwrap_or(Difficulty::Medium);

    Ok(GeneratedQuestionDraft {
        dataset_key: dataset_key.to_string(),
        title: title.to_string(),
        standard_sql: standard_sql.to_string(),
        difficulty,
        score: parse_score(fields.score.as_ref()),
    })
}

// Verbatim text if it is a string that is non-blank once trimmed.
fn required_text(v: Option<&Value>) -> Option<&str> {
    v.and_then(Value::as_str).filter(|s| !s.trim().is_empty())
}

fn incomplete(field: &str, raw: &str) -> CoreError {
    CoreError::IncompleteModelOutput {
        missing: field.to_string(),
        raw: raw.to_string(),
    }
}

/// Positive integers, numeric strings and floats (truncated); anything else is 10.
pub fn parse_score(v: Option<&Value>) -> u32 {
    let n = match v {
        Some(Value::Number(n)) => n.as_u64().map(|u| u as f64).or_else(|| n.as_f64()),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match n.map(f64::trunc) {
        Some(x) if x.is_finite() && x >= 1.0 => x.min(u32::MAX as f64) as u32,
        _ => DEFAULT_SCORE,
    }
}
