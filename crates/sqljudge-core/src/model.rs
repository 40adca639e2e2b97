use chrono::{DateTime, Utc};
use rusqlite::types::ValueRef;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::time::Duration;

/// A named, read-only target schema against which exercise queries run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    pub id: i64,
    pub key: String,
    pub db_name: String,
    #[serde(default)]
    pub schema_desc: Option<String>,
    pub active: bool,
}

impl Dataset {
    /// The precomputed schema description, if one is maintained and non-blank.
    pub fn cached_schema(&self) -> Option<&str> {
        self.schema_desc
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }

    /// Case-insensitive parse; anything else is `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "medium" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionSource {
    Catalog,
    Generated,
}

impl QuestionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionSource::Catalog => "catalog",
            QuestionSource::Generated => "generated",
        }
    }

    // "db"/"llm" are the labels older rows were written with.
    pub fn parse(s: &str) -> Self {
        match s {
            "generated" | "llm" => QuestionSource::Generated,
            _ => QuestionSource::Catalog,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub title: String,
    pub standard_sql: String,
    pub difficulty: Difficulty,
    pub score: u32,
    pub dataset_id: i64,
    pub source: QuestionSource,
    pub allow_view_answer: bool,
}

/// Authorable fields of a question, before it has an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewQuestion {
    pub title: String,
    pub standard_sql: String,
    pub difficulty: Difficulty,
    pub score: u32,
    pub dataset_id: i64,
    pub source: QuestionSource,
    pub allow_view_answer: bool,
}

impl NewQuestion {
    pub fn from_draft(draft: &GeneratedQuestionDraft, dataset_id: i64) -> Self {
        Self {
            title: draft.title.clone(),
            standard_sql: draft.standard_sql.clone(),
            difficulty: draft.difficulty,
            score: draft.score,
            dataset_id,
            source: QuestionSource::Generated,
            allow_view_answer: false,
        }
    }
}

/// A synthesized, validated, not-yet-persisted question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedQuestionDraft {
    pub dataset_key: String,
    pub title: String,
    pub standard_sql: String,
    pub difficulty: Difficulty,
    pub score: u32,
}

/// A single scalar cell. Ordering follows SQLite's native collation:
/// NULL < numeric < text < blob, with integers and reals compared by value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    fn class_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Integer(_) | Value::Real(_) => 1,
            Value::Text(_) => 2,
            Value::Blob(_) => 3,
        }
    }

    /// Text rendering used in previews.
    pub fn render(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Real(r) => format!("{r:?}"),
            Value::Text(s) => s.clone(),
            Value::Blob(b) => hex::encode(b),
        }
    }
}

fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or_else(|| a.total_cmp(&b))
}

// 2^63; every f64 at or above it exceeds i64::MAX.
const TWO_POW_63: f64 = 9_223_372_036_854_775_808.0;

/// Exact integer/real comparison. Casting the integer to f64 would round
/// above 2^53 and break transitivity.
fn cmp_int_real(i: i64, r: f64) -> Ordering {
    if r.is_nan() {
        // Same placement as `f64::total_cmp` in `cmp_f64`.
        return if r.is_sign_negative() {
            Ordering::Greater
        } else {
            Ordering::Less
        };
    }
    if r < -TWO_POW_63 {
        return Ordering::Greater;
    }
    if r >= TWO_POW_63 {
        return Ordering::Less;
    }
    let whole = r.trunc();
    match i.cmp(&(whole as i64)) {
        Ordering::Equal => cmp_f64(0.0, r - whole),
        ord => ord,
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Real(a), Value::Real(b)) => cmp_f64(*a, *b),
            (Value::Integer(a), Value::Real(b)) => cmp_int_real(*a, *b),
            (Value::Real(a), Value::Integer(b)) => cmp_int_real(*b, *a).reverse(),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Blob(a), Value::Blob(b)) => a.cmp(b),
            _ => self.class_rank().cmp(&other.class_rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl From<ValueRef<'_>> for Value {
    fn from(v: ValueRef<'_>) -> Self {
        match v {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(r) => Value::Real(r),
            ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => Value::Blob(b.to_vec()),
        }
    }
}

/// Fully materialized query result, rows in the order the store returned them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

/// Truncated, display-safe rendering of a result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preview {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub total_rows: usize,
}

impl Preview {
    pub fn from_result_set(rs: &ResultSet, limit: usize) -> Self {
        Self {
            columns: rs.columns.clone(),
            rows: rs
                .rows
                .iter()
                .take(limit)
                .map(|row| row.iter().map(Value::render).collect())
                .collect(),
            total_rows: rs.rows.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerdictStatus {
    Pass,
    Fail,
    Error,
}

impl VerdictStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerdictStatus::Pass => "Pass",
            VerdictStatus::Fail => "Fail",
            VerdictStatus::Error => "Error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Pass" => Some(VerdictStatus::Pass),
            "Fail" => Some(VerdictStatus::Fail),
            "Error" => Some(VerdictStatus::Error),
            _ => None,
        }
    }
}

/// Classified outcome of comparing a learner's result to the reference result.
///
/// `Pass` and `Fail` always carry a preview of the learner's result; `Error`
/// never does, because no comparison was attempted.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Pass {
        message: String,
        preview: Preview,
        elapsed: Duration,
    },
    Fail {
        message: String,
        preview: Preview,
        elapsed: Duration,
    },
    Error {
        message: String,
        elapsed: Duration,
    },
}

impl Verdict {
    pub fn error(message: impl Into<String>, elapsed: Duration) -> Self {
        Verdict::Error {
            message: message.into(),
            elapsed,
        }
    }

    pub fn status(&self) -> VerdictStatus {
        match self {
            Verdict::Pass { .. } => VerdictStatus::Pass,
            Verdict::Fail { .. } => VerdictStatus::Fail,
            Verdict::Error { .. } => VerdictStatus::Error,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Verdict::Pass { message, .. }
            | Verdict::Fail { message, .. }
            | Verdict::Error { message, .. } => message,
        }
    }

    pub fn preview(&self) -> Option<&Preview> {
        match self {
            Verdict::Pass { preview, .. } | Verdict::Fail { preview, .. } => Some(preview),
            Verdict::Error { .. } => None,
        }
    }

    pub fn elapsed(&self) -> Duration {
        match self {
            Verdict::Pass { elapsed, .. }
            | Verdict::Fail { elapsed, .. }
            | Verdict::Error { elapsed, .. } => *elapsed,
        }
    }
}

/// What the request layer sends back for a judge call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionOutcome {
    pub result: VerdictStatus,
    pub message: String,
    pub score: u32,
    pub execution_time_seconds: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<Preview>,
}

/// One row of the append-only submission log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub user_id: i64,
    pub question_id: i64,
    pub dataset_id: i64,
    pub user_sql: String,
    pub result: VerdictStatus,
    pub score: u32,
    pub exec_time_secs: f64,
    pub error_log: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallPurpose {
    Generate,
    Explain,
    Assistant,
}

impl CallPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallPurpose::Generate => "generate",
            CallPurpose::Explain => "explain",
            CallPurpose::Assistant => "assistant",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "explain" => CallPurpose::Explain,
            "assistant" => CallPurpose::Assistant,
            _ => CallPurpose::Generate,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    Success,
    Error,
}

impl CallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallStatus::Success => "success",
            CallStatus::Error => "error",
        }
    }
}

/// Telemetry for one completion-service invocation. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmCallRecord {
    pub dataset_key: Option<String>,
    pub dataset_id: Option<i64>,
    pub purpose: CallPurpose,
    pub difficulty: Option<Difficulty>,
    pub status: CallStatus,
    pub error_message: Option<String>,
    pub latency_ms: f64,
    pub prompt_sha256: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub text: String,
    pub provider: String,
    pub model: String,
}
