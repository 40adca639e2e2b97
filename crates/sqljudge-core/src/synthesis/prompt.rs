use crate::model::Difficulty;
use crate::providers::llm::ChatMessage;
use crate::storage::SystemStats;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A rendered system/user prompt pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    pub fn messages(&self) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(self.system.clone()),
            ChatMessage::user(self.user.clone()),
        ]
    }

    /// Hex SHA-256 over both parts, separated by a NUL byte.
    pub fn sha256(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.system.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.user.as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// Optional steering for question generation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestionHints {
    /// Free-text request from the learner.
    pub user_hint: Option<String>,
    pub business_hint: Option<String>,
    pub extra_constraints: Option<String>,
    pub require_join: bool,
    pub require_group_by: bool,
    pub require_subquery: bool,
}

impl QuestionHints {
    /// All hints as one `; `-joined line, or `None` if nothing was asked for.
    pub fn compose(&self) -> Option<String> {
        let mut parts = Vec::new();
        if let Some(h) = non_blank(&self.user_hint) {
            parts.push(h.to_string());
        }
        if let Some(h) = non_blank(&self.business_hint) {
            parts.push(format!("Business scenario or topic: {h}"));
        }
        if let Some(h) = non_blank(&self.extra_constraints) {
            parts.push(format!("Additional requirements: {h}"));
        }
        if self.require_join {
            parts.push("The question must JOIN at least two tables; avoid single-table queries.".into());
        }
        if self.require_group_by {
            parts.push("The question must use GROUP BY aggregation.".into());
        }
        if self.require_subquery {
            parts.push("Prefer a subquery or nested SELECT.".into());
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("; "))
        }
    }
}

fn non_blank(s: &Option<String>) -> Option<&str> {
    s.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

const GENERATION_SYSTEM: &str = "You are an experienced database instructor writing SQL \
exercises for students on SQLite. From the given table structure, design exactly ONE query \
exercise and its reference answer. The exercise must be clear, specific and directly \
verifiable against this database. Reply with a single JSON object containing exactly the \
fields title, standard_sql, difficulty and score, and nothing else.";

pub fn generation_prompt(
    dataset_key: &str,
    schema_text: &str,
    difficulty: Option<Difficulty>,
    hint: Option<&str>,
) -> Prompt {
    let difficulty_line = match difficulty {
        Some(d) => format!("Target difficulty: {d}."),
        None => "Choose a suitable difficulty for this schema.".to_string(),
    };
    let hint_line = match hint.map(str::trim).filter(|h| !h.is_empty()) {
        Some(h) => format!("The exercise should satisfy this request as far as possible: {h}."),
        None => "Pick a realistic scenario with teaching value for this dataset.".to_string(),
    };

    let user = format!(
        r#"Dataset: {dataset_key}

Table structure (for your understanding only):
{schema_text}

Write 1 SQL query exercise for the tables above and return STRICT JSON:
{{
  "title": "the task in plain natural language",
  "standard_sql": "one directly executable SQLite SELECT statement, no commentary",
  "difficulty": "Easy or Medium or Hard",
  "score": 10 or 20 or 30
}}

Rules:
1. Output only the JSON object, no extra text and no code fences;
2. standard_sql must be a valid, read-only SELECT query;
3. {difficulty_line}
4. {hint_line}"#
    );

    Prompt {
        system: GENERATION_SYSTEM.to_string(),
        user,
    }
}

/// Inputs to a feedback narrative for one submission.
#[derive(Debug, Clone, Default)]
pub struct ExplainContext<'a> {
    pub schema_text: &'a str,
    pub title: &'a str,
    pub standard_sql: &'a str,
    pub user_sql: &'a str,
    pub result: &'a str,
    pub judge_message: Option<&'a str>,
}

const EXPLAIN_SYSTEM: &str = "You are a patient database instructor explaining the grading \
result of a SQL exercise. Use a friendly tone and a clear structure.";

pub fn explanation_prompt(ctx: &ExplainContext<'_>) -> Prompt {
    let or = |s: &str, fallback: &'static str| -> String {
        let s = s.trim();
        if s.is_empty() {
            fallback.to_string()
        } else {
            s.to_string()
        }
    };
    let title = or(ctx.title, "(task text omitted)");
    let schema = or(ctx.schema_text, "(schema omitted; judge from the SQL alone)");
    let standard = or(ctx.standard_sql, "(no reference answer provided)");
    let result = or(ctx.result, "unknown");
    let message = or(ctx.judge_message.unwrap_or_default(), "(none)");
    let user_sql = ctx.user_sql.trim();

    let user = format!(
        r#"Task (for context, do not repeat it verbatim):
{title}

Table structure:
{schema}

Reference SQL (for comparison only; never reveal it in full, quote key fragments only when needed):
{standard}

Student SQL:
{user_sql}

Grading result: {result}
Grader message and notes (may be empty, may contain the error cause or follow-up questions):
{message}

Answer strictly in the following structure and nothing else:

1. Overall assessment
- If correct, acknowledge it first; if not, credit the attempt and then say what needs work.

2. Main problems
- List each mistake: where it is and why it is wrong (missing condition, wrong JOIN, bad GROUP BY, ...).

3. How to improve
- For each problem, explain how to fix or rethink it. Partial SQL is fine; never give the complete reference answer.

4. Concepts involved
- 2 to 5 core SQL concepts, one per line, formatted as "Concept: one-sentence explanation"."#
    );

    Prompt {
        system: EXPLAIN_SYSTEM.to_string(),
        user,
    }
}

const ASSISTANT_SYSTEM: &str = "You are the administration assistant of a SQL exercise \
platform, serving instructors and administrators. Answer concisely and professionally using \
the platform overview you are given. If a question needs data that is not in the context, say \
that you cannot query the live database and can only reason from what was provided. Never \
reveal keys or connection details.";

pub fn stats_context(stats: &SystemStats) -> String {
    format!(
        "Rough platform statistics:\n- questions: {}\n- active users: {}\n- submissions: {}\n- language model calls: {}\n",
        stats.questions, stats.users, stats.submissions, stats.llm_calls
    )
}

pub fn assistant_prompt(message: &str, context: Option<&str>) -> Prompt {
    let message = message.trim();
    let user = match context.map(str::trim).filter(|c| !c.is_empty()) {
        Some(ctx) => format!(
            "Current platform overview (for reference):\n{ctx}\n\nThe administrator asks:\n{message}\n\nAnswer concisely using the information above."
        ),
        None => format!("The administrator asks:\n{message}\n\nAnswer concisely."),
    };
    Prompt {
        system: ASSISTANT_SYSTEM.to_string(),
        user,
    }
}
