use crate::model::{
    CallPurpose, CallStatus, Dataset, Difficulty, LlmCallRecord, NewQuestion, Question,
    QuestionSource, SubmissionRecord, VerdictStatus,
};
use anyhow::Context;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// The read-write system of record. Never handed learner SQL.
#[derive(Clone)]
pub struct Store {
    pub(crate) conn: Arc<Mutex<Connection>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SystemStats {
    pub questions: i64,
    pub users: i64,
    pub submissions: i64,
    pub llm_calls: i64,
}

const QUESTION_COLUMNS: &str =
    "id, title, standard_sql, difficulty, score, dataset_id, source, allow_view_answer";

impl Store {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
        }
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open store {}", path.display()))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn init_schema(&self) -> anyhow::Result<()> {
        let conn = self.lock();
        conn.execute_batch(crate::storage::schema::DDL)?;
        Ok(())
    }

    // datasets
    pub fn insert_dataset(
        &self,
        key: &str,
        db_name: &str,
        schema_desc: Option<&str>,
    ) -> anyhow::Result<i64> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO datasets(key, db_name, schema_desc, active) VALUES (?1, ?2, ?3, 1)
             ON CONFLICT(key) DO UPDATE SET db_name=excluded.db_name, schema_desc=excluded.schema_desc, active=1",
            params![key, db_name, schema_desc],
        )
        .with_context(|| format!("failed to upsert dataset '{key}'"))?;
        let id = conn.query_row("SELECT id FROM datasets WHERE key=?1", params![key], |r| {
            r.get(0)
        })?;
        Ok(id)
    }

    pub fn set_dataset_active(&self, key: &str, active: bool) -> anyhow::Result<bool> {
        let conn = self.lock();
        let n = conn.execute(
            "UPDATE datasets SET active=?1 WHERE key=?2",
            params![active, key],
        )?;
        Ok(n > 0)
    }

    /// Active dataset by external key.
    pub fn dataset_by_key(&self, key: &str) -> anyhow::Result<Option<Dataset>> {
        let conn = self.lock();
        conn.query_row(
            "SELECT id, key, db_name, schema_desc, active FROM datasets WHERE key=?1 AND active=1",
            params![key],
            dataset_from_row,
        )
        .optional()
        .map_err(Into::into)
    }

    /// Active dataset by id.
    pub fn dataset_by_id(&self, id: i64) -> anyhow::Result<Option<Dataset>> {
        let conn = self.lock();
        conn.query_row(
            "SELECT id, key, db_name, schema_desc, active FROM datasets WHERE id=?1 AND active=1",
            params![id],
            dataset_from_row,
        )
        .optional()
        .map_err(Into::into)
    }

    pub fn datasets(&self) -> anyhow::Result<Vec<Dataset>> {
        let conn = self.lock();
        let mut stmt =
            conn.prepare("SELECT id, key, db_name, schema_desc, active FROM datasets ORDER BY key")?;
        let rows = stmt.query_map([], dataset_from_row)?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    // questions
    pub fn insert_question(&self, q: &NewQuestion) -> anyhow::Result<i64> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO questions(title, standard_sql, difficulty, score, dataset_id, source, allow_view_answer, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                q.title,
                q.standard_sql,
                q.difficulty.as_str(),
                q.score,
                q.dataset_id,
                q.source.as_str(),
                q.allow_view_answer,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn question(&self, id: i64) -> anyhow::Result<Option<Question>> {
        let conn = self.lock();
        conn.query_row(
            &format!("SELECT {QUESTION_COLUMNS} FROM questions WHERE id=?1"),
            params![id],
            question_from_row,
        )
        .optional()
        .map_err(Into::into)
    }

    /// A random question, optionally narrowed by dataset and difficulty.
    pub fn random_question(
        &self,
        dataset_id: Option<i64>,
        difficulty: Option<Difficulty>,
    ) -> anyhow::Result<Option<Question>> {
        let conn = self.lock();
        conn.query_row(
            &format!(
                "SELECT {QUESTION_COLUMNS} FROM questions
                 WHERE (?1 IS NULL OR dataset_id=?1) AND (?2 IS NULL OR difficulty=?2)
                 ORDER BY RANDOM() LIMIT 1"
            ),
            params![dataset_id, difficulty.map(|d| d.as_str())],
            question_from_row,
        )
        .optional()
        .map_err(Into::into)
    }

    // submissions
    pub fn insert_submission(&self, rec: &SubmissionRecord) -> anyhow::Result<i64> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO submissions(user_id, question_id, dataset_id, user_sql, result, score, exec_time_secs, error_log, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                rec.user_id,
                rec.question_id,
                rec.dataset_id,
                rec.user_sql,
                rec.result.as_str(),
                rec.score,
                rec.exec_time_secs,
                rec.error_log,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn count_submissions(&self, user_id: i64, question_id: i64) -> anyhow::Result<i64> {
        let conn = self.lock();
        let n = conn.query_row(
            "SELECT COUNT(*) FROM submissions WHERE user_id=?1 AND question_id=?2",
            params![user_id, question_id],
            |r| r.get(0),
        )?;
        Ok(n)
    }

    pub fn submissions_for(&self, user_id: i64) -> anyhow::Result<Vec<SubmissionRecord>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT user_id, question_id, dataset_id, user_sql, result, score, exec_time_secs, error_log
             FROM submissions WHERE user_id=?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![user_id], |r| {
            let result: String = r.get(4)?;
            Ok(SubmissionRecord {
                user_id: r.get(0)?,
                question_id: r.get(1)?,
                dataset_id: r.get(2)?,
                user_sql: r.get(3)?,
                result: VerdictStatus::parse(&result).unwrap_or(VerdictStatus::Error),
                score: r.get(5)?,
                exec_time_secs: r.get(6)?,
                error_log: r.get(7)?,
            })
        })?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    pub fn system_stats(&self) -> anyhow::Result<SystemStats> {
        let conn = self.lock();
        let count = |sql: &str| -> rusqlite::Result<i64> { conn.query_row(sql, [], |r| r.get(0)) };
        Ok(SystemStats {
            questions: count("SELECT COUNT(*) FROM questions")?,
            users: count("SELECT COUNT(DISTINCT user_id) FROM submissions")?,
            submissions: count("SELECT COUNT(*) FROM submissions")?,
            llm_calls: count("SELECT COUNT(*) FROM llm_calls")?,
        })
    }

    // llm call log
    pub fn insert_llm_call(&self, rec: &LlmCallRecord) -> anyhow::Result<()> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO llm_calls(dataset_key, dataset_id, purpose, difficulty, status, error_message, latency_ms, prompt_sha256, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                rec.dataset_key,
                rec.dataset_id,
                rec.purpose.as_str(),
                rec.difficulty.map(|d| d.as_str()),
                rec.status.as_str(),
                rec.error_message,
                rec.latency_ms,
                rec.prompt_sha256,
                rec.created_at.to_rfc3339()
            ],
        )?;
        Ok(())
    }

    /// Most recent calls first.
    pub fn llm_calls(&self, limit: usize) -> anyhow::Result<Vec<LlmCallRecord>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT dataset_key, dataset_id, purpose, difficulty, status, error_message, latency_ms, prompt_sha256, created_at
             FROM llm_calls ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |r| {
            let purpose: String = r.get(2)?;
            let difficulty: Option<String> = r.get(3)?;
            let status: String = r.get(4)?;
            let created_at: String = r.get(8)?;
            Ok(LlmCallRecord {
                dataset_key: r.get(0)?,
                dataset_id: r.get(1)?,
                purpose: CallPurpose::parse(&purpose),
                difficulty: difficulty.as_deref().and_then(Difficulty::parse),
                status: if status == "success" {
                    CallStatus::Success
                } else {
                    CallStatus::Error
                },
                error_message: r.get(5)?,
                latency_ms: r.get(6)?,
                prompt_sha256: r.get(7)?,
                created_at: DateTime::parse_from_rfc3339(&created_at)
                    .map(|t| t.with_timezone(&Utc))
                    .unwrap_or_default(),
            })
        })?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }
}

fn dataset_from_row(r: &Row<'_>) -> rusqlite::Result<Dataset> {
    Ok(Dataset {
        id: r.get(0)?,
        key: r.get(1)?,
        db_name: r.get(2)?,
        schema_desc: r.get(3)?,
        active: r.get(4)?,
    })
}

fn question_from_row(r: &Row<'_>) -> rusqlite::Result<Question> {
    let difficulty: String = r.get(3)?;
    let source: String = r.get(6)?;
    Ok(Question {
        id: r.get(0)?,
        title: r.get(1)?,
        standard_sql: r.get(2)?,
        difficulty: Difficulty::parse(&difficulty).unwrap_or(Difficulty::Medium),
        score: r.get(4)?,
        dataset_id: r.get(5)?,
        source: QuestionSource::parse(&source),
        allow_view_answer: r.get(7)?,
    })
}
