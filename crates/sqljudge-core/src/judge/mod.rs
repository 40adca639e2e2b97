//! Result-set judge.
//!
//! A judge call walks `Init → ExecutingStandard → ExecutingUser → Comparing`
//! and ends in `Pass`, `Fail` or `Error`. The reference query always runs
//! first; if it faults the learner query is never executed.

pub mod compare;

use crate::config::JudgeSettings;
use crate::dataset::DatasetRegistry;
use crate::errors::CoreError;
use crate::model::{Preview, ResultSet, Value, Verdict};
use rusqlite::Connection;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub use compare::{normalize_rows, result_sets_match};

/// Rows of the learner's result kept in the preview.
pub const PREVIEW_ROWS: usize = 5;

pub const PASS_MESSAGE: &str = "Correct! Your result matches the expected result.";
pub const FAIL_MESSAGE: &str = "Your result differs from the expected result. Check your logic.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JudgeState {
    Init,
    ExecutingStandard,
    ExecutingUser,
    Comparing,
    Pass,
    Fail,
    Error,
}

impl JudgeState {
    fn can_advance_to(self, next: JudgeState) -> bool {
        use JudgeState::*;
        matches!(
            (self, next),
            (Init, ExecutingStandard)
                | (ExecutingStandard, ExecutingUser)
                | (ExecutingStandard, Error)
                | (ExecutingUser, Comparing)
                | (ExecutingUser, Error)
                | (Comparing, Pass)
                | (Comparing, Fail)
        )
    }
}

#[derive(Debug, Clone)]
pub struct JudgeOptions {
    pub query_timeout: Duration,
    pub compare_column_names: bool,
}

impl Default for JudgeOptions {
    fn default() -> Self {
        Self::from(&JudgeSettings::default())
    }
}

impl From<&JudgeSettings> for JudgeOptions {
    fn from(s: &JudgeSettings) -> Self {
        Self {
            query_timeout: s.query_timeout(),
            compare_column_names: s.compare_column_names,
        }
    }
}

/// Something that can run one read-only query and fully materialize it.
pub trait QueryRunner {
    fn run(&mut self, sql: &str) -> Result<ResultSet, CoreError>;
}

impl QueryRunner for Connection {
    fn run(&mut self, sql: &str) -> Result<ResultSet, CoreError> {
        execute_query(self, sql).map_err(|e| CoreError::QueryExecutionFault(e.to_string()))
    }
}

pub fn execute_query(conn: &Connection, sql: &str) -> rusqlite::Result<ResultSet> {
    let mut stmt = conn.prepare(sql)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let width = columns.len();

    let mut rows = stmt.query([])?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut values = Vec::with_capacity(width);
        for i in 0..width {
            values.push(Value::from(row.get_ref(i)?));
        }
        out.push(values);
    }
    Ok(ResultSet { columns, rows: out })
}

/// One judge call's progress through the state machine.
#[derive(Debug)]
pub struct JudgeRun {
    state: JudgeState,
    started: Instant,
}

impl Default for JudgeRun {
    fn default() -> Self {
        Self::new()
    }
}

impl JudgeRun {
    pub fn new() -> Self {
        Self {
            state: JudgeState::Init,
            started: Instant::now(),
        }
    }

    pub fn state(&self) -> JudgeState {
        self.state
    }

    fn advance(&mut self, next: JudgeState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "illegal judge transition {:?} -> {:?}",
            self.state,
            next
        );
        tracing::trace!(from = ?self.state, to = ?next, "judge transition");
        self.state = next;
    }

    /// Executes both queries on `runner` and classifies the outcome.
    pub fn execute<R: QueryRunner + ?Sized>(
        &mut self,
        runner: &mut R,
        standard_sql: &str,
        user_sql: &str,
        options: &JudgeOptions,
    ) -> Verdict {
        self.advance(JudgeState::ExecutingStandard);
        let expected = match runner.run(standard_sql) {
            Ok(rs) => rs,
            Err(e) => {
                self.advance(JudgeState::Error);
                tracing::warn!(
                    event = "judge.standard_failed",
                    error = %e,
                    "reference query failed; dataset may be misconfigured"
                );
                return Verdict::error(e.to_string(), self.started.elapsed());
            }
        };

        self.advance(JudgeState::ExecutingUser);
        let actual = match runner.run(user_sql) {
            Ok(rs) => rs,
            Err(e) => {
                self.advance(JudgeState::Error);
                return Verdict::error(e.to_string(), self.started.elapsed());
            }
        };

        self.advance(JudgeState::Comparing);
        let preview = Preview::from_result_set(&actual, PREVIEW_ROWS);
        let elapsed = self.started.elapsed();

        if result_sets_match(&expected, &actual, options.compare_column_names) {
            self.advance(JudgeState::Pass);
            Verdict::Pass {
                message: PASS_MESSAGE.to_string(),
                preview,
                elapsed,
            }
        } else {
            self.advance(JudgeState::Fail);
            Verdict::Fail {
                message: FAIL_MESSAGE.to_string(),
                preview,
                elapsed,
            }
        }
    }
}

/// Runs (standard, user) query pairs against datasets from the registry.
#[derive(Clone)]
pub struct JudgeEngine {
    registry: Arc<DatasetRegistry>,
    options: JudgeOptions,
}

impl JudgeEngine {
    pub fn new(registry: Arc<DatasetRegistry>, options: JudgeOptions) -> Self {
        Self { registry, options }
    }

    /// Only an unavailable dataset is returned as `Err`; every query fault
    /// becomes `Verdict::Error`.
    pub async fn judge(
        &self,
        user_sql: &str,
        standard_sql: &str,
        db_name: &str,
    ) -> Result<Verdict, CoreError> {
        let mut conn = self.registry.get_connection(db_name).await?;
        let interrupt = conn.get_interrupt_handle();

        let started = Instant::now();
        let standard = standard_sql.to_string();
        let user = user_sql.to_string();
        let options = self.options.clone();

        // The connection travels back in the task output, so it cannot reach
        // the pool (and another checkout) before `interrupt` below has fired.
        let mut task = tokio::task::spawn_blocking(move || {
            let verdict = JudgeRun::new().execute(&mut *conn, &standard, &user, &options);
            (verdict, conn)
        });

        let verdict = match tokio::time::timeout(self.options.query_timeout, &mut task).await {
            Ok(Ok((verdict, _conn))) => verdict,
            Ok(Err(join_err)) => {
                Verdict::error(format!("query execution aborted: {join_err}"), started.elapsed())
            }
            Err(_) => {
                // Stops the statement still running on the blocking thread; its
                // partial rows are dropped with the task. A no-op if the task
                // already finished.
                interrupt.interrupt();
                drop(task);
                Verdict::error(
                    format!(
                        "query timed out after {}s",
                        self.options.query_timeout.as_secs()
                    ),
                    started.elapsed(),
                )
            }
        };

        tracing::info!(
            event = "judge.completed",
            db_name = %db_name,
            status = verdict.status().as_str(),
            elapsed_ms = verdict.elapsed().as_millis() as u64
        );
        Ok(verdict)
    }
}
