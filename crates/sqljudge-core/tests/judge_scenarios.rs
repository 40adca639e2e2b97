mod common;

use sqljudge_core::dataset::DatasetRegistry;
use sqljudge_core::judge::{JudgeEngine, JudgeOptions};
use sqljudge_core::model::VerdictStatus;
use sqljudge_core::CoreError;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

fn engine(dir: &std::path::Path, timeout: Duration) -> JudgeEngine {
    let registry = Arc::new(DatasetRegistry::new(dir, 2, 8));
    JudgeEngine::new(
        registry,
        JudgeOptions {
            query_timeout: timeout,
            compare_column_names: false,
        },
    )
}

#[tokio::test]
async fn test_reordered_rows_pass() -> anyhow::Result<()> {
    let dir = tempdir()?;
    common::seed_ids_dataset(dir.path(), "ds_ids", &[3, 1, 2])?;
    let judge = engine(dir.path(), Duration::from_secs(5));

    let verdict = judge
        .judge(
            "SELECT id FROM t ORDER BY id DESC",
            "SELECT id FROM t ORDER BY id",
            "ds_ids",
        )
        .await?;

    assert_eq!(verdict.status(), VerdictStatus::Pass);
    let preview = verdict.preview().expect("pass carries a preview");
    let first: Vec<_> = preview.rows.iter().map(|r| r[0].as_str()).collect();
    assert_eq!(first, vec!["3", "2", "1"], "preview keeps learner order");
    Ok(())
}

#[tokio::test]
async fn test_different_value_fails_with_preview() -> anyhow::Result<()> {
    let dir = tempdir()?;
    common::seed_ids_dataset(dir.path(), "ds_ids", &[])?;
    let judge = engine(dir.path(), Duration::from_secs(5));

    let verdict = judge.judge("SELECT 2", "SELECT 1", "ds_ids").await?;

    assert_eq!(verdict.status(), VerdictStatus::Fail);
    let preview = verdict.preview().unwrap();
    assert_eq!(preview.columns, vec!["2".to_string()]);
    assert_eq!(preview.rows, vec![vec!["2".to_string()]]);
    assert_eq!(preview.total_rows, 1);
    Ok(())
}

#[tokio::test]
async fn test_syntax_error_surfaces_driver_message() -> anyhow::Result<()> {
    let dir = tempdir()?;
    common::seed_ids_dataset(dir.path(), "ds_ids", &[1])?;
    let judge = engine(dir.path(), Duration::from_secs(5));

    let verdict = judge.judge("SELEKT 1", "SELECT 1", "ds_ids").await?;

    assert_eq!(verdict.status(), VerdictStatus::Error);
    assert!(
        verdict.message().contains("syntax error"),
        "got: {}",
        verdict.message()
    );
    assert!(verdict.preview().is_none());
    Ok(())
}

#[tokio::test]
async fn test_broken_reference_query_is_error() -> anyhow::Result<()> {
    let dir = tempdir()?;
    common::seed_ids_dataset(dir.path(), "ds_ids", &[1])?;
    let judge = engine(dir.path(), Duration::from_secs(5));

    let verdict = judge
        .judge("SELECT id FROM t", "SELECT id FROM missing_table", "ds_ids")
        .await?;

    assert_eq!(verdict.status(), VerdictStatus::Error);
    assert!(verdict.message().contains("missing_table"));
    Ok(())
}

#[tokio::test]
async fn test_writes_are_rejected_by_the_store() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let path = common::seed_ids_dataset(dir.path(), "ds_ids", &[1, 2])?;
    let judge = engine(dir.path(), Duration::from_secs(5));

    for write in [
        "DELETE FROM t",
        "INSERT INTO t (id) VALUES (99)",
        "DROP TABLE t",
    ] {
        let verdict = judge.judge(write, "SELECT id FROM t", "ds_ids").await?;
        assert_eq!(verdict.status(), VerdictStatus::Error, "{write} must not succeed");
    }
    assert_eq!(common::row_count(&path, "t")?, 2);
    Ok(())
}

#[tokio::test]
async fn test_attach_cannot_reach_other_databases() -> anyhow::Result<()> {
    let dir = tempdir()?;
    common::seed_ids_dataset(dir.path(), "ds_ids", &[1])?;
    let secret = dir.path().join("system.db");
    rusqlite::Connection::open(&secret)?.execute_batch(
        "CREATE TABLE questions (standard_sql TEXT);
         INSERT INTO questions VALUES ('hidden reference');",
    )?;

    // One connection, so the second call reuses whatever the first left behind.
    let registry = Arc::new(DatasetRegistry::new(dir.path(), 1, 8));
    let judge = JudgeEngine::new(registry, JudgeOptions::default());

    let attach = format!("ATTACH '{}' AS s", secret.display());
    let verdict = judge.judge(&attach, "SELECT 1", "ds_ids").await?;
    assert_eq!(verdict.status(), VerdictStatus::Error);

    let verdict = judge
        .judge("SELECT standard_sql FROM s.questions", "SELECT 1", "ds_ids")
        .await?;
    assert_eq!(verdict.status(), VerdictStatus::Error);
    assert!(verdict.preview().is_none());
    assert!(!verdict.message().contains("hidden reference"));
    Ok(())
}

#[tokio::test]
async fn test_nulls_and_mixed_numbers_compare_by_value() -> anyhow::Result<()> {
    let dir = tempdir()?;
    common::seed_scores_dataset(dir.path(), "ds_scores")?;
    let judge = engine(dir.path(), Duration::from_secs(5));

    let verdict = judge
        .judge(
            "SELECT class, name FROM students ORDER BY name DESC",
            "SELECT class, name FROM students",
            "ds_scores",
        )
        .await?;
    assert_eq!(verdict.status(), VerdictStatus::Pass);

    // Reals on one side, integer literals on the other.
    let verdict = judge
        .judge(
            "SELECT 64 UNION ALL SELECT 70",
            "SELECT CAST(score AS REAL) FROM scores WHERE student_id = 2",
            "ds_scores",
        )
        .await?;
    assert_eq!(verdict.status(), VerdictStatus::Pass);
    Ok(())
}

#[tokio::test]
async fn test_extra_column_fails() -> anyhow::Result<()> {
    let dir = tempdir()?;
    common::seed_scores_dataset(dir.path(), "ds_scores")?;
    let judge = engine(dir.path(), Duration::from_secs(5));

    let verdict = judge
        .judge("SELECT id, name FROM students", "SELECT id FROM students", "ds_scores")
        .await?;
    assert_eq!(verdict.status(), VerdictStatus::Fail);
    Ok(())
}

#[tokio::test]
async fn test_runaway_query_times_out() -> anyhow::Result<()> {
    let dir = tempdir()?;
    common::seed_ids_dataset(dir.path(), "ds_ids", &[1])?;
    let judge = engine(dir.path(), Duration::from_secs(1));

    let verdict = judge
        .judge(
            "WITH RECURSIVE c(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM c) SELECT count(*) FROM c",
            "SELECT 1",
            "ds_ids",
        )
        .await?;

    assert_eq!(verdict.status(), VerdictStatus::Error);
    assert!(verdict.message().contains("timed out"), "got: {}", verdict.message());

    // The interrupted connection goes back to the pool and is still usable.
    let verdict = judge.judge("SELECT 1", "SELECT 1", "ds_ids").await?;
    assert_eq!(verdict.status(), VerdictStatus::Pass);
    Ok(())
}

#[tokio::test]
async fn test_timed_out_connection_is_safe_for_the_next_checkout() -> anyhow::Result<()> {
    let dir = tempdir()?;
    common::seed_ids_dataset(dir.path(), "ds_ids", &[1, 2, 3])?;
    // A single pooled connection: every call after the timeout reuses it.
    let registry = Arc::new(DatasetRegistry::new(dir.path(), 1, 8));
    let judge = JudgeEngine::new(
        registry.clone(),
        JudgeOptions {
            query_timeout: Duration::from_secs(1),
            compare_column_names: false,
        },
    );

    let verdict = judge
        .judge(
            "WITH RECURSIVE c(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM c) SELECT count(*) FROM c",
            "SELECT 1",
            "ds_ids",
        )
        .await?;
    assert_eq!(verdict.status(), VerdictStatus::Error);

    for _ in 0..5 {
        let verdict = judge
            .judge("SELECT id FROM t", "SELECT id FROM t ORDER BY id DESC", "ds_ids")
            .await?;
        assert_eq!(verdict.status(), VerdictStatus::Pass, "{}", verdict.message());
    }
    assert_eq!(registry.pools_created(), 1);
    Ok(())
}

#[tokio::test]
async fn test_unknown_dataset_is_unavailable() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let judge = engine(dir.path(), Duration::from_secs(5));

    let err = judge.judge("SELECT 1", "SELECT 1", "nope").await.unwrap_err();
    assert!(matches!(err, CoreError::DatasetUnavailable { .. }));
    Ok(())
}
