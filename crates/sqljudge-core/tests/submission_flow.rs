mod common;

use sqljudge_core::dataset::DatasetRegistry;
use sqljudge_core::judge::JudgeOptions;
use sqljudge_core::model::{
    CallPurpose, CallStatus, Difficulty, NewQuestion, QuestionSource, VerdictStatus,
};
use sqljudge_core::providers::llm::{FakeClient, LlmClient};
use sqljudge_core::request::{ExplainRequest, GenerationRequest, JudgeRequest};
use sqljudge_core::storage::Store;
use sqljudge_core::synthesis::QuestionHints;
use sqljudge_core::{CoreError, ExerciseService};
use std::sync::Arc;
use tempfile::TempDir;

struct Fixture {
    _dir: TempDir,
    service: ExerciseService,
    client: Arc<FakeClient>,
    question_id: i64,
    hidden_question_id: i64,
}

fn fixture(client: FakeClient) -> anyhow::Result<Fixture> {
    let dir = tempfile::tempdir()?;
    common::seed_scores_dataset(dir.path(), "ds_scores")?;

    let store = Store::memory()?;
    store.init_schema()?;
    let dataset_id = store.insert_dataset("student_scores", "ds_scores", None)?;
    let question_id = store.insert_question(&NewQuestion {
        title: "Names of students in class A".into(),
        standard_sql: "SELECT name FROM students WHERE class = 'A'".into(),
        difficulty: Difficulty::Easy,
        score: 10,
        dataset_id,
        source: QuestionSource::Catalog,
        allow_view_answer: true,
    })?;
    let hidden_question_id = store.insert_question(&NewQuestion {
        title: "Average math score".into(),
        standard_sql: "SELECT AVG(score) FROM scores WHERE course = 'math'".into(),
        difficulty: Difficulty::Medium,
        score: 20,
        dataset_id,
        source: QuestionSource::Catalog,
        allow_view_answer: false,
    })?;

    let client = Arc::new(client);
    let llm: Arc<dyn LlmClient> = client.clone();
    let registry = Arc::new(DatasetRegistry::new(dir.path(), 2, 8));
    let service = ExerciseService::new(store, registry, JudgeOptions::default(), llm);

    Ok(Fixture {
        _dir: dir,
        service,
        client,
        question_id,
        hidden_question_id,
    })
}

fn submission(question_id: i64, sql: &str, user_id: Option<i64>) -> JudgeRequest {
    JudgeRequest {
        question_id,
        user_sql: sql.into(),
        user_id,
    }
}

#[tokio::test]
async fn test_pass_credits_question_score_and_records() -> anyhow::Result<()> {
    let fx = fixture(FakeClient::new())?;

    let outcome = fx
        .service
        .submit(submission(
            fx.question_id,
            "SELECT s.name FROM students s WHERE s.class IN ('A')",
            Some(5),
        ))
        .await?;

    assert_eq!(outcome.result, VerdictStatus::Pass);
    assert_eq!(outcome.score, 10);
    assert!(outcome.preview.is_some());

    let records = fx.service.store().submissions_for(5)?;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].result, VerdictStatus::Pass);
    assert_eq!(records[0].score, 10);
    assert_eq!(records[0].error_log, None);
    Ok(())
}

#[tokio::test]
async fn test_error_scores_zero_and_keeps_error_log() -> anyhow::Result<()> {
    let fx = fixture(FakeClient::new())?;

    let outcome = fx
        .service
        .submit(submission(fx.question_id, "SELECT nam FROM students", None))
        .await?;

    assert_eq!(outcome.result, VerdictStatus::Error);
    assert_eq!(outcome.score, 0);
    assert!(outcome.preview.is_none());

    let json = serde_json::to_value(&outcome)?;
    assert!(json.get("preview").is_none());
    assert_eq!(json["result"], "Error");

    let records = fx.service.store().submissions_for(0)?;
    assert_eq!(records.len(), 1, "anonymous submissions are user 0");
    assert!(records[0]
        .error_log
        .as_deref()
        .unwrap_or_default()
        .contains("nam"));
    Ok(())
}

#[tokio::test]
async fn test_unknown_question_is_not_found() -> anyhow::Result<()> {
    let fx = fixture(FakeClient::new())?;
    let err = fx
        .service
        .submit(submission(999, "SELECT 1", None))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NotFound(_)));
    Ok(())
}

#[tokio::test]
async fn test_inactive_dataset_is_unavailable() -> anyhow::Result<()> {
    let fx = fixture(FakeClient::new())?;
    fx.service
        .store()
        .set_dataset_active("student_scores", false)?;

    let err = fx
        .service
        .submit(submission(fx.question_id, "SELECT 1", None))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::DatasetUnavailable { .. }));
    Ok(())
}

#[tokio::test]
async fn test_answer_reveal_needs_permission_and_an_attempt() -> anyhow::Result<()> {
    let fx = fixture(FakeClient::new())?;

    let err = fx.service.reveal_answer(fx.question_id, Some(9)).unwrap_err();
    assert!(matches!(err, CoreError::Forbidden(_)));

    fx.service
        .submit(submission(fx.question_id, "SELECT 'wrong'", Some(9)))
        .await?;
    let sql = fx.service.reveal_answer(fx.question_id, Some(9))?;
    assert_eq!(sql, "SELECT name FROM students WHERE class = 'A'");

    fx.service
        .submit(submission(fx.hidden_question_id, "SELECT 1", Some(9)))
        .await?;
    let err = fx
        .service
        .reveal_answer(fx.hidden_question_id, Some(9))
        .unwrap_err();
    assert!(matches!(err, CoreError::Forbidden(_)));

    let err = fx.service.reveal_answer(12345, Some(9)).unwrap_err();
    assert!(matches!(err, CoreError::NotFound(_)));
    Ok(())
}

#[tokio::test]
async fn test_generate_and_persist_draft() -> anyhow::Result<()> {
    let reply = r#"{"title":"Students per class","standard_sql":"SELECT class, COUNT(*) FROM students GROUP BY class","difficulty":"Medium","score":"20"}"#;
    let fx = fixture(FakeClient::new().with_reply(reply))?;

    let outcome = fx
        .service
        .generate(GenerationRequest {
            dataset_key: "student_scores".into(),
            difficulty: None,
            hints: QuestionHints::default(),
            persist: true,
        })
        .await?;

    assert_eq!(outcome.draft.score, 20);
    let id = outcome.question_id.expect("persisted");
    let q = fx.service.store().question(id)?.expect("stored");
    assert_eq!(q.source, QuestionSource::Generated);
    assert_eq!(q.title, "Students per class");
    assert!(!q.allow_view_answer);

    // Introspected schema was used since the dataset has no cached description.
    let prompt = &fx.client.calls()[0][1].content;
    assert!(prompt.contains("Table students:"));

    let calls = fx.service.store().llm_calls(10)?;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].purpose, CallPurpose::Generate);
    assert_eq!(calls[0].status, CallStatus::Success);
    assert_eq!(calls[0].dataset_key.as_deref(), Some("student_scores"));
    Ok(())
}

#[tokio::test]
async fn test_generate_for_unknown_dataset_is_not_found() -> anyhow::Result<()> {
    let fx = fixture(FakeClient::new())?;
    let err = fx
        .service
        .generate(GenerationRequest {
            dataset_key: "nope".into(),
            difficulty: None,
            hints: QuestionHints::default(),
            persist: false,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NotFound(_)));
    assert_eq!(fx.client.call_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_explain_uses_question_context() -> anyhow::Result<()> {
    let fx = fixture(FakeClient::new().with_reply("Looks right."))?;

    let text = fx
        .service
        .explain(ExplainRequest {
            question_id: fx.question_id,
            user_sql: "SELECT name FROM students".into(),
            result: "Fail".into(),
            judge_message: None,
        })
        .await?;

    assert_eq!(text, "Looks right.");
    let prompt = &fx.client.calls()[0][1].content;
    assert!(prompt.contains("Names of students in class A"));
    assert!(prompt.contains("Table students:"));
    Ok(())
}

#[tokio::test]
async fn test_draw_question_filters_by_difficulty() -> anyhow::Result<()> {
    let fx = fixture(FakeClient::new())?;

    let q = fx
        .service
        .draw_question("student_scores", Some(Difficulty::Medium))?;
    assert_eq!(q.id, fx.hidden_question_id);

    let err = fx
        .service
        .draw_question("student_scores", Some(Difficulty::Hard))
        .unwrap_err();
    assert!(matches!(err, CoreError::NotFound(_)));
    Ok(())
}

#[tokio::test]
async fn test_assistant_gets_platform_stats() -> anyhow::Result<()> {
    let fx = fixture(FakeClient::new().with_reply("You have 2 questions."))?;

    let reply = fx.service.assistant("How many questions are there?").await?;

    assert_eq!(reply, "You have 2 questions.");
    let prompt = &fx.client.calls()[0][1].content;
    assert!(prompt.contains("- questions: 2"));
    let calls = fx.service.store().llm_calls(10)?;
    assert_eq!(calls[0].purpose, CallPurpose::Assistant);
    assert_eq!(calls[0].dataset_key, None);
    Ok(())
}
