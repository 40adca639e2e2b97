use super::{exit_codes, print_json, report};
use crate::cli::args::{AnswerArgs, DrawArgs, QuestionAddArgs};
use serde_json::json;
use sqljudge_core::model::{Difficulty, NewQuestion, QuestionSource};
use sqljudge_core::{CoreError, ExerciseService};

pub fn cmd_question_add(service: &ExerciseService, args: QuestionAddArgs) -> anyhow::Result<i32> {
    let Some(difficulty) = Difficulty::parse(&args.difficulty) else {
        return Ok(report(CoreError::InvalidRequest(format!(
            "difficulty must be Easy, Medium or Hard, got '{}'",
            args.difficulty
        ))));
    };
    if args.score == 0 {
        return Ok(report(CoreError::InvalidRequest("score must be positive".into())));
    }
    let Some(dataset) = service.store().dataset_by_key(&args.dataset)? else {
        return Ok(report(CoreError::NotFound(format!(
            "dataset '{}' does not exist",
            args.dataset
        ))));
    };

    let id = service.store().insert_question(&NewQuestion {
        title: args.title,
        standard_sql: args.sql,
        difficulty,
        score: args.score,
        dataset_id: dataset.id,
        source: QuestionSource::Catalog,
        allow_view_answer: args.allow_view_answer,
    })?;
    print_json(&json!({ "id": id, "dataset": dataset.key }))?;
    Ok(exit_codes::OK)
}

pub fn cmd_answer(service: &ExerciseService, args: AnswerArgs) -> anyhow::Result<i32> {
    match service.reveal_answer(args.question, args.user_id) {
        Ok(sql) => {
            println!("{sql}");
            Ok(exit_codes::OK)
        }
        Err(e) => Ok(report(e)),
    }
}

pub fn cmd_draw(service: &ExerciseService, args: DrawArgs) -> anyhow::Result<i32> {
    let difficulty = match args.difficulty.as_deref().map(Difficulty::parse) {
        None => None,
        Some(Some(d)) => Some(d),
        Some(None) => {
            return Ok(report(CoreError::InvalidRequest(
                "difficulty must be Easy, Medium or Hard".into(),
            )))
        }
    };
    match service.draw_question(&args.dataset, difficulty) {
        Ok(question) => {
            // The reference SQL stays hidden; use `answer` for that.
            print_json(&json!({
                "id": question.id,
                "title": question.title,
                "difficulty": question.difficulty,
                "score": question.score,
            }))?;
            Ok(exit_codes::OK)
        }
        Err(e) => Ok(report(e)),
    }
}
