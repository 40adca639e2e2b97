use super::{exit_codes, print_json, report};
use crate::cli::args::{AskArgs, ExplainArgs, GenerateArgs};
use serde_json::Value;
use sqljudge_core::request::{
    ExplainRequest, GenerationRequest, RawExplainRequest, RawGenerationRequest,
};
use sqljudge_core::synthesis::QuestionHints;
use sqljudge_core::ExerciseService;

pub async fn cmd_generate(service: &ExerciseService, args: GenerateArgs) -> anyhow::Result<i32> {
    let raw = RawGenerationRequest {
        dataset_key: Some(args.dataset),
        difficulty: args.difficulty,
        hints: QuestionHints {
            user_hint: args.hint,
            business_hint: args.business_hint,
            extra_constraints: args.extra_constraints,
            require_join: args.require_join,
            require_group_by: args.require_group_by,
            require_subquery: args.require_subquery,
        },
        persist: args.persist,
    };
    let result = match GenerationRequest::try_from(raw) {
        Ok(req) => service.generate(req).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(outcome) => {
            print_json(&outcome)?;
            Ok(exit_codes::OK)
        }
        Err(e) => Ok(report(e)),
    }
}

pub async fn cmd_explain(service: &ExerciseService, args: ExplainArgs) -> anyhow::Result<i32> {
    let raw = RawExplainRequest {
        question_id: Some(Value::String(args.question)),
        user_sql: Some(args.user_sql),
        result: Some(args.result),
        judge_message: args.judge_message,
    };
    let result = match ExplainRequest::try_from(raw) {
        Ok(req) => service.explain(req).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(text) => {
            println!("{text}");
            Ok(exit_codes::OK)
        }
        Err(e) => Ok(report(e)),
    }
}

pub async fn cmd_ask(service: &ExerciseService, args: AskArgs) -> anyhow::Result<i32> {
    match service.assistant(&args.message).await {
        Ok(reply) => {
            println!("{reply}");
            Ok(exit_codes::OK)
        }
        Err(e) => Ok(report(e)),
    }
}
