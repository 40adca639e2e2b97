use super::{exit_codes, print_json, report};
use crate::cli::args::JudgeArgs;
use sqljudge_core::model::VerdictStatus;
use sqljudge_core::request::{JudgeRequest, RawJudgeRequest};
use sqljudge_core::service::outcome_for;
use sqljudge_core::{CoreError, ExerciseService};

/// Exit 0 on Pass, 1 on Fail or Error.
pub async fn cmd_judge(service: &ExerciseService, args: JudgeArgs) -> anyhow::Result<i32> {
    let outcome = match (&args.question, &args.dataset, &args.standard) {
        (Some(question_id), _, _) => {
            let raw = RawJudgeRequest {
                question_id: Some(serde_json::Value::String(question_id.clone())),
                user_sql: Some(args.user_sql.clone()),
                user_id: args.user_id,
            };
            let req = match JudgeRequest::try_from(raw) {
                Ok(req) => req,
                Err(e) => return Ok(report(e)),
            };
            service.submit(req).await
        }
        (None, Some(dataset), Some(standard)) => service
            .judge_sql(dataset, standard, &args.user_sql)
            .await
            .map(|verdict| outcome_for(&verdict, 0)),
        _ => Err(CoreError::InvalidRequest(
            "pass --question, or --dataset together with --standard".into(),
        )),
    };

    match outcome {
        Ok(outcome) => {
            print_json(&outcome)?;
            Ok(match outcome.result {
                VerdictStatus::Pass => exit_codes::OK,
                VerdictStatus::Fail | VerdictStatus::Error => exit_codes::NOT_PASSED,
            })
        }
        Err(e) => Ok(report(e)),
    }
}
