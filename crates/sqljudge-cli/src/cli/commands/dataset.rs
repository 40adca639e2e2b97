use super::{exit_codes, print_json, report};
use crate::cli::args::{DatasetAddArgs, DatasetKeyArgs};
use serde_json::json;
use sqljudge_core::dataset::SchemaResolution;
use sqljudge_core::ExerciseService;

pub fn cmd_add(service: &ExerciseService, args: DatasetAddArgs) -> anyhow::Result<i32> {
    let path = service
        .registry()
        .datasets_dir()
        .join(format!("{}.db", args.db_name));
    if !path.is_file() {
        eprintln!("warning: {} does not exist yet", path.display());
    }

    let id = service
        .store()
        .insert_dataset(&args.key, &args.db_name, args.schema_desc.as_deref())?;
    print_json(&json!({ "id": id, "key": args.key, "db_name": args.db_name }))?;
    Ok(exit_codes::OK)
}

pub fn cmd_list(service: &ExerciseService) -> anyhow::Result<i32> {
    let datasets = service.store().datasets()?;
    print_json(&datasets)?;
    Ok(exit_codes::OK)
}

pub async fn cmd_schema(service: &ExerciseService, args: DatasetKeyArgs) -> anyhow::Result<i32> {
    match service.dataset_schema(&args.dataset).await {
        Ok(resolution) => {
            let source = match &resolution {
                SchemaResolution::Cached(_) => "cached",
                SchemaResolution::Introspected(_) => "introspected",
            };
            eprintln!("schema source: {source}");
            println!("{}", resolution.text());
            Ok(exit_codes::OK)
        }
        Err(e) => Ok(report(e)),
    }
}

pub async fn cmd_preview(service: &ExerciseService, args: DatasetKeyArgs) -> anyhow::Result<i32> {
    match service.preview_dataset(&args.dataset).await {
        Ok(tables) => {
            print_json(&tables)?;
            Ok(exit_codes::OK)
        }
        Err(e) => Ok(report(e)),
    }
}
