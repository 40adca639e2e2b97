mod common;

use sqljudge_core::dataset::{DatasetRegistry, SchemaIntrospector, SchemaResolution};
use sqljudge_core::model::Dataset;
use sqljudge_core::CoreError;
use std::sync::Arc;
use tempfile::tempdir;

fn introspector(dir: &std::path::Path) -> SchemaIntrospector {
    SchemaIntrospector::new(Arc::new(DatasetRegistry::new(dir, 2, 8)))
}

fn dataset(schema_desc: Option<&str>) -> Dataset {
    Dataset {
        id: 1,
        key: "student_scores".into(),
        db_name: "ds_scores".into(),
        schema_desc: schema_desc.map(String::from),
        active: true,
    }
}

#[tokio::test]
async fn test_describe_schema_renders_tables_in_order() -> anyhow::Result<()> {
    let dir = tempdir()?;
    common::seed_scores_dataset(dir.path(), "ds_scores")?;

    let text = introspector(dir.path()).describe_schema("ds_scores").await?;

    let expected = "Table scores:\n  - student_id (INTEGER)\n  - course (TEXT)\n  - score (REAL)\n\
                    Table students:\n  - id (INTEGER)\n  - name (TEXT)\n  - class (TEXT)";
    assert_eq!(text, expected);
    Ok(())
}

#[tokio::test]
async fn test_cached_description_wins() -> anyhow::Result<()> {
    let dir = tempdir()?;
    // No dataset file: the cached text must be used without touching the store.
    let resolved = introspector(dir.path())
        .resolve_schema_text(&dataset(Some("Table students: id, name")))
        .await?;
    assert_eq!(
        resolved,
        SchemaResolution::Cached("Table students: id, name".into())
    );
    Ok(())
}

#[tokio::test]
async fn test_blank_description_falls_back_to_introspection() -> anyhow::Result<()> {
    let dir = tempdir()?;
    common::seed_scores_dataset(dir.path(), "ds_scores")?;

    let resolved = introspector(dir.path())
        .resolve_schema_text(&dataset(Some("   ")))
        .await?;
    assert!(matches!(resolved, SchemaResolution::Introspected(_)));
    assert!(resolved.text().starts_with("Table scores:"));
    Ok(())
}

#[tokio::test]
async fn test_preview_lists_first_rows_per_table() -> anyhow::Result<()> {
    let dir = tempdir()?;
    common::seed_scores_dataset(dir.path(), "ds_scores")?;

    let previews = introspector(dir.path()).preview_tables("ds_scores").await?;

    let names: Vec<_> = previews.iter().map(|p| p.table.as_str()).collect();
    assert_eq!(names, vec!["scores", "students"]);
    assert_eq!(previews[0].rows.len(), 5, "scores has 7 rows, preview keeps 5");
    assert_eq!(previews[1].columns, vec!["id", "name", "class"]);
    assert!(previews[1].rows.iter().any(|r| r[2] == "NULL"));
    Ok(())
}

#[tokio::test]
async fn test_missing_dataset_is_unavailable() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let err = introspector(dir.path())
        .describe_schema("ds_missing")
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::DatasetUnavailable { .. }));
    Ok(())
}
