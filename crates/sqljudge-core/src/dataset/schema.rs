use super::registry::DatasetRegistry;
use crate::errors::CoreError;
use crate::model::{Dataset, Value};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Rows shown per table by [`SchemaIntrospector::preview_tables`].
pub const TABLE_PREVIEW_ROWS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub declared_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableInfo {
    pub name: String,
    pub columns: Vec<ColumnInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TablePreview {
    pub table: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Where a schema description came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaResolution {
    /// The dataset's maintained `schema_desc`.
    Cached(String),
    /// Rendered from the catalog just now.
    Introspected(String),
}

impl SchemaResolution {
    pub fn text(&self) -> &str {
        match self {
            SchemaResolution::Cached(s) | SchemaResolution::Introspected(s) => s,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            SchemaResolution::Cached(s) | SchemaResolution::Introspected(s) => s,
        }
    }
}

/// Reads catalog metadata from a dataset through the registry's read-only pools.
/// Results are not cached here.
#[derive(Clone)]
pub struct SchemaIntrospector {
    registry: Arc<DatasetRegistry>,
}

impl SchemaIntrospector {
    pub fn new(registry: Arc<DatasetRegistry>) -> Self {
        Self { registry }
    }

    pub async fn describe_tables(&self, db_name: &str) -> Result<Vec<TableInfo>, CoreError> {
        let name = db_name.to_string();
        self.registry
            .with_connection(db_name, move |conn| {
                read_tables(conn).map_err(|e| CoreError::dataset_unavailable(name, e))
            })
            .await
    }

    /// One header line per table, one indented line per column, tables by
    /// name and columns in declaration order.
    pub async fn describe_schema(&self, db_name: &str) -> Result<String, CoreError> {
        let tables = self.describe_tables(db_name).await?;
        Ok(render_schema(&tables))
    }

    /// Cache-or-compute: prefer the dataset's maintained description, fall back
    /// to live introspection.
    pub async fn resolve_schema_text(&self, dataset: &Dataset) -> Result<SchemaResolution, CoreError> {
        if let Some(cached) = dataset.cached_schema() {
            return Ok(SchemaResolution::Cached(cached.to_string()));
        }
        let text = self.describe_schema(&dataset.db_name).await?;
        tracing::debug!(
            event = "schema.introspected",
            dataset = %dataset.key,
            bytes = text.len()
        );
        Ok(SchemaResolution::Introspected(text))
    }

    pub async fn preview_tables(&self, db_name: &str) -> Result<Vec<TablePreview>, CoreError> {
        let name = db_name.to_string();
        self.registry
            .with_connection(db_name, move |conn| {
                read_previews(conn, TABLE_PREVIEW_ROWS)
                    .map_err(|e| CoreError::dataset_unavailable(name, e))
            })
            .await
    }
}

pub fn render_schema(tables: &[TableInfo]) -> String {
    let mut lines = Vec::new();
    for table in tables {
        lines.push(format!("Table {}:", table.name));
        for col in &table.columns {
            if col.declared_type.is_empty() {
                lines.push(format!("  - {}", col.name));
            } else {
                lines.push(format!("  - {} ({})", col.name, col.declared_type));
            }
        }
    }
    lines.join("\n")
}

pub fn read_tables(conn: &Connection) -> rusqlite::Result<Vec<TableInfo>> {
    let mut stmt = conn.prepare(
        "SELECT m.name, p.name, p.type
         FROM sqlite_master m
         JOIN pragma_table_info(m.name) p
         WHERE m.type IN ('table', 'view') AND m.name NOT LIKE 'sqlite_%'
         ORDER BY m.name, p.cid",
    )?;
    let mut rows = stmt.query([])?;

    let mut tables: Vec<TableInfo> = Vec::new();
    while let Some(row) = rows.next()? {
        let table: String = row.get(0)?;
        let column = ColumnInfo {
            name: row.get(1)?,
            declared_type: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        };
        match tables.last_mut() {
            Some(last) if last.name == table => last.columns.push(column),
            _ => tables.push(TableInfo {
                name: table,
                columns: vec![column],
            }),
        }
    }
    Ok(tables)
}

fn read_previews(conn: &Connection, limit: usize) -> rusqlite::Result<Vec<TablePreview>> {
    let tables = read_tables(conn)?;
    let mut previews = Vec::with_capacity(tables.len());
    for table in tables {
        let sql = format!("SELECT * FROM {} LIMIT ?1", quote_ident(&table.name));
        let mut stmt = conn.prepare(&sql)?;
        let width = stmt.column_count();
        let mut rows = stmt.query([limit as i64])?;
        let mut rendered = Vec::new();
        while let Some(row) = rows.next()? {
            let mut cells = Vec::with_capacity(width);
            for i in 0..width {
                cells.push(Value::from(row.get_ref(i)?).render());
            }
            rendered.push(cells);
        }
        previews.push(TablePreview {
            columns: table.columns.iter().map(|c| c.name.clone()).collect(),
            table: table.name,
            rows: rendered,
        });
    }
    Ok(previews)
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
