#![allow(dead_code)]

use rusqlite::Connection;
use std::path::{Path, PathBuf};

/// Writes `<dir>/<db_name>.db` with a small students/scores schema.
pub fn seed_scores_dataset(dir: &Path, db_name: &str) -> anyhow::Result<PathBuf> {
    let path = dir.join(format!("{db_name}.db"));
    let conn = Connection::open(&path)?;
    conn.execute_batch(
        "CREATE TABLE students (id INTEGER PRIMARY KEY, name TEXT NOT NULL, class TEXT);
         CREATE TABLE scores (student_id INTEGER, course TEXT, score REAL);
         INSERT INTO students VALUES (3, 'Chen', 'A'), (1, 'Alice', 'B'), (2, 'Bob', NULL);
         INSERT INTO scores VALUES
           (1, 'math', 91.5), (1, 'art', 78), (2, 'math', 64), (3, 'math', 88),
           (3, 'art', NULL), (2, 'art', 70), (1, 'history', 83);",
    )?;
    Ok(path)
}

/// Writes `<dir>/<db_name>.db` with a single table `t(id)` holding `ids`.
pub fn seed_ids_dataset(dir: &Path, db_name: &str, ids: &[i64]) -> anyhow::Result<PathBuf> {
    let path = dir.join(format!("{db_name}.db"));
    let conn = Connection::open(&path)?;
    conn.execute_batch("CREATE TABLE t (id INTEGER);")?;
    for id in ids {
        conn.execute("INSERT INTO t (id) VALUES (?1)", [id])?;
    }
    Ok(path)
}

pub fn row_count(path: &Path, table: &str) -> anyhow::Result<i64> {
    let conn = Connection::open(path)?;
    Ok(conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))?)
}
