pub const DDL: &str = r#"
CREATE TABLE IF NOT EXISTS datasets (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  key TEXT NOT NULL UNIQUE,
  db_name TEXT NOT NULL,
  schema_desc TEXT,
  active INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS questions (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  title TEXT NOT NULL,
  standard_sql TEXT NOT NULL,
  difficulty TEXT NOT NULL,
  score INTEGER NOT NULL CHECK (score > 0),
  dataset_id INTEGER NOT NULL REFERENCES datasets(id),
  source TEXT NOT NULL DEFAULT 'catalog',
  allow_view_answer INTEGER NOT NULL DEFAULT 0,
  created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS submissions (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  user_id INTEGER NOT NULL,
  question_id INTEGER NOT NULL REFERENCES questions(id),
  dataset_id INTEGER NOT NULL,
  user_sql TEXT NOT NULL,
  result TEXT NOT NULL,
  score INTEGER NOT NULL,
  exec_time_secs REAL NOT NULL,
  error_log TEXT,
  created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_submissions_user_question
  ON submissions(user_id, question_id);

CREATE TABLE IF NOT EXISTS llm_calls (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  dataset_key TEXT,
  dataset_id INTEGER,
  purpose TEXT NOT NULL,
  difficulty TEXT,
  status TEXT NOT NULL,
  error_message TEXT,
  latency_ms REAL NOT NULL,
  prompt_sha256 TEXT NOT NULL,
  created_at TEXT NOT NULL
);
"#;
