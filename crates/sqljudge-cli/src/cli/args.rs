use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "sqljudge",
    version,
    about = "Read-only SQL exercise judge with LLM question synthesis"
)]
pub struct Cli {
    /// Config file; defaults apply when it does not exist
    #[arg(long, global = true, default_value = "sqljudge.yaml")]
    pub config: PathBuf,

    /// Treat unknown config keys as errors
    #[arg(long, global = true)]
    pub strict: bool,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Write a sample config if missing and create the store schema
    InitDb,
    Dataset(DatasetArgs),
    Question(QuestionArgs),
    Judge(JudgeArgs),
    Generate(GenerateArgs),
    Explain(ExplainArgs),
    /// Print a dataset's schema description
    Schema(DatasetKeyArgs),
    /// Print the first rows of every table in a dataset
    Preview(DatasetKeyArgs),
    /// Reveal a question's reference SQL
    Answer(AnswerArgs),
    /// Pick a random catalog question
    Draw(DrawArgs),
    /// Ask the administrator assistant
    Ask(AskArgs),
    Version,
}

#[derive(Parser, Clone)]
pub struct DatasetArgs {
    #[command(subcommand)]
    pub cmd: DatasetSub,
}

#[derive(Subcommand, Clone)]
pub enum DatasetSub {
    /// Register (or update) a dataset
    Add(DatasetAddArgs),
    List,
}

#[derive(Parser, Clone)]
pub struct DatasetAddArgs {
    #[arg(long)]
    pub key: String,

    /// File stem under the datasets directory (`<db_name>.db`)
    #[arg(long)]
    pub db_name: String,

    /// Precomputed schema description; introspected on demand when absent
    #[arg(long)]
    pub schema_desc: Option<String>,
}

#[derive(Parser, Clone)]
pub struct QuestionArgs {
    #[command(subcommand)]
    pub cmd: QuestionSub,
}

#[derive(Subcommand, Clone)]
pub enum QuestionSub {
    /// Add a catalog question
    Add(QuestionAddArgs),
}

#[derive(Parser, Clone)]
pub struct QuestionAddArgs {
    #[arg(long)]
    pub dataset: String,
    #[arg(long)]
    pub title: String,
    #[arg(long)]
    pub sql: String,
    #[arg(long, default_value = "Medium")]
    pub difficulty: String,
    #[arg(long, default_value_t = 10)]
    pub score: u32,
    #[arg(long)]
    pub allow_view_answer: bool,
}

#[derive(Parser, Clone)]
pub struct JudgeArgs {
    /// Catalog question id; the submission is recorded
    #[arg(long, conflicts_with_all = ["dataset", "standard"])]
    pub question: Option<String>,

    /// Dataset key for an ad hoc comparison (needs --standard)
    #[arg(long, requires = "standard")]
    pub dataset: Option<String>,

    #[arg(long)]
    pub standard: Option<String>,

    /// Learner SQL
    #[arg(long = "sql")]
    pub user_sql: String,

    #[arg(long)]
    pub user_id: Option<i64>,
}

#[derive(Parser, Clone)]
pub struct GenerateArgs {
    #[arg(long)]
    pub dataset: String,
    #[arg(long)]
    pub difficulty: Option<String>,
    #[arg(long)]
    pub hint: Option<String>,
    #[arg(long)]
    pub business_hint: Option<String>,
    #[arg(long)]
    pub extra_constraints: Option<String>,
    #[arg(long)]
    pub require_join: bool,
    #[arg(long)]
    pub require_group_by: bool,
    #[arg(long)]
    pub require_subquery: bool,
    /// Save the draft to the question catalog
    #[arg(long)]
    pub persist: bool,
}

#[derive(Parser, Clone)]
pub struct ExplainArgs {
    #[arg(long)]
    pub question: String,
    #[arg(long = "sql")]
    pub user_sql: String,
    /// Verdict label the learner saw (Pass|Fail|Error)
    #[arg(long, default_value = "")]
    pub result: String,
    #[arg(long)]
    pub judge_message: Option<String>,
}

#[derive(Parser, Clone)]
pub struct DatasetKeyArgs {
    #[arg(long)]
    pub dataset: String,
}

#[derive(Parser, Clone)]
pub struct AnswerArgs {
    #[arg(long)]
    pub question: i64,
    #[arg(long)]
    pub user_id: Option<i64>,
}

#[derive(Parser, Clone)]
pub struct DrawArgs {
    #[arg(long)]
    pub dataset: String,
    #[arg(long)]
    pub difficulty: Option<String>,
}

#[derive(Parser, Clone)]
pub struct AskArgs {
    pub message: String,
}
