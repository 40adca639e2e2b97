use super::args::*;
use serde_json::json;
use sqljudge_core::config::{self, AppConfig};
use sqljudge_core::storage::Store;
use sqljudge_core::{CoreError, ExerciseService};
use std::path::Path;
use tracing_subscriber::{fmt, EnvFilter};

pub mod catalog;
pub mod dataset;
pub mod judge;
pub mod llm;

pub mod exit_codes {
    pub const OK: i32 = 0;
    /// The learner query did not pass (Fail or Error verdict).
    pub const NOT_PASSED: i32 = 1;
    pub const CONFIG_ERROR: i32 = 2;
}

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    if let Command::Version = cli.cmd {
        println!("{}", env!("CARGO_PKG_VERSION"));
        return Ok(exit_codes::OK);
    }
    if let Command::InitDb = cli.cmd {
        return cmd_init_db(&cli.config, cli.strict);
    }

    let cfg = match config::load_or_default(&cli.config, cli.strict) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("config error: {e}");
            return Ok(exit_codes::CONFIG_ERROR);
        }
    };
    init_logging(&cfg.log_level);
    tracing::debug!(event = "cli.config_loaded", config = ?cfg);

    let service = ExerciseService::from_config(&cfg)?;

    match cli.cmd {
        Command::Dataset(args) => match args.cmd {
            DatasetSub::Add(add) => dataset::cmd_add(&service, add),
            DatasetSub::List => dataset::cmd_list(&service),
        },
        Command::Question(args) => match args.cmd {
            QuestionSub::Add(add) => catalog::cmd_question_add(&service, add),
        },
        Command::Judge(args) => judge::cmd_judge(&service, args).await,
        Command::Generate(args) => llm::cmd_generate(&service, args).await,
        Command::Explain(args) => llm::cmd_explain(&service, args).await,
        Command::Ask(args) => llm::cmd_ask(&service, args).await,
        Command::Schema(args) => dataset::cmd_schema(&service, args).await,
        Command::Preview(args) => dataset::cmd_preview(&service, args).await,
        Command::Answer(args) => catalog::cmd_answer(&service, args),
        Command::Draw(args) => catalog::cmd_draw(&service, args),
        Command::Version | Command::InitDb => Ok(exit_codes::OK),
    }
}

fn cmd_init_db(config_path: &Path, strict: bool) -> anyhow::Result<i32> {
    if !config_path.exists() {
        config::write_sample_config(config_path)?;
        eprintln!("created {}", config_path.display());
    } else {
        eprintln!("note: {} already exists", config_path.display());
    }

    let cfg: AppConfig = match config::load_config(config_path, strict) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("config error: {e}");
            return Ok(exit_codes::CONFIG_ERROR);
        }
    };
    init_logging(&cfg.log_level);

    let store = Store::open(&cfg.store.path)?;
    store.init_schema()?;
    std::fs::create_dir_all(&cfg.datasets.dir)?;

    tracing::info!(
        event = "store.initialized",
        store = %cfg.store.path.display(),
        datasets_dir = %cfg.datasets.dir.display()
    );
    print_json(&json!({
        "store": cfg.store.path,
        "datasets_dir": cfg.datasets.dir,
    }))?;
    Ok(exit_codes::OK)
}

fn init_logging(log_level: &str) {
    let filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    // A second init (tests driving several commands in-process) is harmless.
    let _ = fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_target(true)
        .with_current_span(false)
        .with_span_list(false)
        .with_writer(std::io::stderr)
        .try_init();
}

pub(crate) fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Logs the full error, prints the display-safe message and picks the exit code.
pub(crate) fn report(err: CoreError) -> i32 {
    tracing::error!(event = "command.failed", error_kind = err.kind(), error = %err);
    eprintln!("error: {}", err.public_message());
    exit_codes::CONFIG_ERROR
}
