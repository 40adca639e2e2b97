use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const SUPPORTED_CONFIG_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub version: u32,
    pub store: StoreSettings,
    pub datasets: DatasetSettings,
    pub judge: JudgeSettings,
    pub llm: LlmSettings,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: SUPPORTED_CONFIG_VERSION,
            store: StoreSettings::default(),
            datasets: DatasetSettings::default(),
            judge: JudgeSettings::default(),
            llm: LlmSettings::default(),
            log_level: "info".to_string(),
        }
    }
}

/// System-of-record database (read-write, never used for learner SQL).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub path: PathBuf,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from(".sqljudge/system.db"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetSettings {
    /// Directory holding one `<db_name>.db` file per dataset.
    pub dir: PathBuf,
    pub pool_size: usize,
    pub cache_capacity: u64,
}

impl Default for DatasetSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("datasets"),
            pool_size: 4,
            cache_capacity: 8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JudgeSettings {
    pub query_timeout_secs: u64,
    /// When false (default) only positional values are compared.
    pub compare_column_names: bool,
}

impl Default for JudgeSettings {
    fn default() -> Self {
        Self {
            query_timeout_secs: 10,
            compare_column_names: false,
        }
    }
}

impl JudgeSettings {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs.max(1))
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub api_base: String,
    pub api_key: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_base: String::new(),
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
            timeout_secs: 30,
        }
    }
}

// Keep the key out of `?cfg` log lines.
impl fmt::Debug for LlmSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmSettings")
            .field("api_base", &self.api_base)
            .field(
                "api_key",
                &if self.api_key.is_empty() { "<unset>" } else { "<redacted>" },
            )
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl LlmSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

impl AppConfig {
    /// Environment wins over the file for secrets and deployment paths.
    pub fn apply_env(&mut self) {
        if let Ok(v) = env::var("LLM_API_BASE") {
            self.llm.api_base = v;
        }
        if let Ok(v) = env::var("LLM_API_KEY") {
            self.llm.api_key = v;
        }
        if let Ok(v) = env::var("LLM_MODEL") {
            if !v.trim().is_empty() {
                self.llm.model = v;
            }
        }
        if let Ok(v) = env::var("SQLJUDGE_DATASETS_DIR") {
            self.datasets.dir = PathBuf::from(v);
        }
        if let Ok(v) = env::var("SQLJUDGE_STORE") {
            self.store.path = PathBuf::from(v);
        }
        if let Ok(v) = env::var("SQLJUDGE_LOG") {
            self.log_level = v;
        }
    }
}

/// Parse a YAML config. Unknown keys are an error in strict mode and a warning
/// otherwise.
pub fn parse_config(raw: &str, strict: bool) -> Result<AppConfig, ConfigError> {
    let mut ignored_keys = Vec::new();
    let deserializer = serde_yaml::Deserializer::from_str(raw);

    let cfg: AppConfig = serde_ignored::deserialize(deserializer, |path| {
        ignored_keys.push(path.to_string());
    })
    .map_err(|e| ConfigError(format!("failed to parse YAML: {}", e)))?;

    let meaningful_unknowns: Vec<_> = ignored_keys
        .iter()
        .filter(|k| !k.starts_with('_') && !k.starts_with("x-"))
        .collect();

    if !meaningful_unknowns.is_empty() {
        if strict {
            return Err(ConfigError(format!(
                "Unknown fields detected in strict mode: {:?}",
                meaningful_unknowns
            )));
        }
        tracing::warn!(
            event = "config.unknown_fields",
            fields = ?meaningful_unknowns,
            "ignoring unknown config fields"
        );
    }

    if cfg.version != SUPPORTED_CONFIG_VERSION {
        return Err(ConfigError(format!(
            "unsupported config version {} (supported: {})",
            cfg.version, SUPPORTED_CONFIG_VERSION
        )));
    }

    if cfg.datasets.pool_size == 0 {
        return Err(ConfigError("datasets.pool_size must be at least 1".into()));
    }
    if cfg.datasets.cache_capacity == 0 {
        return Err(ConfigError("datasets.cache_capacity must be at least 1".into()));
    }

    Ok(cfg)
}

pub fn load_config(path: &Path, strict: bool) -> Result<AppConfig, ConfigError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| ConfigError(format!("failed to read config {}: {}", path.display(), e)))?;
    let mut cfg = parse_config(&raw, strict)?;
    resolve_relative_paths(&mut cfg, path);
    cfg.apply_env();
    Ok(cfg)
}

/// Load the file if it exists, otherwise start from defaults. Env overrides
/// apply in both cases.
pub fn load_or_default(path: &Path, strict: bool) -> Result<AppConfig, ConfigError> {
    if path.exists() {
        return load_config(path, strict);
    }
    let mut cfg = AppConfig::default();
    cfg.apply_env();
    Ok(cfg)
}

// Relative store/dataset paths are anchored at the config file's directory.
fn resolve_relative_paths(cfg: &mut AppConfig, config_path: &Path) {
    let base = match config_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => return,
    };
    if cfg.store.path.is_relative() {
        cfg.store.path = base.join(&cfg.store.path);
    }
    if cfg.datasets.dir.is_relative() {
        cfg.datasets.dir = base.join(&cfg.datasets.dir);
    }
}

pub const SAMPLE_CONFIG: &str = r#"version: 1
log_level: info
store:
  path: .sqljudge/system.db
datasets:
  dir: datasets
  pool_size: 4
  cache_capacity: 8
judge:
  query_timeout_secs: 10
  compare_column_names: false
llm:
  # api_base and api_key are usually injected via LLM_API_BASE / LLM_API_KEY
  api_base: ""
  api_key: ""
  model: gpt-4o-mini
  timeout_secs: 30
"#;

pub fn write_sample_config(path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ConfigError(format!("failed to create {}: {}", parent.display(), e)))?;
        }
    }
    std::fs::write(path, SAMPLE_CONFIG)
        .map_err(|e| ConfigError(format!("failed to write sample config: {}", e)))?;
    Ok(())
}
