use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:9091".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_url")]
    pub url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            url: default_embedding_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl EmbeddingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_embedding_url() -> String {
    "http://127.0.0.1:8081".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_generation_url")]
    pub url: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Maximum silence between two chunks before the stream is considered dead.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            url: default_generation_url(),
            temperature: default_temperature(),
            connect_timeout_secs: default_connect_timeout_secs(),
            idle_timeout_secs: default_idle_timeout_secs(),
        }
    }
}

impl GenerationConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

fn default_generation_url() -> String {
    "http://127.0.0.1:8080".to_string()
}
fn default_temperature() -> f32 {
    0.5
}
fn default_connect_timeout_secs() -> u64 {
    10
}
fn default_idle_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    /// Qdrant gRPC endpoint.
    #[serde(default = "default_index_url")]
    pub url: String,
    #[serde(default = "default_index_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            url: default_index_url(),
            timeout_secs: default_index_timeout_secs(),
        }
    }
}

impl IndexConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_index_url() -> String {
    "http://127.0.0.1:6334".to_string()
}
fn default_index_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Candidates requested per query vector.
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Candidates scoring below this are discarded.
    #[serde(default = "default_min_score")]
    pub min_score: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            min_score: default_min_score(),
        }
    }
}

fn default_limit() -> usize {
    3
}
fn default_min_score() -> f32 {
    0.5
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Fallback `EnvFilter` directive when `RUST_LOG` is unset.
    #[serde(default = "default_filter")]
    pub filter: String,
    /// `pretty` or `json`.
    #[serde(default = "default_format")]
    pub format: String,
    /// Append logs to this file instead of stderr.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            format: default_format(),
            file: None,
        }
    }
}

fn default_filter() -> String {
    "info".to_string()
}
fn default_format() -> String {
    "pretty".to_string()
}

fn validate_url(field: &str, url: &str) -> Result<()> {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        bail!("{} must be an http:// or https:// URL, got '{}'", field, url);
    }
    Ok(())
}

impl Config {
    /// Check cross-field invariants. Called by [`load_config`].
    pub fn validate(&self) -> Result<()> {
        validate_url("embedding.url", &self.embedding.url)?;
        validate_url("generation.url", &self.generation.url)?;
        validate_url("index.url", &self.index.url)?;

        if self.server.bind.trim().is_empty() {
            bail!("server.bind must not be empty");
        }

        // Validate retrieval
        if self.retrieval.limit < 1 {
            bail!("retrieval.limit must be >= 1");
        }
        if !self.retrieval.min_score.is_finite() {
            bail!("retrieval.min_score must be a finite number");
        }

        // Validate generation
        let t = self.generation.temperature;
        if !t.is_finite() || !(0.0..=2.0).contains(&t) {
            bail!("generation.temperature must be in [0.0, 2.0]");
        }

        if self.embedding.timeout_secs == 0
            || self.generation.connect_timeout_secs == 0
            || self.generation.idle_timeout_secs == 0
            || self.index.timeout_secs == 0
        {
            bail!("timeouts must be > 0 seconds");
        }

        match self.logging.format.as_str() {
            "pretty" | "json" => {}
            other => bail!(
                "Unknown logging format: '{}'. Must be pretty or json.",
                other
            ),
        }

        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.validate()?;

    Ok(config)
}

/// Load the config file if it exists, otherwise fall back to defaults.
pub fn load_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        Ok(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.server.bind, "127.0.0.1:9091");
        assert_eq!(cfg.generation.temperature, 0.5);
        assert_eq!(cfg.retrieval.limit, 3);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let file = write_config(
            r#"
[embedding]
url = "http://embed:9000"

[retrieval]
min_score = 0.25
"#,
        );
        let cfg = load_config(file.path()).unwrap();
        assert_eq!(cfg.embedding.url, "http://embed:9000");
        assert_eq!(cfg.embedding.timeout_secs, 30);
        assert_eq!(cfg.retrieval.min_score, 0.25);
        assert_eq!(cfg.retrieval.limit, 3);
        assert_eq!(cfg.logging.format, "pretty");
        assert!(cfg.logging.file.is_none());
    }

    #[test]
    fn test_log_file_path() {
        let file = write_config("[logging]\nfile = \"./gorag.log\"\n");
        let cfg = load_config(file.path()).unwrap();
        assert_eq!(cfg.logging.file, Some(PathBuf::from("./gorag.log")));
    }

    #[test]
    fn test_rejects_zero_limit() {
        let file = write_config("[retrieval]\nlimit = 0\n");
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("retrieval.limit"));
    }

    #[test]
    fn test_rejects_bad_url() {
        let file = write_config("[generation]\nurl = \"localhost:8080\"\n");
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("generation.url"));
    }

    #[test]
    fn test_rejects_unknown_log_format() {
        let file = write_config("[logging]\nformat = \"xml\"\n");
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let cfg = load_or_default(Path::new("/nonexistent/gorag.toml")).unwrap();
        assert_eq!(cfg.index.url, "http://127.0.0.1:6334");
    }
}
