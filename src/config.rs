//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` relative to the current working directory,
//! then applies `CATALOG_WORK_DIR` and `CATALOG_LOG_LEVEL` env overrides.
//! API keys are only ever read from the environment.

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::error::AppError;

/// Which storage backend a collaborator uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// SQLite file under `work_dir` (requires the `sqlite` feature).
    Sqlite,
    /// Process-local, lost on exit.
    Memory,
}

impl Backend {
    fn parse(section: &str, value: &str) -> Result<Self, AppError> {
        match value {
            "sqlite" => Ok(Self::Sqlite),
            "memory" => Ok(Self::Memory),
            other => Err(AppError::Config(format!(
                "[{section}] backend must be \"sqlite\" or \"memory\", got \"{other}\""
            ))),
        }
    }
}

/// OpenAI / OpenAI-compatible chat provider (`[llm.openai]`).
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Full chat completions endpoint URL.
    pub api_base_url: String,
    pub model: String,
    /// Sampling temperature (ignored for models that forbid it).
    pub temperature: f32,
    /// Per-request HTTP timeout in seconds.
    pub timeout_seconds: u64,
}

/// LLM configuration.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Active provider: `"static"` or `"openai"`.
    /// Maps to `default` in `[llm]`.
    pub provider: String,
    pub openai: OpenAiConfig,
    /// Canned reply for the `static` provider (`[llm.static] reply`).
    pub static_reply: String,
}

/// OpenAI-compatible embeddings endpoint (`[embedding.openai]`).
#[derive(Debug, Clone)]
pub struct OpenAiEmbeddingConfig {
    /// Full embeddings endpoint URL.
    pub api_base_url: String,
    pub model: String,
    pub timeout_seconds: u64,
}

/// Embedding configuration.
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    /// Active embedder: `"hashing"` or `"openai"`.
    pub provider: String,
    /// Vector width of the hashing embedder.
    pub hashing_dimensions: usize,
    pub openai: OpenAiEmbeddingConfig,
}

/// Fully-resolved service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub service_name: String,
    /// Directory for all persistent data (already expanded, no `~`).
    pub work_dir: PathBuf,
    pub log_level: String,
    pub catalog_backend: Backend,
    pub index_backend: Backend,
    pub embedding: EmbeddingConfig,
    /// Search prompt template, resolved against the current directory.
    pub prompt_template: PathBuf,
    pub llm: LlmConfig,
    /// From `LLM_API_KEY`; `None` for keyless local models.
    pub llm_api_key: Option<String>,
    /// From `EMBEDDING_API_KEY`, falling back to `LLM_API_KEY`.
    pub embedding_api_key: Option<String>,
}

#[derive(Deserialize)]
struct RawConfig {
    service: RawService,
    #[serde(default)]
    catalog: RawBackendSection,
    #[serde(default)]
    index: RawBackendSection,
    #[serde(default)]
    embedding: RawEmbedding,
    #[serde(default)]
    search: RawSearch,
    #[serde(default)]
    llm: RawLlm,
}

#[derive(Deserialize)]
struct RawService {
    name: String,
    work_dir: String,
    log_level: String,
}

#[derive(Deserialize)]
struct RawBackendSection {
    #[serde(default = "default_backend")]
    backend: String,
}

impl Default for RawBackendSection {
    fn default() -> Self {
        Self { backend: default_backend() }
    }
}

#[derive(Deserialize)]
struct RawEmbedding {
    #[serde(rename = "default", default = "default_embedding_provider")]
    provider: String,
    #[serde(default)]
    hashing: RawHashing,
    #[serde(default)]
    openai: RawOpenAiEmbedding,
}

impl Default for RawEmbedding {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            hashing: RawHashing::default(),
            openai: RawOpenAiEmbedding::default(),
        }
    }
}

#[derive(Deserialize)]
struct RawHashing {
    #[serde(default = "default_hashing_dimensions")]
    dimensions: usize,
}

impl Default for RawHashing {
    fn default() -> Self {
        Self { dimensions: default_hashing_dimensions() }
    }
}

#[derive(Deserialize)]
struct RawOpenAiEmbedding {
    #[serde(default = "default_embedding_api_base_url")]
    api_base_url: String,
    #[serde(default = "default_embedding_model")]
    model: String,
    #[serde(default = "default_openai_timeout_seconds")]
    timeout_seconds: u64,
}

impl Default for RawOpenAiEmbedding {
    fn default() -> Self {
        Self {
            api_base_url: default_embedding_api_base_url(),
            model: default_embedding_model(),
            timeout_seconds: default_openai_timeout_seconds(),
        }
    }
}

#[derive(Deserialize)]
struct RawSearch {
    #[serde(default = "default_prompt_template")]
    prompt_template: String,
}

impl Default for RawSearch {
    fn default() -> Self {
        Self { prompt_template: default_prompt_template() }
    }
}

#[derive(Deserialize)]
struct RawLlm {
    /// Maps to `default = "..."` in `[llm]`.
    #[serde(rename = "default", default = "default_llm_provider")]
    provider: String,
    #[serde(default)]
    openai: RawOpenAiConfig,
    #[serde(rename = "static", default)]
    static_provider: RawStatic,
}

impl Default for RawLlm {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            openai: RawOpenAiConfig::default(),
            static_provider: RawStatic::default(),
        }
    }
}

#[derive(Deserialize)]
struct RawOpenAiConfig {
    #[serde(default = "default_openai_api_base_url")]
    api_base_url: String,
    #[serde(default = "default_openai_model")]
    model: String,
    #[serde(default = "default_openai_temperature")]
    temperature: f32,
    #[serde(default = "default_openai_timeout_seconds")]
    timeout_seconds: u64,
}

impl Default for RawOpenAiConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_openai_api_base_url(),
            model: default_openai_model(),
            temperature: default_openai_temperature(),
            timeout_seconds: default_openai_timeout_seconds(),
        }
    }
}

#[derive(Deserialize)]
struct RawStatic {
    #[serde(default = "default_static_reply")]
    reply: String,
}

impl Default for RawStatic {
    fn default() -> Self {
        Self { reply: default_static_reply() }
    }
}

fn default_backend() -> String { "sqlite".to_string() }
fn default_embedding_provider() -> String { "hashing".to_string() }
fn default_hashing_dimensions() -> usize { 512 }
fn default_embedding_api_base_url() -> String { "https://api.openai.com/v1/embeddings".to_string() }
fn default_embedding_model() -> String { "text-embedding-3-small".to_string() }
fn default_prompt_template() -> String { "config/prompts/catalog_search.txt".to_string() }
fn default_llm_provider() -> String { "static".to_string() }
fn default_static_reply() -> String { "[]".to_string() }
fn default_openai_api_base_url() -> String { "https://api.openai.com/v1/chat/completions".to_string() }
fn default_openai_model() -> String { "gpt-4o-mini".to_string() }
fn default_openai_temperature() -> f32 { 0.2 }
fn default_openai_timeout_seconds() -> u64 { 60 }

/// Load config from `config/default.toml`, then apply env-var overrides.
pub fn load() -> Result<Config, AppError> {
    load_path(Path::new("config/default.toml"))
}

/// Same as [`load`] for an explicit config file path.
pub fn load_path(path: &Path) -> Result<Config, AppError> {
    let work_dir_override = env::var("CATALOG_WORK_DIR").ok();
    let log_level_override = env::var("CATALOG_LOG_LEVEL").ok();
    let mut config = load_from(path, work_dir_override.as_deref(), log_level_override.as_deref())?;
    config.llm_api_key = env::var("LLM_API_KEY").ok();
    config.embedding_api_key = env::var("EMBEDDING_API_KEY")
        .ok()
        .or_else(|| config.llm_api_key.clone());
    Ok(config)
}

/// Loader with an explicit path and optional overrides.
/// Tests pass overrides directly instead of mutating env vars; API keys are
/// left unset.
pub fn load_from(
    path: &Path,
    work_dir_override: Option<&str>,
    log_level_override: Option<&str>,
) -> Result<Config, AppError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;

    let parsed: RawConfig = toml::from_str(&raw)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?;

    let s = parsed.service;
    let work_dir = expand_home(work_dir_override.unwrap_or(&s.work_dir));
    let log_level = log_level_override.unwrap_or(&s.log_level).to_string();

    if parsed.embedding.hashing.dimensions == 0 {
        return Err(AppError::Config(
            "[embedding.hashing] dimensions must be > 0".to_string(),
        ));
    }

    Ok(Config {
        service_name: s.name,
        work_dir,
        log_level,
        catalog_backend: Backend::parse("catalog", &parsed.catalog.backend)?,
        index_backend: Backend::parse("index", &parsed.index.backend)?,
        embedding: EmbeddingConfig {
            provider: parsed.embedding.provider,
            hashing_dimensions: parsed.embedding.hashing.dimensions,
            openai: OpenAiEmbeddingConfig {
                api_base_url: parsed.embedding.openai.api_base_url,
                model: parsed.embedding.openai.model,
                timeout_seconds: parsed.embedding.openai.timeout_seconds,
            },
        },
        prompt_template: expand_home(&parsed.search.prompt_template),
        llm: LlmConfig {
            provider: parsed.llm.provider,
            openai: OpenAiConfig {
                api_base_url: parsed.llm.openai.api_base_url,
                model: parsed.llm.openai.model,
                temperature: parsed.llm.openai.temperature,
                timeout_seconds: parsed.llm.openai.timeout_seconds,
            },
            static_reply: parsed.llm.static_provider.reply,
        },
        llm_api_key: None,
        embedding_api_key: None,
    })
}

/// Expand a leading `~` to the user's home directory.
/// Absolute or relative paths without `~` are returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINIMAL_TOML: &str = r#"
[service]
name = "test-catalog"
work_dir = "~/.catalog-search"
log_level = "info"
"#;

    fn write_toml(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let f = write_toml(MINIMAL_TOML);
        let cfg = load_from(f.path(), None, None).unwrap();
        assert_eq!(cfg.service_name, "test-catalog");
        assert_eq!(cfg.catalog_backend, Backend::Sqlite);
        assert_eq!(cfg.index_backend, Backend::Sqlite);
        assert_eq!(cfg.embedding.provider, "hashing");
        assert_eq!(cfg.embedding.hashing_dimensions, 512);
        assert_eq!(cfg.llm.provider, "static");
        assert_eq!(cfg.llm.static_reply, "[]");
        assert_eq!(cfg.prompt_template, PathBuf::from("config/prompts/catalog_search.txt"));
        assert!(cfg.llm_api_key.is_none());
    }

    #[test]
    fn full_config_parses_every_section() {
        let f = write_toml(
            r#"
[service]
name = "shop"
work_dir = "/srv/shop"
log_level = "debug"

[catalog]
backend = "memory"

[index]
backend = "memory"

[embedding]
default = "openai"

[embedding.openai]
api_base_url = "http://localhost:11434/v1/embeddings"
model = "nomic-embed-text"
timeout_seconds = 5

[search]
prompt_template = "/etc/shop/search.txt"

[llm]
default = "static"

[llm.static]
reply = "[]"
"#,
        );
        let cfg = load_from(f.path(), None, None).unwrap();
        assert_eq!(cfg.catalog_backend, Backend::Memory);
        assert_eq!(cfg.index_backend, Backend::Memory);
        assert_eq!(cfg.embedding.provider, "openai");
        assert_eq!(cfg.embedding.openai.model, "nomic-embed-text");
        assert_eq!(cfg.embedding.openai.timeout_seconds, 5);
        assert_eq!(cfg.prompt_template, PathBuf::from("/etc/shop/search.txt"));
        assert_eq!(cfg.llm.provider, "static");
        assert_eq!(cfg.llm.static_reply, "[]");
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let f = write_toml(&format!("{MINIMAL_TOML}\n[catalog]\nbackend = \"postgres\"\n"));
        let err = load_from(f.path(), None, None).unwrap_err();
        assert!(err.to_string().contains("postgres"));
    }

    #[test]
    fn zero_hashing_dimensions_is_rejected() {
        let f = write_toml(&format!("{MINIMAL_TOML}\n[embedding.hashing]\ndimensions = 0\n"));
        assert!(load_from(f.path(), None, None).is_err());
    }

    #[test]
    fn tilde_expands_to_home() {
        let home = dirs::home_dir().expect("home dir must exist in test env");
        let expanded = expand_home("~/.catalog-search");
        assert!(expanded.starts_with(&home));
        assert!(expanded.ends_with(".catalog-search"));
    }

    #[test]
    fn absolute_path_unchanged() {
        assert_eq!(expand_home("/absolute/path"), PathBuf::from("/absolute/path"));
    }

    #[test]
    fn missing_file_errors() {
        let result = load_from(Path::new("/nonexistent/config.toml"), None, None);
        let msg = result.unwrap_err().to_string();
        assert!(msg.contains("config error"));
    }

    #[test]
    fn work_dir_and_log_level_overrides() {
        let f = write_toml(MINIMAL_TOML);
        let cfg = load_from(f.path(), Some("/tmp/test-override"), Some("debug")).unwrap();
        assert_eq!(cfg.work_dir, PathBuf::from("/tmp/test-override"));
        assert_eq!(cfg.log_level, "debug");
    }
}
