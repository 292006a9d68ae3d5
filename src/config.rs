//! TOML configuration for the portal.
//!
//! Only `[db]` is required; every other section falls back to defaults.
//! [`load_config`] parses and validates in one step, so a returned
//! [`Config`] is always usable. The chat credential itself is never stored
//! here, only the name of the environment variable that holds it.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use docs_portal_core::chat::{ChatSettings, DEFAULT_MAX_HISTORY, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE};
use docs_portal_core::context::{ContextLimits, DEFAULT_MAX_CONTEXT_DOCUMENTS};
use docs_portal_core::folders::DEFAULT_MAX_FOLDER_DEPTH;
use docs_portal_core::search::DEFAULT_MAX_RESULTS;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub context: ContextConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub import: ImportConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
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
    "127.0.0.1:7340".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

fn default_max_results() -> usize {
    DEFAULT_MAX_RESULTS
}

#[derive(Debug, Deserialize, Clone)]
pub struct ContextConfig {
    #[serde(default = "default_max_documents")]
    pub max_documents: usize,
    #[serde(default = "default_max_history")]
    pub max_history: usize,
    #[serde(default = "default_max_folder_depth")]
    pub max_folder_depth: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_documents: DEFAULT_MAX_CONTEXT_DOCUMENTS,
            max_history: DEFAULT_MAX_HISTORY,
            max_folder_depth: DEFAULT_MAX_FOLDER_DEPTH,
        }
    }
}

fn default_max_documents() -> usize {
    DEFAULT_MAX_CONTEXT_DOCUMENTS
}
fn default_max_history() -> usize {
    DEFAULT_MAX_HISTORY
}
fn default_max_folder_depth() -> usize {
    DEFAULT_MAX_FOLDER_DEPTH
}

impl ContextConfig {
    pub fn limits(&self) -> ContextLimits {
        ContextLimits {
            max_documents: self.max_documents,
            max_folder_depth: self.max_folder_depth,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Name of the environment variable holding the bearer credential.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Sent as `HTTP-Referer`.
    #[serde(default = "default_app_url")]
    pub app_url: String,
    /// Sent as `X-Title`.
    #[serde(default = "default_app_title")]
    pub app_title: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            timeout_secs: default_timeout_secs(),
            app_url: default_app_url(),
            app_title: default_app_title(),
        }
    }
}

fn default_api_url() -> String {
    "https://openrouter.ai/api/v1/chat/completions".to_string()
}
fn default_model() -> String {
    "google/gemini-3-flash-preview".to_string()
}
fn default_api_key_env() -> String {
    "OPENROUTER_API_KEY".to_string()
}
fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}
fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_app_url() -> String {
    "http://localhost:3000".to_string()
}
fn default_app_title() -> String {
    "Docs Portal".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ImportConfig {
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            include_globs: default_include_globs(),
            exclude_globs: Vec::new(),
        }
    }
}

fn default_include_globs() -> Vec<String> {
    vec!["**/*.md".to_string()]
}

impl Config {
    /// Config with defaults everywhere and the database at `db_path`.
    pub fn with_db_path(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db: DbConfig {
                path: db_path.into(),
            },
            server: ServerConfig::default(),
            search: SearchConfig::default(),
            context: ContextConfig::default(),
            chat: ChatConfig::default(),
            import: ImportConfig::default(),
        }
    }

    /// Orchestrator parameters derived from `[chat]` and `[context]`.
    pub fn chat_settings(&self) -> ChatSettings {
        ChatSettings {
            model: self.chat.model.clone(),
            max_tokens: self.chat.max_tokens,
            temperature: self.chat.temperature,
            max_history: self.context.max_history,
            context: self.context.limits(),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.search.max_results < 1 {
            anyhow::bail!("search.max_results must be >= 1");
        }
        if self.context.max_documents < 1 {
            anyhow::bail!("context.max_documents must be >= 1");
        }
        if self.context.max_folder_depth < 1 {
            anyhow::bail!("context.max_folder_depth must be >= 1");
        }
        if self.chat.max_tokens < 1 {
            anyhow::bail!("chat.max_tokens must be >= 1");
        }
        if !(0.0..=2.0).contains(&self.chat.temperature) {
            anyhow::bail!("chat.temperature must be in [0.0, 2.0]");
        }
        if self.chat.api_key_env.trim().is_empty() {
            anyhow::bail!("chat.api_key_env must name an environment variable");
        }
        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

/// Parse and validate a config from TOML text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    config.validate()?;
    Ok(config)
}
