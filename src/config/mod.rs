use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::completion::http::{DEFAULT_ENDPOINT, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS};
use crate::pipeline::PipelineSettings;

/// Env var holding the completion API key.
pub const API_KEY_ENV: &str = "DEFAULT_API_KEY";

/// Env var overriding the completion endpoint.
pub const ENDPOINT_ENV: &str = "DEEPSEEK_ENDPOINT";

/// `[api]` block from config.toml.
#[derive(Debug, Deserialize, Serialize, Default, Clone)]
pub struct ApiConfig {
    pub api_key: Option<String>,
    pub api_key_command: Option<String>,
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// `[pipeline]` block from config.toml.
#[derive(Debug, Deserialize, Serialize, Default, Clone)]
pub struct PipelineConfig {
    pub chunk_size: Option<usize>,
    pub summary_interval_minutes: Option<u32>,
    pub intro_interval_minutes: Option<u32>,
    pub prompt_dir: Option<PathBuf>,
}

/// Top-level tsd config file structure.
#[derive(Debug, Deserialize, Serialize, Default, Clone)]
pub struct TsdConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl TsdConfig {
    /// Load config from an explicit path. Returns default if file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(TsdConfig::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config: TsdConfig =
            toml::from_str(&content).with_context(|| "Failed to parse config.toml")?;
        Ok(config)
    }

    /// Pipeline settings with defaults filled in.
    pub fn settings(&self) -> PipelineSettings {
        let defaults = PipelineSettings::default();
        PipelineSettings {
            chunk_size: self.pipeline.chunk_size.unwrap_or(defaults.chunk_size),
            summary_interval_minutes: self
                .pipeline
                .summary_interval_minutes
                .unwrap_or(defaults.summary_interval_minutes),
            intro_interval_minutes: self
                .pipeline
                .intro_interval_minutes
                .unwrap_or(defaults.intro_interval_minutes),
        }
    }

    /// Endpoint: env var > config > built-in default.
    pub fn endpoint(&self) -> String {
        match std::env::var(ENDPOINT_ENV) {
            Ok(val) if !val.is_empty() => val,
            _ => self
                .api
                .endpoint
                .clone()
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
        }
    }

    pub fn model(&self) -> String {
        self.api
            .model
            .clone()
            .unwrap_or_else(|| DEFAULT_MODEL.to_string())
    }

    pub fn timeout_secs(&self) -> u64 {
        self.api.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)
    }

    /// Prompt directory: config value or `./prompt`.
    pub fn prompt_dir(&self) -> PathBuf {
        self.pipeline
            .prompt_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("prompt"))
    }

    /// Display config with secrets redacted.
    pub fn display_redacted(&self) -> String {
        let mut lines = vec!["[api]".to_string()];
        let api = &self.api;
        if let Some(ref key) = api.api_key {
            lines.push(format!("  api_key = \"{}\"", redact(key)));
        }
        if let Some(ref cmd) = api.api_key_command {
            lines.push(format!("  api_key_command = \"{}\"", cmd));
        }
        lines.push(format!("  endpoint = \"{}\"", self.endpoint()));
        lines.push(format!("  model = \"{}\"", self.model()));
        lines.push(format!("  timeout_secs = {}", self.timeout_secs()));

        let settings = self.settings();
        lines.push("[pipeline]".to_string());
        lines.push(format!("  chunk_size = {}", settings.chunk_size));
        lines.push(format!(
            "  summary_interval_minutes = {}",
            settings.summary_interval_minutes
        ));
        lines.push(format!(
            "  intro_interval_minutes = {}",
            settings.intro_interval_minutes
        ));
        lines.push(format!("  prompt_dir = \"{}\"", self.prompt_dir().display()));
        lines.join("\n")
    }
}

fn redact(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    } else {
        "****".to_string()
    }
}

/// Resolve the API key through the chain: CLI flag > env var > config key > config command.
pub fn resolve_credential(
    cli_flag: Option<&str>,
    env_var_name: &str,
    config: &ApiConfig,
) -> Result<String> {
    // 1. CLI flag
    if let Some(key) = cli_flag {
        if !key.is_empty() {
            return Ok(key.to_string());
        }
    }

    // 2. Environment variable
    if let Ok(val) = std::env::var(env_var_name) {
        if !val.is_empty() {
            return Ok(val);
        }
    }

    // 3. Config file api_key
    if let Some(ref key) = config.api_key {
        if !key.is_empty() {
            return Ok(key.clone());
        }
    }

    // 4. External command
    if let Some(ref cmd) = config.api_key_command {
        if !cmd.is_empty() {
            let output = std::process::Command::new("sh")
                .arg("-c")
                .arg(cmd)
                .output()
                .with_context(|| format!("Failed to run api_key_command: {cmd}"))?;

            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                bail!(
                    "api_key_command failed (exit {}): {}",
                    output.status.code().unwrap_or(-1),
                    stderr.trim()
                );
            }

            let secret = String::from_utf8(output.stdout)
                .context("api_key_command output is not valid UTF-8")?
                .trim()
                .to_string();

            if !secret.is_empty() {
                return Ok(secret);
            }
        }
    }

    bail!(
        "No API key found. Provide via --api-key, {} env var, or ~/.tsd/config.toml",
        env_var_name
    );
}

/// Path to the config file: ~/.tsd/config.toml
pub fn config_path() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".tsd").join("config.toml"))
}

/// Default config template content.
pub fn default_config_template() -> &'static str {
    r#"# ~/.tsd/config.toml
# Credential resolution order: CLI flag > DEFAULT_API_KEY env var > api_key > api_key_command

[api]
# api_key = "your-api-key"
# api_key_command = "your-secrets-manager-command-here"
# endpoint = "https://api.deepseek.com/chat/completions"
# model = "deepseek-reasoner"
# timeout_secs = 600

[pipeline]
# chunk_size = 100
# summary_interval_minutes = 30
# intro_interval_minutes = 25
# prompt_dir = "prompt"
"#
}

/// Create the default config file if it doesn't already exist.
pub fn init_config(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, default_config_template())?;
    Ok(true)
}
