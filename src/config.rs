use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::classify::BreakPolicy;
use crate::llm::LlmConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub mapping: MappingConfig,
    #[serde(default)]
    pub policy: BreakPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSection {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    #[serde(default = "default_internal_path")]
    pub internal_path: String,
    #[serde(default = "default_custody_path")]
    pub custody_path: String,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    #[serde(default = "default_event_key_column")]
    pub event_key_column: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MappingFallback {
    /// A failed mapping ends the run.
    #[default]
    Abort,
    /// A failed mapping falls back to pairing identically named columns.
    ExactNames,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MappingConfig {
    #[serde(default)]
    pub fallback: MappingFallback,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub internal_path: Option<PathBuf>,
    pub custody_path: Option<PathBuf>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub fallback: Option<MappingFallback>,
}

impl Config {
    pub fn default_path() -> PathBuf {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".config/dividend-recon/config.toml")
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(|p| p.to_path_buf())
            .unwrap_or_else(Self::default_path);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(&path)
            .with_context(|| format!("failed reading config: {}", path.display()))?;
        let parsed: Self = toml::from_str(&data)
            .with_context(|| format!("failed parsing TOML config: {}", path.display()))?;
        Ok(parsed)
    }

    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(path) = overrides.internal_path {
            self.input.internal_path = path.to_string_lossy().into_owned();
        }
        if let Some(path) = overrides.custody_path {
            self.input.custody_path = path.to_string_lossy().into_owned();
        }
        if let Some(model) = overrides.model {
            self.llm.model = model;
        }
        if let Some(base_url) = overrides.base_url {
            self.llm.base_url = base_url;
        }
        if let Some(fallback) = overrides.fallback {
            self.mapping.fallback = fallback;
        }
    }

    pub fn write_template(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed creating config directory: {}", parent.display())
            })?;
        }
        fs::write(path, Self::default_template())
            .with_context(|| format!("failed writing config template: {}", path.display()))
    }

    pub fn internal_path(&self) -> PathBuf {
        expand_tilde(&self.input.internal_path)
    }

    pub fn custody_path(&self) -> PathBuf {
        expand_tilde(&self.input.custody_path)
    }

    pub fn delimiter(&self) -> Result<u8> {
        let delimiter = self.input.delimiter;
        if !delimiter.is_ascii() {
            return Err(anyhow!(
                "input delimiter must be a single ASCII character, got {delimiter:?}"
            ));
        }
        Ok(delimiter as u8)
    }

    pub fn llm_config(&self) -> Result<LlmConfig> {
        let api_key = std::env::var(&self.llm.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                anyhow!(
                    "missing API credential: set the {} environment variable",
                    self.llm.api_key_env
                )
            })?;
        Ok(LlmConfig {
            api_key,
            model: self.llm.model.clone(),
            base_url: self.llm.base_url.clone(),
            temperature: self.llm.temperature,
            timeout_secs: self.llm.timeout_secs,
            connect_timeout_secs: self.llm.connect_timeout_secs,
        })
    }

    pub fn default_template() -> String {
        let template = r#"[llm]
model = "gpt-4o-mini"
base_url = "https://api.openai.com/v1"
api_key_env = "OPENAI_API_KEY"
temperature = 0.2
timeout_secs = 60
connect_timeout_secs = 10

[input]
internal_path = "resources/NBIM_Dividend_Bookings.csv"
custody_path = "resources/CUSTODY_Dividend_Bookings.csv"
delimiter = ";"
event_key_column = "COAC_EVENT_KEY"

[mapping]
# "abort" or "exact_names"
fallback = "abort"

[policy]
critical_pct = 5.0
high_pct = 1.0
medium_pct = 0.1
auto_remediation_cap = 100000.0
"#;
        template.to_string()
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            internal_path: default_internal_path(),
            custody_path: default_custody_path(),
            delimiter: default_delimiter(),
            event_key_column: default_event_key_column(),
        }
    }
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_temperature() -> f64 {
    0.2
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_internal_path() -> String {
    "resources/NBIM_Dividend_Bookings.csv".to_string()
}

fn default_custody_path() -> String {
    "resources/CUSTODY_Dividend_Bookings.csv".to_string()
}

fn default_delimiter() -> char {
    ';'
}

fn default_event_key_column() -> String {
    "COAC_EVENT_KEY".to_string()
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use crate::config::{Config, ConfigOverrides, MappingFallback};

    #[test]
    fn template_round_trips_to_defaults() {
        let parsed: Config = toml::from_str(&Config::default_template()).expect("template");
        let defaults = Config::default();
        assert_eq!(parsed.llm.model, defaults.llm.model);
        assert_eq!(parsed.input.delimiter, ';');
        assert_eq!(parsed.input.event_key_column, "COAC_EVENT_KEY");
        assert_eq!(parsed.mapping.fallback, MappingFallback::Abort);
        assert_eq!(parsed.policy.auto_remediation_cap, 100_000.0);
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let parsed: Config = toml::from_str(
            r#"
[policy]
critical_pct = 10.0

[mapping]
fallback = "exact_names"
"#,
        )
        .expect("partial config");
        assert_eq!(parsed.policy.critical_pct, 10.0);
        assert_eq!(parsed.policy.medium_pct, 0.1);
        assert_eq!(parsed.mapping.fallback, MappingFallback::ExactNames);
        assert_eq!(parsed.llm.api_key_env, "OPENAI_API_KEY");
    }

    #[test]
    fn overrides_replace_file_values() {
        let mut config = Config::default();
        config.apply_overrides(ConfigOverrides {
            internal_path: Some(PathBuf::from("/data/nbim.csv")),
            model: Some("gpt-4o".to_string()),
            ..ConfigOverrides::default()
        });
        assert_eq!(config.internal_path(), PathBuf::from("/data/nbim.csv"));
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.delimiter().expect("delimiter"), b';');
    }

    #[test]
    fn missing_credential_is_reported() {
        let mut config = Config::default();
        config.llm.api_key_env = "DIVIDEND_RECON_TEST_UNSET_KEY".to_string();
        let err = config.llm_config().unwrap_err();
        assert!(err.to_string().contains("DIVIDEND_RECON_TEST_UNSET_KEY"));
    }
}
