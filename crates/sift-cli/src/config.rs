// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use sift_grid::{DEFAULT_PAGE_SIZE, GridFeatures};
use sift_llm::{
    DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE, InvokeOptions,
    ProviderConfig, ProviderKind, default_anthropic_url, default_ollama_url, default_openai_url,
};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const APP_NAME: &str = "sift";
const CONFIG_VERSION: i64 = 1;
const DEFAULT_PROVIDER: &str = "ollama";
const DEFAULT_MODEL: &str = "qwen3";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub grid: Grid,
    #[serde(default)]
    pub ai: Ai,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            grid: Grid::default(),
            ai: Ai::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Grid {
    pub page_size: Option<usize>,
    pub multi_select: Option<bool>,
    pub strict: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ai {
    pub enabled: Option<bool>,
    pub provider: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    /// Name of the environment variable holding the API key, never the key.
    pub api_key_env: Option<String>,
    pub timeout: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub json_mode: Option<bool>,
    pub confidence_threshold: Option<f64>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl Default for Ai {
    fn default() -> Self {
        Self {
            enabled: Some(true),
            provider: Some(DEFAULT_PROVIDER.to_owned()),
            base_url: None,
            model: Some(DEFAULT_MODEL.to_owned()),
            api_key_env: None,
            timeout: None,
            temperature: Some(DEFAULT_TEMPERATURE),
            max_tokens: Some(DEFAULT_MAX_TOKENS),
            json_mode: Some(true),
            confidence_threshold: Some(DEFAULT_CONFIDENCE_THRESHOLD),
            headers: BTreeMap::new(),
        }
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("SIFT_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set SIFT_CONFIG_PATH to the config file")
        })?;
        Ok(config_root.join(APP_NAME).join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} is missing `version = 1`; add it at the top and keep settings under [grid] and [ai]",
                    path.display()
                )
            })?;
        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if self.grid.page_size == Some(0) {
            bail!("grid.page_size in {} must be positive", path.display());
        }

        let provider = self.provider_kind()?;
        if provider == ProviderKind::Custom && self.ai_base_url().is_none() {
            bail!(
                "ai.base_url in {} is required for provider = \"custom\"; set it to the endpoint URL",
                path.display()
            );
        }

        if let Some(timeout) = &self.ai.timeout
            && parse_duration(timeout)? <= Duration::ZERO
        {
            bail!(
                "ai.timeout in {} must be positive, got {}",
                path.display(),
                timeout
            );
        }

        if let Some(temperature) = self.ai.temperature
            && !(0.0..=2.0).contains(&temperature)
        {
            bail!(
                "ai.temperature in {} must be between 0 and 2, got {}",
                path.display(),
                temperature
            );
        }

        if self.ai.max_tokens == Some(0) {
            bail!("ai.max_tokens in {} must be positive", path.display());
        }

        if let Some(threshold) = self.ai.confidence_threshold
            && !(0.0..=1.0).contains(&threshold)
        {
            bail!(
                "ai.confidence_threshold in {} must be between 0 and 1, got {}",
                path.display(),
                threshold
            );
        }

        Ok(())
    }

    pub fn page_size(&self) -> usize {
        self.grid.page_size.unwrap_or(DEFAULT_PAGE_SIZE)
    }

    pub fn grid_features(&self) -> GridFeatures {
        GridFeatures {
            enable_multi_row_selection: self.grid.multi_select.unwrap_or(true),
            strict_references: self.grid.strict.unwrap_or(false),
            ..GridFeatures::default()
        }
    }

    pub fn ai_enabled(&self) -> bool {
        self.ai.enabled.unwrap_or(true)
    }

    pub fn provider_kind(&self) -> Result<ProviderKind> {
        let raw = self.ai.provider.as_deref().unwrap_or(DEFAULT_PROVIDER);
        ProviderKind::parse(raw).ok_or_else(|| {
            let known: Vec<&str> = ProviderKind::ALL.iter().map(|kind| kind.as_str()).collect();
            anyhow!(
                "unknown ai.provider {raw:?}; use one of: {}",
                known.join(", ")
            )
        })
    }

    pub fn ai_base_url(&self) -> Option<&str> {
        self.ai
            .base_url
            .as_deref()
            .map(|url| url.trim_end_matches('/'))
            .filter(|url| !url.is_empty())
    }

    pub fn ai_model(&self) -> &str {
        self.ai.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    /// `None` leaves the provider's own default in place (30s, 60s for ollama).
    pub fn ai_timeout(&self) -> Result<Option<Duration>> {
        self.ai.timeout.as_deref().map(parse_duration).transpose()
    }

    pub fn confidence_threshold(&self) -> f64 {
        self.ai
            .confidence_threshold
            .unwrap_or(DEFAULT_CONFIDENCE_THRESHOLD)
    }

    /// The variable the API key is read from: `ai.api_key_env`, else the
    /// provider's conventional one.
    pub fn api_key_env(&self) -> Result<Option<String>> {
        if let Some(name) = &self.ai.api_key_env {
            return Ok(Some(name.clone()));
        }
        Ok(match self.provider_kind()? {
            ProviderKind::OpenAi => Some("OPENAI_API_KEY".to_owned()),
            ProviderKind::Anthropic => Some("ANTHROPIC_API_KEY".to_owned()),
            ProviderKind::Ollama | ProviderKind::Custom => None,
        })
    }

    pub fn provider_config(&self) -> Result<ProviderConfig> {
        let api_key = match self.api_key_env()? {
            Some(name) => env::var(&name).unwrap_or_default(),
            None => String::new(),
        };
        let model = self.ai_model().to_owned();
        let base_url = self.ai_base_url().map(str::to_owned);

        Ok(match self.provider_kind()? {
            ProviderKind::OpenAi => ProviderConfig::OpenAi {
                base_url: base_url.unwrap_or_else(default_openai_url),
                api_key,
                model,
            },
            ProviderKind::Anthropic => {
                if api_key.is_empty() {
                    bail!(
                        "no API key for provider = \"anthropic\"; export {} or point ai.api_key_env at the variable holding it",
                        self.api_key_env()?.unwrap_or_default()
                    );
                }
                ProviderConfig::Anthropic {
                    base_url: base_url.unwrap_or_else(default_anthropic_url),
                    api_key,
                    model,
                }
            }
            ProviderKind::Ollama => ProviderConfig::Ollama {
                base_url: base_url.unwrap_or_else(default_ollama_url),
                model,
            },
            ProviderKind::Custom => {
                let mut headers = BTreeMap::new();
                if !api_key.is_empty() {
                    headers.insert("Authorization".to_owned(), format!("Bearer {api_key}"));
                }
                ProviderConfig::Custom {
                    endpoint: base_url.ok_or_else(|| {
                        anyhow!("ai.base_url is required for provider = \"custom\"")
                    })?,
                    model: Some(model),
                    headers,
                    body_format: Default::default(),
                }
            }
        })
    }

    pub fn invoke_options(&self) -> Result<InvokeOptions> {
        Ok(InvokeOptions {
            model: None,
            temperature: self.ai.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            max_tokens: self.ai.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            timeout: self.ai_timeout()?,
            json_mode: self.ai.json_mode.unwrap_or(true),
            extra_headers: self.ai.headers.clone(),
        })
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# sift config\n# Place this file at: {}\n\nversion = 1\n\n[grid]\npage_size = {}\nmulti_select = true\n# Reject unknown column and row ids instead of ignoring them.\nstrict = false\n\n[ai]\nenabled = true\n# One of: openai, anthropic, ollama, custom\nprovider = \"{}\"\n# Optional. Defaults to the provider's public endpoint; required for custom.\n# base_url = \"http://localhost:11434\"\nmodel = \"{}\"\n# Environment variable holding the API key.\n# api_key_env = \"OPENAI_API_KEY\"\n# Defaults to 30s, or 60s for ollama.\n# timeout = \"30s\"\ntemperature = {}\nmax_tokens = {}\njson_mode = true\nconfidence_threshold = {}\n\n[ai.headers]\n# X-Team = \"data\"\n",
            path.display(),
            DEFAULT_PAGE_SIZE,
            DEFAULT_PROVIDER,
            DEFAULT_MODEL,
            DEFAULT_TEMPERATURE,
            DEFAULT_MAX_TOKENS,
            DEFAULT_CONFIDENCE_THRESHOLD,
        )
    }
}

/// Accepts `<N>ms`, `<N>s` or `<N>m`.
pub fn parse_duration(raw: &str) -> Result<Duration> {
    let raw = raw.trim();
    let (count, millis_per_unit) = if let Some(count) = raw.strip_suffix("ms") {
        (count, 1)
    } else if let Some(count) = raw.strip_suffix('s') {
        (count, 1_000)
    } else if let Some(count) = raw.strip_suffix('m') {
        (count, 60_000)
    } else {
        bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 500ms or 30s)");
    };
    let count: u64 = count
        .trim()
        .parse()
        .with_context(|| format!("invalid duration {raw:?}; expected a whole number before the unit"))?;
    Ok(Duration::from_millis(count.saturating_mul(millis_per_unit)))
}
