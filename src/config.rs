//! Configuration file parser for ~/.config/feedbrief/config.toml.
//!
//! The config file is optional: a missing file yields `Config::default()`,
//! which carries the built-in source list and summarizer settings.
//! Unknown keys are silently ignored by serde, though we log a warning when
//! the file contains potential typos.
use crate::types::Source;
use secrecy::SecretString;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;
use url::Url;

/// Environment variable holding the text-generation API key.
pub const API_KEY_ENV: &str = "SILICONFLOW_API_KEY";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),

    /// Values parsed but violate a constraint (duplicate source, bad URL, ...).
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// Custom Debug impl masks `api_key`.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Text-generation API key. `SILICONFLOW_API_KEY` takes precedence.
    /// Absent key means every summary comes from the extractive fallback.
    pub api_key: Option<String>,

    /// Maximum entries taken from each feed per pass.
    pub entries_per_source: usize,

    /// Feeds to aggregate, in no particular order.
    pub sources: Vec<Source>,

    pub fetch: FetchConfig,
    pub summarizer: SummarizerConfig,
    pub normalizer: NormalizerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            entries_per_source: 5,
            sources: default_sources(),
            fetch: FetchConfig::default(),
            summarizer: SummarizerConfig::default(),
            normalizer: NormalizerConfig::default(),
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("entries_per_source", &self.entries_per_source)
            .field("sources", &self.sources)
            .field("fetch", &self.fetch)
            .field("summarizer", &self.summarizer)
            .field("normalizer", &self.normalizer)
            .finish()
    }
}

fn default_sources() -> Vec<Source> {
    vec![
        Source::new("36kr", "https://36kr.com/feed"),
        Source::new("geekpark", "https://www.geekpark.net/rss"),
        Source::new("cyzone", "https://special.cyzone.cn/rss"),
    ]
}

/// Feed download settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_secs: u64,
    /// Retries on HTTP 429 / 5xx, with 1s, 2s, 4s... backoff.
    pub max_retries: u32,
    pub max_feed_bytes: usize,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_retries: 2,
            max_feed_bytes: 10 * 1024 * 1024,
            user_agent: concat!("feedbrief/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// What a summarizer does once every attempt against the service failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnExhausted {
    /// Use the extractive summary of the article content.
    Fallback,
    /// Report no summary; the article is dropped.
    Drop,
}

/// Text-generation service and extractive fallback settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SummarizerConfig {
    /// Base URL of an OpenAI-compatible API; `/chat/completions` is appended.
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    /// Per-attempt timeout.
    pub timeout_secs: u64,
    pub max_retries: u32,
    /// Fixed delay between attempts.
    pub retry_delay_ms: u64,
    pub on_exhausted: OnExhausted,
    /// Upper bound on simultaneous requests to the service. 0 = unbounded.
    pub max_concurrent_requests: usize,
    /// Sentences kept by the extractive fallback.
    pub fallback_sentences: usize,
    /// Hard cut, in characters, when the content has no sentence boundary.
    pub fallback_char_budget: usize,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.siliconflow.cn/v1".to_string(),
            model: "deepseek-ai/DeepSeek-R1-Distill-Llama-8B".to_string(),
            max_tokens: 256,
            temperature: 0.1,
            top_p: 0.5,
            timeout_secs: 10,
            max_retries: 2,
            retry_delay_ms: 1000,
            on_exhausted: OnExhausted::Fallback,
            max_concurrent_requests: 8,
            fallback_sentences: 2,
            fallback_char_budget: 150,
        }
    }
}

/// Leakage filter data. The defaults target Chinese model output; any
/// working language can be configured by replacing the two word lists.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Delimiter tag name, without angle brackets.
    pub tag: String,
    /// Literal prefix removed from the start of a response.
    pub strip_prefix: String,
    /// Characters that end a sentence.
    pub terminal_marks: String,
    /// Appended to accepted summaries that lack a terminal mark.
    pub default_mark: char,
    /// Below this many characters the tag payload is considered truncated.
    pub min_chars: usize,
    pub max_chars: usize,
    /// Sentences starting with one of these are meta-commentary and removed.
    pub discourse_markers: Vec<String>,
    /// Any of these anywhere in a response rejects it.
    pub leakage_keywords: Vec<String>,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            tag: "summary".to_string(),
            strip_prefix: "AI Summary:".to_string(),
            terminal_marks: "。！？".to_string(),
            default_mark: '。',
            min_chars: 10,
            max_chars: 200,
            discourse_markers: [
                "现在开始处理",
                "首先",
                "接下来",
                "然后",
                "需要",
                "我们要",
                "让我们",
                "好的",
                "确保",
                "现在",
                "最后",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            leakage_keywords: [
                "处理",
                "总结一下",
                "我来",
                "整理",
                "思考",
                "格式要求",
                "标签包裹",
                "不添加",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Constraint violation → `Err(ConfigError::Invalid)`
    /// - Unknown keys → silently accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        let config = Self::from_toml(&content)?;
        tracing::info!(
            path = %path.display(),
            sources = config.sources.len(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        if let Ok(raw) = content.parse::<toml::Table>() {
            let known_keys = [
                "api_key",
                "entries_per_source",
                "sources",
                "fetch",
                "summarizer",
                "normalizer",
            ];
            for key in raw.keys() {
                if !known_keys.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.entries_per_source == 0 {
            return Err(ConfigError::Invalid(
                "entries_per_source must be at least 1".into(),
            ));
        }

        let mut names = HashSet::new();
        for source in &self.sources {
            if source.name.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "source with url '{}' has an empty name",
                    source.url
                )));
            }
            if !names.insert(source.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate source name '{}'",
                    source.name
                )));
            }
            let url = Url::parse(&source.url).map_err(|e| {
                ConfigError::Invalid(format!("source '{}': invalid url: {}", source.name, e))
            })?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(ConfigError::Invalid(format!(
                    "source '{}': unsupported scheme '{}' (only http/https allowed)",
                    source.name,
                    url.scheme()
                )));
            }
        }

        if self.summarizer.fallback_sentences == 0 {
            return Err(ConfigError::Invalid(
                "summarizer.fallback_sentences must be at least 1".into(),
            ));
        }

        let normalizer = &self.normalizer;
        if normalizer.tag.trim().is_empty() {
            return Err(ConfigError::Invalid("normalizer.tag must not be empty".into()));
        }
        if !normalizer.terminal_marks.contains(normalizer.default_mark) {
            return Err(ConfigError::Invalid(format!(
                "normalizer.default_mark '{}' is not one of terminal_marks '{}'",
                normalizer.default_mark, normalizer.terminal_marks
            )));
        }
        if normalizer.max_chars == 0 {
            return Err(ConfigError::Invalid(
                "normalizer.max_chars must be at least 1".into(),
            ));
        }

        Ok(())
    }

    /// The API key to use, if any. The environment wins over the file;
    /// blank values count as absent.
    pub fn api_key(&self) -> Option<SecretString> {
        self.resolve_api_key(std::env::var(API_KEY_ENV).ok())
    }

    fn resolve_api_key(&self, from_env: Option<String>) -> Option<SecretString> {
        from_env
            .filter(|k| !k.trim().is_empty())
            .or_else(|| self.api_key.clone().filter(|k| !k.trim().is_empty()))
            .map(SecretString::from)
    }
}

// ============================================================================
// Tests
// ============================================================================
