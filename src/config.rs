//! Environment-driven configuration
//!
//! Binaries load `.env` first (dotenv), then call `AgentConfig::from_env`.

use crate::error::OrchestrationError;
use crate::Result;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_PAYLOAD_LIMIT: usize = 4000;
pub const DEFAULT_CONTEXT_EXCHANGES: usize = 2;
pub const DEFAULT_STEP_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_MAX_SESSIONS: usize = 1000;
pub const DEFAULT_SESSION_IDLE_SECS: u64 = 30 * 60;

#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.1,
            max_output_tokens: 4096,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub llm: LlmSettings,
    /// Root URL of the tool service. `None` leaves remote tools unconfigured.
    pub tools_base_url: Option<String>,
    pub memory_max_exchanges: usize,
    pub context_exchanges: usize,
    pub payload_char_limit: usize,
    /// `None` means steps may run indefinitely.
    pub step_timeout: Option<Duration>,
    pub port: u16,
    /// API sessions kept at once; the least recently used goes first.
    pub max_sessions: usize,
    /// API sessions untouched this long are dropped.
    pub session_idle: Duration,
    pub log_level: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            llm: LlmSettings::default(),
            tools_base_url: None,
            memory_max_exchanges: crate::memory::DEFAULT_MAX_EXCHANGES,
            context_exchanges: DEFAULT_CONTEXT_EXCHANGES,
            payload_char_limit: DEFAULT_PAYLOAD_LIMIT,
            step_timeout: Some(Duration::from_secs(DEFAULT_STEP_TIMEOUT_SECS)),
            port: DEFAULT_PORT,
            max_sessions: DEFAULT_MAX_SESSIONS,
            session_idle: Duration::from_secs(DEFAULT_SESSION_IDLE_SECS),
            log_level: "info".to_string(),
        }
    }
}

impl AgentConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let first = |keys: &[&str]| keys.iter().find_map(|k| get(*k));

        let defaults = Self::default();

        let llm = LlmSettings {
            api_key: first(&["GEMINI_API_KEY", "GOOGLE_API_KEY"]).unwrap_or_default(),
            model: get("LLM_MODEL").unwrap_or(defaults.llm.model),
            temperature: parse_or("LLM_TEMPERATURE", get("LLM_TEMPERATURE"), defaults.llm.temperature)?,
            max_output_tokens: parse_or(
                "LLM_MAX_TOKENS",
                get("LLM_MAX_TOKENS"),
                defaults.llm.max_output_tokens,
            )?,
        };

        let timeout_secs: u64 = parse_or(
            "STEP_TIMEOUT_SECS",
            get("STEP_TIMEOUT_SECS"),
            DEFAULT_STEP_TIMEOUT_SECS,
        )?;

        Ok(Self {
            llm,
            tools_base_url: first(&["FINANCIAL_API_BASE_URL", "TOOLS_API_BASE_URL"])
                .map(|url| url.trim_end_matches('/').to_string()),
            memory_max_exchanges: parse_or(
                "MEMORY_MAX_TURNS",
                get("MEMORY_MAX_TURNS"),
                defaults.memory_max_exchanges,
            )?,
            context_exchanges: parse_or(
                "CONTEXT_TURNS",
                get("CONTEXT_TURNS"),
                defaults.context_exchanges,
            )?,
            payload_char_limit: parse_or(
                "SYNTH_PAYLOAD_LIMIT",
                get("SYNTH_PAYLOAD_LIMIT"),
                defaults.payload_char_limit,
            )?,
            step_timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
            port: match get("PORT") {
                Some(v) => parse_or("PORT", Some(v), defaults.port)?,
                None => parse_or("API_PORT", get("API_PORT"), defaults.port)?,
            },
            max_sessions: parse_or("SESSION_MAX", get("SESSION_MAX"), defaults.max_sessions)?,
            session_idle: Duration::from_secs(parse_or(
                "SESSION_IDLE_SECS",
                get("SESSION_IDLE_SECS"),
                DEFAULT_SESSION_IDLE_SECS,
            )?),
            log_level: get("LOG_LEVEL")
                .map(|v| v.to_lowercase())
                .unwrap_or(defaults.log_level),
        })
    }
}

fn parse_or<T: FromStr>(key: &str, value: Option<String>, default: T) -> Result<T> {
    match value {
        None => Ok(default),
        Some(raw) => raw.parse::<T>().map_err(|_| {
            OrchestrationError::ConfigError(format!("{} has an invalid value: '{}'", key, raw))
        }),
    }
}
