//! Server configuration resolved from environment variables at startup.

use std::path::PathBuf;

use recap_common::config::{env_opt, env_or, env_parse_or};

use crate::services::chat::DEFAULT_SUMMARY_PROMPT;
use crate::services::key_policy::PolicyMode;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_NUM_WORKERS: usize = 3;
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;
pub const DEFAULT_CHUNK_SECONDS: f64 = 400.0;
pub const DEFAULT_MERGE_INTERVAL_SECONDS: f64 = 15.0;
pub const DEFAULT_MAX_HISTORY: usize = 50;

pub const DEFAULT_LLM_API_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_LLM_API_MODEL: &str = "gpt-4.1-nano";
pub const DEFAULT_LLM_MAX_TOKENS: u32 = 1500;
pub const DEFAULT_LLM_TEMPERATURE: f64 = 0.2;
pub const DEFAULT_LLM_HTTP_TIMEOUT_SECS: u64 = 30;

/// LLM chat API settings.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
    /// Server-side key, used when the key policy permits.
    pub api_key: Option<String>,
    pub http_timeout_secs: u64,
    /// System prompt for per-chunk summarization.
    pub prompt: String,
}

/// Complete server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub cache_dir: PathBuf,
    pub users_dir: PathBuf,
    pub num_workers: usize,
    pub queue_capacity: usize,
    pub chunk_seconds: f64,
    pub merge_interval_seconds: f64,
    pub max_history: usize,
    pub subtitle_langs: String,
    pub key_policy_mode: PolicyMode,
    pub designated_users: Vec<String>,
    pub llm: LlmConfig,
}

impl Config {
    /// Resolve configuration from the process environment.
    pub fn from_env() -> Self {
        let num_workers = {
            let n: i64 = env_parse_or("NUM_SUMMARY_WORKERS", DEFAULT_NUM_WORKERS as i64);
            if n <= 0 {
                DEFAULT_NUM_WORKERS
            } else {
                n as usize
            }
        };

        let key_policy_mode = match env_or("SERVER_KEY_POLICY", "all").as_str() {
            "designated" => PolicyMode::Designated,
            _ => PolicyMode::All,
        };

        let designated_users = env_opt("DESIGNATED_USERS")
            .map(|list| {
                list.split(',')
                    .map(|id| id.trim().to_string())
                    .filter(|id| !id.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Config {
            port: env_parse_or("PORT", DEFAULT_PORT),
            cache_dir: PathBuf::from(env_or("CACHE_DIR", "cache")),
            users_dir: PathBuf::from(env_or("USERS_DIR", "users")),
            num_workers,
            queue_capacity: env_parse_or("JOB_QUEUE_CAPACITY", DEFAULT_QUEUE_CAPACITY),
            chunk_seconds: env_parse_or("SUMMARY_CHUNK_SECONDS", DEFAULT_CHUNK_SECONDS),
            merge_interval_seconds: env_parse_or(
                "MERGE_INTERVAL_SECONDS",
                DEFAULT_MERGE_INTERVAL_SECONDS,
            ),
            max_history: env_parse_or("MAX_USER_HISTORY", DEFAULT_MAX_HISTORY),
            subtitle_langs: env_or("SUBTITLE_LANGS", "ko"),
            key_policy_mode,
            designated_users,
            llm: LlmConfig {
                url: env_or("LLM_API_URL", DEFAULT_LLM_API_URL),
                model: env_or("LLM_API_MODEL", DEFAULT_LLM_API_MODEL),
                max_tokens: env_parse_or("LLM_API_MAX_TOKENS", DEFAULT_LLM_MAX_TOKENS),
                temperature: env_parse_or("LLM_API_TEMPERATURE", DEFAULT_LLM_TEMPERATURE),
                api_key: env_opt("LLM_API_KEY"),
                http_timeout_secs: env_parse_or(
                    "LLM_HTTP_TIMEOUT_SECS",
                    DEFAULT_LLM_HTTP_TIMEOUT_SECS,
                ),
                prompt: env_opt("SUMMARY_PROMPT")
                    .unwrap_or_else(|| DEFAULT_SUMMARY_PROMPT.to_string()),
            },
        }
    }
}
