use crate::intake::client::LlmConfig;

/// Startup configuration, read from the environment exactly once and passed
/// into the server explicitly.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub database_path: String,
    pub llm: LlmConfig,
    pub llm_timeout_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        AppConfig {
            bind_addr: std::env::var("BIND_ADDR")
                .unwrap_or_else(|_| "127.0.0.1:8080".to_string()),
            database_path: std::env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "data/aidline.db".to_string()),
            llm: LlmConfig {
                api_key: std::env::var("GEMINI_API_KEY").ok().filter(|k| !k.is_empty()),
                model: std::env::var("GEMINI_MODEL")
                    .unwrap_or_else(|_| "gemini-2.5-flash".to_string()),
            },
            llm_timeout_secs: std::env::var("LLM_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(20),
        }
    }
}
