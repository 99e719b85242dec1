use std::env;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub bind_addr: String,
    pub history_base_url: String,
    pub feedback_enabled: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            bind_addr: env::var("ANSWERVIEW_BIND").unwrap_or_else(|_| "127.0.0.1:8090".to_string()),
            history_base_url: env::var("HISTORY_BASE_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:50505".to_string()),
            feedback_enabled: env::var("FEEDBACK_ENABLED")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
        }
    }
}
