use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, ensure};

/// Runtime configuration from `COURIER_*` environment variables; a `.env`
/// file is honored when present.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub chat_db_path: PathBuf,
    pub service: String,
    pub poll_interval: Duration,
    pub history_limit: u32,
    pub send_retries: u32,
    pub send_retry_delay: Duration,
    pub typing_indicator: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let host = env_or("COURIER_HOST", "0.0.0.0");
        let port = env_or("COURIER_PORT", "8765")
            .parse()
            .context("COURIER_PORT must be a port number")?;

        let db_path = PathBuf::from(env_or("COURIER_DB_PATH", "courier.db"));
        let chat_db_path = std::env::var("COURIER_CHAT_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_chat_db_path());
        let service = env_or("COURIER_SERVICE", "iMessage");

        let poll_interval_ms: u64 = env_or("COURIER_POLL_INTERVAL_MS", "500")
            .parse()
            .context("COURIER_POLL_INTERVAL_MS must be an integer")?;
        ensure!(
            poll_interval_ms > 0,
            "COURIER_POLL_INTERVAL_MS must be positive"
        );

        let history_limit = env_or("COURIER_HISTORY_LIMIT", "100")
            .parse()
            .context("COURIER_HISTORY_LIMIT must be a non-negative integer")?;

        let send_retries = env_or("COURIER_SEND_RETRIES", "3")
            .parse()
            .context("COURIER_SEND_RETRIES must be an integer")?;
        ensure!(send_retries > 0, "COURIER_SEND_RETRIES must be positive");

        let send_retry_delay_ms: u64 = env_or("COURIER_SEND_RETRY_DELAY_MS", "1000")
            .parse()
            .context("COURIER_SEND_RETRY_DELAY_MS must be an integer")?;

        let typing_indicator = env_or("COURIER_TYPING_INDICATOR", "true")
            .to_lowercase()
            .parse()
            .context("COURIER_TYPING_INDICATOR must be true or false")?;

        Ok(Self {
            host,
            port,
            db_path,
            chat_db_path,
            service,
            poll_interval: Duration::from_millis(poll_interval_ms),
            history_limit,
            send_retries,
            send_retry_delay: Duration::from_millis(send_retry_delay_ms),
            typing_indicator,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// The Messages.app store lives in the current user's library.
fn default_chat_db_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_default();
    PathBuf::from(home).join("Library/Messages/chat.db")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        // Env-dependent keys are left untouched; defaults only
        let config = Config::from_env().unwrap();
        assert_eq!(config.port, 8765);
        assert_eq!(config.service, "iMessage");
        assert_eq!(config.poll_interval, Duration::from_millis(500));
        assert_eq!(config.send_retries, 3);
        assert!(config.chat_db_path.ends_with("Library/Messages/chat.db"));
    }
}
