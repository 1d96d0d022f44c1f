//! Engine startup configuration — the handful of knobs that must be known
//! before `AppState` can be built, merged from the environment the way the
//! teacher's `AppConfig::from_env` merges `.env` values (§6 "single loopback
//! TCP port... single process").

use anyhow::Context;

const DEFAULT_TCP_PORT: u16 = 8888;
const DEFAULT_HTTP_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_DB_PATH: &str = "bridge_config.db";
const DEFAULT_CYCLE_TIMEOUT_SECS: u64 = 60;
const DEFAULT_MALFORMED_FRAME_THRESHOLD: u32 = 8;
const DEFAULT_MALFORMED_FRAME_WINDOW_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub tcp_bind_addr: String,
    pub http_bind_addr: String,
    pub db_path: String,
    pub cycle_timeout_secs: u64,
    pub malformed_frame_threshold: u32,
    pub malformed_frame_window_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let tcp_port: u16 = env_or("MGBA_BRIDGE_TCP_PORT", DEFAULT_TCP_PORT.to_string())
            .parse()
            .context("MGBA_BRIDGE_TCP_PORT must be a valid port number")?;

        Ok(Self {
            tcp_bind_addr: format!("127.0.0.1:{tcp_port}"),
            http_bind_addr: env_or("MGBA_BRIDGE_HTTP_ADDR", DEFAULT_HTTP_ADDR.to_string()),
            db_path: env_or("MGBA_BRIDGE_DB_PATH", DEFAULT_DB_PATH.to_string()),
            cycle_timeout_secs: env_or(
                "MGBA_BRIDGE_CYCLE_TIMEOUT_SECS",
                DEFAULT_CYCLE_TIMEOUT_SECS.to_string(),
            )
            .parse()
            .context("MGBA_BRIDGE_CYCLE_TIMEOUT_SECS must be an integer")?,
            malformed_frame_threshold: env_or(
                "MGBA_BRIDGE_MALFORMED_FRAME_THRESHOLD",
                DEFAULT_MALFORMED_FRAME_THRESHOLD.to_string(),
            )
            .parse()
            .context("MGBA_BRIDGE_MALFORMED_FRAME_THRESHOLD must be an integer")?,
            malformed_frame_window_secs: env_or(
                "MGBA_BRIDGE_MALFORMED_FRAME_WINDOW_SECS",
                DEFAULT_MALFORMED_FRAME_WINDOW_SECS.to_string(),
            )
            .parse()
            .context("MGBA_BRIDGE_MALFORMED_FRAME_WINDOW_SECS must be an integer")?,
        })
    }
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_env_is_unset() {
        // Use a key that is guaranteed unset in the test process rather than
        // mutating the real environment (tests run concurrently).
        assert_eq!(env_or("MGBA_BRIDGE_TEST_UNSET_KEY", "fallback".to_string()), "fallback");
    }
}
