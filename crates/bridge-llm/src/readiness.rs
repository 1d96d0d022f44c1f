//! Screenshot readiness wait (spec §4.3): before reading a screenshot path,
//! poll until the file exists and its size is non-zero and stable across one
//! polling tick, bounded by `max(base_stabilization_ms * category_multiplier,
//! max_wait_ms)`.

use std::time::Duration;
use tokio::time::Instant;

use mgba_bridge_protocol::ActionClass;

use crate::error::LlmError;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Timing knobs mirrored from the config store's `Timing` record (kept as a
/// plain struct here so `bridge-llm` doesn't need to depend on
/// `bridge-config` for a handful of numbers).
#[derive(Debug, Clone, Copy)]
pub struct ReadinessConfig {
    pub base_stabilization_ms: u64,
    pub movement_multiplier: f64,
    pub interaction_multiplier: f64,
    pub menu_multiplier: f64,
    pub max_wait_ms: u64,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            base_stabilization_ms: 500,
            movement_multiplier: 1.0,
            interaction_multiplier: 1.5,
            menu_multiplier: 2.0,
            max_wait_ms: 5_000,
        }
    }
}

impl ReadinessConfig {
    /// `max(base_stabilization_ms * category_multiplier, max_wait_ms)` per §4.3.
    pub fn max_wait(&self, class: ActionClass) -> Duration {
        let multiplier = class.multiplier(
            self.movement_multiplier,
            self.interaction_multiplier,
            self.menu_multiplier,
        );
        let scaled = (self.base_stabilization_ms as f64 * multiplier) as u64;
        Duration::from_millis(scaled.max(self.max_wait_ms))
    }
}

/// Wait for `path` to exist with non-zero size, stable for one polling tick.
pub async fn wait_until_ready(path: &str, timeout: Duration) -> Result<(), LlmError> {
    let deadline = Instant::now() + timeout;
    let mut last_size: Option<u64> = None;

    loop {
        if let Ok(metadata) = tokio::fs::metadata(path).await {
            let len = metadata.len();
            if len > 0 {
                if last_size == Some(len) {
                    return Ok(());
                }
                last_size = Some(len);
            }
        }

        if Instant::now() >= deadline {
            return Err(LlmError::FileMissing(path.to_string()));
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_wait_takes_the_larger_of_scaled_and_floor() {
        let config = ReadinessConfig {
            base_stabilization_ms: 500,
            movement_multiplier: 1.0,
            interaction_multiplier: 1.5,
            menu_multiplier: 2.0,
            max_wait_ms: 5_000,
        };
        assert_eq!(
            config.max_wait(ActionClass::Interaction),
            Duration::from_millis(5_000)
        );

        let config = ReadinessConfig {
            base_stabilization_ms: 10_000,
            max_wait_ms: 1_000,
            ..config
        };
        assert_eq!(
            config.max_wait(ActionClass::Menu),
            Duration::from_millis(20_000)
        );
    }

    #[tokio::test]
    async fn ready_once_file_exists_with_stable_nonzero_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cur.png");
        tokio::fs::write(&path, b"\x89PNG\r\n").await.unwrap();

        let result =
            wait_until_ready(path.to_str().unwrap(), Duration::from_millis(500)).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn times_out_when_file_never_appears() {
        let result =
            wait_until_ready("/nonexistent/never.png", Duration::from_millis(120)).await;
        assert!(matches!(result, Err(LlmError::FileMissing(_))));
    }
}
