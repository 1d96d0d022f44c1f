//! Aggregated infrastructure error, modeled on `infrastructure::error::InfraError`:
//! one enum the engine's call sites can `?` into, with a leaf variant per
//! collaborator crate.

use mgba_bridge_config::ConfigError;
use mgba_bridge_detect::DetectError;
use mgba_bridge_llm::LlmError;
use mgba_bridge_protocol::ProtocolError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("detector error: {0}")]
    Detect(#[from] DetectError),

    #[error("llm error: {0}")]
    Llm(#[from] LlmError),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
