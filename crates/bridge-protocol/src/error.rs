//! Wire-level error taxonomy (§7 `ProtocolFraming`), kept in the shared
//! vocabulary crate since both the engine's reader and any future client
//! need the same classification of a malformed frame.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ProtocolError {
    #[error("malformed frame: {0}")]
    MalformedFrame(String),
}
