use thiserror::Error;

#[derive(Debug, Error)]
pub enum DetectError {
    #[error("no game config registered for id: {0}")]
    UnknownGame(String),
}
