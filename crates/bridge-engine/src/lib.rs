//! mgba-bridge Engine library: TCP protocol engine, Chat Buffer, and HTTP
//! surface. The binary (`main.rs`) is a thin composition shell over this.

pub mod buffer;
pub mod config;
pub mod error;
pub mod frame;
pub mod http;
pub mod launch;
pub mod notepad;
pub mod session;
pub mod state;

pub use config::AppConfig;
pub use session::ProtocolEngine;
pub use state::AppState;
