pub mod config;
pub mod error;
pub mod types;

pub use config::ScoutConfig;
pub use error::{Result, ScoutError};
pub use types::{ChatMode, Phase, TurnEvent, TurnRequest};
