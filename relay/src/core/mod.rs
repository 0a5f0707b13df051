//! Core application infrastructure

pub mod cli;
pub mod config;
pub mod constants;
pub mod credential;

pub use crate::app::RelayApp;
pub use cli::{CliConfig, Commands};
pub use config::{RelayConfig, UploadConfig};
pub use credential::{BearerToken, TokenSource};
