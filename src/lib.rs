// src/lib.rs

pub mod common;
pub mod config;
pub mod controller;
pub mod logging;
pub mod reader;
pub mod runner;

// Re-export key types for convenience
pub use common::{CommandTable, Sensed, TagError, TagId, TagReader};
pub use config::{Config, ConfigError};
pub use controller::{Cycle, Session, SessionState, TagController, Transition};
pub use runner::{CommandRunner, ShellRunner};
