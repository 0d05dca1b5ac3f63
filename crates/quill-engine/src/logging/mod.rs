//! `env_logger` setup behind the `log` facade used across the quill crates.

mod init;

pub use init::{init_logging, LoggingConfig};
