//! Startup errors. Anything here aborts the run before a robot is spawned.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read seed file {path}: {source}")]
    SeedUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("seed file {path} is empty")]
    SeedEmpty { path: PathBuf },

    #[error("seed file {path} does not hold an integer: {value:?}")]
    SeedInvalid { path: PathBuf, value: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
