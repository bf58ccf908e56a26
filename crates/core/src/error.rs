//! Error types raised while building and registering blocks

use crate::template::TemplateError;
use thiserror::Error;

/// A block could not be constructed from its configuration
#[derive(Debug, Error)]
pub enum BlockInitError {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("expected a '{expected}' config, got '{actual}'")]
    WrongConfig {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("{0}")]
    Invalid(String),
}

/// Registration-time contract violations. These are fatal: a runner never
/// continues with a misconfigured block set.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("unknown block type '{0}'")]
    UnknownType(String),

    #[error("block identity '{0}' is already registered")]
    DuplicateIdentity(String),

    #[error("cannot register block '{0}' after the runner has started")]
    AlreadyStarted(String),

    #[error("block '{name}' cannot be refreshed by signal {signal}")]
    InvalidSignal { name: String, signal: i32 },

    #[error("invalid configuration for block '{name}': {source}")]
    InvalidConfig {
        name: String,
        #[source]
        source: BlockInitError,
    },
}
