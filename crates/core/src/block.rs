//! Block trait and related types

use async_trait::async_trait;
use rg_blocks_types::{ClickEvent, FieldMetadata, Fragment};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Metadata about a block type
#[derive(Debug, Clone)]
pub struct BlockMetadata {
    /// Block type identifier, e.g. `"cpu"`
    pub id: String,
    /// Description of what this block shows
    pub description: String,
    /// Recommended polling interval
    pub default_interval: Duration,
}

impl BlockMetadata {
    pub fn new(id: &str, description: &str, default_interval: Duration) -> Self {
        Self {
            id: id.to_string(),
            description: description.to_string(),
            default_interval,
        }
    }
}

/// Why a poll did not produce a fresh fragment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// The probe did not answer within its bounded timeout
    Timeout,
    /// The thing being measured is missing (unmounted disk, unknown interface)
    Unavailable,
    Io,
    /// A reply arrived but could not be decoded
    Decode,
    /// An external command failed to run
    Command,
    /// The probe panicked; its loop has ended
    Panicked,
    Other,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureReason::Timeout => "timeout",
            FailureReason::Unavailable => "unavailable",
            FailureReason::Io => "i/o error",
            FailureReason::Decode => "decode error",
            FailureReason::Command => "command failed",
            FailureReason::Panicked => "panicked",
            FailureReason::Other => "error",
        };
        f.write_str(name)
    }
}

/// A recoverable poll failure.
///
/// Carries an optional fallback fragment so the block can say how its
/// failed state should look; the runtime shows a generic urgent fragment
/// when none is supplied.
#[derive(Debug, Clone, Error)]
#[error("{reason}: {message}")]
pub struct Failure {
    pub reason: FailureReason,
    pub message: String,
    pub fallback: Option<Fragment>,
}

impl Failure {
    pub fn new(reason: FailureReason, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: message.into(),
            fallback: None,
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(FailureReason::Timeout, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(FailureReason::Unavailable, message)
    }

    pub fn with_fallback(mut self, fallback: Fragment) -> Self {
        self.fallback = Some(fallback);
        self
    }
}

impl From<anyhow::Error> for Failure {
    fn from(err: anyhow::Error) -> Self {
        Failure::new(FailureReason::Other, format!("{:#}", err))
    }
}

impl From<std::io::Error> for Failure {
    fn from(err: std::io::Error) -> Self {
        let reason = match err.kind() {
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => FailureReason::Timeout,
            _ => FailureReason::Io,
        };
        Failure::new(reason, err.to_string())
    }
}

/// Trait for all blocks
///
/// A block samples one piece of external state and renders it as a
/// fragment. The runtime owns each block exclusively and drives it from a
/// single task, so implementations never see concurrent calls.
#[async_trait]
pub trait Block: Send {
    /// Get metadata about this block type
    fn metadata(&self) -> &BlockMetadata;

    /// Fields this block offers to its format templates
    fn fields(&self) -> Vec<FieldMetadata> {
        Vec::new()
    }

    /// Minimum rest between the end of one poll and the start of the next.
    /// Zero means the block only refreshes in reaction to events.
    fn interval(&self) -> Duration {
        self.metadata().default_interval
    }

    /// Fragment shown before the first poll completes
    fn placeholder(&self) -> Option<Fragment> {
        None
    }

    /// Perform exactly one sampling cycle.
    ///
    /// Must return within a bounded time; anything recoverable is reported
    /// as a `Failure`, never as a panic.
    async fn poll(&mut self) -> Result<Fragment, Failure>;

    /// React to a pointer event. The runtime re-polls right after this
    /// returns, so implementations only need to adjust state.
    async fn on_event(&mut self, _event: &ClickEvent) {}
}

/// Type-erased block for dynamic dispatch
pub type BoxedBlock = Box<dyn Block>;
