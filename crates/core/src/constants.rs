//! Shared constants for the application

use std::time::Duration;

/// Upper bound the runtime enforces on a single `poll` or `on_event` call
/// when the configuration does not say otherwise
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(5000);

pub const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;
