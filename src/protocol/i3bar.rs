//! i3bar JSON protocol.
//!
//! Output is a header object, then an endless JSON array whose elements
//! are status lines; each line is itself an array of block records.
//! Input, when click events are enabled, is an endless array of click
//! event objects, one per line.

use rg_blocks_core::{ClickEvent, Fragment};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, Lines};

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// First object written to the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub version: u32,
    pub click_events: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_signal: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cont_signal: Option<i32>,
}

impl Default for Header {
    fn default() -> Self {
        Self {
            version: 1,
            click_events: true,
            stop_signal: None,
            cont_signal: None,
        }
    }
}

/// Header line followed by the opening bracket of the infinite array
pub fn encode_header(header: &Header) -> Result<String, ProtocolError> {
    Ok(format!("{}\n[\n", serde_json::to_string(header)?))
}

/// One status line. Blocks that have not rendered anything yet are
/// left out; the rest keep their order.
pub fn encode_line(fragments: &[Option<Arc<Fragment>>]) -> Result<String, ProtocolError> {
    let present: Vec<&Fragment> = fragments.iter().flatten().map(|f| f.as_ref()).collect();
    Ok(format!("{},\n", serde_json::to_string(&present)?))
}

/// Parse one line of the event stream. Returns `None` for lines that
/// carry no event: the opening `[`, the closing `]` and blank lines.
pub fn parse_event(line: &str) -> Result<Option<ClickEvent>, ProtocolError> {
    let line = line.trim();
    let line = line.strip_prefix(',').unwrap_or(line).trim_start();
    if line.is_empty() || line == "[" || line == "]" {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(line)?))
}

/// Writes status lines to the host, flushing after each
pub struct StatusWriter<W> {
    out: W,
}

impl<W: AsyncWrite + Unpin> StatusWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub async fn write_header(&mut self, header: &Header) -> Result<(), ProtocolError> {
        self.write(&encode_header(header)?).await
    }

    pub async fn write_line(
        &mut self,
        fragments: &[Option<Arc<Fragment>>],
    ) -> Result<(), ProtocolError> {
        self.write(&encode_line(fragments)?).await
    }

    async fn write(&mut self, text: &str) -> Result<(), ProtocolError> {
        self.out.write_all(text.as_bytes()).await?;
        self.out.flush().await?;
        Ok(())
    }
}

/// Reads click events from the host
pub struct EventReader<R> {
    lines: Lines<R>,
}

impl<R: AsyncBufRead + Unpin> EventReader<R> {
    pub fn new(input: R) -> Self {
        Self {
            lines: input.lines(),
        }
    }

    /// Next well-formed event, or `None` once the host closes its end.
    /// Malformed lines are logged and skipped.
    pub async fn next_event(&mut self) -> Result<Option<ClickEvent>, ProtocolError> {
        while let Some(line) = self.lines.next_line().await? {
            match parse_event(&line) {
                Ok(Some(event)) => return Ok(Some(event)),
                Ok(None) => {}
                Err(e) => log::warn!("Skipping malformed event line {:?}: {}", line, e),
            }
        }
        Ok(None)
    }
}
