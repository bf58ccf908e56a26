//! Clock block
//!
//! Shows local time through a strftime format. Clicking the block flips
//! between the time and date formats.

use async_trait::async_trait;
use chrono::format::{Item, StrftimeItems};
use chrono::Local;
use rg_blocks_core::{
    Block, BlockConfig, BlockInitError, BlockMetadata, BoxedBlock, ClickEvent, Failure, Fragment,
};
use rg_blocks_types::block_configs::ClockBlockConfig;
use std::time::Duration;

/// Reject formats chrono cannot render, since rendering them panics
fn check_format(format: &str) -> Result<(), BlockInitError> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(BlockInitError::Invalid(format!(
            "invalid strftime format '{}'",
            format
        )));
    }
    Ok(())
}

pub struct ClockBlock {
    metadata: BlockMetadata,
    formats: [String; 2],
    current: usize,
    interval: Duration,
}

impl ClockBlock {
    pub fn new(config: &ClockBlockConfig) -> Result<Self, BlockInitError> {
        check_format(&config.format_time)?;
        check_format(&config.format_date)?;

        Ok(Self {
            metadata: BlockMetadata::new("clock", "Local date and time", Duration::from_secs(1)),
            formats: [config.format_time.clone(), config.format_date.clone()],
            current: 0,
            interval: Duration::from_millis(config.interval_ms),
        })
    }

    fn render(&self) -> String {
        Local::now().format(&self.formats[self.current]).to_string()
    }
}

#[async_trait]
impl Block for ClockBlock {
    fn metadata(&self) -> &BlockMetadata {
        &self.metadata
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn poll(&mut self) -> Result<Fragment, Failure> {
        Ok(Fragment::new(self.render()))
    }

    async fn on_event(&mut self, _event: &ClickEvent) {
        self.current = (self.current + 1) % self.formats.len();
    }
}

pub fn build(config: &BlockConfig) -> Result<BoxedBlock, BlockInitError> {
    match config {
        BlockConfig::Clock(cfg) => Ok(Box::new(ClockBlock::new(cfg)?)),
        other => Err(BlockInitError::WrongConfig {
            expected: "clock",
            actual: other.block_type(),
        }),
    }
}
