//! Network interface throughput block

use crate::shared;
use async_trait::async_trait;
use rg_blocks_core::{
    Block, BlockConfig, BlockInitError, BlockMetadata, BoxedBlock, Color, Failure, FieldMetadata,
    FieldPurpose, FieldType, Fragment, Template, ThresholdMap,
};
use rg_blocks_types::block_configs::{NetworkBlockConfig, SpeedUnit};
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Cumulative byte counters of one interface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Counters {
    received: u64,
    transmitted: u64,
}

/// Upload and download rate in bytes per second between two readings
fn rates(prev: Counters, now: Counters, elapsed: Duration) -> (f64, f64) {
    let secs = elapsed.as_secs_f64();
    if secs <= 0.0 {
        return (0.0, 0.0);
    }
    (
        now.transmitted.saturating_sub(prev.transmitted) as f64 / secs,
        now.received.saturating_sub(prev.received) as f64 / secs,
    )
}

pub struct NetworkBlock {
    metadata: BlockMetadata,
    interface: String,
    unit: SpeedUnit,
    format: Template,
    colors: ThresholdMap<Option<Color>>,
    interval: Duration,
    previous: Option<(Counters, Instant)>,
    values: HashMap<String, Value>,
}

impl NetworkBlock {
    pub fn new(config: &NetworkBlockConfig) -> Result<Self, BlockInitError> {
        Ok(Self {
            metadata: BlockMetadata::new(
                "network",
                "Network interface traffic",
                Duration::from_secs(3),
            ),
            interface: config.interface.clone(),
            unit: config.unit,
            format: Template::parse(&config.format, &Self::field_list())?,
            colors: config.colors.clone(),
            interval: Duration::from_millis(config.interval_ms),
            previous: None,
            values: HashMap::with_capacity(6),
        })
    }

    fn field_list() -> Vec<FieldMetadata> {
        vec![
            FieldMetadata::text("interface", "Interface name"),
            FieldMetadata::value("upload", "Upload speed"),
            FieldMetadata::value("download", "Download speed"),
            FieldMetadata::new("unit", "Speed unit", FieldType::Text, FieldPurpose::Unit),
            FieldMetadata::new(
                "total_upload",
                "Bytes transmitted since boot",
                FieldType::Numerical,
                FieldPurpose::SecondaryValue,
            ),
            FieldMetadata::new(
                "total_download",
                "Bytes received since boot",
                FieldType::Numerical,
                FieldPurpose::SecondaryValue,
            ),
        ]
    }

    /// First reading after startup reports zero speed
    fn render(&mut self, counters: Counters, at: Instant) -> Fragment {
        let (upload, download) = match self.previous {
            Some((prev, prev_at)) => rates(prev, counters, at.saturating_duration_since(prev_at)),
            None => (0.0, 0.0),
        };
        self.previous = Some((counters, at));

        let divisor = self.unit.bytes();
        self.values.clear();
        self.values
            .insert("interface".to_string(), Value::from(self.interface.as_str()));
        self.values
            .insert("upload".to_string(), Value::from(upload / divisor));
        self.values
            .insert("download".to_string(), Value::from(download / divisor));
        self.values
            .insert("unit".to_string(), Value::from(self.unit.label()));
        self.values
            .insert("total_upload".to_string(), Value::from(counters.transmitted));
        self.values
            .insert("total_download".to_string(), Value::from(counters.received));

        Fragment::new(self.format.render(&self.values))
            .with_color(self.colors.resolve_flat(upload.max(download)).copied())
    }
}

#[async_trait]
impl Block for NetworkBlock {
    fn metadata(&self) -> &BlockMetadata {
        &self.metadata
    }

    fn fields(&self) -> Vec<FieldMetadata> {
        Self::field_list()
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn poll(&mut self) -> Result<Fragment, Failure> {
        let counters = {
            let mut networks = shared::networks()?;
            networks.refresh_list();
            networks
                .iter()
                .find(|(name, _)| name.as_str() == self.interface)
                .map(|(_, data)| Counters {
                    received: data.total_received(),
                    transmitted: data.total_transmitted(),
                })
        };

        match counters {
            Some(counters) => Ok(self.render(counters, Instant::now())),
            None => {
                self.previous = None;
                Err(Failure::unavailable(format!(
                    "interface {} not found",
                    self.interface
                )))
            }
        }
    }
}

pub fn build(config: &BlockConfig) -> Result<BoxedBlock, BlockInitError> {
    match config {
        BlockConfig::Network(cfg) => Ok(Box::new(NetworkBlock::new(cfg)?)),
        other => Err(BlockInitError::WrongConfig {
            expected: "network",
            actual: other.block_type(),
        }),
    }
}
