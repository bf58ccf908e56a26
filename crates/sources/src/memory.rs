//! Memory (RAM) block

use crate::shared;
use async_trait::async_trait;
use rg_blocks_core::{
    Block, BlockConfig, BlockInitError, BlockMetadata, BoxedBlock, Color, Failure, FieldMetadata,
    FieldPurpose, FieldType, Fragment, Template, ThresholdMap, BYTES_PER_GIB,
};
use rg_blocks_types::block_configs::MemoryBlockConfig;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

/// Byte counts read from the system in one refresh
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct MemorySample {
    total: u64,
    used: u64,
    available: u64,
    swap_total: u64,
    swap_used: u64,
}

impl MemorySample {
    fn used_percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.used as f64 / self.total as f64 * 100.0
    }

    fn fill(&self, values: &mut HashMap<String, Value>) {
        let gib = |bytes: u64| Value::from(bytes as f64 / BYTES_PER_GIB);
        values.clear();
        values.insert("total".to_string(), gib(self.total));
        values.insert("used".to_string(), gib(self.used));
        values.insert("available".to_string(), gib(self.available));
        values.insert("percent".to_string(), Value::from(self.used_percent()));
        values.insert("swap_used".to_string(), gib(self.swap_used));
        values.insert("swap_total".to_string(), gib(self.swap_total));
    }
}

pub struct MemoryBlock {
    metadata: BlockMetadata,
    format: Template,
    colors: ThresholdMap<Option<Color>>,
    interval: Duration,
    values: HashMap<String, Value>,
}

impl MemoryBlock {
    pub fn new(config: &MemoryBlockConfig) -> Result<Self, BlockInitError> {
        Ok(Self {
            metadata: BlockMetadata::new(
                "memory",
                "System memory (RAM) and swap usage",
                Duration::from_secs(3),
            ),
            format: Template::parse(&config.format, &Self::field_list())?,
            colors: config.colors.clone(),
            interval: Duration::from_millis(config.interval_ms),
            values: HashMap::with_capacity(6),
        })
    }

    fn field_list() -> Vec<FieldMetadata> {
        vec![
            FieldMetadata::value("total", "Total memory in GiB"),
            FieldMetadata::value("used", "Used memory in GiB"),
            FieldMetadata::value("available", "Available memory in GiB"),
            FieldMetadata::new(
                "percent",
                "Used memory percentage",
                FieldType::Percentage,
                FieldPurpose::Value,
            ),
            FieldMetadata::new(
                "swap_used",
                "Used swap in GiB",
                FieldType::Numerical,
                FieldPurpose::SecondaryValue,
            ),
            FieldMetadata::new(
                "swap_total",
                "Total swap in GiB",
                FieldType::Numerical,
                FieldPurpose::SecondaryValue,
            ),
        ]
    }

    fn render(&mut self, sample: &MemorySample) -> Fragment {
        sample.fill(&mut self.values);
        Fragment::new(self.format.render(&self.values))
            .with_color(self.colors.resolve_flat(sample.used_percent()).copied())
    }
}

#[async_trait]
impl Block for MemoryBlock {
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
        let sample = {
            let mut system = shared::system()?;
            system.refresh_memory();
            MemorySample {
                total: system.total_memory(),
                used: system.used_memory(),
                available: system.available_memory(),
                swap_total: system.total_swap(),
                swap_used: system.used_swap(),
            }
        };

        Ok(self.render(&sample))
    }
}

pub fn build(config: &BlockConfig) -> Result<BoxedBlock, BlockInitError> {
    match config {
        BlockConfig::Memory(cfg) => Ok(Box::new(MemoryBlock::new(cfg)?)),
        other => Err(BlockInitError::WrongConfig {
            expected: "memory",
            actual: other.block_type(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_colors_by_percent() {
        let mut block = MemoryBlock::new(&MemoryBlockConfig {
            format: "{used:.1}/{total:.0}G {percent:.0}%".to_string(),
            ..Default::default()
        })
        .unwrap();

        let gib = BYTES_PER_GIB as u64;
        let fragment = block.render(&MemorySample {
            total: 16 * gib,
            used: 15 * gib,
            available: gib,
            ..Default::default()
        });

        assert_eq!(fragment.full_text, "15.0/16G 94%");
        assert_eq!(fragment.color, Some(Color::URGENT));
    }

    #[test]
    fn test_zero_total_is_zero_percent() {
        assert_eq!(MemorySample::default().used_percent(), 0.0);
    }

    #[tokio::test]
    async fn test_memory_poll() {
        let mut block = MemoryBlock::new(&MemoryBlockConfig::default()).unwrap();
        assert!(block.poll().await.is_ok());
    }
}
