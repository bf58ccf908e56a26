//! CPU usage block

use crate::shared;
use async_trait::async_trait;
use rg_blocks_core::{
    Block, BlockConfig, BlockInitError, BlockMetadata, BoxedBlock, Color, Failure, FieldMetadata,
    FieldPurpose, FieldType, Fragment, Template, ThresholdMap,
};
use rg_blocks_types::block_configs::CpuBlockConfig;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

/// Global CPU usage. The first sample after startup reads as zero since
/// usage is measured between two refreshes.
pub struct CpuBlock {
    metadata: BlockMetadata,
    format: Template,
    colors: ThresholdMap<Option<Color>>,
    interval: Duration,
    values: HashMap<String, Value>,
}

impl CpuBlock {
    pub fn new(config: &CpuBlockConfig) -> Result<Self, BlockInitError> {
        Ok(Self {
            metadata: BlockMetadata::new("cpu", "Global CPU usage", Duration::from_secs(1)),
            format: Template::parse(&config.format, &Self::field_list())?,
            colors: config.colors.clone(),
            interval: Duration::from_millis(config.interval_ms),
            values: HashMap::with_capacity(3),
        })
    }

    fn field_list() -> Vec<FieldMetadata> {
        vec![
            FieldMetadata::percent("usage", "Global CPU usage"),
            FieldMetadata::new(
                "cores",
                "Number of logical cores",
                FieldType::Numerical,
                FieldPurpose::SecondaryValue,
            ),
            FieldMetadata::new(
                "frequency",
                "Frequency of the first core in MHz",
                FieldType::Numerical,
                FieldPurpose::SecondaryValue,
            ),
        ]
    }
}

#[async_trait]
impl Block for CpuBlock {
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
        let (usage, cores, frequency) = {
            let mut system = shared::system()?;
            system.refresh_cpu_all();
            let cpus = system.cpus();
            (
                system.global_cpu_usage() as f64,
                cpus.len(),
                cpus.first().map(|cpu| cpu.frequency()).unwrap_or(0),
            )
        };

        self.values.clear();
        self.values.insert("usage".to_string(), Value::from(usage));
        self.values.insert("cores".to_string(), Value::from(cores));
        self.values
            .insert("frequency".to_string(), Value::from(frequency));

        Ok(Fragment::new(self.format.render(&self.values))
            .with_color(self.colors.resolve_flat(usage).copied()))
    }
}

pub fn build(config: &BlockConfig) -> Result<BoxedBlock, BlockInitError> {
    match config {
        BlockConfig::Cpu(cfg) => Ok(Box::new(CpuBlock::new(cfg)?)),
        other => Err(BlockInitError::WrongConfig {
            expected: "cpu",
            actual: other.block_type(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cpu_poll_reports_cores() {
        let mut block = CpuBlock::new(&CpuBlockConfig {
            format: "{cores}".to_string(),
            ..Default::default()
        })
        .unwrap();

        let fragment = block.poll().await.unwrap();
        assert!(fragment.full_text.parse::<usize>().is_ok());
    }

    #[test]
    fn test_cpu_rejects_unknown_field() {
        let config = CpuBlockConfig {
            format: "{load}".to_string(),
            ..Default::default()
        };
        assert!(CpuBlock::new(&config).is_err());
    }
}
