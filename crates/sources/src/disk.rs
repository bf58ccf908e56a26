//! Disk usage block for one mount point

use crate::shared;
use async_trait::async_trait;
use rg_blocks_core::{
    Block, BlockConfig, BlockInitError, BlockMetadata, BoxedBlock, Color, Failure, FieldMetadata,
    FieldPurpose, FieldType, Fragment, Template, ThresholdMap,
};
use rg_blocks_types::block_configs::{DiskBlockConfig, DiskUnit};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// `/media/backup/Downloads` becomes `/m/b/D`
pub fn short_label(path: &str) -> String {
    let initials: Vec<String> = path
        .split('/')
        .filter_map(|part| part.chars().next())
        .map(String::from)
        .collect();
    format!("/{}", initials.join("/"))
}

pub struct DiskBlock {
    metadata: BlockMetadata,
    path: String,
    label: String,
    unit: DiskUnit,
    format: Template,
    colors: ThresholdMap<Option<Color>>,
    interval: Duration,
    values: HashMap<String, Value>,
}

impl DiskBlock {
    pub fn new(config: &DiskBlockConfig) -> Result<Self, BlockInitError> {
        let label = if config.short_label {
            short_label(&config.path)
        } else {
            config.path.clone()
        };

        Ok(Self {
            metadata: BlockMetadata::new("disk", "Disk usage of a mount point", Duration::from_secs(5)),
            path: config.path.clone(),
            label,
            unit: config.unit,
            format: Template::parse(&config.format, &Self::field_list())?,
            colors: config.colors.clone(),
            interval: Duration::from_millis(config.interval_ms),
            values: HashMap::with_capacity(7),
        })
    }

    fn field_list() -> Vec<FieldMetadata> {
        vec![
            FieldMetadata::text("label", "Mount point, possibly abbreviated"),
            FieldMetadata::text("path", "Mount point"),
            FieldMetadata::value("free", "Available space"),
            FieldMetadata::value("used", "Used space"),
            FieldMetadata::value("total", "Total space"),
            FieldMetadata::percent("percent", "Used percentage"),
            FieldMetadata::new("unit", "Unit of the space fields", FieldType::Text, FieldPurpose::Unit),
        ]
    }

    fn render(&mut self, total: u64, available: u64) -> Fragment {
        let used = total.saturating_sub(available);
        let percent = if total == 0 {
            0.0
        } else {
            used as f64 / total as f64 * 100.0
        };
        let divisor = self.unit.bytes();
        let scale = |bytes: u64| Value::from(bytes as f64 / divisor);

        self.values.clear();
        self.values
            .insert("label".to_string(), Value::from(self.label.as_str()));
        self.values
            .insert("path".to_string(), Value::from(self.path.as_str()));
        self.values.insert("free".to_string(), scale(available));
        self.values.insert("used".to_string(), scale(used));
        self.values.insert("total".to_string(), scale(total));
        self.values.insert("percent".to_string(), Value::from(percent));
        self.values
            .insert("unit".to_string(), Value::from(self.unit.label()));

        Fragment::new(self.format.render(&self.values))
            .with_color(self.colors.resolve_flat(percent).copied())
    }
}

#[async_trait]
impl Block for DiskBlock {
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
        let found = {
            let mut disks = shared::disks()?;
            disks.refresh_list();
            disks
                .iter()
                .find(|disk| disk.mount_point() == Path::new(&self.path))
                .map(|disk| (disk.total_space(), disk.available_space()))
        };

        match found {
            Some((total, available)) => Ok(self.render(total, available)),
            None => Err(Failure::unavailable(format!("{} is not mounted", self.path))),
        }
    }
}

pub fn build(config: &BlockConfig) -> Result<BoxedBlock, BlockInitError> {
    match config {
        BlockConfig::Disk(cfg) => Ok(Box::new(DiskBlock::new(cfg)?)),
        other => Err(BlockInitError::WrongConfig {
            expected: "disk",
            actual: other.block_type(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rg_blocks_core::FailureReason;

    #[test]
    fn test_short_label() {
        assert_eq!(short_label("/media/backup/Downloads"), "/m/b/D");
        assert_eq!(short_label("/"), "/");
    }

    #[test]
    fn test_render_in_configured_unit() {
        let mut block = DiskBlock::new(&DiskBlockConfig {
            path: "/home/user".to_string(),
            short_label: true,
            unit: DiskUnit::MiB,
            format: "{label} {free:.0}{unit} {percent:.0}%".to_string(),
            ..Default::default()
        })
        .unwrap();

        let mib = 1024 * 1024;
        let fragment = block.render(100 * mib, 4 * mib);
        assert_eq!(fragment.full_text, "/h/u 4MiB 96%");
        assert_eq!(fragment.color, Some(Color::URGENT));
    }

    #[tokio::test]
    async fn test_unmounted_path_is_unavailable() {
        let mut block = DiskBlock::new(&DiskBlockConfig {
            path: "/definitely/not/a/mount/point".to_string(),
            ..Default::default()
        })
        .unwrap();

        let failure = block.poll().await.unwrap_err();
        assert_eq!(failure.reason, FailureReason::Unavailable);
    }
}
