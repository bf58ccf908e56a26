//! Shell command block
//!
//! Runs a command through `sh -c` on every poll and shows its trimmed
//! output. Exit status can pick the color, and each mouse button can run
//! its own command before the block refreshes.

use async_trait::async_trait;
use rg_blocks_core::{
    Block, BlockConfig, BlockInitError, BlockMetadata, BoxedBlock, ClickEvent, Color, Failure,
    FailureReason, FieldMetadata, FieldPurpose, FieldType, Fragment, Template,
};
use rg_blocks_types::block_configs::ShellBlockConfig;
use serde_json::Value;
use std::collections::HashMap;
use std::hash::Hash;
use std::process::{Output, Stdio};
use std::str::FromStr;
use std::time::Duration;
use tokio::process::Command;

/// Exit status reported when the command was killed by a signal
const SIGNALLED_STATUS: i32 = -1;

fn parse_keys<K: FromStr + Eq + Hash, V: Clone>(
    map: &HashMap<String, V>,
    what: &str,
) -> Result<HashMap<K, V>, BlockInitError> {
    map.iter()
        .map(|(key, value)| {
            key.trim()
                .parse::<K>()
                .map(|k| (k, value.clone()))
                .map_err(|_| BlockInitError::Invalid(format!("invalid {} '{}'", what, key)))
        })
        .collect()
}

/// Run `command` through the shell, killing it once `timeout` expires
async fn run_shell(command: &str, timeout: Duration) -> Result<Output, Failure> {
    let child = Command::new("sh")
        .arg("-c")
        .arg(command)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| Failure::new(FailureReason::Command, format!("cannot spawn sh: {}", e)))?;

    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(output) => Ok(output?),
        Err(_) => Err(Failure::timeout(format!(
            "'{}' still running after {:?}",
            command, timeout
        ))),
    }
}

pub struct ShellBlock {
    metadata: BlockMetadata,
    command: String,
    format: Template,
    command_on_click: HashMap<u8, String>,
    color_by_returncode: HashMap<i32, Color>,
    timeout: Duration,
    interval: Duration,
    values: HashMap<String, Value>,
}

impl ShellBlock {
    pub fn new(config: &ShellBlockConfig) -> Result<Self, BlockInitError> {
        if config.command.trim().is_empty() {
            return Err(BlockInitError::Invalid("shell command is empty".to_string()));
        }

        Ok(Self {
            metadata: BlockMetadata::new("shell", "Output of a shell command", Duration::from_secs(1)),
            command: config.command.clone(),
            format: Template::parse(&config.format, &Self::field_list())?,
            command_on_click: parse_keys(&config.command_on_click, "mouse button")?,
            color_by_returncode: parse_keys(&config.color_by_returncode, "return code")?,
            timeout: Duration::from_millis(config.timeout_ms),
            interval: Duration::from_millis(config.interval_ms),
            values: HashMap::with_capacity(3),
        })
    }

    fn field_list() -> Vec<FieldMetadata> {
        vec![
            FieldMetadata::text("output", "Standard output, trimmed"),
            FieldMetadata::text("output_err", "Standard error, trimmed"),
            FieldMetadata::new("status", "Exit status", FieldType::Numerical, FieldPurpose::Status),
        ]
    }
}

#[async_trait]
impl Block for ShellBlock {
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
        let output = run_shell(&self.command, self.timeout).await?;
        let status = output.status.code().unwrap_or(SIGNALLED_STATUS);

        self.values.clear();
        self.values.insert(
            "output".to_string(),
            Value::from(String::from_utf8_lossy(&output.stdout).trim()),
        );
        self.values.insert(
            "output_err".to_string(),
            Value::from(String::from_utf8_lossy(&output.stderr).trim()),
        );
        self.values.insert("status".to_string(), Value::from(status));

        Ok(Fragment::new(self.format.render(&self.values))
            .with_color(self.color_by_returncode.get(&status).copied()))
    }

    async fn on_event(&mut self, event: &ClickEvent) {
        let Some(command) = self.command_on_click.get(&u8::from(event.button)) else {
            return;
        };

        match run_shell(command, self.timeout).await {
            Ok(output) if !output.status.success() => {
                log::warn!("Click command '{}' exited with {}", command, output.status)
            }
            Ok(_) => {}
            Err(failure) => log::warn!("Click command '{}' failed: {}", command, failure),
        }
    }
}

pub fn build(config: &BlockConfig) -> Result<BoxedBlock, BlockInitError> {
    match config {
        BlockConfig::Shell(cfg) => Ok(Box::new(ShellBlock::new(cfg)?)),
        other => Err(BlockInitError::WrongConfig {
            expected: "shell",
            actual: other.block_type(),
        }),
    }
}
