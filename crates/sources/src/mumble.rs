//! Mumble server latency probe.
//!
//! Sends the unauthenticated UDP ping query a Mumble server answers on its
//! voice port and reports round-trip time, user counts and the server
//! version.

use async_trait::async_trait;
use rg_blocks_core::{
    Block, BlockConfig, BlockInitError, BlockMetadata, BoxedBlock, Color, Failure, FailureReason,
    FieldMetadata, Fragment, Template, ThresholdMap,
};
use rg_blocks_types::block_configs::MumbleBlockConfig;
use serde_json::Value;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;
use tokio::net::UdpSocket;

/// Size of the ping query: `i32` tag followed by a `u64` timestamp
pub const REQUEST_LEN: usize = 12;

/// Size of the ping reply: four version bytes, the echoed `u64` timestamp,
/// then users, max users and bandwidth as `i32`
pub const REPLY_LEN: usize = 24;

/// Added to a negative round trip, which happens when the sub-second
/// timestamp wrapped between send and receive. A difference of exactly
/// zero is left alone. A reply that takes longer than a whole second
/// still wraps and reads as a short round trip, which the default one
/// second timeout rules out.
const WRAP_CORRECTION_MS: f64 = 1000.0;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("reply too short: {0} bytes, expected {REPLY_LEN}")]
    TooShort(usize),
}

/// Decoded server answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PingReply {
    pub version: (u8, u8, u8),
    pub timestamp: u64,
    pub users: i32,
    pub max_users: i32,
    /// Bits per second
    pub bandwidth: i32,
}

impl PingReply {
    pub fn version_string(&self) -> String {
        let (major, minor, patch) = self.version;
        format!("{}.{}.{}", major, minor, patch)
    }
}

pub fn encode_request(timestamp: u64) -> [u8; REQUEST_LEN] {
    let mut buf = [0u8; REQUEST_LEN];
    buf[..4].copy_from_slice(&0i32.to_be_bytes());
    buf[4..].copy_from_slice(&timestamp.to_be_bytes());
    buf
}

/// Decode a reply. Bytes past the fixed layout are ignored.
pub fn decode_reply(data: &[u8]) -> Result<PingReply, DecodeError> {
    if data.len() < REPLY_LEN {
        return Err(DecodeError::TooShort(data.len()));
    }

    let be_i32 = |at: usize| i32::from_be_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]]);
    let mut timestamp = [0u8; 8];
    timestamp.copy_from_slice(&data[4..12]);

    Ok(PingReply {
        version: (data[1], data[2], data[3]),
        timestamp: u64::from_be_bytes(timestamp),
        users: be_i32(12),
        max_users: be_i32(16),
        bandwidth: be_i32(20),
    })
}

/// Round trip in milliseconds between two sub-second microsecond stamps
pub fn round_trip_ms(sent_micros: u64, received_micros: u64) -> f64 {
    let ms = (received_micros as f64 - sent_micros as f64) / 1000.0;
    if ms < 0.0 {
        ms + WRAP_CORRECTION_MS
    } else {
        ms
    }
}

/// Latency mapping first, then the user count mapping
pub fn select_background(
    backgrounds_ping: &ThresholdMap<Option<Color>>,
    backgrounds_users: &ThresholdMap<Option<Color>>,
    ping: f64,
    users: i32,
) -> Option<Color> {
    backgrounds_ping
        .resolve_flat(ping)
        .or_else(|| backgrounds_users.resolve_flat(users as f64))
        .copied()
}

fn now_micros() -> u64 {
    chrono::Utc::now().timestamp_subsec_micros() as u64
}

pub struct MumbleBlock {
    metadata: BlockMetadata,
    host: String,
    port: u16,
    timeout: Duration,
    interval: Duration,
    format_success: Template,
    format_timeout: Template,
    backgrounds_users: ThresholdMap<Option<Color>>,
    backgrounds_ping: ThresholdMap<Option<Color>>,
    background_timeout: Option<Color>,
    values: HashMap<String, Value>,
}

impl MumbleBlock {
    pub fn new(config: &MumbleBlockConfig) -> Result<Self, BlockInitError> {
        let format_success = Template::parse(&config.format_success, &Self::field_list())?;
        let format_timeout = Template::literal(&config.format_timeout)?;

        Ok(Self {
            metadata: BlockMetadata::new(
                "mumble",
                "Latency and user count of a Mumble server",
                Duration::from_secs(60),
            ),
            host: config.host.clone(),
            port: config.port,
            timeout: Duration::from_millis(config.timeout_ms),
            interval: Duration::from_millis(config.interval_ms),
            format_success,
            format_timeout,
            backgrounds_users: config.backgrounds_users.clone(),
            backgrounds_ping: config.backgrounds_ping.clone(),
            background_timeout: config.background_timeout,
            values: HashMap::with_capacity(5),
        })
    }

    fn field_list() -> Vec<FieldMetadata> {
        vec![
            FieldMetadata::value("ping", "Round trip time in milliseconds"),
            FieldMetadata::value("users", "Connected users"),
            FieldMetadata::value("max_users", "User slots on the server"),
            FieldMetadata::text("version", "Server version"),
            FieldMetadata::value("bandwidth", "Allowed bandwidth per user in kbit/s"),
        ]
    }

    async fn resolve(&self) -> Result<SocketAddr, Failure> {
        tokio::net::lookup_host((self.host.as_str(), self.port))
            .await?
            .next()
            .ok_or_else(|| {
                Failure::unavailable(format!("{} did not resolve to an address", self.host))
            })
    }

    async fn ping(&self) -> Result<(PingReply, f64), Failure> {
        let target = self.resolve().await?;
        let bind: SocketAddr = if target.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            ([0u16; 8], 0).into()
        };
        let socket = UdpSocket::bind(bind).await?;

        socket.send_to(&encode_request(now_micros()), target).await?;

        let mut buf = [0u8; 1024];
        let len = match tokio::time::timeout(self.timeout, socket.recv_from(&mut buf)).await {
            Ok(received) => received?.0,
            Err(_) => return Err(self.timeout_failure(target)),
        };
        let received_at = now_micros();

        let reply = decode_reply(&buf[..len])
            .map_err(|e| Failure::new(FailureReason::Decode, e.to_string()))?;
        Ok((reply, round_trip_ms(reply.timestamp, received_at)))
    }

    fn timeout_failure(&self, target: SocketAddr) -> Failure {
        let fragment = Fragment::new(self.format_timeout.render(&HashMap::new()))
            .with_background(self.background_timeout);
        Failure::timeout(format!("no reply from {} within {:?}", target, self.timeout))
            .with_fallback(fragment)
    }
}

#[async_trait]
impl Block for MumbleBlock {
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
        let (reply, ping) = self.ping().await?;
        log::trace!("Mumble {}:{} answered in {:.1}ms", self.host, self.port, ping);

        self.values.clear();
        self.values.insert("ping".to_string(), Value::from(ping));
        self.values.insert("users".to_string(), Value::from(reply.users));
        self.values
            .insert("max_users".to_string(), Value::from(reply.max_users));
        self.values
            .insert("version".to_string(), Value::from(reply.version_string()));
        self.values.insert(
            "bandwidth".to_string(),
            Value::from(reply.bandwidth as f64 / 1000.0),
        );

        let background = select_background(
            &self.backgrounds_ping,
            &self.backgrounds_users,
            ping,
            reply.users,
        );
        Ok(Fragment::new(self.format_success.render(&self.values)).with_background(background))
    }
}

pub fn build(config: &BlockConfig) -> Result<BoxedBlock, BlockInitError> {
    match config {
        BlockConfig::Mumble(cfg) => Ok(Box::new(MumbleBlock::new(cfg)?)),
        other => Err(BlockInitError::WrongConfig {
            expected: "mumble",
            actual: other.block_type(),
        }),
    }
}
