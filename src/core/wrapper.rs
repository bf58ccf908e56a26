//! Per-block runtime harness
//!
//! A `Wrapper` owns one block and drives it from a single task: poll,
//! publish, rest, repeat. The block's latest fragment lives in a `Slot`
//! shared with the runner, which only ever reads it.

use arc_swap::ArcSwapOption;
use rg_blocks_core::{BlockStyle, BoxedBlock, ClickEvent, Failure, FailureReason, Fragment};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

/// Where a wrapper is in its poll cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapperState {
    /// Registered and not polling right now
    Idle,
    Polling,
    /// The last poll failed
    Failed,
    /// The loop has exited
    Stopped,
}

impl WrapperState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => WrapperState::Idle,
            1 => WrapperState::Polling,
            2 => WrapperState::Failed,
            _ => WrapperState::Stopped,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            WrapperState::Idle => 0,
            WrapperState::Polling => 1,
            WrapperState::Failed => 2,
            WrapperState::Stopped => 3,
        }
    }
}

/// Point-in-time copy of a wrapper's health
#[derive(Debug, Clone, PartialEq)]
pub struct StatusSnapshot {
    pub state: WrapperState,
    pub consecutive_failures: u64,
    pub total_failures: u64,
    pub last_failure_at: Option<Instant>,
    pub last_failure_reason: Option<FailureReason>,
}

#[derive(Debug, Default)]
struct LastFailure {
    at: Option<Instant>,
    reason: Option<FailureReason>,
}

/// Health counters, readable from any thread without waiting on the loop
#[derive(Debug, Default)]
pub(crate) struct WrapperStatus {
    state: AtomicU8,
    consecutive_failures: AtomicU64,
    total_failures: AtomicU64,
    last_failure: Mutex<LastFailure>,
}

impl WrapperStatus {
    pub(crate) fn set_state(&self, state: WrapperState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }

    fn record_success(&self) {
        self.consecutive_failures.store(0, Ordering::Release);
        self.set_state(WrapperState::Idle);
    }

    /// Returns the consecutive failure count including this one
    pub(crate) fn record_failure(&self, reason: FailureReason) -> u64 {
        self.total_failures.fetch_add(1, Ordering::AcqRel);
        let consecutive = self.consecutive_failures.fetch_add(1, Ordering::AcqRel) + 1;

        let mut last = self
            .last_failure
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        last.at = Some(Instant::now());
        last.reason = Some(reason);
        drop(last);

        self.set_state(WrapperState::Failed);
        consecutive
    }

    pub(crate) fn snapshot(&self) -> StatusSnapshot {
        let last = self
            .last_failure
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        StatusSnapshot {
            state: WrapperState::from_u8(self.state.load(Ordering::Acquire)),
            consecutive_failures: self.consecutive_failures.load(Ordering::Acquire),
            total_failures: self.total_failures.load(Ordering::Acquire),
            last_failure_at: last.at,
            last_failure_reason: last.reason,
        }
    }
}

/// State a wrapper shares with the runner.
///
/// Only the owning wrapper (or its supervisor, once the wrapper is gone)
/// writes `fragment`; every write swaps in a whole new fragment.
pub(crate) struct Slot {
    pub(crate) name: String,
    pub(crate) instance: String,
    style: BlockStyle,
    fragment: ArcSwapOption<Fragment>,
    pub(crate) status: WrapperStatus,
    changed: Arc<watch::Sender<u64>>,
}

impl Slot {
    pub(crate) fn new(
        name: String,
        instance: String,
        style: BlockStyle,
        changed: Arc<watch::Sender<u64>>,
    ) -> Self {
        Self {
            name,
            instance,
            style,
            fragment: ArcSwapOption::empty(),
            status: WrapperStatus::default(),
            changed,
        }
    }

    pub(crate) fn load(&self) -> Option<Arc<Fragment>> {
        self.fragment.load_full()
    }

    /// Stamp identity and style defaults onto `fragment`, store it and
    /// wake the compositor
    pub(crate) fn publish(&self, fragment: Fragment) {
        let mut fragment = fragment.stamped(&self.name, &self.instance);
        fragment.apply_style(&self.style);
        self.fragment.store(Some(Arc::new(fragment)));
        self.changed.send_modify(|revision| *revision = revision.wrapping_add(1));
    }

    /// Fragment shown when a poll failed without saying how it should look
    pub(crate) fn error_fragment(&self, failure: &Failure) -> Fragment {
        Fragment::error(format!("{}: {}", self.name, failure.reason))
    }
}

/// Messages the runner queues for a wrapper
#[derive(Debug)]
pub(crate) enum Message {
    Click(ClickEvent),
    Refresh,
}

enum Wake {
    Poll,
    Click(ClickEvent),
    Stop,
}

pub(crate) struct Wrapper {
    block: BoxedBlock,
    slot: Arc<Slot>,
    inbox: mpsc::UnboundedReceiver<Message>,
    inbox_open: bool,
    poll_timeout: Duration,
}

impl Wrapper {
    pub(crate) fn new(
        block: BoxedBlock,
        slot: Arc<Slot>,
        inbox: mpsc::UnboundedReceiver<Message>,
        poll_timeout: Duration,
    ) -> Self {
        if let Some(placeholder) = block.placeholder() {
            slot.publish(placeholder);
        }

        Self {
            block,
            slot,
            inbox,
            inbox_open: true,
            poll_timeout,
        }
    }

    pub(crate) fn slot(&self) -> Arc<Slot> {
        self.slot.clone()
    }

    /// Poll loop. An in-flight poll always completes (bounded by the poll
    /// timeout); cancellation is only observed while resting.
    pub(crate) async fn run(mut self, cancel: CancellationToken) {
        let interval = self.block.interval();
        log::debug!(
            "Starting block '{}' ({}) with interval {:?}",
            self.slot.name,
            self.block.metadata().id,
            interval
        );

        loop {
            self.poll_once().await;

            match self.rest(&cancel, interval).await {
                Wake::Stop => break,
                Wake::Poll => {}
                Wake::Click(event) => self.handle_click(event).await,
            }
        }

        self.slot.status.set_state(WrapperState::Stopped);
        log::debug!("Block '{}' stopped", self.slot.name);
    }

    async fn poll_once(&mut self) {
        self.slot.status.set_state(WrapperState::Polling);

        let result = match tokio::time::timeout(self.poll_timeout, self.block.poll()).await {
            Ok(result) => result,
            Err(_) => Err(Failure::timeout(format!(
                "poll did not finish within {:?}",
                self.poll_timeout
            ))),
        };

        match result {
            Ok(fragment) => {
                self.slot.status.record_success();
                self.slot.publish(fragment);
            }
            Err(failure) => {
                let consecutive = self.slot.status.record_failure(failure.reason);
                if consecutive == 1 {
                    log::warn!("Block '{}' failed: {}", self.slot.name, failure);
                } else {
                    log::debug!(
                        "Block '{}' failed ({} in a row): {}",
                        self.slot.name,
                        consecutive,
                        failure
                    );
                }

                let fragment = match failure.fallback {
                    Some(ref fallback) => fallback.clone(),
                    None => self.slot.error_fragment(&failure),
                };
                self.slot.publish(fragment);
            }
        }
    }

    /// Wait for the interval to pass, a message, or cancellation. A zero
    /// interval waits for messages only.
    async fn rest(&mut self, cancel: &CancellationToken, interval: Duration) -> Wake {
        let sleep = tokio::time::sleep(interval);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Wake::Stop,
                message = self.inbox.recv(), if self.inbox_open => match message {
                    Some(Message::Click(event)) => return Wake::Click(event),
                    Some(Message::Refresh) => return Wake::Poll,
                    None => self.inbox_open = false,
                },
                _ = &mut sleep, if !interval.is_zero() => return Wake::Poll,
            }
        }
    }

    async fn handle_click(&mut self, event: ClickEvent) {
        log::debug!(
            "Block '{}' got {:?} button {:?}",
            self.slot.name,
            event.kind(),
            event.button
        );
        if tokio::time::timeout(self.poll_timeout, self.block.on_event(&event))
            .await
            .is_err()
        {
            log::warn!(
                "Block '{}' event handler did not finish within {:?}",
                self.slot.name,
                self.poll_timeout
            );
        }
    }
}
