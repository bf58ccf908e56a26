//! Runner: owns the wrappers, starts and stops their loops, composes the
//! status line and routes events back to blocks.

use super::wrapper::{Message, Slot, StatusSnapshot, Wrapper, WrapperState};
use rg_blocks_core::{
    BlockStyle, BoxedBlock, ClickEvent, FailureReason, Fragment, RegistryError,
    DEFAULT_POLL_TIMEOUT,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Position of a wrapper in registration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WrapperId(pub usize);

/// Per-registration options
#[derive(Debug, Clone, Default)]
pub struct RegisterOptions {
    /// Identity; defaults to the block's type id
    pub name: Option<String>,
    /// Instance; defaults to a random UUID
    pub instance: Option<String>,
    /// Defaults layered under every fragment the block produces
    pub style: BlockStyle,
    /// Advisory position. Registration order always wins.
    pub order_hint: Option<usize>,
}

impl RegisterOptions {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }
}

struct Entry {
    slot: Arc<Slot>,
    sender: mpsc::UnboundedSender<Message>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Registering,
    Running,
    Stopped,
}

/// Scheduler and compositor for a set of blocks
pub struct Runner {
    entries: Vec<Entry>,
    by_name: HashMap<String, WrapperId>,
    pending: Vec<Wrapper>,
    handles: Vec<JoinHandle<()>>,
    cancel: CancellationToken,
    changed: Arc<watch::Sender<u64>>,
    poll_timeout: Duration,
    phase: Phase,
}

impl Runner {
    /// `poll_timeout` bounds every `poll` and `on_event` call
    pub fn new(poll_timeout: Duration) -> Self {
        let (changed, _) = watch::channel(0u64);
        Self {
            entries: Vec::new(),
            by_name: HashMap::new(),
            pending: Vec::new(),
            handles: Vec::new(),
            cancel: CancellationToken::new(),
            changed: Arc::new(changed),
            poll_timeout,
            phase: Phase::Registering,
        }
    }

    /// Add a block at the end of the line
    pub fn register(
        &mut self,
        block: BoxedBlock,
        options: RegisterOptions,
    ) -> Result<WrapperId, RegistryError> {
        let name = options
            .name
            .unwrap_or_else(|| block.metadata().id.clone());

        if self.phase != Phase::Registering {
            return Err(RegistryError::AlreadyStarted(name));
        }
        if self.by_name.contains_key(&name) {
            return Err(RegistryError::DuplicateIdentity(name));
        }

        let id = WrapperId(self.entries.len());
        if let Some(hint) = options.order_hint {
            if hint != id.0 {
                log::debug!(
                    "Block '{}' asked for position {}, registered at {}",
                    name,
                    hint,
                    id.0
                );
            }
        }

        let instance = options
            .instance
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let slot = Arc::new(Slot::new(
            name.clone(),
            instance,
            options.style,
            self.changed.clone(),
        ));
        let (sender, inbox) = mpsc::unbounded_channel();

        self.pending
            .push(Wrapper::new(block, slot.clone(), inbox, self.poll_timeout));
        self.entries.push(Entry { slot, sender });
        self.by_name.insert(name.clone(), id);

        log::info!("Registered block '{}' at position {}", name, id.0);
        Ok(id)
    }

    /// Launch every wrapper loop. Returns without waiting for first polls.
    pub fn start(&mut self) {
        if self.phase != Phase::Registering {
            log::warn!("Runner already started, ignoring start()");
            return;
        }
        self.phase = Phase::Running;

        for wrapper in self.pending.drain(..) {
            let slot = wrapper.slot();
            let inner = tokio::spawn(wrapper.run(self.cancel.clone()));
            self.handles.push(tokio::spawn(supervise(slot, inner)));
        }
        log::info!("Started {} blocks", self.handles.len());
    }

    /// Cancel every loop and wait until all have exited. Safe to call
    /// more than once.
    pub async fn stop(&mut self) {
        if self.phase == Phase::Stopped {
            return;
        }
        self.phase = Phase::Stopped;
        self.cancel.cancel();

        // All loops were cancelled together, so this waits about as long
        // as the slowest one
        for handle in self.handles.drain(..) {
            if let Err(e) = handle.await {
                log::error!("Block supervisor failed: {}", e);
            }
        }
        for wrapper in self.pending.drain(..) {
            wrapper.slot().status.set_state(WrapperState::Stopped);
        }
        log::info!("All blocks stopped");
    }

    /// Route a click to the block registered as `identity`. Unknown
    /// identities are logged and ignored.
    pub fn dispatch_event(&self, identity: &str, event: ClickEvent) -> bool {
        let Some(entry) = self.entry(identity) else {
            log::warn!("Dropping event for unknown block '{}'", identity);
            return false;
        };

        if let Some(instance) = &event.instance {
            if *instance != entry.slot.instance {
                log::warn!(
                    "Dropping event for block '{}' with stale instance '{}'",
                    identity,
                    instance
                );
                return false;
            }
        }

        self.send(entry, Message::Click(event))
    }

    /// Queue an immediate re-poll of `identity`
    pub fn refresh(&self, identity: &str) -> bool {
        match self.entry(identity) {
            Some(entry) => self.send(entry, Message::Refresh),
            None => {
                log::warn!("Cannot refresh unknown block '{}'", identity);
                false
            }
        }
    }

    /// Current fragment of every block, in registration order
    pub fn render(&self) -> Vec<Option<Arc<Fragment>>> {
        self.entries.iter().map(|entry| entry.slot.load()).collect()
    }

    /// Read-only view of the line that can move to another task
    pub fn compositor(&self) -> Compositor {
        Compositor {
            slots: self.entries.iter().map(|entry| entry.slot.clone()).collect(),
        }
    }

    /// Receiver that wakes whenever any block publishes a fragment.
    /// Bursts of updates coalesce into one wake-up.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changed.subscribe()
    }

    pub fn status(&self, identity: &str) -> Option<StatusSnapshot> {
        self.entry(identity).map(|entry| entry.slot.status.snapshot())
    }

    /// Registered identities in order
    pub fn identities(&self) -> Vec<&str> {
        self.entries
            .iter()
            .map(|entry| entry.slot.name.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, identity: &str) -> Option<&Entry> {
        self.by_name
            .get(identity)
            .and_then(|id| self.entries.get(id.0))
    }

    fn send(&self, entry: &Entry, message: Message) -> bool {
        if entry.sender.send(message).is_err() {
            log::debug!("Block '{}' is no longer running", entry.slot.name);
            return false;
        }
        true
    }
}

/// Snapshot reader over the slots registered so far
#[derive(Clone)]
pub struct Compositor {
    slots: Arc<[Arc<Slot>]>,
}

impl Compositor {
    /// Same as `Runner::render`
    pub fn render(&self) -> Vec<Option<Arc<Fragment>>> {
        self.slots.iter().map(|slot| slot.load()).collect()
    }
}

impl Default for Runner {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_TIMEOUT)
    }
}

/// Wait for a wrapper task. A panic marks the block failed and leaves an
/// urgent fragment in its place; the other blocks keep running.
async fn supervise(slot: Arc<Slot>, inner: JoinHandle<()>) {
    match inner.await {
        Ok(()) => {}
        Err(e) if e.is_panic() => {
            log::error!("Block '{}' panicked, it will not be polled again", slot.name);
            slot.status.record_failure(FailureReason::Panicked);
            slot.publish(Fragment::error(format!("Exception in {}", slot.name)));
        }
        Err(e) => {
            log::debug!("Block '{}' task ended: {}", slot.name, e);
            slot.status.set_state(WrapperState::Stopped);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::i3bar;
    use async_trait::async_trait;
    use rg_blocks_core::{Block, BlockMetadata, Color, Failure, MouseButton};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Copy)]
    enum Behavior {
        Succeed,
        TimeOut,
        Panic,
        Hang,
    }

    #[derive(Default)]
    struct Counters {
        polls: AtomicUsize,
        clicks: AtomicUsize,
    }

    struct Scripted {
        metadata: BlockMetadata,
        text: String,
        behavior: Behavior,
        placeholder: Option<Fragment>,
        counters: Arc<Counters>,
    }

    impl Scripted {
        fn new(id: &str, interval_ms: u64, behavior: Behavior) -> (Self, Arc<Counters>) {
            let counters = Arc::new(Counters::default());
            let block = Self {
                metadata: BlockMetadata::new(id, "scripted", Duration::from_millis(interval_ms)),
                text: format!("ok-{}", id),
                behavior,
                placeholder: None,
                counters: counters.clone(),
            };
            (block, counters)
        }

        fn with_placeholder(mut self, text: &str) -> Self {
            self.placeholder = Some(Fragment::new(text));
            self
        }
    }

    #[async_trait]
    impl Block for Scripted {
        fn metadata(&self) -> &BlockMetadata {
            &self.metadata
        }

        fn placeholder(&self) -> Option<Fragment> {
            self.placeholder.clone()
        }

        async fn poll(&mut self) -> Result<Fragment, Failure> {
            self.counters.polls.fetch_add(1, Ordering::SeqCst);
            match self.behavior {
                Behavior::Succeed => Ok(Fragment::new(self.text.clone())),
                Behavior::TimeOut => Err(Failure::timeout("no reply").with_fallback(
                    Fragment::new("timeout").with_background(Color::URGENT),
                )),
                Behavior::Panic => panic!("probe exploded"),
                Behavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(Fragment::new("never"))
                }
            }
        }

        async fn on_event(&mut self, _event: &ClickEvent) {
            self.counters.clicks.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn texts(runner: &Runner) -> Vec<Option<String>> {
        runner
            .render()
            .into_iter()
            .map(|f| f.map(|f| f.full_text.clone()))
            .collect()
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(150)).await;
    }

    #[test]
    fn test_render_before_start() {
        let mut runner = Runner::default();
        let (a, _) = Scripted::new("a", 1000, Behavior::Succeed);
        let (b, _) = Scripted::new("b", 1000, Behavior::Succeed);
        let (c, _) = Scripted::new("c", 0, Behavior::Succeed);

        runner.register(Box::new(a), RegisterOptions::default()).unwrap();
        runner
            .register(Box::new(b.with_placeholder("...")), RegisterOptions::default())
            .unwrap();
        runner.register(Box::new(c), RegisterOptions::default()).unwrap();

        assert_eq!(texts(&runner), vec![None, Some("...".to_string()), None]);
        assert_eq!(runner.identities(), vec!["a", "b", "c"]);

        let placeholder = runner.render()[1].clone().unwrap();
        assert_eq!(placeholder.name, "b");
        assert!(placeholder.instance.is_some());
    }

    #[test]
    fn test_duplicate_identity_rejected() {
        let mut runner = Runner::default();
        let (first, _) = Scripted::new("cpu", 1000, Behavior::Succeed);
        let (second, _) = Scripted::new("cpu", 1000, Behavior::Succeed);

        runner.register(Box::new(first), RegisterOptions::default()).unwrap();
        let err = runner
            .register(Box::new(second), RegisterOptions::default())
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateIdentity(ref name) if name == "cpu"));

        // Same type under a different name is fine
        let (third, _) = Scripted::new("cpu", 1000, Behavior::Succeed);
        assert_eq!(
            runner
                .register(Box::new(third), RegisterOptions::named("cpu2"))
                .unwrap(),
            WrapperId(1)
        );
    }

    #[tokio::test]
    async fn test_register_after_start_rejected() {
        let mut runner = Runner::default();
        runner.start();
        let (late, _) = Scripted::new("late", 1000, Behavior::Succeed);
        assert!(matches!(
            runner.register(Box::new(late), RegisterOptions::default()),
            Err(RegistryError::AlreadyStarted(_))
        ));
        runner.stop().await;
    }

    #[tokio::test]
    async fn test_scenario_three_blocks() {
        let mut runner = Runner::default();
        let (a, a_count) = Scripted::new("A", 5000, Behavior::Succeed);
        let (b, b_count) = Scripted::new("B", 20, Behavior::TimeOut);
        let (c, c_count) = Scripted::new("C", 0, Behavior::Succeed);

        runner.register(Box::new(a), RegisterOptions::default()).unwrap();
        runner.register(Box::new(b), RegisterOptions::default()).unwrap();
        runner
            .register(Box::new(c.with_placeholder("ok-C")), RegisterOptions::default())
            .unwrap();

        runner.start();
        settle().await;

        let line = runner.render();
        assert_eq!(line[0].as_ref().unwrap().full_text, "ok-A");
        let b_fragment = line[1].clone().unwrap();
        assert_eq!(b_fragment.full_text, "timeout");
        assert_eq!(b_fragment.background, Some(Color::URGENT));
        assert_eq!(line[2].as_ref().unwrap().full_text, "ok-C");

        let polls_before = a_count.polls.load(Ordering::SeqCst);
        assert!(runner.dispatch_event("C", ClickEvent::new("C", MouseButton::Left)));
        settle().await;

        assert_eq!(c_count.clicks.load(Ordering::SeqCst), 1);
        assert_eq!(a_count.clicks.load(Ordering::SeqCst), 0);
        assert_eq!(b_count.clicks.load(Ordering::SeqCst), 0);
        assert_eq!(a_count.polls.load(Ordering::SeqCst), polls_before);

        let after = runner.render();
        assert_eq!(after[0].as_ref().unwrap().full_text, "ok-A");
        assert_eq!(after[1].as_ref().unwrap().full_text, "timeout");
        // Event-only block polled once at start and once for the click
        assert_eq!(c_count.polls.load(Ordering::SeqCst), 2);

        runner.stop().await;
    }

    #[tokio::test]
    async fn test_failure_counter_increments() {
        let mut runner = Runner::default();
        let (b, b_count) = Scripted::new("b", 10, Behavior::TimeOut);
        runner.register(Box::new(b), RegisterOptions::default()).unwrap();
        runner.start();

        settle().await;
        let first = runner.status("b").unwrap();
        settle().await;
        let second = runner.status("b").unwrap();

        assert!(first.consecutive_failures >= 1);
        assert!(second.total_failures > first.total_failures);
        assert_eq!(second.last_failure_reason, Some(FailureReason::Timeout));
        assert!(b_count.polls.load(Ordering::SeqCst) as u64 >= second.total_failures);
        assert_eq!(runner.len(), 1);

        runner.stop().await;
        assert_eq!(runner.status("b").unwrap().state, WrapperState::Stopped);
    }

    #[tokio::test]
    async fn test_failure_without_fallback_is_flagged() {
        struct Broken(BlockMetadata);

        #[async_trait]
        impl Block for Broken {
            fn metadata(&self) -> &BlockMetadata {
                &self.0
            }

            async fn poll(&mut self) -> Result<Fragment, Failure> {
                Err(Failure::unavailable("sensor missing"))
            }
        }

        let mut runner = Runner::default();
        runner
            .register(
                Box::new(Broken(BlockMetadata::new("disk", "broken", Duration::from_secs(60)))),
                RegisterOptions::default(),
            )
            .unwrap();
        runner.start();
        settle().await;

        let fragment = runner.render()[0].clone().unwrap();
        assert!(fragment.urgent);
        assert_eq!(fragment.full_text, "disk: unavailable");
        runner.stop().await;
    }

    #[tokio::test]
    async fn test_poll_watchdog() {
        let mut runner = Runner::new(Duration::from_millis(30));
        let (slow, _) = Scripted::new("slow", 1000, Behavior::Hang);
        runner.register(Box::new(slow), RegisterOptions::default()).unwrap();
        runner.start();
        settle().await;

        let status = runner.status("slow").unwrap();
        assert_eq!(status.last_failure_reason, Some(FailureReason::Timeout));
        assert!(runner.render()[0].as_ref().unwrap().urgent);
        runner.stop().await;
    }

    #[tokio::test]
    async fn test_stop_while_sleeping() {
        let mut runner = Runner::default();
        let mut counters = Vec::new();
        for name in ["a", "b", "c"] {
            let (block, count) = Scripted::new(name, 60_000, Behavior::Succeed);
            runner.register(Box::new(block), RegisterOptions::default()).unwrap();
            counters.push(count);
        }
        runner.start();
        settle().await;

        tokio::time::timeout(Duration::from_secs(2), runner.stop())
            .await
            .expect("stop did not return");

        for name in ["a", "b", "c"] {
            assert_eq!(runner.status(name).unwrap().state, WrapperState::Stopped);
        }
        let polls: Vec<usize> = counters.iter().map(|c| c.polls.load(Ordering::SeqCst)).collect();
        settle().await;
        let later: Vec<usize> = counters.iter().map(|c| c.polls.load(Ordering::SeqCst)).collect();
        assert_eq!(polls, later);

        // Idempotent
        runner.stop().await;
    }

    #[tokio::test]
    async fn test_panic_is_isolated() {
        let mut runner = Runner::default();
        let (good, good_count) = Scripted::new("good", 20, Behavior::Succeed);
        let (bad, _) = Scripted::new("bad", 20, Behavior::Panic);
        runner.register(Box::new(good), RegisterOptions::default()).unwrap();
        runner.register(Box::new(bad), RegisterOptions::default()).unwrap();
        runner.start();
        settle().await;

        let line = runner.render();
        assert_eq!(line[0].as_ref().unwrap().full_text, "ok-good");
        let bad_fragment = line[1].clone().unwrap();
        assert_eq!(bad_fragment.full_text, "Exception in bad");
        assert!(bad_fragment.urgent);
        assert_eq!(
            runner.status("bad").unwrap().last_failure_reason,
            Some(FailureReason::Panicked)
        );

        let polls = good_count.polls.load(Ordering::SeqCst);
        settle().await;
        assert!(good_count.polls.load(Ordering::SeqCst) > polls);
        assert!(!runner.dispatch_event("bad", ClickEvent::new("bad", MouseButton::Left)));

        runner.stop().await;
    }

    #[tokio::test]
    async fn test_unknown_identity_is_noop() {
        let mut runner = Runner::default();
        let (a, a_count) = Scripted::new("a", 0, Behavior::Succeed);
        runner.register(Box::new(a), RegisterOptions::default()).unwrap();
        runner.start();
        settle().await;

        assert!(!runner.dispatch_event("ghost", ClickEvent::new("ghost", MouseButton::Left)));
        assert!(!runner.refresh("ghost"));
        settle().await;
        assert_eq!(a_count.clicks.load(Ordering::SeqCst), 0);
        assert_eq!(a_count.polls.load(Ordering::SeqCst), 1);

        runner.stop().await;
    }

    #[tokio::test]
    async fn test_refresh_repolls() {
        let mut runner = Runner::default();
        let (a, a_count) = Scripted::new("a", 0, Behavior::Succeed);
        runner.register(Box::new(a), RegisterOptions::default()).unwrap();
        runner.start();
        settle().await;

        assert!(runner.refresh("a"));
        settle().await;
        assert_eq!(a_count.polls.load(Ordering::SeqCst), 2);
        assert_eq!(a_count.clicks.load(Ordering::SeqCst), 0);
        runner.stop().await;
    }

    #[tokio::test]
    async fn test_compositor_follows_runner() {
        let mut runner = Runner::default();
        let (a, _) = Scripted::new("a", 0, Behavior::Succeed);
        let (b, _) = Scripted::new("b", 0, Behavior::Succeed);
        runner
            .register(Box::new(a.with_placeholder("...")), RegisterOptions::default())
            .unwrap();
        runner.register(Box::new(b), RegisterOptions::default()).unwrap();

        let compositor = runner.compositor();
        assert_eq!(compositor.render(), runner.render());

        runner.start();
        settle().await;
        let line: Vec<String> = compositor
            .render()
            .into_iter()
            .map(|f| f.unwrap().full_text.clone())
            .collect();
        assert_eq!(line, vec!["ok-a", "ok-b"]);
        runner.stop().await;
    }

    #[tokio::test]
    async fn test_protocol_round_trip_dispatch() {
        let mut runner = Runner::default();
        let mut counters = Vec::new();
        for name in ["x", "y", "z"] {
            let (block, count) = Scripted::new(name, 0, Behavior::Succeed);
            runner.register(Box::new(block), RegisterOptions::default()).unwrap();
            counters.push(count);
        }
        runner.start();
        settle().await;

        let line = i3bar::encode_line(&runner.render()).unwrap();
        let records: Vec<serde_json::Value> =
            serde_json::from_str(line.trim_end().trim_end_matches(',')).unwrap();
        assert_eq!(records.len(), 3);

        // The host echoes name and instance back on click
        let clicked = &records[1];
        let event_line = format!(
            ",{{\"name\":{},\"instance\":{},\"button\":1,\"x\":10,\"y\":5}}",
            clicked["name"], clicked["instance"]
        );
        let event = i3bar::parse_event(&event_line).unwrap().unwrap();
        assert!(runner.dispatch_event(&event.name.clone(), event));
        settle().await;

        let clicks: Vec<usize> = counters.iter().map(|c| c.clicks.load(Ordering::SeqCst)).collect();
        assert_eq!(clicks, vec![0, 1, 0]);
        runner.stop().await;
    }

    #[tokio::test]
    async fn test_subscribe_wakes_on_publish() {
        let mut runner = Runner::default();
        let (a, _) = Scripted::new("a", 0, Behavior::Succeed);
        runner.register(Box::new(a), RegisterOptions::default()).unwrap();
        let mut changes = runner.subscribe();
        runner.start();

        tokio::time::timeout(Duration::from_secs(1), changes.changed())
            .await
            .expect("no change signalled")
            .unwrap();
        runner.stop().await;
    }
}
