//! Bar lifecycle: build the runner from config, wire it to the host and
//! tear everything down on exit.

use super::scheduler::{Compositor, RegisterOptions, Runner};
use crate::config::AppConfig;
use crate::protocol::{EventReader, Header, StatusWriter};
use anyhow::{Context, Result};
use rg_blocks_core::{ClickEvent, Registry, RegistryError};
use std::future::Future;
use tokio::io::{AsyncBufRead, AsyncWrite};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Highest signal number on Linux (`SIGRTMAX`)
const MAX_SIGNAL: i32 = 64;

/// SIGILL, SIGFPE, SIGKILL, SIGSEGV and SIGSTOP: no handler can be
/// installed for these
const UNCATCHABLE_SIGNALS: [i32; 5] = [4, 8, 9, 11, 19];

/// A Unix signal that forces one block to refresh
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalBinding {
    pub signal: i32,
    pub identity: String,
}

fn can_bind(signal: i32) -> bool {
    (1..=MAX_SIGNAL).contains(&signal) && !UNCATCHABLE_SIGNALS.contains(&signal)
}

/// Build every configured block and register it, in config order. Any
/// error aborts the whole set.
pub fn assemble(
    config: &AppConfig,
    registry: &Registry,
) -> Result<(Runner, Vec<SignalBinding>), RegistryError> {
    let mut runner = Runner::new(config.poll_timeout());
    let mut signals = Vec::new();

    for (position, entry) in config.blocks.iter().enumerate() {
        let identity = entry.identity().to_string();
        if let Some(signal) = entry.signal {
            if !can_bind(signal) {
                return Err(RegistryError::InvalidSignal {
                    name: identity,
                    signal,
                });
            }
        }

        let block = registry.create(&identity, &entry.config)?;
        runner.register(
            block,
            RegisterOptions {
                name: Some(identity.clone()),
                instance: entry.instance.clone(),
                style: entry.style.clone(),
                order_hint: Some(position),
            },
        )?;

        if let Some(signal) = entry.signal {
            signals.push(SignalBinding { signal, identity });
        }
    }

    Ok((runner, signals))
}

/// Resolves on SIGINT or SIGTERM
pub async fn termination() -> Result<()> {
    let mut interrupt = signal(SignalKind::interrupt()).context("installing SIGINT handler")?;
    let mut terminate = signal(SignalKind::terminate()).context("installing SIGTERM handler")?;
    tokio::select! {
        _ = interrupt.recv() => log::info!("Received SIGINT"),
        _ = terminate.recv() => log::info!("Received SIGTERM"),
    }
    Ok(())
}

fn spawn_event_reader<R>(input: R, events: mpsc::UnboundedSender<ClickEvent>) -> JoinHandle<()>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = EventReader::new(input);
        loop {
            match reader.next_event().await {
                Ok(Some(event)) => {
                    if events.send(event).is_err() {
                        break;
                    }
                }
                Ok(None) => {
                    log::info!("Host closed the event stream");
                    break;
                }
                Err(e) => {
                    log::warn!("Stopped reading events: {}", e);
                    break;
                }
            }
        }
    })
}

fn spawn_signal_forwarders(
    bindings: &[SignalBinding],
    refreshes: mpsc::UnboundedSender<String>,
) -> Result<Vec<JoinHandle<()>>> {
    let mut tasks = Vec::with_capacity(bindings.len());
    for binding in bindings {
        let mut stream = match signal(SignalKind::from_raw(binding.signal)) {
            Ok(stream) => stream,
            Err(e) => {
                tasks.iter().for_each(JoinHandle::abort);
                return Err(e).with_context(|| {
                    format!(
                        "installing handler for signal {} of block '{}'",
                        binding.signal, binding.identity
                    )
                });
            }
        };
        let identity = binding.identity.clone();
        let refreshes = refreshes.clone();
        tasks.push(tokio::spawn(async move {
            while stream.recv().await.is_some() {
                if refreshes.send(identity.clone()).is_err() {
                    break;
                }
            }
        }));
    }
    Ok(tasks)
}

/// Write the header, then the line again after every burst of changes.
///
/// Runs apart from the event loop: a host that stops reading blocks only
/// this task, and dropping it at shutdown abandons the pending write.
fn spawn_status_writer<W>(
    mut writer: StatusWriter<W>,
    header: Header,
    compositor: Compositor,
    mut changes: watch::Receiver<u64>,
) -> JoinHandle<Result<()>>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        writer
            .write_header(&header)
            .await
            .context("writing protocol header")?;

        loop {
            let line = compositor.render();
            writer
                .write_line(&line)
                .await
                .context("writing status line")?;

            if changes.changed().await.is_err() {
                return Ok(());
            }
        }
    })
}

/// Drive the bar until `shutdown` resolves or the host stops reading.
///
/// Starts every block, emits the line whenever a fragment changes and
/// routes host clicks and refresh signals to their blocks. Once the
/// blocks have started, `runner.stop()` always runs before this returns.
pub async fn run_bar<W, R, S>(
    mut runner: Runner,
    signals: Vec<SignalBinding>,
    header: Header,
    output: W,
    input: R,
    shutdown: S,
) -> Result<()>
where
    W: AsyncWrite + Unpin + Send + 'static,
    R: AsyncBufRead + Unpin + Send + 'static,
    S: Future<Output = ()>,
{
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let (refresh_tx, mut refresh_rx) = mpsc::unbounded_channel();
    let mut tasks = spawn_signal_forwarders(&signals, refresh_tx)?;
    tasks.push(spawn_event_reader(input, event_tx));

    // Subscribe before starting so no publish is missed
    let mut emitter = spawn_status_writer(
        StatusWriter::new(output),
        header,
        runner.compositor(),
        runner.subscribe(),
    );
    runner.start();

    let result = event_loop(
        &mut runner,
        &mut emitter,
        &mut event_rx,
        &mut refresh_rx,
        shutdown,
    )
    .await;

    emitter.abort();
    for task in &tasks {
        task.abort();
    }
    runner.stop().await;
    result
}

async fn event_loop<S>(
    runner: &mut Runner,
    emitter: &mut JoinHandle<Result<()>>,
    events: &mut mpsc::UnboundedReceiver<ClickEvent>,
    refreshes: &mut mpsc::UnboundedReceiver<String>,
    shutdown: S,
) -> Result<()>
where
    S: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut events_open = true;
    let mut refreshes_open = true;

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => {
                log::info!("Shutting down");
                return Ok(());
            }
            finished = &mut *emitter => {
                return match finished {
                    Ok(result) => result,
                    Err(e) => Err(anyhow::Error::new(e).context("status writer task failed")),
                };
            }
            event = events.recv(), if events_open => match event {
                Some(event) => {
                    let identity = event.name.clone();
                    runner.dispatch_event(&identity, event);
                }
                None => events_open = false,
            },
            identity = refreshes.recv(), if refreshes_open => match identity {
                Some(identity) => {
                    log::debug!("Refresh signal for '{}'", identity);
                    runner.refresh(&identity);
                }
                None => refreshes_open = false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rg_blocks_types::block_configs::TextBlockConfig;
    use rg_blocks_types::{BlockConfig, BlockEntry};
    use std::time::Duration;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    fn text_entry(name: &str, text: &str) -> BlockEntry {
        let mut entry = BlockEntry::new(BlockConfig::Text(TextBlockConfig {
            text: text.to_string(),
            short_text: None,
        }));
        entry.name = Some(name.to_string());
        entry
    }

    fn registry() -> Registry {
        let mut registry = Registry::new();
        rg_blocks_sources::register_all(&mut registry);
        registry
    }

    #[test]
    fn test_assemble_keeps_order_and_signals() {
        let mut second = text_entry("second", "b");
        second.signal = Some(10);
        let config = AppConfig {
            blocks: vec![text_entry("first", "a"), second],
            ..Default::default()
        };

        let (runner, signals) = assemble(&config, &registry()).unwrap();
        assert_eq!(runner.identities(), vec!["first", "second"]);
        assert_eq!(
            signals,
            vec![SignalBinding {
                signal: 10,
                identity: "second".to_string()
            }]
        );
    }

    #[test]
    fn test_assemble_rejects_duplicates() {
        let config = AppConfig {
            blocks: vec![text_entry("same", "a"), text_entry("same", "b")],
            ..Default::default()
        };
        assert!(matches!(
            assemble(&config, &registry()),
            Err(RegistryError::DuplicateIdentity(_))
        ));
    }

    #[tokio::test]
    async fn test_run_bar_emits_and_stops() {
        let config = AppConfig {
            blocks: vec![text_entry("greeting", "hello")],
            ..Default::default()
        };
        let (runner, signals) = assemble(&config, &registry()).unwrap();

        let (bar_out, host_in) = tokio::io::duplex(4096);
        let (mut host_out, bar_in) = tokio::io::duplex(4096);
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

        let bar = tokio::spawn(run_bar(
            runner,
            signals,
            Header::default(),
            bar_out,
            BufReader::new(bar_in),
            async move {
                let _ = stop_rx.await;
            },
        ));

        let mut lines = BufReader::new(host_in).lines();
        assert_eq!(
            lines.next_line().await.unwrap().unwrap(),
            r#"{"version":1,"click_events":true}"#
        );
        assert_eq!(lines.next_line().await.unwrap().unwrap(), "[");
        let status = lines.next_line().await.unwrap().unwrap();
        assert!(status.contains(r#""full_text":"hello""#));
        assert!(status.contains(r#""name":"greeting""#));

        // A click re-polls the block, which produces another line
        host_out
            .write_all(b"[\n{\"name\":\"greeting\",\"button\":1}\n")
            .await
            .unwrap();
        let next = tokio::time::timeout(Duration::from_secs(2), lines.next_line())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert!(next.contains("hello"));

        stop_tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(2), bar)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_run_bar_fails_when_host_goes_away() {
        let config = AppConfig {
            blocks: vec![text_entry("greeting", "hello")],
            ..Default::default()
        };
        let (runner, signals) = assemble(&config, &registry()).unwrap();

        let (bar_out, host_in) = tokio::io::duplex(64);
        drop(host_in);
        let result = run_bar(
            runner,
            signals,
            Header::default(),
            bar_out,
            BufReader::new(tokio::io::empty()),
            std::future::pending::<()>(),
        )
        .await;
        assert!(result.is_err());
    }

    struct Counter {
        metadata: rg_blocks_core::BlockMetadata,
        polls: usize,
    }

    #[async_trait::async_trait]
    impl rg_blocks_core::Block for Counter {
        fn metadata(&self) -> &rg_blocks_core::BlockMetadata {
            &self.metadata
        }

        async fn poll(&mut self) -> Result<rg_blocks_core::Fragment, rg_blocks_core::Failure> {
            self.polls += 1;
            Ok(rg_blocks_core::Fragment::new(format!("poll-{}", self.polls)))
        }
    }

    async fn line_containing<R>(lines: &mut tokio::io::Lines<R>, needle: &str) -> String
    where
        R: tokio::io::AsyncBufRead + Unpin,
    {
        tokio::time::timeout(Duration::from_secs(3), async {
            loop {
                let line = lines.next_line().await.unwrap().expect("bar closed its output");
                if line.contains(needle) {
                    return line;
                }
            }
        })
        .await
        .unwrap_or_else(|_| panic!("no line containing {:?}", needle))
    }

    #[test]
    fn test_assemble_rejects_uncatchable_signal() {
        let mut entry = text_entry("greeting", "hello");
        entry.signal = Some(9);
        let config = AppConfig {
            blocks: vec![entry],
            ..Default::default()
        };
        assert!(matches!(
            assemble(&config, &registry()),
            Err(RegistryError::InvalidSignal { signal: 9, .. })
        ));

        assert!(can_bind(SignalKind::user_defined1().as_raw_value()));
        assert!(!can_bind(0));
        assert!(!can_bind(65));
    }

    #[tokio::test]
    async fn test_shutdown_while_host_not_reading() {
        let config = AppConfig {
            blocks: vec![text_entry("wide", &"x".repeat(200))],
            ..Default::default()
        };
        let (runner, signals) = assemble(&config, &registry()).unwrap();

        // The host keeps its end open but never reads, so the first status
        // line cannot fit into the pipe
        let (bar_out, _host_in) = tokio::io::duplex(64);
        let result = tokio::time::timeout(
            Duration::from_secs(3),
            run_bar(
                runner,
                signals,
                Header::default(),
                bar_out,
                BufReader::new(tokio::io::empty()),
                tokio::time::sleep(Duration::from_millis(100)),
            ),
        )
        .await
        .expect("run_bar ignored shutdown while its write was blocked");
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_signal_refreshes_block() {
        let mut runner = Runner::default();
        runner
            .register(
                Box::new(Counter {
                    metadata: rg_blocks_core::BlockMetadata::new(
                        "counter",
                        "counts polls",
                        Duration::ZERO,
                    ),
                    polls: 0,
                }),
                RegisterOptions::named("counter"),
            )
            .unwrap();
        let signals = vec![SignalBinding {
            signal: SignalKind::user_defined1().as_raw_value(),
            identity: "counter".to_string(),
        }];

        let (bar_out, host_in) = tokio::io::duplex(4096);
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let bar = tokio::spawn(run_bar(
            runner,
            signals,
            Header::default(),
            bar_out,
            BufReader::new(tokio::io::empty()),
            async move {
                let _ = stop_rx.await;
            },
        ));

        let mut lines = BufReader::new(host_in).lines();
        line_containing(&mut lines, "poll-1").await;

        let sent = tokio::process::Command::new("kill")
            .arg("-USR1")
            .arg(std::process::id().to_string())
            .status()
            .await
            .unwrap();
        assert!(sent.success());
        line_containing(&mut lines, "poll-2").await;

        stop_tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(2), bar)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }
}
