use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, warn};
use rg_blocks::config::AppConfig;
use rg_blocks::core::{assemble, run_bar, termination};
use rg_blocks::protocol::Header;
use rg_blocks::{sources, Registry};
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::BufReader;

/// How long to wait for stray blocking work (the stdin reader) at exit
const RUNTIME_SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(500);

/// rg-blocks - status line generator for i3bar and swaybar
#[derive(Parser, Debug, Clone)]
#[command(name = "rg-blocks")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file to load instead of the one in the user config directory
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Debug verbosity level (0=quiet, 1=info, 2=debug, 3=trace)
    #[arg(short = 'd', long = "debug", value_name = "LEVEL", default_value = "0")]
    debug: u8,

    /// Print the default configuration and exit
    #[arg(long = "print-default-config")]
    print_default_config: bool,

    /// List available block types and exit
    #[arg(long = "list-blocks")]
    list_blocks: bool,
}

fn main() {
    let cli = Cli::parse();

    // Level 0 (default): warn only
    // Level 1: info
    // Level 2: debug
    // Level 3+: trace
    let log_level = match cli.debug {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    // Allow RUST_LOG to override CLI setting. Logs go to stderr; stdout
    // belongs to the bar.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    if let Err(e) = run(cli) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut registry = Registry::new();
    sources::register_all(&mut registry);

    if cli.list_blocks {
        for info in registry.list() {
            println!("{:<10} {}", info.id, info.description);
        }
        return Ok(());
    }

    if cli.print_default_config {
        println!("{}", serde_json::to_string_pretty(&AppConfig::default())?);
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => AppConfig::load_from_path(path),
        None => AppConfig::load(),
    }
    .context("loading configuration")?;

    info!("Starting rg-blocks v{}", env!("CARGO_PKG_VERSION"));
    let (runner, signals) = assemble(&config, &registry).context("building blocks")?;

    let header = Header {
        click_events: config.click_events,
        ..Header::default()
    };

    let runtime = tokio::runtime::Runtime::new().context("starting tokio runtime")?;
    let result = runtime.block_on(async {
        let shutdown = async {
            if let Err(e) = termination().await {
                warn!("Signal handling unavailable: {:#}", e);
                std::future::pending::<()>().await;
            }
        };
        run_bar(
            runner,
            signals,
            header,
            tokio::io::stdout(),
            BufReader::new(tokio::io::stdin()),
            shutdown,
        )
        .await
    });

    // Reading stdin parks a blocking thread that never returns on its own
    runtime.shutdown_timeout(RUNTIME_SHUTDOWN_TIMEOUT);
    result
}
