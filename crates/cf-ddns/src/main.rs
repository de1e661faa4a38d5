// # cf-ddns
//
// Keeps Cloudflare A/AAAA records pointed at this host's public addresses.
//
// This binary is a thin integration layer:
// 1. Parse flags (each with an environment fallback)
// 2. Validate configuration before any network activity
// 3. Initialize logging and the runtime
// 4. Wire OS signals into the engine's cancellation channel
// 5. Run the engine from cf-ddns-core
//
// ## Configuration
//
// | flag | env |
// |---|---|
// | `--zone` | `ZONE_ID` |
// | `--token` | `CLOUDFLARE_API_TOKEN` |
// | `--resolver` | `RESOLVER` |
// | `--records` (repeatable) | `RECORDS` (comma-separated) |
// | `--loop` | `LOOP` |
// | `--period` | `LOOP_PERIOD` |
// | `--dry-run` | `DRY_RUN` |
// | `--api-base` | `CLOUDFLARE_API_BASE` |
// | `--log-level` | `LOG_LEVEL` |
//
// Records given on the command line replace the `RECORDS` list entirely.
//
// ## Example
//
// ```bash
// export CLOUDFLARE_API_TOKEN=your_token
// cf-ddns --zone 023e105f4ecef8ad9ca31a8372d0c353 \
//     --resolver https://icanhazip.com \
//     --records 372e67954025e0ba6aaa6d586b9e0b59 \
//     --records 9a7806061c88ada191ed06f989cc3dac \
//     --loop --period 5m
// ```

use anyhow::{Context, Result};
use cf_ddns_core::DdnsEngine;
use cf_ddns_core::config::{
    DEFAULT_API_BASE, DdnsConfig, ProviderConfig, RunMode, parse_duration,
};
use cf_ddns_ip_http::HttpAddressSource;
use cf_ddns_provider_cloudflare::CloudflareFactory;
use clap::Parser;
use clap::builder::FalseyValueParser;
use std::process::ExitCode;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{Level, debug, error, info};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{Signal, SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (including a fatal first cycle)
#[derive(Debug, Clone, Copy)]
enum DdnsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<DdnsExitCode> for ExitCode {
    fn from(code: DdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Command-line arguments
///
/// No `Debug` derive: the token must never be printed.
#[derive(Parser)]
#[command(name = "cf-ddns", version)]
#[command(about = "Point Cloudflare A/AAAA records at this host's public addresses", long_about = None)]
struct Args {
    /// Cloudflare zone identifier
    #[arg(long, env = "ZONE_ID")]
    zone: Option<String>,

    /// Cloudflare API token
    #[arg(long, env = "CLOUDFLARE_API_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Public IP resolver endpoint (returns the caller's IP as plain text)
    #[arg(long, env = "RESOLVER")]
    resolver: Option<String>,

    /// Identifier of a record to update (repeatable)
    #[arg(long = "records", env = "RECORDS", value_delimiter = ',')]
    records: Vec<String>,

    /// Keep running and reconcile every period
    #[arg(long = "loop", env = "LOOP", value_parser = FalseyValueParser::new())]
    run_loop: bool,

    /// Time between cycles in loop mode (e.g. 30s, 5m, 1h30m)
    #[arg(long, env = "LOOP_PERIOD", default_value = "5m", value_parser = parse_period)]
    period: Duration,

    /// Fetch records but only log the updates that would be made
    #[arg(long, env = "DRY_RUN", value_parser = FalseyValueParser::new())]
    dry_run: bool,

    /// Cloudflare API base URL
    #[arg(long, env = "CLOUDFLARE_API_BASE", default_value = DEFAULT_API_BASE)]
    api_base: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: Level,
}

fn parse_period(s: &str) -> std::result::Result<Duration, String> {
    parse_duration(s).map_err(|e| e.to_string())
}

impl Args {
    /// Build the core configuration
    fn into_config(self) -> DdnsConfig {
        DdnsConfig {
            resolver: self.resolver.unwrap_or_default(),
            zone_id: self.zone.unwrap_or_default(),
            provider: ProviderConfig::Cloudflare {
                api_token: self.token.unwrap_or_default(),
                api_base: self.api_base,
                dry_run: self.dry_run,
            },
            records: self.records,
            mode: if self.run_loop {
                RunMode::Loop {
                    period: self.period,
                }
            } else {
                RunMode::Once
            },
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.log_level;
    let config = args.into_config();

    // Validate configuration before touching the network
    if let Err(e) = config.validate() {
        eprintln!("{}", e);
        return DdnsExitCode::ConfigError.into();
    }

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DdnsExitCode::ConfigError.into();
    }

    info!("Starting cf-ddns");
    info!("Configuration loaded: {} record(s)", config.record_ids().len());

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DdnsExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        match run_daemon(config).await {
            Ok(()) => DdnsExitCode::CleanShutdown,
            Err(e) if is_config_error(&e) => {
                error!("{:#}", e);
                DdnsExitCode::ConfigError
            }
            Err(e) => {
                error!("Fatal error: {:#}", e);
                DdnsExitCode::RuntimeError
            }
        }
    });

    result.into()
}

fn is_config_error(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<cf_ddns_core::Error>(),
        Some(cf_ddns_core::Error::Config(_))
    )
}

/// Run the daemon
async fn run_daemon(config: DdnsConfig) -> Result<()> {
    let source = HttpAddressSource::new(config.resolver.clone())
        .context("couldn't create address resolver")?;
    info!("Resolving public addresses via {}", source.endpoint());

    // Loop mode installs its handlers before the first cycle so an early
    // Ctrl-C is not lost. Run-once keeps the default signal disposition.
    let signals = ShutdownSignals::for_mode(config.mode)?;
    let (engine, mut events) =
        DdnsEngine::new(Box::new(source), Box::new(CloudflareFactory), config)?;

    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            debug!("Engine event: {:?}", event);
        }
    });

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let listener = signals.map(|signals| {
        tokio::spawn(async move {
            let name = signals.recv().await;
            info!("Received shutdown signal: {}", name);
            let _ = shutdown_tx.send(());
        })
    });

    let result = engine.run(shutdown_rx).await;
    if let Some(listener) = listener {
        listener.abort();
    }

    result.context("first reconciliation cycle failed")?;
    info!("cf-ddns stopped");
    Ok(())
}

impl ShutdownSignals {
    /// Listener for loop mode; `None` for run-once
    fn for_mode(mode: RunMode) -> Result<Option<Self>> {
        match mode {
            RunMode::Once => Ok(None),
            RunMode::Loop { .. } => Self::install().map(Some),
        }
    }
}

/// SIGTERM/SIGINT listener
#[cfg(unix)]
struct ShutdownSignals {
    sigterm: Signal,
    sigint: Signal,
}

#[cfg(unix)]
impl ShutdownSignals {
    fn install() -> Result<Self> {
        let sigterm = signal(SignalKind::terminate()).context("Failed to setup SIGTERM handler")?;
        let sigint = signal(SignalKind::interrupt()).context("Failed to setup SIGINT handler")?;
        Ok(Self { sigterm, sigint })
    }

    /// Wait for the first signal and return its name
    async fn recv(mut self) -> &'static str {
        tokio::select! {
            _ = self.sigterm.recv() => "SIGTERM",
            _ = self.sigint.recv() => "SIGINT",
        }
    }
}

/// Ctrl-C listener
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
struct ShutdownSignals;

#[cfg(not(unix))]
impl ShutdownSignals {
    fn install() -> Result<Self> {
        Ok(Self)
    }

    async fn recv(self) -> &'static str {
        match tokio::signal::ctrl_c().await {
            Ok(()) => "SIGINT",
            Err(e) => {
                error!("Failed to wait for CTRL-C: {}", e);
                std::future::pending().await
            }
        }
    }
}
