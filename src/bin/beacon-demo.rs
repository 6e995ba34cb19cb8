//! Beacon demo - walks through the signal scenarios from the command line
//!
//! # Usage
//!
//! ```bash
//! # Connect, emit "a", cancel, emit "b"
//! beacon-demo counter
//!
//! # Emit an envelope with metadata
//! beacon-demo click --x 1
//!
//! # Route enum events through an event bus
//! beacon-demo bus
//!
//! # Emit ticks until Ctrl+C, with subscribers tied to the shutdown token
//! beacon-demo ticker --interval-ms 500
//!
//! # Any command with a custom buffer size
//! beacon-demo --config beacon.toml counter
//! ```

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::runtime::Handle;
use tokio::time::{interval, sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use beacon_core::SignalConfig;
use beacon_signal::{params, BusEvent, EventBus, Scope, Signal, SignalData};

/// How long the demo waits for a subscriber to catch up
const SETTLE_TIMEOUT: Duration = Duration::from_secs(2);

/// Beacon demo - typed broadcast signals
#[derive(Parser, Debug)]
#[command(name = "beacon-demo", version, about)]
struct Args {
    /// TOML file with signal configuration (e.g. `capacity = 64`)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Count deliveries across a cancel
    Counter,
    /// Emit a "click" envelope carrying an x coordinate
    Click {
        #[arg(long, default_value_t = 1)]
        x: i32,
    },
    /// Route events by kind through an event bus
    Bus,
    /// Emit ticks until interrupted
    Ticker {
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("beacon_demo=info".parse()?)
                .add_directive("beacon_signal=info".parse()?)
                .add_directive("beacon_core=info".parse()?),
        )
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => SignalConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => SignalConfig::default(),
    };
    info!(capacity = config.capacity, "Using signal config");

    match args.command {
        Command::Counter => run_counter(config).await,
        Command::Click { x } => run_click(config, x).await,
        Command::Bus => run_bus(config).await,
        Command::Ticker { interval_ms } => run_ticker(config, interval_ms).await,
    }
}

/// Waits until `condition` holds or the settle timeout elapses.
async fn settle(mut condition: impl FnMut() -> bool) -> Result<()> {
    timeout(SETTLE_TIMEOUT, async {
        while !condition() {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .context("Subscriber did not catch up in time")
}

async fn run_counter(config: SignalConfig) -> Result<()> {
    let signal = Signal::<&'static str>::with_config(config);
    let count = Arc::new(AtomicUsize::new(0));

    let connection = {
        let count = Arc::clone(&count);
        signal.connect(move |value| {
            let total = count.fetch_add(1, Ordering::SeqCst) + 1;
            info!(value, total, "Counter received value");
            async {}
        })?
    };

    signal.emit("a").await;
    settle(|| count.load(Ordering::SeqCst) == 1).await?;

    connection.cancel();
    info!(active = connection.is_active(), "Connection cancelled");

    let delivered = signal.emit("b").await;
    sleep(Duration::from_millis(50)).await;

    let total = count.load(Ordering::SeqCst);
    info!(total, delivered, "Emitted after cancel");
    if total != 1 {
        bail!("expected exactly one delivery, counted {total}");
    }
    Ok(())
}

async fn run_click(config: SignalConfig, x: i32) -> Result<()> {
    let signal = Signal::<SignalData<&'static str>>::with_config(config);
    let seen = Arc::new(AtomicUsize::new(0));

    let _connection = {
        let seen = Arc::clone(&seen);
        signal.connect(move |data: SignalData<&'static str>| {
            match data.get_param::<i32>("x") {
                Some(x) => info!(value = *data.value(), x, "Received click"),
                None => warn!(value = *data.value(), "Click without coordinates"),
            }
            seen.fetch_add(1, Ordering::SeqCst);
            async {}
        })?
    };

    signal.emit_with_params("click", params! { "x" => x }).await;
    settle(|| seen.load(Ordering::SeqCst) == 1).await
}

#[derive(Debug, Clone)]
enum DemoEvent {
    Clicked { x: i32 },
    KeyPressed(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum DemoEventKind {
    Clicked,
    KeyPressed,
}

impl BusEvent for DemoEvent {
    type Kind = DemoEventKind;

    fn kind(&self) -> DemoEventKind {
        match self {
            DemoEvent::Clicked { .. } => DemoEventKind::Clicked,
            DemoEvent::KeyPressed(_) => DemoEventKind::KeyPressed,
        }
    }
}

async fn run_bus(config: SignalConfig) -> Result<()> {
    let bus = EventBus::<DemoEvent>::with_config(config);
    let handled = Arc::new(AtomicUsize::new(0));

    let _clicks = {
        let handled = Arc::clone(&handled);
        bus.on(DemoEventKind::Clicked, move |event| {
            if let DemoEvent::Clicked { x } = event {
                info!(x, "Click handler");
            }
            handled.fetch_add(1, Ordering::SeqCst);
            async {}
        })?
    };
    let _keys = {
        let handled = Arc::clone(&handled);
        bus.on(DemoEventKind::KeyPressed, move |event| {
            if let DemoEvent::KeyPressed(key) = event {
                info!(%key, "Key handler");
            }
            handled.fetch_add(1, Ordering::SeqCst);
            async {}
        })?
    };

    let mut delivered = 0;
    delivered += bus.publish(DemoEvent::Clicked { x: 10 }).await;
    delivered += bus.publish(DemoEvent::KeyPressed('q')).await;
    info!(delivered, "Published events");

    settle(|| handled.load(Ordering::SeqCst) == delivered).await
}

async fn run_ticker(config: SignalConfig, interval_ms: u64) -> Result<()> {
    let shutdown = CancellationToken::new();
    let scope = Scope::with_token(Handle::current(), shutdown.clone());
    let signal = Signal::<u64>::with_config(config);

    let subscription = signal.connect_in(&scope, |tick| async move {
        info!(tick, "Tick");
    });

    let shutdown_token = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Error waiting for shutdown signal");
        }
        info!("Shutdown signal received");
        shutdown_token.cancel();
    });

    let mut ticker = interval(Duration::from_millis(interval_ms.max(1)));
    let mut tick = 0_u64;
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                tick += 1;
                signal.emit(tick).await;
            }
        }
    }

    subscription.join().await?;
    info!(ticks = tick, "Ticker stopped");
    Ok(())
}
