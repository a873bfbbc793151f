//! kai-probe - connect to the hub and log whatever it sends
//!
//! Loads kaiconf configuration, subscribes the Default alias to the requested
//! capabilities and pumps deliveries at a fixed tick until Ctrl-C.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use kai::{Capabilities, Capability, EventKind, KaiSdk, KaiTarget};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "kai-probe")]
#[command(about = "Connect to a Kai hub and log decoded events")]
#[command(version)]
struct Cli {
    /// Config file (defaults to the usual kaiconf search path)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Hub endpoint, overriding config
    #[arg(short, long, env = "KAI_HUB_ENDPOINT")]
    endpoint: Option<String>,

    /// Module ID, overriding config
    #[arg(long)]
    module_id: Option<String>,

    /// Module secret, overriding config
    #[arg(long)]
    secret: Option<String>,

    /// Capabilities to request on the Default alias (wire names, e.g. gestureData)
    #[arg(short = 'C', long = "capability", value_parser = parse_capability, default_value = "gestureData")]
    capabilities: Vec<Capability>,

    /// Pump interval in milliseconds
    #[arg(short, long, default_value = "16")]
    tick_ms: u64,

    /// Stop after this many seconds
    #[arg(short, long)]
    duration: Option<u64>,
}

fn parse_capability(s: &str) -> Result<Capability, String> {
    Capability::from_wire_name(s).ok_or_else(|| {
        let known: Vec<&str> = Capability::ALL.iter().map(|c| c.wire_name()).collect();
        format!("unknown capability {:?} (known: {})", s, known.join(", "))
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, sources) = kaiconf::KaiConfig::load_with_sources_from(cli.config.as_deref())
        .context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.telemetry.log_level)),
        )
        .init();

    for path in &sources.files {
        info!("config: {}", path.display());
    }

    let mut hub = config.hub.clone();
    if let Some(endpoint) = cli.endpoint {
        hub = hub.with_endpoint(endpoint);
    }

    let module_id = cli
        .module_id
        .or(config.module.id.clone())
        .context("No module ID: pass --module-id or set [module] id")?;
    let secret = cli
        .secret
        .or(config.module.secret.clone())
        .context("No module secret: pass --secret or set [module] secret")?;

    let mut sdk = KaiSdk::new(hub);
    sdk.initialise(module_id, secret);

    let requested: Capabilities = cli.capabilities.iter().copied().collect();
    info!("requesting {} on {}", requested, KaiTarget::DEFAULT);
    sdk.set_capabilities(KaiTarget::DEFAULT, requested);

    for kind in EventKind::ALL {
        if kind == EventKind::Error {
            continue;
        }
        sdk.subscribe(KaiTarget::Any, kind, |d| {
            let source = d.source.map(|id| id.to_string()).unwrap_or_default();
            info!("kai {} {:?}", source, d.event);
        });
    }
    sdk.on_error(|d| warn!("{:?}", d.event));
    sdk.on_unknown_data(|d| info!("unknown message {:?}", d.event));

    sdk.connect()?;
    info!("connecting to {}", sdk.config().endpoint);

    let mut tick = tokio::time::interval(Duration::from_millis(cli.tick_ms.max(1)));
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let deadline = cli.duration.map(Duration::from_secs);
    let started = tokio::time::Instant::now();
    let mut last_state = sdk.connection_state();

    loop {
        tokio::select! {
            _ = tick.tick() => {
                sdk.process_pending_events();

                let state = sdk.connection_state();
                if state != last_state {
                    info!("{}", state);
                    last_state = state;
                }
                if deadline.is_some_and(|d| started.elapsed() >= d) {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
        }
    }

    sdk.disconnect();
    Ok(())
}
