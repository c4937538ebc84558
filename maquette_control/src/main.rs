//! # Maquette
//!
//! Runs the control core against the simulated rig. Commands arrive on
//! the TCP command port (`--bind`), or on an in-process loopback with
//! `--loopback` for smoke runs without a network peer.

use clap::Parser;
use maquette_common::config::{ConfigError, ConfigLoader};
use maquette_common::store::{ConfigStore, TomlFileStore};
use maquette_control::config::ControlConfig;
use maquette_control::cycle::ControlLoop;
use maquette_control::dispatch::Dispatcher;
use maquette_control::motion::{MotionEngine, MotionParts};
use maquette_control::safety::EmergencyStop;
use maquette_control::transport::{
    MemoryListener, NetworkTransport, PeerListener, TcpPeerListener,
};
use maquette_hal::SimulatedRig;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Maquette rig control core
#[derive(Parser, Debug)]
#[command(name = "maquette")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Command protocol, motion engine and e-stop interlock for the maquette rig")]
struct Args {
    /// Path to the runtime configuration TOML.
    #[arg(long, default_value = "maquette.toml")]
    config: PathBuf,

    /// Listen address, overrides `transport.bind`.
    #[arg(long, value_name = "ADDR")]
    bind: Option<String>,

    /// Serve an in-process loopback instead of TCP.
    #[arg(long)]
    loopback: bool,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();
    let config = match load_config(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("maquette: {e}");
            process::exit(1);
        }
    };
    setup_tracing(&args, &config);

    info!("Maquette v{} starting...", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(&args, config) {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("Maquette shutdown complete");
}

/// A missing file runs on defaults; anything else must parse and validate.
fn load_config(path: &Path) -> Result<ControlConfig, ConfigError> {
    let config = match ControlConfig::load(path) {
        Ok(config) => config,
        Err(ConfigError::FileNotFound) => ControlConfig::default(),
        Err(e) => return Err(e),
    };
    config.validate()?;
    Ok(config)
}

fn run(args: &Args, mut config: ControlConfig) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(bind) = &args.bind {
        config.transport.bind = bind.clone();
    }
    info!(
        service = %config.shared.service_name,
        cycle_ms = config.cycle.cycle_period_ms,
        "config OK"
    );

    let store = match TomlFileStore::open(&config.store.path) {
        Ok(store) => store,
        Err(e) => {
            warn!(path = %config.store.path.display(), error = %e, "store unreadable, starting empty");
            TomlFileStore::new(&config.store.path)
        }
    };
    info!(items = store.keys().len(), "store opened");

    let rig = SimulatedRig::new(config.simulation.clone());
    let handles = rig.handles();
    let engine = MotionEngine::new(
        MotionParts {
            axes: handles.axes,
            pan_home: handles.pan_home,
            limits: handles.limits,
            tilt: handles.tilt,
        },
        config.to_motion_settings(),
    );
    let interlock = EmergencyStop::new(handles.estop, config.interlock.active_low);
    let mut dispatcher = Dispatcher::new(engine, interlock, handles.rangefinder, Box::new(store));
    dispatcher.init(Instant::now());

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    })?;

    if args.loopback {
        let listener = MemoryListener::new();
        let connector = listener.connector();
        let client = connector.connect();
        client.send_line("PING");
        serve(listener, dispatcher, &config, &rig, &running);
        info!(replies = ?client.take_lines(), "loopback session");
    } else {
        let listener = TcpPeerListener::bind(&config.transport.bind)?;
        serve(listener, dispatcher, &config, &rig, &running);
    }
    Ok(())
}

fn serve<L: PeerListener>(
    listener: L,
    dispatcher: Dispatcher,
    config: &ControlConfig,
    rig: &SimulatedRig,
    running: &AtomicBool,
) {
    let transport = NetworkTransport::new(listener, config.to_transport_settings());
    let relisten = std::time::Duration::from_millis(config.transport.relisten_interval_ms);
    let mut control = ControlLoop::new(transport, dispatcher, relisten);
    control.run(config.cycle.cycle_period(), running, |dt| rig.advance(dt));
    info!(diagnostics = %control.transport().diagnostics(Instant::now()), "transport at shutdown");
}

fn setup_tracing(args: &Args, config: &ControlConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.shared.log_level.as_filter()));
    let filter = if args.verbose {
        filter.add_directive(tracing::Level::DEBUG.into())
    } else {
        filter
    };

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}
