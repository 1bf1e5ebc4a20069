//! # Compressor Monitor & Control Node
//!
//! Loads the node TOML, builds the configured driver set, starts the bus
//! and timer threads and runs the reporting cadence on the main thread.
//! Bus requests can be typed on stdin (`help` lists the commands).

use clap::Parser;
use cmc_common::config::{ConfigLoader, NodeConfig};
use cmc_common::consts::DEFAULT_CONFIG_PATH;
use cmc_common::facility::FacilityRegistry;
use cmc_hal::DriverRegistry;
use cmc_node::peer::{self, ConsoleCommand, HELP};
use cmc_node::runtime::{BusClient, Node};
use parking_lot::Mutex;
use std::io::BufRead;
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Compressor node: status store, dwell-time guard, bus dispatch, reporting
#[derive(Parser, Debug)]
#[command(name = "cmc_node")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Compressor monitor & control node")]
struct Args {
    /// Path to the node configuration TOML.
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Driver to use instead of the one named in the config.
    #[arg(long, value_name = "NAME")]
    driver: Option<String>,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();
    let config = NodeConfig::load(&args.config);
    let level = match (&config, args.verbose) {
        (_, true) => "debug",
        (Ok(config), false) => config.shared.log_level.as_filter(),
        (Err(_), false) => "info",
    };
    setup_tracing(level, args.json);

    info!("Compressor node v{} starting...", env!("CARGO_PKG_VERSION"));

    let result = config
        .map_err(|e| -> Box<dyn std::error::Error> {
            format!("{}: {e}", args.config.display()).into()
        })
        .and_then(|config| run(&args, config));
    if let Err(e) = result {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("Compressor node shutdown complete");
}

fn run(args: &Args, mut config: NodeConfig) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(driver) = &args.driver {
        config.driver.name = driver.clone();
    }
    config.validate()?;
    info!(
        service = %config.shared.service_name,
        driver = %config.driver.name,
        "Config OK"
    );

    let registry = DriverRegistry::with_builtin();
    let drivers = registry.create(&config.driver.name, &config)?;
    let node = Node::start(&config, drivers)?;

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    })?;

    let mut node = node.spawn(running.clone())?;
    spawn_console(node.client(), node.registry(), running)?;

    node.run_reporting();
    node.shutdown();
    Ok(())
}

/// Serve console lines from stdin. `quit` stops the node; end of input only
/// ends the console. The thread is detached since a blocking read cannot be
/// interrupted.
fn spawn_console(
    client: BusClient,
    facilities: Arc<Mutex<FacilityRegistry>>,
    running: Arc<AtomicBool>,
) -> std::io::Result<()> {
    thread::Builder::new().name("cmc-console".into()).spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            match peer::parse_line(&line) {
                Ok(ConsoleCommand::Bus(msg)) => match client.request(msg) {
                    Ok((response, outcome)) => {
                        println!("{}", peer::format_response(&response, &outcome))
                    }
                    Err(e) => {
                        warn!("Console request failed: {e}");
                        break;
                    }
                },
                Ok(ConsoleCommand::FacilityStatus) => {
                    println!("{}", peer::format_facility_status(&facilities.lock().status()))
                }
                Ok(ConsoleCommand::ClearFacilityStatus) => facilities.lock().clear(),
                Ok(ConsoleCommand::Help) => println!("{HELP}"),
                Ok(ConsoleCommand::Quit) => {
                    info!("Console requested shutdown");
                    running.store(false, Ordering::SeqCst);
                    break;
                }
                Err(peer::PeerError::Empty) => {}
                Err(e) => println!("{e}"),
            }
        }
        info!("Console closed");
    })?;
    Ok(())
}

/// Setup tracing subscriber. `RUST_LOG` overrides the configured level.
fn setup_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
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
