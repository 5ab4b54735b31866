use std::process;
use std::sync::Arc;

use clap::Parser;
use env_logger::Builder;
use log::{debug, error, info, LevelFilter};

use bgpd::config::{self, Start};
use bgpd::{listener, rde, session};

/// BGP-4 speaker: session FSM, wire codec, and route decision engine.
#[derive(Parser)]
#[clap(name = "bgpd", version)]
struct Args {
    /// Path to the server's TOML config file.
    #[clap(short = 'c', long = "config-path")]
    config_path: String,

    /// Logging verbosity: -v for debug, -vv for trace.
    #[clap(short = 'v', parse(from_occurrences))]
    verbosity: u64,
}

fn init_logging(verbosity: u64) {
    let (bgpd_level, other_level) = match verbosity {
        0 => (LevelFilter::Info, LevelFilter::Warn),
        1 => (LevelFilter::Debug, LevelFilter::Warn),
        _ => (LevelFilter::Trace, LevelFilter::Trace),
    };
    Builder::new()
        .filter(Some("bgpd"), bgpd_level)
        .filter(None, other_level)
        .init();
    info!("logging at levels {}/{}", bgpd_level, other_level);
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.verbosity);

    let config = match config::from_file(&args.config_path) {
        Ok(config) => config,
        Err(err) => {
            error!("failed to load {}: {}", args.config_path, err);
            process::exit(1);
        }
    };
    debug!("loaded {} peer(s) from {}", config.peers.len(), args.config_path);
    let config = Arc::new(config);

    let rde = rde::spawn(config.asn);
    let registry = session::Registry::new();

    for peer in &config.peers {
        if peer.start == Start::Automatic {
            session::spawn(peer.clone(), rde.clone(), registry.clone(), None);
        }
    }

    if let Err(err) = listener::run(config, registry, rde).await {
        error!("listener stopped: {}", err);
        process::exit(1);
    }
}
