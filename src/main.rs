use clap::Parser;
use log::{error, info};
use sentry_proxy::configuration::Config;
use sentry_proxy::controller::Controller;
use std::net::Ipv4Addr;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sentry-proxy")]
#[command(version = "0.0.2")]
#[command(about = "Content inspecting proxy for a stateful packet filter")]
struct Args {
    /// TOML configuration file. The stock deployment is used when omitted
    #[arg(short, long, env = "SENTRY_PROXY_CONFIG")]
    config: Option<PathBuf>,

    /// Address the protocol listeners bind to
    #[arg(long)]
    internal_address: Option<Ipv4Addr>,

    /// Address server-side connections originate from
    #[arg(long)]
    external_address: Option<Ipv4Addr>,
}

#[tokio::main]
async fn main() {
    // https://docs.rs/env_logger/latest/env_logger/
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .format_target(false)
        .init();

    println!(
        "
==============================================================================
                 sentry-proxy v0.0.2  HTTP / FTP / SMTP inspection
==============================================================================
"
    );

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => {
            info!("Importing configuration from {}", path.display());
            Config::from_file(path).unwrap_or_else(|e| {
                error!("Unable to import configuration from file: {}", e);
                std::process::exit(1);
            })
        }
        None => {
            info!("No configuration file given, using the stock deployment");
            Config::default()
        }
    };

    if let Some(address) = args.internal_address {
        config.internal_address = address;
    }
    if let Some(address) = args.external_address {
        config.external_address = address;
    }

    let controller = Controller::new(config).unwrap_or_else(|e| {
        error!("Unable to create a controller instance: {}, exiting...", e);
        std::process::exit(1);
    });

    if let Err(e) = controller.run().await {
        error!("Error occured in the controller process: {}, exiting...", e);
        std::process::exit(1);
    }
}
