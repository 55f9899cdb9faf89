use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command};
use leafjack_node::{broadcaster::Broadcaster, server::Server, Config, ValidatedConfig};
use leafjack_types::{wire::truncate_name, Offer};
use tracing::info;

fn print_dry_run_report(config: &ValidatedConfig) {
    println!("dry-run report");
    println!("  server_name: {}", config.server_name);
    if truncate_name(&config.server_name).len() < config.server_name.len() {
        println!(
            "  advertised_name: {} (truncated to fit the offer)",
            truncate_name(&config.server_name)
        );
    }
    println!("  listen: {}", config.listen);
    println!(
        "  offers: target={} interval={:?}",
        config.broadcast, config.offer_interval
    );
    println!("  session_timeout: {:?}", config.session_timeout);
    println!("  log_level: {}", config.log_level);
}

fn main() {
    if let Err(err) = main_result() {
        eprintln!("{err:?}");
        std::process::exit(1);
    }
}

fn main_result() -> Result<()> {
    // Parse arguments
    let matches = Command::new("leafjack-node")
        .about("Blackjack table server for the local network.")
        .arg(
            Arg::new("config")
                .long("config")
                .help("YAML config file; every field has a default")
                .required(false),
        )
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .help("Validate config and exit without starting the server")
                .action(ArgAction::SetTrue),
        )
        .get_matches();
    let dry_run = matches.get_flag("dry-run");

    // Load config
    let config = match matches.get_one::<String>("config") {
        Some(path) => {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Could not read config file {path}"))?;
            serde_yaml::from_str::<Config>(&contents).context("Could not parse config file")?
        }
        None => Config::default(),
    };
    let config = config.validate().context("Invalid config")?;
    if dry_run {
        print_dry_run_report(&config);
        println!("config ok");
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .init();

    let runtime = tokio::runtime::Runtime::new().context("Failed to start runtime")?;
    runtime.block_on(run(config))
}

async fn run(config: ValidatedConfig) -> Result<()> {
    let server = Server::bind(config.listen, config.session_timeout)
        .await
        .with_context(|| format!("Could not listen on {}", config.listen))?;
    let addr = server.local_addr().context("Could not read listen address")?;
    info!(%addr, name = %config.server_name, "server started");

    let offer = Offer {
        port: addr.port(),
        server_name: config.server_name.clone(),
    };
    let broadcaster = Broadcaster::bind(offer, config.broadcast, config.offer_interval)
        .await
        .context("Could not open broadcast socket")?;
    let broadcasting = tokio::spawn(broadcaster.run());

    tokio::select! {
        _ = server.run() => {}
        signal = tokio::signal::ctrl_c() => {
            signal.context("Could not listen for ctrl-c")?;
            info!("shutting down");
        }
    }
    broadcasting.abort();
    Ok(())
}
