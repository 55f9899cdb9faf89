//! Terminal player: discovers a table on the LAN, plays a session with hit or
//! stand typed at the prompt, prints the session statistics, and starts over.
//!
//! Usage:
//!   cargo run --release --bin play
//!   cargo run --release --bin play -- --rounds 5 --connect 192.168.1.20:40123

use anyhow::{Context, Result};
use clap::Parser;
use leafjack_client::{
    backoff::{jittered_backoff, next_backoff},
    Connection, Discovery, Listener, RoundView, ServerOffer, SessionDriver, SessionStats,
    Strategy,
};
use leafjack_types::{Card, Decision, Outcome, RoundSummary, OFFER_PORT};
use std::{
    io::Write,
    net::{Ipv4Addr, SocketAddr},
    str::FromStr,
    time::Duration,
};
use tokio::{
    io::{AsyncBufReadExt, BufReader, Lines, Stdin},
    time,
};
use tracing::{debug, info, warn, Level};

const PAUSE_BETWEEN_SESSIONS: Duration = Duration::from_secs(2);
const MAX_RECONNECT_BACKOFF: Duration = Duration::from_secs(30);

#[derive(Parser, Debug)]
#[command(author, version, about = "Play blackjack against a leafjack table on the local network")]
struct Args {
    /// Team name sent to the server.
    #[arg(short, long, default_value = "🌀 Rasengan Gamblers 🌀")]
    name: String,

    /// Rounds per session. Prompted for when omitted; when given, the player
    /// exits after one completed session.
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..))]
    rounds: Option<u8>,

    /// Skip discovery and connect to this server directly.
    #[arg(long)]
    connect: Option<SocketAddr>,

    #[arg(long, default_value_t = OFFER_PORT)]
    discovery_port: u16,

    #[arg(long, default_value = "10", value_parser = clap::value_parser!(u64).range(1..))]
    discovery_timeout_secs: u64,

    #[arg(long, default_value = "30", value_parser = clap::value_parser!(u64).range(1..))]
    session_timeout_secs: u64,

    #[arg(long, default_value = "warn")]
    log_level: String,
}

enum Target {
    Direct(SocketAddr),
    /// Local address to listen for offers on, bound afresh for every attempt.
    Discover(SocketAddr),
}

/// Reads decisions and round counts from stdin and renders rounds to stdout.
struct Console {
    lines: Lines<BufReader<Stdin>>,
    closed: bool,
}

impl Console {
    fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
            closed: false,
        }
    }

    async fn read_line(&mut self, prompt: &str) -> Option<String> {
        print!("{prompt}");
        if let Err(err) = std::io::stdout().flush() {
            debug!(?err, "failed to flush prompt");
        }
        match self.lines.next_line().await {
            Ok(Some(line)) => Some(line),
            Ok(None) => {
                self.closed = true;
                None
            }
            Err(err) => {
                warn!(?err, "failed to read stdin");
                self.closed = true;
                None
            }
        }
    }

    async fn ask_rounds(&mut self) -> Option<u8> {
        loop {
            let line = self
                .read_line("How many rounds would you like to play? (1-255): ")
                .await?;
            match line.trim().parse::<u8>() {
                Ok(rounds) if rounds > 0 => return Some(rounds),
                _ => println!("Please enter a whole number between 1 and 255."),
            }
        }
    }
}

impl Strategy for Console {
    async fn decide(&mut self, view: &RoundView) -> Decision {
        println!(
            "Round {}: you hold {} (total {}), dealer shows {}",
            view.round,
            show(view.player.cards()),
            view.player_total(),
            show(view.dealer.cards()),
        );
        loop {
            // Standing is the only safe answer once stdin is gone.
            let Some(line) = self.read_line("Hit or stand? [h/s]: ").await else {
                return Decision::Stand;
            };
            match line.trim().to_ascii_lowercase().as_str() {
                "h" | "hit" => return Decision::Hit,
                "s" | "stand" => return Decision::Stand,
                _ => println!("Please enter h or s."),
            }
        }
    }

    fn round_finished(&mut self, view: &RoundView, summary: &RoundSummary) {
        let verdict = match summary.outcome {
            Outcome::Win => "You win!",
            Outcome::Loss => "You lose.",
            Outcome::Tie => "Push, it's a tie.",
        };
        println!(
            "Round {}: you {} ({}) vs dealer {} ({}). {verdict}",
            view.round,
            show(view.player.cards()),
            summary.player_total,
            show(view.dealer.cards()),
            summary.dealer_total,
        );
    }
}

fn show(cards: &[Card]) -> String {
    cards
        .iter()
        .map(Card::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

fn print_stats(server: &ServerOffer, stats: &SessionStats) {
    let tally = stats.tally;
    let rate = stats
        .win_rate()
        .map(|rate| format!("{rate:.1}%"))
        .unwrap_or_else(|| "n/a".to_string());
    println!(
        "Finished playing {} rounds at {}: {} won, {} lost, {} tied, win rate: {rate}",
        tally.rounds(),
        server.server_name,
        tally.wins,
        tally.losses,
        tally.ties,
    );
}

/// Listens on a socket bound for this attempt only, so offers that queued
/// up during an earlier session are never replayed.
async fn discover(bind: SocketAddr, timeout: Duration) -> Result<ServerOffer> {
    let listener = Listener::bind(bind)
        .await
        .with_context(|| format!("Could not bind discovery port {bind}"))?;
    loop {
        match listener.wait(timeout).await.context("discovery failed")? {
            Discovery::Found(offer) => return Ok(offer),
            Discovery::Retry => println!(
                "No offers in the last {}s, still listening...",
                timeout.as_secs()
            ),
        }
    }
}

async fn play(
    server: &ServerOffer,
    rounds: u8,
    name: &str,
    timeout: Duration,
    console: &mut Console,
) -> leafjack_client::Result<SessionStats> {
    let connection = Connection::connect(server.addr, timeout).await?;
    println!("Connected to {} at {}", server.server_name, server.addr);
    SessionDriver::new(connection, rounds, name).run(console).await
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = Level::from_str(&args.log_level).context("Invalid log level")?;
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .init();

    let discovery_timeout = Duration::from_secs(args.discovery_timeout_secs);
    let session_timeout = Duration::from_secs(args.session_timeout_secs);
    let target = match args.connect {
        Some(addr) => Target::Direct(addr),
        None => Target::Discover(SocketAddr::from((
            Ipv4Addr::UNSPECIFIED,
            args.discovery_port,
        ))),
    };
    info!(name = %args.name, "player started");

    let mut console = Console::new();
    let mut rng = rand::thread_rng();
    let mut backoff = PAUSE_BETWEEN_SESSIONS;
    loop {
        let rounds = match args.rounds {
            Some(rounds) => rounds,
            None => match console.ask_rounds().await {
                Some(rounds) => rounds,
                None => break,
            },
        };

        let server = match &target {
            Target::Direct(addr) => ServerOffer {
                addr: *addr,
                server_name: addr.to_string(),
            },
            Target::Discover(bind) => {
                println!("Listening for offers on port {}...", args.discovery_port);
                let offer = discover(*bind, discovery_timeout).await?;
                println!("Received offer from {} at {}", offer.server_name, offer.addr);
                offer
            }
        };

        match play(&server, rounds, &args.name, session_timeout, &mut console).await {
            Ok(stats) => {
                print_stats(&server, &stats);
                backoff = PAUSE_BETWEEN_SESSIONS;
                if args.rounds.is_some() {
                    break;
                }
            }
            Err(err) if err.is_disconnect() => {
                info!(?err, addr = %server.addr, "session dropped");
                println!("Lost the connection to {}. Trying again...", server.server_name);
                backoff = next_backoff(backoff, MAX_RECONNECT_BACKOFF);
            }
            Err(err) => {
                warn!(?err, addr = %server.addr, "session failed");
                println!(
                    "The session with {} ended unexpectedly. Trying again...",
                    server.server_name
                );
            }
        }
        if console.closed {
            break;
        }
        time::sleep(jittered_backoff(&mut rng, backoff)).await;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_timeouts_are_rejected() {
        assert!(Args::try_parse_from(["play", "--discovery-timeout-secs", "0"]).is_err());
        assert!(Args::try_parse_from(["play", "--session-timeout-secs", "0"]).is_err());
        assert!(Args::try_parse_from(["play", "--rounds", "0"]).is_err());
    }

    #[test]
    fn defaults_listen_on_offer_port() {
        let args = Args::try_parse_from(["play"]).unwrap();
        assert_eq!(args.discovery_port, OFFER_PORT);
        assert_eq!(args.discovery_timeout_secs, 10);
        assert_eq!(args.session_timeout_secs, 30);
        assert!(args.connect.is_none());
    }
}
