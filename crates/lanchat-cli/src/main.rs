//! LANCHAT CLI
//!
//! Terminal client for a LANCHAT relay: line chat plus relay-negotiated
//! file transfer.

mod config;
mod progress;

use anyhow::Context;
use clap::{Parser, Subcommand};
use console::style;
use lanchat_core::{ChannelSink, SendError, Session, SessionEvent};
use lanchat_transport::TcpConnector;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use config::Config;
use progress::{TransferProgress, format_bytes};

/// LANCHAT - chat and file transfer over a LAN relay
#[derive(Parser)]
#[command(name = "lanchat")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Join the relay and chat
    Chat {
        /// Relay host or IP, optionally with :port
        #[arg(long)]
        host: Option<String>,

        /// Name to register with
        #[arg(short, long)]
        name: Option<String>,

        /// Directory for received files
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the effective configuration
    Config,
}

/// Input typed at the prompt
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Quit,
    SendFile(&'a str),
    Chat(&'a str),
}

impl<'a> Input<'a> {
    fn parse(line: &'a str) -> Self {
        let trimmed = line.trim();
        if trimmed == "/quit" {
            Self::Quit
        } else if let Some(path) = trimmed.strip_prefix("/send ") {
            Self::SendFile(path.trim())
        } else {
            Self::Chat(line)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::load_or_default()?,
    };

    // Logs go to stderr; stdout carries the conversation
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Chat { host, name, output } => {
            if host.is_some() {
                config.relay.host = host;
            }
            if name.is_some() {
                config.identity.name = name;
            }
            if let Some(dir) = output {
                config.transfer.download_dir = dir;
            }
            config.validate()?;
            run_chat(&config).await?;
        }
        Commands::Config => {
            config.validate()?;
            show_config(&config)?;
        }
    }

    Ok(())
}

/// Connect and run the interactive loop until `/quit`, end of input, or
/// connection loss.
async fn run_chat(config: &Config) -> anyhow::Result<()> {
    let Some(host) = config.relay.host.as_deref() else {
        anyhow::bail!("No relay host given (use --host or set relay.host in the config file)");
    };
    let Some(name) = config.identity.name.as_deref() else {
        anyhow::bail!("No name given (use --name or set identity.name in the config file)");
    };

    let (sink, mut events) = ChannelSink::new();
    let mut session = Session::connect_with(
        host,
        name,
        Arc::new(sink),
        config.to_session_config(),
        Arc::new(TcpConnector::with_config(config.to_transport_config())),
    )
    .await
    .with_context(|| format!("connecting to {host}"))?;

    eprintln!(
        "{} {} as {}. Type /send <path> to offer a file, /quit to leave.",
        style("Connected to").green(),
        session.relay_addr(),
        style(session.identity()).bold()
    );

    let mut progress = TransferProgress::new();
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = stdin.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match Input::parse(&line) {
                    Input::Quit => break,
                    Input::SendFile(path) => match session.queue_file(path).await {
                        Ok(()) => eprintln!(
                            "{} {path}; it is sent when the relay opens a transfer port",
                            style("Queued").cyan()
                        ),
                        Err(e) => eprintln!("{} {e}", style("Cannot send:").red()),
                    },
                    Input::Chat(text) => match session.send(text).await {
                        Ok(()) => {
                            if !text.is_empty() {
                                progress.println(&format!("{} {text}", style("me:").dim()));
                            }
                        }
                        Err(SendError::Closed) => {
                            eprintln!("{}", style(lanchat_core::CONNECTION_LOST_NOTICE).red());
                            break;
                        }
                        Err(e) => eprintln!("{} {e}", style("Not sent:").yellow()),
                    },
                }
            }
            event = events.recv() => match event {
                Some(SessionEvent::ChatLine(line)) => progress.println(line.as_str()),
                Some(SessionEvent::Transfer(status)) => progress.update(&status),
                Some(SessionEvent::ConnectionLost) | None => {
                    eprintln!("{}", style(lanchat_core::CONNECTION_LOST_NOTICE).red());
                    break;
                }
            },
        }
    }

    let stats = session.stats();
    session.close().await;
    tracing::info!(
        "Sent {} lines ({}), received {}, {} transfers",
        stats.lines_sent,
        format_bytes(stats.bytes_sent),
        stats.lines_received,
        stats.transfers_started
    );
    if progress.active() > 0 {
        tracing::warn!("{} transfers still running at exit", progress.active());
    }

    Ok(())
}

/// Print the effective configuration as TOML
fn show_config(config: &Config) -> anyhow::Result<()> {
    println!("# LANCHAT {}", env!("CARGO_PKG_VERSION"));
    println!("# {}", Config::default_path().display());
    println!();
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_input() {
        assert_eq!(Input::parse("/quit"), Input::Quit);
        assert_eq!(Input::parse("  /quit "), Input::Quit);
        assert_eq!(
            Input::parse("/send ./notes.txt"),
            Input::SendFile("./notes.txt")
        );
        assert_eq!(Input::parse("hello"), Input::Chat("hello"));
        assert_eq!(Input::parse(" padded "), Input::Chat(" padded "));
        assert_eq!(Input::parse("/sendx"), Input::Chat("/sendx"));
    }

    #[test]
    fn test_cli_parses_chat() {
        let cli = Cli::try_parse_from([
            "lanchat", "chat", "--host", "10.0.0.5", "--name", "alice", "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Chat { host, name, output } => {
                assert_eq!(host.as_deref(), Some("10.0.0.5"));
                assert_eq!(name.as_deref(), Some("alice"));
                assert!(output.is_none());
            }
            Commands::Config => panic!("expected chat"),
        }
    }

    #[test]
    fn test_cli_verify() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
