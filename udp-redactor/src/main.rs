//! Entry point for `udp-redactor`.
//!
//! Parses CLI arguments and dispatches into either **server** or **client** mode.
//! All actual protocol work is delegated to library modules; `main.rs` owns only
//! process setup (logging, argument parsing, stdin prompts, exit status).

use std::io::Write;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};

use udp_redactor::client::{self, ClientInput};
use udp_redactor::fragment::DEFAULT_FRAGMENT_SIZE;
use udp_redactor::server::Server;
use udp_redactor::{ChannelConfig, FrameCodec, SessionConfig};

/// Reliable UDP messaging with keyword redaction.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    mode: Mode,
}

/// Knobs shared by both modes.  Both peers must agree on them.
#[derive(Args, Clone)]
struct ProtocolArgs {
    /// Milliseconds to wait for an ACK before retransmitting.
    #[arg(long, default_value_t = 1000)]
    timeout_ms: u64,
    /// Transmissions per datagram before giving up.
    #[arg(long, default_value_t = 3)]
    attempts: u32,
    /// Maximum fragment size in bytes.
    #[arg(long, default_value_t = DEFAULT_FRAGMENT_SIZE)]
    fragment_size: usize,
    /// Use tagged frames instead of the plain-text wire format.
    #[arg(long)]
    tagged: bool,
}

impl ProtocolArgs {
    fn channel_config(&self) -> ChannelConfig {
        ChannelConfig {
            ack_timeout: Duration::from_millis(self.timeout_ms),
            max_attempts: self.attempts,
            max_fragment_size: self.fragment_size,
            codec: if self.tagged {
                FrameCodec::Tagged
            } else {
                FrameCodec::Text
            },
            ..ChannelConfig::default()
        }
    }
}

#[derive(Subcommand)]
enum Mode {
    /// Run the redaction server.
    Server {
        /// UDP port to listen on.
        port: u16,
        /// Local address to bind.
        #[arg(short, long, default_value = "0.0.0.0")]
        bind: IpAddr,
        /// Seconds before an unanswered phrase is forgotten (0 = never).
        #[arg(long, default_value_t = 300)]
        session_ttl_secs: u64,
        #[command(flatten)]
        protocol: ProtocolArgs,
    },
    /// Send a phrase and keyword to a server; prompts for anything omitted.
    Client {
        /// Server name or IP address.
        #[arg(long)]
        host: Option<String>,
        /// Server port (1024-49151).
        #[arg(long)]
        port: Option<String>,
        /// Phrase to redact.
        #[arg(long)]
        phrase: Option<String>,
        /// Word to redact from the phrase.
        #[arg(long)]
        keyword: Option<String>,
        #[command(flatten)]
        protocol: ProtocolArgs,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Initialise env_logger; set RUST_LOG to control verbosity.
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.mode {
        Mode::Server {
            port,
            bind,
            session_ttl_secs,
            protocol,
        } => {
            let sessions = SessionConfig {
                ttl: (session_ttl_secs > 0).then(|| Duration::from_secs(session_ttl_secs)),
                ..SessionConfig::default()
            };
            run_server(SocketAddr::new(bind, port), protocol.channel_config(), sessions).await
        }
        Mode::Client {
            host,
            port,
            phrase,
            keyword,
            protocol,
        } => run_client(host, port, phrase, keyword, protocol.channel_config()).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run_server(addr: SocketAddr, channel: ChannelConfig, sessions: SessionConfig) -> Result<()> {
    let mut server = Server::bind(addr, channel, sessions)
        .await
        .with_context(|| format!("binding {addr}"))?;
    log::info!("Starting server on {}", server.local_addr());
    server.run().await;
    Ok(())
}

async fn run_client(
    host: Option<String>,
    port: Option<String>,
    phrase: Option<String>,
    keyword: Option<String>,
    config: ChannelConfig,
) -> Result<()> {
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let host = or_prompt(host, "Enter server name or IP address: ", &mut stdin).await?;
    let port = or_prompt(port, "Enter port: ", &mut stdin).await?;
    let phrase = or_prompt(phrase, "Enter string: ", &mut stdin).await?;
    let keyword = or_prompt(keyword, "Enter keyword: ", &mut stdin).await?;

    let input = ClientInput::validate(&host, &port, &phrase, &keyword)?;
    let server = client::resolve(&input.host, input.port).await?;
    log::info!("Starting client, connecting to {server}");

    let mut channel = client::connect_channel(server, config).await?;
    let reply = client::run_exchange(&mut channel, server, &input.phrase, &input.keyword)
        .await
        .context("Failed to complete exchange. Terminating!")?;

    println!("{}", reply.redacted);
    println!("{}", reply.count);
    for echo in &reply.echoes {
        println!("{echo}");
    }
    Ok(())
}

/// Use `value` if given, otherwise print `label` and read one line from stdin.
async fn or_prompt<R>(
    value: Option<String>,
    label: &str,
    lines: &mut tokio::io::Lines<R>,
) -> Result<String>
where
    R: tokio::io::AsyncBufRead + Unpin,
{
    if let Some(value) = value {
        return Ok(value);
    }
    print!("{label}");
    std::io::stdout().flush()?;
    Ok(lines.next_line().await?.unwrap_or_default())
}
