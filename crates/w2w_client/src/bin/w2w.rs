//! w2w: command-line client for the W2W servers.
//! `request` sends one envelope to the command server and prints the reply;
//! `chat` joins the shared room, posting stdin lines and printing relayed ones.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use w2w_client::messages::{chat_line, join_notice, leave_notice};
use w2w_client::{config, ChatClient, Client};

#[derive(Debug, Parser)]
#[command(name = "w2w", version, about = "W2W movie lookup and chat client")]
struct Cli {
    /// Config file (defaults to $W2W_CONFIG, then ~/.w2w/config.yaml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Send one request to the command server and print the JSON reply.
    Request {
        /// Action name, e.g. `login` or `search`.
        action: String,
        /// Request payload as a JSON object.
        #[arg(long, default_value = "{}")]
        data: String,
    },
    /// Join the chat room.
    Chat {
        #[arg(long)]
        username: String,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to create runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match rt.block_on(run(cli)) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let path = config::resolve_config_path(cli.config.as_deref())?;
    let cfg = config::load_or_default(&path)
        .with_context(|| format!("failed to load config from {}", path.display()))?;

    match cli.command {
        Command::Request { action, data } => {
            let data: serde_json::Value =
                serde_json::from_str(&data).context("--data must be valid JSON")?;
            let client = Client::new(cfg.command_addr()).with_timeout(cfg.request_timeout());
            let response = client.send_request(&action, data).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(if response.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Chat { username } => {
            run_chat(&cfg.chat_addr(), &username).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run_chat(addr: &str, username: &str) -> anyhow::Result<()> {
    let client = ChatClient::connect(addr).await?;
    let (mut sender, mut receiver) = client.split();
    sender.send(&join_notice(username)).await?;

    let printer = tokio::spawn(async move {
        loop {
            match receiver.recv(None).await {
                Ok(Some(line)) => println!("{}", line),
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "chat connection failed");
                    break;
                }
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        sender.send(&chat_line(username, text)).await?;
    }

    sender.send(&leave_notice(username)).await?;
    sender.close().await?;
    match tokio::time::timeout(Duration::from_secs(1), printer).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::debug!(error = %e, "chat printer task failed"),
        Err(_) => tracing::debug!("chat printer still running at exit"),
    }
    Ok(())
}
