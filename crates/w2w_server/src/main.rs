//! w2w-server: runs the command server, the chat server, or both.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use w2w_client::{config, Config};
use w2w_server::{ChatServer, CommandServer, Router};

#[derive(Debug, Parser)]
#[command(name = "w2w-server", version, about = "W2W command and chat servers")]
struct Cli {
    /// Config file (defaults to $W2W_CONFIG, then ~/.w2w/config.yaml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the bind host.
    #[arg(long, global = true)]
    host: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the command server (register, login, search, favorites, reviews).
    Serve {
        #[arg(long)]
        port: Option<u16>,
    },
    /// Run the broadcast chat server.
    Chat {
        #[arg(long)]
        port: Option<u16>,
    },
    /// Run both servers in one process.
    All,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let path = config::resolve_config_path(cli.config.as_deref())?;
    let mut cfg = config::load_or_default(&path)
        .with_context(|| format!("failed to load config from {}", path.display()))?;
    if let Some(host) = cli.host {
        cfg.server.host = Some(host);
    }
    let command = cli.command;
    match command {
        Command::Serve { port: Some(port) } => cfg.server.port = Some(port),
        Command::Chat { port: Some(port) } => cfg.server.chat_port = Some(port),
        _ => {}
    }

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to create runtime")?;

    rt.block_on(async move {
        match command {
            Command::Serve { .. } => run_commands(&cfg).await,
            Command::Chat { .. } => run_chat(&cfg).await,
            Command::All => {
                tokio::try_join!(run_commands(&cfg), run_chat(&cfg))?;
                Ok(())
            }
        }
    })
}

async fn run_commands(cfg: &Config) -> anyhow::Result<()> {
    let router = Router::from_config(cfg).context("failed to open data files")?;
    let server = CommandServer::bind(cfg.command_addr(), router)
        .await
        .with_context(|| format!("failed to bind {}", cfg.command_addr()))?
        .with_idle_timeout(cfg.idle_timeout());
    server.serve_until(shutdown_signal()).await?;
    Ok(())
}

async fn run_chat(cfg: &Config) -> anyhow::Result<()> {
    let server = ChatServer::bind(cfg.chat_addr())
        .await
        .with_context(|| format!("failed to bind {}", cfg.chat_addr()))?;
    server.serve_until(shutdown_signal()).await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
