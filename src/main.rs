mod config;

use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use cg_resolver::{
    AuthResolver, MemoryCache, MojangResolver, ProfileResolver, ResolveError, decode_skin,
};
use clap::{Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::config::AppConfig;

#[derive(Debug, Parser)]
#[command(name = "craftgate", version, about = "Resolve Minecraft player identities")]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Resolve a player name to its UUID
    Uuid { name: String },
    /// Download the signed skin property of a player
    Skin {
        id: Uuid,
        /// Print the decoded skin instead of the raw property
        #[arg(long)]
        decode: bool,
    },
    /// Check whether a player joined a server
    HasJoined {
        username: String,
        server_hash: String,
        #[arg(long)]
        ip: Option<IpAddr>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load_or_default(cli.config.as_deref()).await?;

    let cache = match config.cache_expiry() {
        Some(expiry) => MemoryCache::with_expiry(expiry),
        None => MemoryCache::new(),
    };
    let resolver = MojangResolver::new(config.resolver)
        .context("Failed to create resolver")?
        .with_cache(Arc::new(cache));

    match cli.command {
        Command::Uuid { name } => match resolver.find_profile(&name).await? {
            Some(profile) => println!("{}\t{}", profile.name, profile.id),
            None => warn!("No player named {}", name),
        },
        Command::Skin { id, decode } => match resolver.download_skin(&id).await {
            Ok(Some(property)) if decode => {
                let skin = decode_skin(&property)?;
                println!("{}", serde_json::to_string_pretty(&skin)?);
            }
            Ok(Some(property)) => println!("{}", serde_json::to_string_pretty(&property)?),
            Ok(None) => warn!("Player {} has no skin", id),
            Err(ResolveError::QuotaExhausted) => {
                anyhow::bail!("Skin requests are rate limited, try again later")
            }
            Err(e) => return Err(e.into()),
        },
        Command::HasJoined {
            username,
            server_hash,
            ip,
        } => match resolver.has_joined(&username, &server_hash, ip).await? {
            Some(verification) => println!("{}", serde_json::to_string_pretty(&verification)?),
            None => warn!("{} has not joined {}", username, server_hash),
        },
    }

    Ok(())
}
