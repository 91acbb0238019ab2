use std::path::PathBuf;

use clap::Parser;

/// Gateway bridging local devices to a cloud device registry.
#[derive(Debug, Parser)]
#[command(name = "meshgate", version, about)]
pub struct Cli {
    /// Configuration file path.
    #[arg(short = 'f', long, env = "MESHGATE_CONFIG")]
    pub config: PathBuf,

    /// Override the registry host from the configuration file.
    #[arg(long)]
    pub host: Option<String>,

    /// Override the registry port.
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Override the transport backend (e.g. "http").
    #[arg(short = 'P', long)]
    pub protocol: Option<String>,

    /// Increase log verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
