use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use log::warn;

#[derive(Parser, Debug)]
#[command(name = "webhook-dispatcher", version, about = "Stores incoming webhooks and forwards them to configured targets")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the webhook server.
    Server(Settings),
}

/// Everything the server needs, resolved once at startup.
#[derive(Args, Debug, Clone)]
pub struct Settings {
    #[arg(long, env = "PORT", default_value_t = 8000)]
    pub port: u16,

    /// Redis host; the server connects on port 6379.
    #[arg(long, env = "REDIS", default_value = "127.0.0.1")]
    pub redis: String,

    /// SQLite archive file. Enables the secondary store when set.
    #[arg(long, env = "SQLITE_PATH")]
    pub sqlite_path: Option<PathBuf>,

    /// Dispatch rules file.
    #[arg(long, env = "CONFIG", default_value = "config.yaml")]
    pub config: PathBuf,

    /// Log method, headers and body of every ingested request (`1` to enable).
    #[arg(long = "log", env = "LOG", default_value = "0")]
    pub log: String,
}

impl Settings {
    pub fn listen_addr(&self) -> SocketAddr {
        ([0, 0, 0, 0], self.port).into()
    }

    /// Unrecognised values turn request logging off rather than failing startup.
    pub fn log_requests(&self) -> bool {
        parse_flag(&self.log).unwrap_or_else(|| {
            warn!("Unrecognised LOG value {:?}, request logging disabled", self.log);
            false
        })
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "" | "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
