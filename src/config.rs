//! Command-line configuration for the server and the CLI.
//!
//! Every server flag can also be supplied through an environment variable.

use crate::{DEFAULT_HOST, DEFAULT_PORT};
use clap::Parser;

/// In-memory key-value server speaking a Redis-compatible protocol.
#[derive(Debug, Clone, Parser)]
#[command(name = "respkv", version, about)]
pub struct ServerConfig {
    /// Address to bind to.
    #[arg(short = 'H', long, default_value = DEFAULT_HOST, env = "RESPKV_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "RESPKV_PORT")]
    pub port: u16,

    /// Log filter used when RUST_LOG is not set, e.g. "info" or "respkv=debug".
    #[arg(long, default_value = "info", env = "RESPKV_LOG")]
    pub log_level: String,
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Command-line client for respkv.
#[derive(Debug, Clone, Parser)]
#[command(name = "respkv-cli", version, about)]
pub struct ClientConfig {
    /// Server hostname.
    #[arg(short = 'H', long, default_value = DEFAULT_HOST)]
    pub host: String,

    /// Server port.
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Command to execute. Starts an interactive prompt when omitted.
    #[arg(trailing_var_arg = true)]
    pub command: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_defaults() {
        let config = ServerConfig::try_parse_from(["respkv"]).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.bind_address(), format!("{}:{}", DEFAULT_HOST, DEFAULT_PORT));
    }

    #[test]
    fn test_server_flags() {
        let config =
            ServerConfig::try_parse_from(["respkv", "-H", "0.0.0.0", "--port", "7000"]).unwrap();
        assert_eq!(config.bind_address(), "0.0.0.0:7000");
    }

    #[test]
    fn test_server_rejects_bad_port() {
        assert!(ServerConfig::try_parse_from(["respkv", "--port", "seventy"]).is_err());
    }

    #[test]
    fn test_client_trailing_command() {
        let config =
            ClientConfig::try_parse_from(["respkv-cli", "-p", "7000", "SET", "k", "v", "EX", "10"])
                .unwrap();
        assert_eq!(config.port, 7000);
        assert_eq!(config.command, vec!["SET", "k", "v", "EX", "10"]);

        let config = ClientConfig::try_parse_from(["respkv-cli"]).unwrap();
        assert!(config.command.is_empty());
    }
}
