//! Command-line arguments.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context};
use clap::{Args, Parser};
use corelib::config::DEFAULT_PORT;
use corelib::partitioner::Sha256Partitioner;
use corelib::{Config, NodeAddress};

use crate::commands::Command;
use crate::logging::LogLevel;

#[derive(Parser, Debug)]
#[command(name = "chord-node", about = "Chord ring node and key-value client", version)]
pub struct CliConfig {
    #[command(subcommand)]
    pub command: Command,

    #[arg(
        long,
        default_value_t = LogLevel::Info,
        value_enum,
        env = "CHORD_LOG_LEVEL",
        global = true
    )]
    pub log_level: LogLevel,
}

/// Settings every command shares.
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// JSON config file; flags below override it.
    #[arg(long, env = "CHORD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Identifier width in bits.
    #[arg(long, env = "CHORD_ID_BITS")]
    pub id_bits: Option<usize>,

    /// Timeout of a single remote call, in milliseconds.
    #[arg(long, env = "CHORD_RPC_TIMEOUT_MS")]
    pub rpc_timeout_ms: Option<u64>,
}

impl CommonArgs {
    /// File settings (or defaults) with flag overrides applied, validated.
    pub fn load(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        if let Some(bits) = self.id_bits {
            config.ring.id_bits = bits;
        }
        if let Some(ms) = self.rpc_timeout_ms {
            config.ring.rpc_timeout = Duration::from_millis(ms);
        }
        config.ring.validate()?;
        config.store.validate()?;
        Ok(config)
    }
}

/// Address of an existing ring member used for lookups.
#[derive(Args, Debug, Clone)]
pub struct EntryArgs {
    /// `host:port` of any ring member.
    #[arg(long, env = "CHORD_ENTRY")]
    pub entry: String,

    /// Copies written per key.
    #[arg(long, env = "CHORD_REDUNDANCY")]
    pub redundancy: Option<usize>,

    #[command(flatten)]
    pub common: CommonArgs,
}

impl EntryArgs {
    pub fn load(&self) -> anyhow::Result<Config> {
        let mut config = self.common.load()?;
        if let Some(redundancy) = self.redundancy {
            config.store.redundancy = redundancy;
        }
        config.store.validate()?;
        Ok(config)
    }
}

/// Split `host:port`. A missing port means the default one.
pub fn parse_endpoint(s: &str) -> anyhow::Result<(String, u16)> {
    let (host, port) = match s.rsplit_once(':') {
        Some((host, port)) => {
            let port = port
                .parse::<u16>()
                .with_context(|| format!("invalid port in {:?}", s))?;
            (host, port)
        }
        None => (s, DEFAULT_PORT),
    };
    if host.is_empty() {
        return Err(anyhow!("missing host in {:?}", s));
    }
    Ok((host.to_string(), port))
}

/// Ring address of the node at `host:port`, placed by hashing the endpoint.
pub fn hashed_address(endpoint: &str, id_bits: usize) -> anyhow::Result<NodeAddress> {
    let (host, port) = parse_endpoint(endpoint)?;
    Ok(NodeAddress::hashed(host, port, &Sha256Partitioner::new(id_bits)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Command;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        CliConfig::command().debug_assert();
    }

    #[test]
    fn test_parse_endpoint() {
        assert_eq!(parse_endpoint("10.0.0.1:4000").unwrap(), ("10.0.0.1".into(), 4000));
        assert_eq!(parse_endpoint("localhost").unwrap(), ("localhost".into(), DEFAULT_PORT));
        assert!(parse_endpoint("host:notaport").is_err());
        assert!(parse_endpoint(":4000").is_err());
    }

    #[test]
    fn test_hashed_address_matches_node_placement() {
        let addr = hashed_address("localhost:4300", 32).unwrap();
        assert_eq!(addr.id, corelib::Identifier::from_address_and_port("localhost", 4300));
    }

    #[test]
    fn test_run_with_seed() {
        let cli = CliConfig::try_parse_from([
            "chord-node",
            "--log-level",
            "debug",
            "run",
            "--port",
            "4400",
            "--seed",
            "10.0.0.1:4300",
            "--id-bits",
            "16",
        ])
        .unwrap();
        assert_eq!(cli.log_level, LogLevel::Debug);
        match cli.command {
            Command::Run(args) => {
                assert_eq!(args.port, 4400);
                assert_eq!(args.seed.as_deref(), Some("10.0.0.1:4300"));
                assert_eq!(args.common.load().unwrap().ring.id_bits, 16);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_put_overrides_redundancy() {
        let cli = CliConfig::try_parse_from([
            "chord-node",
            "put",
            "--entry",
            "localhost:4300",
            "--redundancy",
            "3",
            "key",
            "value",
        ])
        .unwrap();
        match cli.command {
            Command::Put(args) => {
                assert_eq!(args.key, "key");
                assert_eq!(args.value, "value");
                assert_eq!(args.entry.load().unwrap().store.redundancy, 3);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_invalid_overrides_rejected() {
        let args = CommonArgs {
            config: None,
            id_bits: Some(0),
            rpc_timeout_ms: None,
        };
        assert!(args.load().is_err());
    }
}
