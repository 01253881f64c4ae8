//! Subcommands and their execution.

use std::fmt;
use std::sync::Arc;

use anyhow::Context;
use bytes::Bytes;
use clap::{Args, Subcommand};
use corelib::config::DEFAULT_PORT;
use corelib::partitioner::Sha256Partitioner;
use corelib::{NodeAddress, Partitioner};
use node::ChordNode;
use replication::DataStore;
use rpc::ClientPool;
use tracing::info;

use crate::config::{hashed_address, CliConfig, CommonArgs, EntryArgs};

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
pub enum Command {
    /// Run a node until interrupted.
    Run(RunArgs),
    /// Store a value under a key.
    Put(PutArgs),
    /// Fetch the value stored under a key.
    Get(GetArgs),
    /// Print the node responsible for a key.
    Lookup(LookupArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Host to bind and advertise.
    #[arg(long, default_value = "127.0.0.1", env = "CHORD_HOST")]
    pub host: String,

    #[arg(long, default_value_t = DEFAULT_PORT, env = "CHORD_PORT")]
    pub port: u16,

    /// `host:port` of a ring member to join; without it a new ring is created.
    #[arg(long, env = "CHORD_SEED")]
    pub seed: Option<String>,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Args, Debug)]
pub struct PutArgs {
    #[command(flatten)]
    pub entry: EntryArgs,
    pub key: String,
    pub value: String,
}

#[derive(Args, Debug)]
pub struct GetArgs {
    #[command(flatten)]
    pub entry: EntryArgs,
    pub key: String,
}

#[derive(Args, Debug)]
pub struct LookupArgs {
    #[command(flatten)]
    pub entry: EntryArgs,
    pub key: String,
}

/// What a command reports on success.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandResult {
    Stopped(NodeAddress),
    Stored { key: String, copies: usize },
    Found(Bytes),
    NotFound(String),
    Owner { key: String, owner: NodeAddress },
}

impl fmt::Display for CommandResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandResult::Stopped(addr) => write!(f, "node {} stopped", addr),
            CommandResult::Stored { key, copies } => {
                write!(f, "stored {:?} ({} copies)", key, copies)
            }
            CommandResult::Found(value) => write!(f, "{}", String::from_utf8_lossy(value)),
            CommandResult::NotFound(key) => write!(f, "{:?} not found", key),
            CommandResult::Owner { key, owner } => write!(f, "{:?} -> {}", key, owner),
        }
    }
}

impl CliConfig {
    pub async fn run(self) -> anyhow::Result<CommandResult> {
        match self.command {
            Command::Run(args) => run_node(args).await,
            Command::Put(args) => put(args).await,
            Command::Get(args) => get(args).await,
            Command::Lookup(args) => lookup(args).await,
        }
    }
}

async fn run_node(args: RunArgs) -> anyhow::Result<CommandResult> {
    let config = args.common.load()?;
    let partitioner = Sha256Partitioner::new(config.ring.id_bits);
    let address = NodeAddress::hashed(args.host, args.port, &partitioner);
    let seed = args
        .seed
        .as_deref()
        .map(|s| hashed_address(s, config.ring.id_bits))
        .transpose()?;

    let pool = Arc::new(ClientPool::new(config.ring.rpc_timeout, config.ring.id_bits));
    let node = ChordNode::new(address.clone(), config.ring, pool)?;
    node.join(seed)
        .await
        .with_context(|| format!("node {} failed to join", address))?;
    info!(node = %address, "running, press Ctrl-C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    node.stop().await;
    Ok(CommandResult::Stopped(address))
}

fn data_store(entry: &EntryArgs) -> anyhow::Result<DataStore> {
    let config = entry.load()?;
    let entry_addr = hashed_address(&entry.entry, config.ring.id_bits)?;
    let pool = Arc::new(ClientPool::new(config.ring.rpc_timeout, config.ring.id_bits));
    Ok(DataStore::new(entry_addr, pool, config.store)?)
}

async fn put(args: PutArgs) -> anyhow::Result<CommandResult> {
    let store = data_store(&args.entry)?;
    let copies = store.config().redundancy;
    let stored = store.store(&args.key, Bytes::from(args.value.into_bytes())).await;
    store.shutdown().await;
    stored?;
    Ok(CommandResult::Stored { key: args.key, copies })
}

async fn get(args: GetArgs) -> anyhow::Result<CommandResult> {
    let store = data_store(&args.entry)?;
    let found = store.get(&args.key).await;
    store.shutdown().await;
    Ok(match found {
        Some(value) => CommandResult::Found(value),
        None => CommandResult::NotFound(args.key),
    })
}

async fn lookup(args: LookupArgs) -> anyhow::Result<CommandResult> {
    let config = args.entry.load()?;
    let entry = hashed_address(&args.entry.entry, config.ring.id_bits)?;
    // The primary copy of a key sits at salt 0.
    let id = Sha256Partitioner::new(config.ring.id_bits).partition_salted(&args.key, 0);
    let pool = ClientPool::new(config.ring.rpc_timeout, config.ring.id_bits);
    let owner = pool.client(&entry).find_successor(&id).await?;
    Ok(CommandResult::Owner { key: args.key, owner })
}
