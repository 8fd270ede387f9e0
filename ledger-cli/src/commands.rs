//! CLI commands

use crate::config::CliConfig;
use anyhow::{bail, Context, Result};
use clap::Subcommand;
use ledger_core::{Block, Hash, Height, Transaction, Wallet};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the hash of a transaction or block JSON file
    Hash {
        /// Transaction or block JSON file
        file: PathBuf,
    },
    /// Print the address of a private key
    Address {
        /// Hex private key
        #[arg(long, env = "LEDGER_KEY", hide_env_values = true)]
        key: Option<String>,
    },
    /// Sign a transaction JSON file and print the signed transaction
    Sign {
        /// Transaction JSON file
        file: PathBuf,

        /// Hex private key
        #[arg(long, env = "LEDGER_KEY", hide_env_values = true)]
        key: Option<String>,

        /// File holding the hex private key
        #[arg(long)]
        key_file: Option<PathBuf>,
    },
    /// Verify the signature of a transaction JSON file
    Verify {
        /// Transaction JSON file
        file: PathBuf,

        /// Expected signer address (defaults to the `signer` field)
        #[arg(long)]
        address: Option<String>,
    },
    /// Assemble a block from a JSON array of transactions
    BuildBlock {
        /// JSON file with an array of transactions
        file: PathBuf,

        /// Hash of the previous block header
        #[arg(long, default_value_t = Hash::NULL)]
        prev_hash: Hash,

        /// Height of the previous block
        #[arg(long, default_value_t = 0)]
        prev_height: Height,

        /// Block timestamp in seconds (defaults to now)
        #[arg(long)]
        timestamp: Option<u64>,
    },
    /// Print the merkle path of a transaction in a block JSON file
    MerklePath {
        /// Block JSON file
        file: PathBuf,

        /// Position of the transaction in the block
        #[arg(long)]
        index: usize,
    },
}

pub async fn run(cmd: Command, config: &CliConfig) -> Result<()> {
    let output = match cmd {
        Command::Hash { file } => hash_file(&file)?,
        Command::Address { key } => {
            let wallet = load_wallet(key.as_deref(), None, config)?;
            json!({ "address": wallet.address().to_checksum() })
        }
        Command::Sign {
            file,
            key,
            key_file,
        } => {
            let wallet = load_wallet(key.as_deref(), key_file.as_deref(), config)?;
            sign_file(&file, &wallet).await?
        }
        Command::Verify { file, address } => verify_file(&file, address.as_deref())?,
        Command::BuildBlock {
            file,
            prev_hash,
            prev_height,
            timestamp,
        } => build_block(&file, prev_hash, prev_height, timestamp)?,
        Command::MerklePath { file, index } => merkle_path(&file, index)?,
    };

    let text = if config.pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    println!("{}", text);
    Ok(())
}

fn read_json(path: &Path) -> Result<Value> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", path.display()))
}

/// Resolve the signing key: explicit key, then key file, then configured key file
fn load_wallet(key: Option<&str>, key_file: Option<&Path>, config: &CliConfig) -> Result<Wallet> {
    let key = match (key, key_file.or(config.key_file.as_deref())) {
        (Some(key), _) => key.to_string(),
        (None, Some(path)) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read key file {}", path.display()))?,
        (None, None) => bail!("No signing key: pass --key, --key-file or set key_file in the config"),
    };

    Ok(Wallet::from_hex(key.trim())?)
}

fn hash_file(path: &Path) -> Result<Value> {
    let value = read_json(path)?;

    if value.get("header").is_some() {
        let block = Block::from_json_value(value)?;
        Ok(json!({
            "kind": "block",
            "height": block.header.height,
            "hash": block.hash(),
        }))
    } else {
        let tx = Transaction::from_json_value(value)?;
        Ok(json!({
            "kind": "transaction",
            "sequence": tx.sequence,
            "hash": tx.hash(),
        }))
    }
}

async fn sign_file(path: &Path, wallet: &Wallet) -> Result<Value> {
    let mut tx = Transaction::from_json_value(read_json(path)?)?;
    tx.sign(wallet).await?;
    info!(sequence = tx.sequence, signer = %tx.signer, "transaction signed");
    Ok(tx.to_json_value()?)
}

fn verify_file(path: &Path, address: Option<&str>) -> Result<Value> {
    let tx = Transaction::from_json_value(read_json(path)?)?;
    let valid = tx.verify(address);
    Ok(json!({
        "hash": tx.hash(),
        "signer": address.unwrap_or(&tx.signer),
        "valid": valid,
    }))
}

fn build_block(
    path: &Path,
    prev_hash: Hash,
    prev_height: Height,
    timestamp: Option<u64>,
) -> Result<Value> {
    let value = read_json(path)?;
    let Value::Array(items) = value else {
        bail!("{} must contain a JSON array of transactions", path.display());
    };

    let transactions = items
        .into_iter()
        .map(Transaction::from_json_value)
        .collect::<Result<Vec<_>, _>>()?;

    let block = match timestamp {
        Some(ts) => Block::create_at(prev_hash, prev_height, transactions, ts)?,
        None => Block::create(prev_hash, prev_height, transactions)?,
    };
    info!(height = block.header.height, hash = %block.hash(), "block assembled");
    Ok(block.to_json_value()?)
}

fn merkle_path(path: &Path, index: usize) -> Result<Value> {
    let block = Block::from_json_value(read_json(path)?)?;
    let tx = block
        .transactions
        .get(index)
        .with_context(|| format!("Block has no transaction at index {}", index))?;

    Ok(json!({
        "index": index,
        "hash": tx.hash(),
        "root": block.merkle_root(),
        "path": block.merkle_path(index)?,
    }))
}
