//! Core ledger data structures
//!
//! This crate provides the canonical data model of the purchase ledger:
//! - Basic types (Hash, Address, Amount, ...)
//! - Deterministic hashing of ledger values
//! - Signed purchase transactions
//! - Merkle trees over transaction hashes
//! - Blocks chained by header hash
//! - Shape validation of transport records

pub mod block;
pub mod error;
pub mod hash;
pub mod merkle;
pub mod signer;
pub mod transaction;
pub mod types;
pub mod validation;

// Re-export commonly used types
pub use block::{check_sequence, Block, BlockHeader};
pub use error::{CoreError, CoreResult};
pub use hash::{hash_full, hash_multi, HashPart};
pub use merkle::{build_merkle_tree, check_merkle_path, merkle_path, merkle_root, tree_size};
pub use signer::{recover_address, Signature, Signer, Wallet};
pub use transaction::Transaction;
pub use types::{Address, Amount, Hash, Height, Timestamp};
