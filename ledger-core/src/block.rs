//! Block data structures and operations

use crate::hash::{hash_full, HashPart};
use crate::merkle::{build_merkle_tree, merkle_path};
use crate::types::u64_string_serde;
use crate::{validation, CoreError, CoreResult, Hash, Height, Timestamp, Transaction};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Block header; the block hash is the hash of this header alone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Hash of the previous block header, `Hash::NULL` for genesis
    pub prev_hash: Hash,
    /// Block height (previous height + 1)
    #[serde(with = "u64_string_serde")]
    pub height: Height,
    /// Root of the transaction merkle tree
    pub merkle_root: Hash,
    /// Block timestamp in seconds
    pub timestamp: Timestamp,
    /// Number of transactions in the block
    pub tx_count: u32,
}

impl BlockHeader {
    /// Create a new block header
    pub fn new(
        prev_hash: Hash,
        height: Height,
        merkle_root: Hash,
        timestamp: Timestamp,
        tx_count: u32,
    ) -> Self {
        Self {
            prev_hash,
            height,
            merkle_root,
            timestamp,
            tx_count,
        }
    }

    /// Calculate the hash of this block header
    pub fn hash(&self) -> Hash {
        hash_full(self)
    }
}

impl HashPart for BlockHeader {
    fn hash_part(&self, buffer: &mut Vec<u8>) {
        self.prev_hash.hash_part(buffer);
        self.height.hash_part(buffer);
        self.merkle_root.hash_part(buffer);
        self.timestamp.hash_part(buffer);
        self.tx_count.hash_part(buffer);
    }
}

/// Complete block with header and transactions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Block header
    pub header: BlockHeader,
    /// Transactions ordered by sequence
    #[serde(rename = "txs")]
    pub transactions: Vec<Transaction>,
    /// Flattened merkle tree over the transaction hashes, root last
    pub merkle_tree: Vec<Hash>,
}

impl Block {
    /// Create a block on top of `prev_hash`/`prev_height`, stamped with the current time
    pub fn create(
        prev_hash: Hash,
        prev_height: Height,
        transactions: Vec<Transaction>,
    ) -> CoreResult<Self> {
        let now = chrono::Utc::now().timestamp().max(0) as Timestamp;
        Self::create_at(prev_hash, prev_height, transactions, now)
    }

    /// Create a block with an explicit timestamp
    pub fn create_at(
        prev_hash: Hash,
        prev_height: Height,
        transactions: Vec<Transaction>,
        timestamp: Timestamp,
    ) -> CoreResult<Self> {
        check_sequence(&transactions)?;

        let tx_hashes: Vec<Hash> = transactions.iter().map(Transaction::hash).collect();
        let merkle_tree = build_merkle_tree(&tx_hashes)?;
        let merkle_root = *merkle_tree.last().ok_or(CoreError::EmptyTree)?;

        let tx_count = u32::try_from(transactions.len()).map_err(|_| {
            CoreError::Encoding(format!("{} transactions exceed u32", transactions.len()))
        })?;
        let height = prev_height
            .checked_add(1)
            .ok_or_else(|| CoreError::Encoding("block height overflows u64".to_string()))?;

        let header = BlockHeader::new(prev_hash, height, merkle_root, timestamp, tx_count);

        debug!(
            height,
            tx_count,
            merkle_root = %merkle_root,
            prev_hash = %prev_hash,
            "created block"
        );

        Ok(Self {
            header,
            transactions,
            merkle_tree,
        })
    }

    /// Get the block hash (same as header hash)
    pub fn hash(&self) -> Hash {
        self.header.hash()
    }

    /// Check if block is genesis
    pub fn is_genesis(&self) -> bool {
        self.header.prev_hash.is_null()
    }

    /// Merkle root stored in the header
    pub fn merkle_root(&self) -> Hash {
        self.header.merkle_root
    }

    /// Re-check the structural invariants of a block received from elsewhere
    pub fn validate(&self) -> CoreResult<()> {
        if self.header.tx_count as usize != self.transactions.len() {
            return Err(CoreError::validation(
                "tx_count",
                format!(
                    "header says {} but block has {} transactions",
                    self.header.tx_count,
                    self.transactions.len()
                ),
            ));
        }

        check_sequence(&self.transactions)?;

        let tx_hashes: Vec<Hash> = self.transactions.iter().map(Transaction::hash).collect();
        let merkle_tree = build_merkle_tree(&tx_hashes)?;
        if merkle_tree != self.merkle_tree {
            return Err(CoreError::validation(
                "merkle_tree",
                "does not match the transactions",
            ));
        }
        if merkle_tree.last() != Some(&self.header.merkle_root) {
            return Err(CoreError::validation(
                "merkle_root",
                "does not match the merkle tree",
            ));
        }

        Ok(())
    }

    /// Merkle path proving the transaction at `index`
    pub fn merkle_path(&self, index: usize) -> CoreResult<Vec<Hash>> {
        merkle_path(&self.merkle_tree, self.transactions.len(), index)
    }

    /// Get transaction and its position by hash
    pub fn find_transaction(&self, hash: &Hash) -> Option<(usize, &Transaction)> {
        self.transactions
            .iter()
            .enumerate()
            .find(|(_, tx)| tx.hash() == *hash)
    }

    /// Build from a JSON value, checking its shape and then its invariants
    pub fn from_json_value(value: serde_json::Value) -> CoreResult<Self> {
        validation::validate_block(&value)?;
        let block: Block = serde_json::from_value(value)?;
        block.validate()?;
        Ok(block)
    }

    /// Parse from JSON text, see [`Block::from_json_value`]
    pub fn from_json_str(json: &str) -> CoreResult<Self> {
        Self::from_json_value(serde_json::from_str(json)?)
    }

    /// Convert to the JSON transport form
    pub fn to_json_value(&self) -> CoreResult<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

impl HashPart for Block {
    fn hash_part(&self, buffer: &mut Vec<u8>) {
        self.header.hash_part(buffer);
    }
}

/// Transactions must be numbered `0, 1, 2, ...` in order
pub fn check_sequence(transactions: &[Transaction]) -> CoreResult<()> {
    for (index, tx) in transactions.iter().enumerate() {
        let expected = index as u64;
        if tx.sequence != expected {
            return Err(CoreError::Sequence {
                index,
                expected,
                found: tx.sequence,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merkle::check_merkle_path;
    use crate::Amount;

    fn tx(sequence: u64) -> Transaction {
        Transaction::new(
            sequence,
            format!("{:08}", sequence),
            1668044556,
            Amount::from(1_000_000_000u64),
            "F000100",
            "a@example.com",
            1,
        )
    }

    fn txs(n: u64) -> Vec<Transaction> {
        (0..n).map(tx).collect()
    }

    #[test]
    fn test_create_block() {
        let block = Block::create_at(Hash::NULL, 0, txs(5), 1668044600).unwrap();

        assert_eq!(block.header.height, 1);
        assert_eq!(block.header.tx_count, 5);
        assert_eq!(block.header.timestamp, 1668044600);
        assert_eq!(block.header.prev_hash, Hash::NULL);
        assert_eq!(block.merkle_tree.len(), 5 + 3 + 2 + 1);
        assert_eq!(block.header.merkle_root, *block.merkle_tree.last().unwrap());
        assert!(block.is_genesis());
        assert!(block.validate().is_ok());
    }

    #[test]
    fn test_create_uses_current_time() {
        let before = chrono::Utc::now().timestamp() as u64;
        let block = Block::create(Hash::NULL, 9, txs(1)).unwrap();
        let after = chrono::Utc::now().timestamp() as u64;

        assert_eq!(block.header.height, 10);
        assert!(block.header.timestamp >= before && block.header.timestamp <= after);
    }

    #[test]
    fn test_block_hash_is_header_hash() {
        let block = Block::create_at(Hash::NULL, 0, txs(3), 1).unwrap();
        assert_eq!(hash_full(&block), hash_full(&block.header));
        assert_eq!(block.hash(), block.header.hash());
        // Hash should be deterministic
        assert_eq!(block.hash(), block.hash());
    }

    #[test]
    fn test_chaining() {
        let first = Block::create_at(Hash::NULL, 0, txs(2), 1).unwrap();
        let second = Block::create_at(first.hash(), first.header.height, txs(3), 2).unwrap();

        assert_eq!(second.header.prev_hash, first.hash());
        assert_eq!(second.header.height, 2);
        assert!(!second.is_genesis());
    }

    #[test]
    fn test_empty_block_rejected() {
        let err = Block::create_at(Hash::NULL, 0, vec![], 1).unwrap_err();
        assert!(matches!(err, CoreError::EmptyTree));
    }

    #[test]
    fn test_sequence_gap_rejected() {
        let list = vec![tx(0), tx(1), tx(3)];
        match Block::create_at(Hash::NULL, 0, list, 1).unwrap_err() {
            CoreError::Sequence {
                index,
                expected,
                found,
            } => {
                assert_eq!(index, 2);
                assert_eq!(expected, 2);
                assert_eq!(found, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_sequence_duplicate_and_offset_rejected() {
        let dup = vec![tx(0), tx(1), tx(1)];
        assert!(matches!(
            Block::create_at(Hash::NULL, 0, dup, 1),
            Err(CoreError::Sequence { index: 2, .. })
        ));

        let offset = vec![tx(1), tx(2)];
        assert!(matches!(
            Block::create_at(Hash::NULL, 0, offset, 1),
            Err(CoreError::Sequence { index: 0, .. })
        ));

        let unordered = vec![tx(1), tx(0)];
        assert!(Block::create_at(Hash::NULL, 0, unordered, 1).is_err());
    }

    #[test]
    fn test_validate_detects_tampering() {
        let block = Block::create_at(Hash::NULL, 0, txs(4), 1).unwrap();

        let mut bad_count = block.clone();
        bad_count.header.tx_count = 3;
        assert!(matches!(
            bad_count.validate(),
            Err(CoreError::Validation { ref field, .. }) if field == "tx_count"
        ));

        let mut bad_tx = block.clone();
        bad_tx.transactions[2].user_email = "mallory@example.com".into();
        assert!(matches!(
            bad_tx.validate(),
            Err(CoreError::Validation { ref field, .. }) if field == "merkle_tree"
        ));

        let mut bad_root = block.clone();
        bad_root.header.merkle_root = Hash::NULL;
        assert!(matches!(
            bad_root.validate(),
            Err(CoreError::Validation { ref field, .. }) if field == "merkle_root"
        ));
    }

    #[test]
    fn test_merkle_path_and_lookup() {
        let block = Block::create_at(Hash::NULL, 0, txs(7), 1).unwrap();
        let target = block.transactions[5].hash();

        let (index, found) = block.find_transaction(&target).unwrap();
        assert_eq!(index, 5);
        assert_eq!(found.sequence, 5);

        let path = block.merkle_path(index).unwrap();
        assert!(check_merkle_path(&block.merkle_root(), &target, index, &path));

        assert!(block.find_transaction(&Hash::NULL).is_none());
        assert!(block.merkle_path(7).is_err());
    }

    #[test]
    fn test_header_json_shape() {
        let block = Block::create_at(Hash::NULL, 41, txs(2), 1668044600).unwrap();
        let value = block.to_json_value().unwrap();

        assert_eq!(value["header"]["height"], serde_json::json!("42"));
        assert_eq!(value["header"]["tx_count"], serde_json::json!(2));
        assert_eq!(
            value["header"]["prev_hash"],
            serde_json::json!(format!("0x{}", "00".repeat(32)))
        );
        assert_eq!(value["txs"].as_array().unwrap().len(), 2);
        assert_eq!(value["merkle_tree"].as_array().unwrap().len(), 3);
    }
}
