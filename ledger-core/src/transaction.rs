//! Purchase transaction record

use crate::hash::{hash_full, HashPart};
use crate::signer::{recover_address, Signature, Signer};
use crate::types::amount_serde;
use crate::{validation, Amount, CoreResult, Hash, Timestamp};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A purchase recorded on the ledger
///
/// All fields except `signer` and `signature` are fixed at construction.
/// `signature` is never part of the hashed payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Position in the block, starting at zero
    pub sequence: u64,
    /// Opaque purchase identifier
    pub purchase_id: String,
    /// Seconds since Unix epoch
    pub timestamp: Timestamp,
    /// Purchase amount, carried as a decimal string on the wire
    #[serde(with = "amount_serde")]
    pub amount: Amount,
    pub franchisee_id: String,
    pub user_email: String,
    /// Payment method code
    pub method: u32,
    /// Checksummed address of the signing key, empty until signed
    #[serde(default)]
    pub signer: String,
    /// `0x`-prefixed signature hex, empty until signed
    #[serde(default)]
    pub signature: String,
}

impl Transaction {
    /// Create a new unsigned transaction
    pub fn new(
        sequence: u64,
        purchase_id: impl Into<String>,
        timestamp: Timestamp,
        amount: Amount,
        franchisee_id: impl Into<String>,
        user_email: impl Into<String>,
        method: u32,
    ) -> Self {
        Self {
            sequence,
            purchase_id: purchase_id.into(),
            timestamp,
            amount,
            franchisee_id: franchisee_id.into(),
            user_email: user_email.into(),
            method,
            signer: String::new(),
            signature: String::new(),
        }
    }

    /// Attach an existing signer/signature pair
    pub fn with_signature(mut self, signer: impl Into<String>, signature: impl Into<String>) -> Self {
        self.signer = signer.into();
        self.signature = signature.into();
        self
    }

    /// Canonical hash (excludes the signature)
    pub fn hash(&self) -> Hash {
        hash_full(self)
    }

    /// Whether a signature is attached (not whether it verifies)
    pub fn is_signed(&self) -> bool {
        !self.signature.is_empty()
    }

    /// Sign the transaction
    ///
    /// The signer address is part of the hashed payload, so the digest is taken
    /// over a copy carrying the new address. Both fields are written only after
    /// the signer has answered; dropping the future leaves `self` untouched.
    pub async fn sign<S: Signer + ?Sized>(&mut self, signer: &S) -> CoreResult<()> {
        let address = signer.address().await?.to_checksum();

        let mut draft = self.clone();
        draft.signer = address;
        draft.signature.clear();
        let digest = draft.hash();

        let signature = signer.sign_message(digest.as_bytes()).await?;

        debug!(
            sequence = self.sequence,
            signer = %draft.signer,
            hash = %digest,
            "signed transaction"
        );

        self.signer = draft.signer;
        self.signature = signature.to_hex();
        Ok(())
    }

    /// Verify the signature against `address`, or against `signer` when `None`
    ///
    /// Malformed, missing or mismatching signatures all yield `false`.
    pub fn verify(&self, address: Option<&str>) -> bool {
        let digest = self.hash();

        let signature = match Signature::from_hex(&self.signature) {
            Ok(sig) => sig,
            Err(e) => {
                debug!(sequence = self.sequence, error = %e, "unparseable signature");
                return false;
            }
        };

        let recovered = match recover_address(digest.as_bytes(), &signature) {
            Ok(addr) => addr,
            Err(e) => {
                debug!(sequence = self.sequence, error = %e, "signature recovery failed");
                return false;
            }
        };

        let expected = address.unwrap_or(&self.signer);
        recovered.to_checksum().eq_ignore_ascii_case(expected)
    }

    /// Build from a JSON value after checking its shape
    pub fn from_json_value(value: serde_json::Value) -> CoreResult<Self> {
        validation::validate_transaction(&value)?;
        Ok(serde_json::from_value(value)?)
    }

    /// Parse from JSON text after checking its shape
    pub fn from_json_str(json: &str) -> CoreResult<Self> {
        Self::from_json_value(serde_json::from_str(json)?)
    }

    /// Convert to the JSON transport form
    pub fn to_json_value(&self) -> CoreResult<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

impl HashPart for Transaction {
    fn hash_part(&self, buffer: &mut Vec<u8>) {
        self.sequence.hash_part(buffer);
        self.purchase_id.hash_part(buffer);
        self.timestamp.hash_part(buffer);
        self.amount.hash_part(buffer);
        self.franchisee_id.hash_part(buffer);
        self.user_email.hash_part(buffer);
        self.method.hash_part(buffer);
        self.signer.hash_part(buffer);
    }
}
