//! Signing keys and signature recovery
//!
//! Signatures follow the Ethereum personal-message convention: the payload is
//! prefixed with `"\x19Ethereum Signed Message:\n" + len`, hashed with
//! Keccak-256 and signed with secp256k1. The recovered public key maps to an
//! address through the last 20 bytes of its Keccak-256 hash.

use crate::types::strip_hex_prefix;
use crate::{Address, CoreError, CoreResult, Hash};
use async_trait::async_trait;
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{All, Message, PublicKey, Secp256k1, SecretKey};
use sha3::{Digest, Keccak256};
use std::fmt;

const PERSONAL_MESSAGE_PREFIX: &str = "\x19Ethereum Signed Message:\n";

/// Offset added to the recovery id in the `v` byte
const V_OFFSET: u8 = 27;

/// Recoverable secp256k1 signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub r: [u8; 32],
    pub s: [u8; 32],
    pub v: u8,
}

impl Signature {
    /// Create new signature
    pub fn new(r: [u8; 32], s: [u8; 32], v: u8) -> Self {
        Self { r, s, v }
    }

    /// Convert to bytes (65 bytes total)
    pub fn to_bytes(&self) -> [u8; 65] {
        let mut bytes = [0u8; 65];
        bytes[0..32].copy_from_slice(&self.r);
        bytes[32..64].copy_from_slice(&self.s);
        bytes[64] = self.v;
        bytes
    }

    /// Create from bytes
    pub fn from_bytes(bytes: &[u8]) -> CoreResult<Self> {
        if bytes.len() != 65 {
            return Err(CoreError::Encoding(format!(
                "signature must be 65 bytes, got {}",
                bytes.len()
            )));
        }

        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[0..32]);
        s.copy_from_slice(&bytes[32..64]);
        let v = bytes[64];

        Ok(Self { r, s, v })
    }

    /// `0x`-prefixed hex of the 65 signature bytes
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.to_bytes()))
    }

    /// Parse from hex string, with or without `0x` prefix
    pub fn from_hex(s: &str) -> CoreResult<Self> {
        let bytes = hex::decode(strip_hex_prefix(s))?;
        Self::from_bytes(&bytes)
    }

    /// Recovery id in `0..=3`, accepting both raw and `27`-offset `v`
    pub fn recovery_id(&self) -> CoreResult<u8> {
        let id = if self.v >= V_OFFSET {
            self.v - V_OFFSET
        } else {
            self.v
        };
        if id > 3 {
            return Err(CoreError::Crypto(format!("invalid recovery byte {}", self.v)));
        }
        Ok(id)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Keccak-256 of a personal message with its length prefix
pub fn personal_message_hash(message: &[u8]) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update(PERSONAL_MESSAGE_PREFIX.as_bytes());
    hasher.update(message.len().to_string().as_bytes());
    hasher.update(message);
    Hash::new(hasher.finalize().into())
}

/// Address of a public key (last 20 bytes of Keccak-256 of the uncompressed key)
pub fn public_key_to_address(public_key: &PublicKey) -> Address {
    let pubkey_bytes = public_key.serialize_uncompressed();
    let pubkey_hash = Keccak256::digest(&pubkey_bytes[1..]); // Skip first byte (0x04)
    let mut addr_bytes = [0u8; 20];
    addr_bytes.copy_from_slice(&pubkey_hash[12..32]);
    Address::new(addr_bytes)
}

/// Recover the address that produced `signature` over the personal message `message`
pub fn recover_address(message: &[u8], signature: &Signature) -> CoreResult<Address> {
    let digest = personal_message_hash(message);
    let secp = Secp256k1::verification_only();

    let recovery_id = RecoveryId::from_u8_masked(signature.recovery_id()?);

    let mut sig_bytes = [0u8; 64];
    sig_bytes[0..32].copy_from_slice(&signature.r);
    sig_bytes[32..64].copy_from_slice(&signature.s);

    let recoverable_sig = RecoverableSignature::from_compact(&sig_bytes, recovery_id)
        .map_err(|e| CoreError::Crypto(e.to_string()))?;

    let message = Message::from_digest(*digest.as_bytes());
    let public_key = secp
        .recover_ecdsa(message, &recoverable_sig)
        .map_err(|e| CoreError::Crypto(e.to_string()))?;

    Ok(public_key_to_address(&public_key))
}

/// Key provider used to sign transactions
///
/// Implementations may reach out to a remote key holder or a hardware token,
/// hence the async methods.
#[async_trait]
pub trait Signer: Send + Sync {
    /// Address of the signing key
    async fn address(&self) -> CoreResult<Address>;

    /// Sign `message` as a personal message
    async fn sign_message(&self, message: &[u8]) -> CoreResult<Signature>;
}

/// Local secp256k1 private key
pub struct Wallet {
    secp: Secp256k1<All>,
    secret_key: SecretKey,
    address: Address,
}

impl Wallet {
    /// Create a wallet from 32 private key bytes
    pub fn from_private_key(private_key: &[u8]) -> CoreResult<Self> {
        let secp = Secp256k1::new();
        let secret_key = SecretKey::from_slice(private_key)
            .map_err(|e| CoreError::Crypto(e.to_string()))?;
        let public_key = PublicKey::from_secret_key(&secp, &secret_key);
        let address = public_key_to_address(&public_key);

        Ok(Self {
            secp,
            secret_key,
            address,
        })
    }

    /// Create a wallet from a hex private key, with or without `0x` prefix
    pub fn from_hex(private_key: &str) -> CoreResult<Self> {
        let bytes = hex::decode(strip_hex_prefix(private_key.trim()))?;
        Self::from_private_key(&bytes)
    }

    /// Address derived from the public key
    pub fn address(&self) -> Address {
        self.address
    }

    /// Sign a personal message (RFC6979 deterministic nonce)
    pub fn sign_personal(&self, message: &[u8]) -> Signature {
        let digest = personal_message_hash(message);
        let message = Message::from_digest(*digest.as_bytes());

        let sig = self.secp.sign_ecdsa_recoverable(message, &self.secret_key);
        let (recovery_id, sig_bytes) = sig.serialize_compact();

        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&sig_bytes[0..32]);
        s.copy_from_slice(&sig_bytes[32..64]);
        let v = recovery_id as u8 + V_OFFSET;

        Signature::new(r, s, v)
    }
}

#[async_trait]
impl Signer for Wallet {
    async fn address(&self) -> CoreResult<Address> {
        Ok(self.address)
    }

    async fn sign_message(&self, message: &[u8]) -> CoreResult<Signature> {
        Ok(self.sign_personal(message))
    }
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY1: &str = "0xf6dda8e03f9dce37c081e5d178c1fda2ebdb90b5b099de1a555a658270d8c47d";
    const KEY2: &str = "0x023beec95e3e47cb5b56bb8b5e4357db4b8565aef61eaa661c11ebbac6a6c4e8";

    #[test]
    fn test_wallet_address() {
        let wallet = Wallet::from_hex(KEY1).unwrap();
        assert_eq!(
            wallet.address().to_string(),
            "0x19dCAc1131Dfa2fdBbf992261d54c03dDE616D75"
        );

        let wallet2 = Wallet::from_hex(KEY2).unwrap();
        assert_eq!(
            wallet2.address().to_string(),
            "0xc2DfB49ad9BF96b541939EDABdDeBd63d85e8d70"
        );
    }

    #[test]
    fn test_sign_and_recover() {
        let wallet = Wallet::from_hex(KEY1).unwrap();
        let sig = wallet.sign_personal(b"hello world");

        assert!(sig.v == 27 || sig.v == 28);
        assert_eq!(recover_address(b"hello world", &sig).unwrap(), wallet.address());
        assert_ne!(recover_address(b"hello there", &sig).unwrap(), wallet.address());
    }

    #[test]
    fn test_signing_is_deterministic() {
        let wallet = Wallet::from_hex(KEY2).unwrap();
        assert_eq!(wallet.sign_personal(b"data"), wallet.sign_personal(b"data"));
    }

    #[test]
    fn test_signature_hex_roundtrip() {
        let wallet = Wallet::from_hex(KEY1).unwrap();
        let sig = wallet.sign_personal(b"payload");
        let parsed = Signature::from_hex(&sig.to_hex()).unwrap();
        assert_eq!(parsed, sig);
        assert_eq!(sig.to_hex().len(), 2 + 130);
    }

    #[test]
    fn test_malformed_signature() {
        assert!(Signature::from_hex("").is_err());
        assert!(Signature::from_hex("0x1234").is_err());

        let sig = Signature::new([1u8; 32], [2u8; 32], 40);
        assert!(recover_address(b"x", &sig).is_err());
    }

    #[test]
    fn test_invalid_private_key() {
        let err = Wallet::from_private_key(&[0u8; 32]).unwrap_err();
        assert!(matches!(err, CoreError::Crypto(_)));
        assert!(Wallet::from_hex("0x1234").is_err());
    }

    #[test]
    fn test_personal_message_hash_prefix() {
        let mut hasher = Keccak256::new();
        hasher.update(b"\x19Ethereum Signed Message:\n3abc");
        let expected = Hash::new(hasher.finalize().into());
        assert_eq!(personal_message_hash(b"abc"), expected);
    }

    #[tokio::test]
    async fn test_signer_trait() {
        let wallet = Wallet::from_hex(KEY1).unwrap();
        let signer: &dyn Signer = &wallet;

        let address = signer.address().await.unwrap();
        let sig = signer.sign_message(b"async").await.unwrap();
        assert_eq!(recover_address(b"async", &sig).unwrap(), address);
    }
}
