//! Cryptographic primitives for the chain-of-custody ledger.
//!
//! Provides SHA-512 digests for addresses and payload hashes, Ed25519
//! signing/verification for transactions and batches, and passphrase-encrypted
//! key files.
//!
//! All crypto operations wrap established libraries; no custom cryptography.

pub mod error;
pub mod hasher;
pub mod keystore;
pub mod signer;

pub use error::{CryptoError, CryptoResult};
pub use hasher::{sha512, sha512_hex, verify_sha512_hex};
pub use keystore::{new_key_pair, public_key_of, sign, EncryptedKey};
pub use signer::{Signature, Signer, SigningKey, VerifyingKey};
