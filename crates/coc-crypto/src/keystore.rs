use std::fs;
use std::path::Path;

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::{CryptoError, CryptoResult};
use crate::signer::{Signature, SigningKey};

const KEY_FILE_VERSION: u8 = 1;
const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;

/// Default PBKDF2-HMAC-SHA256 iteration count for new key files.
pub const DEFAULT_KDF_ROUNDS: u32 = 10_000;

/// A private key encrypted at rest under a passphrase.
///
/// The passphrase is stretched with PBKDF2-HMAC-SHA256 into an AES-256-GCM
/// key. The public key is stored in the clear so callers can
/// identify a key file without unlocking it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedKey {
    pub version: u8,
    pub public_key: String,
    pub kdf_rounds: u32,
    pub salt_b64: String,
    pub nonce_b64: String,
    pub ciphertext_b64: String,
}

impl EncryptedKey {
    /// Encrypt `key` under `passphrase` with the default work factor.
    pub fn encrypt(key: &SigningKey, passphrase: &str) -> CryptoResult<Self> {
        Self::encrypt_with_rounds(key, passphrase, DEFAULT_KDF_ROUNDS)
    }

    pub fn encrypt_with_rounds(
        key: &SigningKey,
        passphrase: &str,
        rounds: u32,
    ) -> CryptoResult<Self> {
        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);

        let cipher_key = stretch(passphrase, &salt, rounds);
        let cipher = Aes256Gcm::new_from_slice(&cipher_key[..])
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), &key.as_bytes()[..])
            .map_err(|_| CryptoError::Signing("key encryption failed".into()))?;

        Ok(Self {
            version: KEY_FILE_VERSION,
            public_key: public_key_of(key),
            kdf_rounds: rounds,
            salt_b64: BASE64.encode(salt),
            nonce_b64: BASE64.encode(nonce_bytes),
            ciphertext_b64: BASE64.encode(ciphertext),
        })
    }

    /// Unlock the private key. Fails with [`CryptoError::WrongPassphrase`]
    /// when authentication of the ciphertext fails.
    pub fn decrypt(&self, passphrase: &str) -> CryptoResult<SigningKey> {
        if self.version != KEY_FILE_VERSION {
            return Err(CryptoError::MalformedKeyFile(format!(
                "unsupported version {}",
                self.version
            )));
        }
        let salt = decode_field("salt", &self.salt_b64)?;
        let nonce_raw = decode_field("nonce", &self.nonce_b64)?;
        if nonce_raw.len() != NONCE_LEN {
            return Err(CryptoError::MalformedKeyFile("bad nonce length".into()));
        }
        let ciphertext = decode_field("ciphertext", &self.ciphertext_b64)?;

        let cipher_key = stretch(passphrase, &salt, self.kdf_rounds);
        let cipher = Aes256Gcm::new_from_slice(&cipher_key[..])
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        let plaintext = Zeroizing::new(
            cipher
                .decrypt(Nonce::from_slice(&nonce_raw), ciphertext.as_ref())
                .map_err(|_| CryptoError::WrongPassphrase)?,
        );
        let secret: [u8; 32] = plaintext
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::MalformedKeyFile("bad secret length".into()))?;
        let key = SigningKey::from_bytes(secret);

        if public_key_of(&key) != self.public_key {
            return Err(CryptoError::MalformedKeyFile(
                "public key does not match encrypted secret".into(),
            ));
        }
        Ok(key)
    }

    pub fn to_json(&self) -> CryptoResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(s: &str) -> CryptoResult<Self> {
        Ok(serde_json::from_str(s)?)
    }

    /// Write the key file, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> CryptoResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, self.to_json()?)?;
        tracing::debug!(path = %path.display(), public_key = %self.public_key, "key file written");
        Ok(())
    }

    pub fn load(path: &Path) -> CryptoResult<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_json(&raw)
    }
}

/// Generate a fresh key pair. Returns the private key and its hex public key.
pub fn new_key_pair() -> (SigningKey, String) {
    let key = SigningKey::generate();
    let public = public_key_of(&key);
    (key, public)
}

/// Sign `bytes` with `key`.
pub fn sign(bytes: &[u8], key: &SigningKey) -> Signature {
    key.sign(bytes)
}

/// Lower-case hex public key for `key`.
pub fn public_key_of(key: &SigningKey) -> String {
    key.verifying_key().to_hex()
}

fn decode_field(name: &str, value: &str) -> CryptoResult<Vec<u8>> {
    BASE64
        .decode(value.as_bytes())
        .map_err(|e| CryptoError::MalformedKeyFile(format!("{name}: {e}")))
}

fn stretch(passphrase: &str, salt: &[u8], rounds: u32) -> Zeroizing<[u8; 32]> {
    let mut out = Zeroizing::new([0u8; 32]);
    pbkdf2_hmac::<Sha256>(passphrase.as_bytes(), salt, rounds.max(1), &mut out[..]);
    out
}
