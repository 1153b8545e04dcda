use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::error::{CryptoError, CryptoResult};

/// Ed25519 signing key (private). Key material is zeroized on drop.
pub struct SigningKey(ed25519_dalek::SigningKey);

/// Ed25519 verifying key (public).
#[derive(Clone, PartialEq, Eq)]
pub struct VerifyingKey(ed25519_dalek::VerifyingKey);

/// Ed25519 signature.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature(#[serde(with = "signature_serde")] ed25519_dalek::Signature);

/// Anything that can sign on behalf of a public key.
///
/// Envelope construction only needs this, so remote or hardware signers can
/// stand in for an in-memory [`SigningKey`].
pub trait Signer: Send + Sync {
    /// Lower-case hex public key (64 characters).
    fn public_key_hex(&self) -> String;

    /// Sign `message`.
    fn try_sign(&self, message: &[u8]) -> CryptoResult<Signature>;
}

impl SigningKey {
    /// Generate a new key from the OS CSPRNG.
    pub fn generate() -> Self {
        Self(ed25519_dalek::SigningKey::generate(&mut OsRng))
    }

    /// Create from raw 32-byte secret.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(ed25519_dalek::SigningKey::from_bytes(&bytes))
    }

    /// Parse a 64-character hex secret.
    pub fn from_hex(s: &str) -> CryptoResult<Self> {
        let bytes = Zeroizing::new(
            hex::decode(s.trim()).map_err(|e| CryptoError::InvalidKey(e.to_string()))?,
        );
        let arr: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::InvalidKey(format!("expected 32 bytes, got {}", bytes.len())))?;
        Ok(Self::from_bytes(arr))
    }

    /// The corresponding public verifying key.
    pub fn verifying_key(&self) -> VerifyingKey {
        VerifyingKey(self.0.verifying_key())
    }

    /// Sign a message.
    pub fn sign(&self, message: &[u8]) -> Signature {
        use ed25519_dalek::Signer as _;
        Signature(self.0.sign(message))
    }

    /// Raw secret key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }
}

impl Signer for SigningKey {
    fn public_key_hex(&self) -> String {
        self.verifying_key().to_hex()
    }

    fn try_sign(&self, message: &[u8]) -> CryptoResult<Signature> {
        Ok(self.sign(message))
    }
}

impl VerifyingKey {
    /// Verify a signature on a message.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> CryptoResult<()> {
        use ed25519_dalek::Verifier;
        self.0
            .verify(message, &signature.0)
            .map_err(|_| CryptoError::InvalidSignature)
    }

    /// Raw public key bytes.
    pub fn as_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    /// Create from raw 32-byte public key.
    pub fn from_bytes(bytes: [u8; 32]) -> CryptoResult<Self> {
        let key = ed25519_dalek::VerifyingKey::from_bytes(&bytes)
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        Ok(Self(key))
    }

    /// Lower-case hex encoding, as carried in transaction headers.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0.to_bytes())
    }

    /// Parse a 64-character hex public key.
    pub fn from_hex(s: &str) -> CryptoResult<Self> {
        let bytes = hex::decode(s).map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidKey("expected 32-byte public key".into()))?;
        Self::from_bytes(arr)
    }
}

impl Signature {
    pub fn to_bytes(&self) -> [u8; 64] {
        self.0.to_bytes()
    }

    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(ed25519_dalek::Signature::from_bytes(&bytes))
    }

    /// Lower-case hex encoding. Used as the transaction and batch id.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0.to_bytes())
    }

    pub fn from_hex(s: &str) -> CryptoResult<Self> {
        let bytes = hex::decode(s).map_err(|_| CryptoError::InvalidSignature)?;
        let arr: [u8; 64] = bytes.try_into().map_err(|_| CryptoError::InvalidSignature)?;
        Ok(Self::from_bytes(arr))
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SigningKey(<redacted>)")
    }
}

impl std::fmt::Debug for VerifyingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "VerifyingKey({})", self.to_hex())
    }
}

impl std::fmt::Debug for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Signature({}...)", hex::encode(&self.0.to_bytes()[..8]))
    }
}

mod signature_serde {
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(sig: &ed25519_dalek::Signature, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_bytes(&sig.to_bytes())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<ed25519_dalek::Signature, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bytes: Vec<u8> = Vec::deserialize(deserializer)?;
        let arr: [u8; 64] = bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("expected 64-byte signature"))?;
        Ok(ed25519_dalek::Signature::from_bytes(&arr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify() {
        let sk = SigningKey::generate();
        let sig = sk.sign(b"custody record");
        assert!(sk.verifying_key().verify(b"custody record", &sig).is_ok());
    }

    #[test]
    fn verify_fails_on_wrong_message() {
        let sk = SigningKey::generate();
        let sig = sk.sign(b"correct message");
        assert!(sk.verifying_key().verify(b"wrong message", &sig).is_err());
    }

    #[test]
    fn verify_fails_with_wrong_key() {
        let sk1 = SigningKey::generate();
        let sk2 = SigningKey::generate();
        let sig = sk1.sign(b"message");
        assert!(sk2.verifying_key().verify(b"message", &sig).is_err());
    }

    #[test]
    fn public_key_hex_is_64_lowercase_chars() {
        let sk = SigningKey::generate();
        let hex = sk.public_key_hex();
        assert_eq!(hex.len(), 64);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(VerifyingKey::from_hex(&hex).unwrap(), sk.verifying_key());
    }

    #[test]
    fn secret_hex_roundtrip() {
        let sk = SigningKey::generate();
        let restored = SigningKey::from_hex(&hex::encode(sk.as_bytes())).unwrap();
        assert_eq!(sk.verifying_key(), restored.verifying_key());
        assert!(SigningKey::from_hex("abcd").is_err());
        assert!(SigningKey::from_hex("zz").is_err());
    }

    #[test]
    fn signature_hex_roundtrip() {
        let sig = SigningKey::generate().sign(b"test");
        assert_eq!(sig.to_hex().len(), 128);
        assert_eq!(Signature::from_hex(&sig.to_hex()).unwrap(), sig);
        assert!(Signature::from_hex("00").is_err());
    }

    #[test]
    fn signature_bincode_roundtrip() {
        let sig = SigningKey::generate().sign(b"test");
        let bytes = bincode::serialize(&sig).unwrap();
        let parsed: Signature = bincode::deserialize(&bytes).unwrap();
        assert_eq!(sig, parsed);
    }

    #[test]
    fn trait_signer_matches_inherent() {
        let sk = SigningKey::generate();
        let signer: &dyn Signer = &sk;
        let sig = signer.try_sign(b"abc").unwrap();
        assert_eq!(sig, sk.sign(b"abc"));
    }

    #[test]
    fn debug_redacts_signing_key() {
        let sk = SigningKey::generate();
        assert!(format!("{sk:?}").contains("redacted"));
    }

    proptest::proptest! {
        #[test]
        fn any_message_verifies_only_untampered(
            seed in proptest::array::uniform32(proptest::num::u8::ANY),
            message in proptest::collection::vec(proptest::num::u8::ANY, 0..256),
            flip in proptest::num::usize::ANY,
        ) {
            let sk = SigningKey::from_bytes(seed);
            let vk = sk.verifying_key();
            let sig = sk.sign(&message);
            proptest::prop_assert!(vk.verify(&message, &sig).is_ok());

            let mut tampered = message.clone();
            match tampered.len() {
                0 => tampered.push(0),
                n => tampered[flip % n] ^= 0x01,
            }
            proptest::prop_assert!(vk.verify(&tampered, &sig).is_err());
        }
    }
}
