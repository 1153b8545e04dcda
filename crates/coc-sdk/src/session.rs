use std::fmt;
use std::path::Path;
use std::sync::Arc;

use coc_crypto::{EncryptedKey, Signer};

use crate::error::{SdkError, SdkResult};

/// The acting identity for a flow: who the records are attributed to and
/// which key signs them. Passed explicitly; there is no ambient session.
#[derive(Clone)]
pub struct Session {
    user_id: String,
    signer: Arc<dyn Signer>,
}

impl Session {
    pub fn new(user_id: impl Into<String>, signer: Arc<dyn Signer>) -> SdkResult<Self> {
        let user_id = user_id.into();
        if user_id.trim().is_empty() {
            return Err(SdkError::Validation("user id must not be empty".into()));
        }
        Ok(Self { user_id, signer })
    }

    /// Unlock an encrypted key file and bind it to `user_id`.
    pub fn from_key_file(
        user_id: impl Into<String>,
        path: &Path,
        passphrase: &str,
    ) -> SdkResult<Self> {
        let key = EncryptedKey::load(path)?.decrypt(passphrase)?;
        Self::new(user_id, Arc::new(key))
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn public_key(&self) -> String {
        self.signer.public_key_hex()
    }

    pub fn signer(&self) -> &dyn Signer {
        self.signer.as_ref()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .field("public_key", &self.public_key())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coc_crypto::{CryptoError, SigningKey};

    #[test]
    fn rejects_blank_user() {
        let key = Arc::new(SigningKey::generate());
        assert!(matches!(Session::new("  ", key), Err(SdkError::Validation(_))));
    }

    #[test]
    fn exposes_signer_public_key() {
        let key = SigningKey::generate();
        let expected = key.public_key_hex();
        let session = Session::new("officer-7", Arc::new(key)).unwrap();
        assert_eq!(session.public_key(), expected);
        assert_eq!(session.user_id(), "officer-7");
        let debug = format!("{session:?}");
        assert!(debug.contains("officer-7"));
    }

    #[test]
    fn from_key_file_checks_passphrase() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("key.json");
        let key = SigningKey::generate();
        EncryptedKey::encrypt_with_rounds(&key, "pw", 8)
            .unwrap()
            .save(&path)
            .unwrap();

        let session = Session::from_key_file("officer-7", &path, "pw").unwrap();
        assert_eq!(session.public_key(), key.public_key_hex());

        let err = Session::from_key_file("officer-7", &path, "nope").unwrap_err();
        assert!(matches!(err, SdkError::Key(CryptoError::WrongPassphrase)));
    }
}
