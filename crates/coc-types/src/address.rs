use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Hex characters taken from the family namespace hash.
pub const NAMESPACE_LEN: usize = 6;
/// Hex characters taken from the case-number hash.
pub const CASE_SEGMENT_LEN: usize = 8;
/// Hex characters taken from the image-hash hash.
pub const IMAGE_SEGMENT_LEN: usize = 56;
/// Total address length in hex characters.
pub const ADDRESS_LEN: usize = NAMESPACE_LEN + CASE_SEGMENT_LEN + IMAGE_SEGMENT_LEN;

/// A 70-character lower-case hex key into ledger state.
///
/// Layout: `namespace(6) || case(8) || image(56)`. Construction goes through
/// [`LedgerAddress::parse`], so every value of this type is well formed.
/// Derivation from case identifiers lives in `coc-ledger`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LedgerAddress(String);

impl LedgerAddress {
    /// Parse and validate an address string.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        if s.len() != ADDRESS_LEN {
            return Err(TypeError::InvalidLength {
                expected: ADDRESS_LEN,
                actual: s.len(),
            });
        }
        if !s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)) {
            return Err(TypeError::InvalidHex(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }

    /// Assemble an address from full SHA-512 digests of the namespace seed,
    /// case number and image hash, truncating each to its segment width.
    pub fn from_sha512(namespace: &[u8; 64], case: &[u8; 64], image: &[u8; 64]) -> Self {
        let mut s = String::with_capacity(ADDRESS_LEN);
        s.push_str(&hex::encode(namespace)[..NAMESPACE_LEN]);
        s.push_str(&hex::encode(case)[..CASE_SEGMENT_LEN]);
        s.push_str(&hex::encode(image)[..IMAGE_SEGMENT_LEN]);
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The 6-character family namespace prefix.
    pub fn namespace(&self) -> &str {
        &self.0[..NAMESPACE_LEN]
    }

    /// The 8-character case-number segment.
    pub fn case_segment(&self) -> &str {
        &self.0[NAMESPACE_LEN..NAMESPACE_LEN + CASE_SEGMENT_LEN]
    }

    /// The 56-character image-hash segment.
    pub fn image_segment(&self) -> &str {
        &self.0[NAMESPACE_LEN + CASE_SEGMENT_LEN..]
    }

    /// Short form for logs.
    pub fn short(&self) -> String {
        format!("{}..{}", &self.0[..NAMESPACE_LEN + CASE_SEGMENT_LEN], &self.0[ADDRESS_LEN - 4..])
    }
}

impl fmt::Debug for LedgerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LedgerAddress({})", self.short())
    }
}

impl fmt::Display for LedgerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for LedgerAddress {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for LedgerAddress {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<LedgerAddress> for String {
    fn from(value: LedgerAddress) -> Self {
        value.0
    }
}

impl AsRef<str> for LedgerAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
