use std::sync::OnceLock;

use coc_crypto::sha512;
use coc_types::address::NAMESPACE_LEN;
use coc_types::{CustodyRecord, LedgerAddress, TypeError, FAMILY_NAME};

use crate::error::LedgerResult;

static CUSTODY_NAMESPACE: OnceLock<[u8; 64]> = OnceLock::new();

/// Deterministic mapping from case identifiers to ledger addresses.
///
/// `address = sha512(seed)[..6] || sha512(caseNum)[..8] || sha512(imageHash)[..56]`
/// in lower-case hex. Submit and lookup paths both go through here so they
/// always agree.
pub struct AddressCodec;

impl AddressCodec {
    /// Namespace prefix of the custody family. Hashed once per process.
    pub fn namespace_prefix() -> String {
        hex_prefix(Self::custody_namespace())
    }

    /// Namespace prefix for an arbitrary family seed.
    #[cfg(test)]
    pub(crate) fn namespace_for(seed: &str) -> String {
        hex_prefix(&sha512(seed.as_bytes()))
    }

    /// Derive the address for `(case_num, image_hash)` under `namespace_seed`.
    pub fn derive(namespace_seed: &str, case_num: &str, image_hash: &str) -> LedgerAddress {
        let namespace = if namespace_seed == FAMILY_NAME {
            *Self::custody_namespace()
        } else {
            sha512(namespace_seed.as_bytes())
        };
        LedgerAddress::from_sha512(
            &namespace,
            &sha512(case_num.as_bytes()),
            &sha512(image_hash.as_bytes()),
        )
    }

    /// Derive the custody-family address for `(case_num, image_hash)`.
    pub fn custody(case_num: &str, image_hash: &str) -> LedgerAddress {
        Self::derive(FAMILY_NAME, case_num, image_hash)
    }

    /// Derive the custody-family address a record belongs at.
    pub fn for_record(record: &CustodyRecord) -> LedgerResult<LedgerAddress> {
        let case_num = non_blank(&record.case_num);
        let image_hash = non_blank(&record.image_hash);
        match (case_num, image_hash) {
            (Some(case), Some(image)) => Ok(Self::custody(case, image)),
            _ => {
                let mut missing = Vec::new();
                if case_num.is_none() {
                    missing.push("caseNum");
                }
                if image_hash.is_none() {
                    missing.push("imageHash");
                }
                Err(TypeError::MissingFields(missing).into())
            }
        }
    }

    fn custody_namespace() -> &'static [u8; 64] {
        CUSTODY_NAMESPACE.get_or_init(|| sha512(FAMILY_NAME.as_bytes()))
    }
}

fn hex_prefix(digest: &[u8; 64]) -> String {
    let mut out = String::with_capacity(NAMESPACE_LEN);
    for byte in &digest[..NAMESPACE_LEN / 2] {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use coc_crypto::sha512_hex;
    use coc_types::ADDRESS_LEN;
    use proptest::prelude::*;

    #[test]
    fn namespace_is_sha512_of_family() {
        assert_eq!(AddressCodec::namespace_prefix(), sha512_hex(b"coc")[..6]);
        assert_eq!(AddressCodec::namespace_for("coc"), AddressCodec::namespace_prefix());
        assert_ne!(AddressCodec::namespace_for("intkey"), AddressCodec::namespace_prefix());
    }

    #[test]
    fn layout_matches_segment_hashes() {
        let addr = AddressCodec::custody("2024-001", "abc123");
        assert_eq!(addr.as_str().len(), ADDRESS_LEN);
        assert_eq!(addr.namespace(), &sha512_hex(b"coc")[..6]);
        assert_eq!(addr.case_segment(), &sha512_hex(b"2024-001")[..8]);
        assert_eq!(addr.image_segment(), &sha512_hex(b"abc123")[..56]);
    }

    #[test]
    fn custom_seed_changes_only_namespace() {
        let a = AddressCodec::derive("other", "c", "i");
        let b = AddressCodec::custody("c", "i");
        assert_ne!(a.namespace(), b.namespace());
        assert_eq!(a.case_segment(), b.case_segment());
        assert_eq!(a.image_segment(), b.image_segment());
    }

    #[test]
    fn for_record_requires_identifiers() {
        let record = CustodyRecord {
            case_num: Some("2024-001".into()),
            image_hash: Some("  ".into()),
            ..Default::default()
        };
        let err = AddressCodec::for_record(&record).unwrap_err();
        assert_eq!(
            err,
            crate::LedgerError::Validation(TypeError::MissingFields(vec!["imageHash"]))
        );

        let record = CustodyRecord {
            image_hash: Some("abc123".into()),
            ..record
        };
        assert_eq!(
            AddressCodec::for_record(&record).unwrap(),
            AddressCodec::custody("2024-001", "abc123")
        );
    }

    proptest! {
        #[test]
        fn derivation_is_deterministic_and_well_formed(case in ".{0,40}", image in ".{0,80}") {
            let a = AddressCodec::custody(&case, &image);
            let b = AddressCodec::custody(&case, &image);
            prop_assert_eq!(&a, &b);
            prop_assert_eq!(a.as_str().len(), 70);
            prop_assert!(a.as_str().bytes().all(|c| c.is_ascii_digit() || (b'a'..=b'f').contains(&c)));
        }
    }
}
