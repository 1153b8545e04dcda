use sha2::{Digest, Sha512};

/// Raw SHA-512 digest.
pub fn sha512(data: &[u8]) -> [u8; 64] {
    Sha512::digest(data).into()
}

/// Lower-case hex SHA-512 digest (128 characters).
pub fn sha512_hex(data: &[u8]) -> String {
    hex::encode(sha512(data))
}

/// Check that `data` hashes to the given hex digest.
pub fn verify_sha512_hex(data: &[u8], expected: &str) -> bool {
    sha512_hex(data).eq_ignore_ascii_case(expected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vector() {
        // SHA-512("abc")
        assert_eq!(
            sha512_hex(b"abc"),
            "ddaf35a193617abacc417349ae20413112e6fa4e89a97ea20a9eeee64b55d39a\
             2192992a274fc1a836ba3c23a3feebbd454d4423643ce80e2a9ac94fa54ca49f"
        );
    }

    #[test]
    fn verify_detects_tampering() {
        let digest = sha512_hex(b"payload");
        assert!(verify_sha512_hex(b"payload", &digest));
        assert!(!verify_sha512_hex(b"payl0ad", &digest));
    }
}
