//! Keccak-256 and SHA3-256 hashing.

use hyperdrive_types::Digest;
use sha3::{Digest as _, Keccak256, Sha3_256};

/// Keccak-256 of arbitrary data.
pub fn keccak256(data: &[u8]) -> Digest {
    keccak256_multi(&[data])
}

/// Keccak-256 over several byte slices in sequence (avoids concatenation).
pub fn keccak256_multi(parts: &[&[u8]]) -> Digest {
    let mut hasher = Keccak256::new();
    for part in parts {
        hasher.update(part);
    }
    let mut output = [0u8; 32];
    output.copy_from_slice(&hasher.finalize());
    Digest::new(output)
}

/// SHA3-256 of arbitrary data.
pub fn sha3_256(data: &[u8]) -> Digest {
    sha3_256_multi(&[data])
}

/// SHA3-256 over several byte slices in sequence (avoids concatenation).
pub fn sha3_256_multi(parts: &[&[u8]]) -> Digest {
    let mut hasher = Sha3_256::new();
    for part in parts {
        hasher.update(part);
    }
    let mut output = [0u8; 32];
    output.copy_from_slice(&hasher.finalize());
    Digest::new(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keccak_known_vector() {
        // Keccak-256("") as used by Ethereum.
        assert_eq!(
            keccak256(b"").to_string(),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn sha3_known_vector() {
        assert_eq!(
            sha3_256(b"").to_string(),
            "a7ffc6f8bf1ed76651c14756a061d662f580ff4de43b49fa82d80a4b80f8434a"
        );
    }

    #[test]
    fn keccak_and_sha3_differ() {
        assert_ne!(keccak256(b"hyperdrive"), sha3_256(b"hyperdrive"));
    }

    #[test]
    fn multi_equivalent_to_concatenation() {
        assert_eq!(sha3_256(b"helloworld"), sha3_256_multi(&[b"hello", b"world"]));
        assert_eq!(keccak256(b"helloworld"), keccak256_multi(&[b"hello", b"world"]));
    }
}
