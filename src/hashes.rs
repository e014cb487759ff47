//! The SHA-256 `Write`-based running hasher used as the OER codec's
//! "Hasher" object (§4.1): feeding hash-payload bytes through it and
//! calling `digest()` is equivalent to writing those bytes to a buffer and
//! hashing the buffer, without the intermediate allocation.
//!
//! Grounded on `coins-core`'s `hashes::hash256::Hash256Writer`, which wraps
//! a running digest behind `std::io::Write` the same way.

use sha2::{Digest, Sha256};
use std::io::{Result as IOResult, Write};

/// A `Write` sink that feeds everything it receives into a running SHA-256
/// computation.
#[derive(Default)]
pub struct Sha256Hasher {
    internal: Sha256,
}

impl Sha256Hasher {
    /// Start a fresh hasher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume the hasher, producing the 32-byte digest of everything
    /// written to it.
    pub fn digest(self) -> [u8; 32] {
        self.internal.finalize().into()
    }
}

impl Write for Sha256Hasher {
    fn write(&mut self, buf: &[u8]) -> IOResult<usize> {
        self.internal.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> IOResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_preimage_hash_matches_known_value() {
        // SHA-256("") = e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b85
        let expected =
            hex::decode("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b85")
                .unwrap();
        let mut w = Sha256Hasher::new();
        w.write_all(b"").unwrap();
        assert_eq!(w.digest().to_vec(), expected);
    }
}
