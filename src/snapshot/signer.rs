//! Snapshot signing
//!
//! HMAC-SHA256 over the content hash's lowercase-hex form. The key comes
//! from process configuration (environment-loaded once at boot); signatures
//! are verified with a constant-time comparison.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::config::SigningKey;

type HmacSha256 = Hmac<Sha256>;

/// Signs and verifies snapshot content hashes
#[derive(Clone)]
pub struct SnapshotSigner {
    key: SigningKey,
}

impl SnapshotSigner {
    /// Build a signer around the configured key
    pub fn new(key: SigningKey) -> Self {
        Self { key }
    }

    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(self.key.as_bytes()).expect("HMAC can take key of any size")
    }

    /// Sign a 64-hex content hash; returns a 64-hex signature.
    pub fn sign(&self, content_hash: &str) -> String {
        let mut mac = self.mac();
        mac.update(content_hash.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Verify a signature in constant time.
    ///
    /// Malformed (non-hex) signatures verify as false rather than erroring;
    /// a tampered signature and a garbage signature are the same case.
    pub fn verify(&self, content_hash: &str, signature: &str) -> bool {
        let Ok(signature_bytes) = hex::decode(signature) else {
            return false;
        };
        let mut mac = self.mac();
        mac.update(content_hash.as_bytes());
        let expected = mac.finalize().into_bytes();
        // Constant-time over the tag bytes; length mismatch is false
        expected
            .as_slice()
            .ct_eq(signature_bytes.as_slice())
            .into()
    }
}

impl std::fmt::Debug for SnapshotSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SnapshotSigner(..)")
    }
}
