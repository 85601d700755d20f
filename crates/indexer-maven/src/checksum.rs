//! Artifact checksum computation (MD5, SHA-1).
//!
//! The proxy never fetches a sidecar to check an artifact against — it
//! tolerates either upload order (primary file or `.md5`/`.sha1` sidecar
//! first) and reconciles whichever arrives second against whichever arrived
//! first. See [`indexer_core::session::InFlightArtifact::set_or_verify_md5`]
//! for the rendezvous itself; this module only supplies the raw digests.

use md5::Md5;
use sha1::Sha1;
use sha2::Digest;

/// Hex-encoded MD5 digest of `data`, lowercase.
pub fn hex_md5(data: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Hex-encoded SHA-1 digest of `data`, lowercase.
pub fn hex_sha1(data: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Decode a checksum sidecar body into a comparable hash string: lowercase,
/// trimmed. Maven checksum files are sometimes `hash  filename`; we only
/// ever see the hash itself here since the indexer writes a bare hash, but
/// trimming whitespace on both ends matches the reference decoder.
pub fn decode_hash(body: &[u8]) -> String {
    String::from_utf8_lossy(body).trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn md5_computation() {
        assert_eq!(hex_md5(b"hello world"), "5eb63bbbe01eeed093cb22bb8f5acdc3");
    }

    #[test]
    fn sha1_computation() {
        assert_eq!(
            hex_sha1(b"hello world"),
            "2aae6c35c94fcfb415dbe95f408b9ce91ee846ed"
        );
    }

    #[test]
    fn decode_hash_trims_and_lowercases() {
        assert_eq!(decode_hash(b"  ABC123\n"), "abc123");
    }
}
