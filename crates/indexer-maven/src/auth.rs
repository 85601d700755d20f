//! HTTP Basic Auth for the upload endpoint: the expected `user:pass` pair is
//! hashed once at startup, and every request's `Authorization` header is
//! compared against it in constant time, so the comparison cost never
//! leaks how many leading bytes matched.

use base64::Engine;
use sha2::{Digest, Sha512};
use subtle::ConstantTimeEq;

const BASIC_PREFIX: &str = "Basic ";

/// Pre-hashed credential, ready to compare against incoming
/// `Authorization` header values.
pub struct BasicAuth {
    expected: [u8; 64],
}

impl BasicAuth {
    pub fn new(username: &str, password: &str) -> Self {
        let token = base64::engine::general_purpose::STANDARD
            .encode(format!("{username}:{password}"));
        Self {
            expected: sha512_sum(format!("{BASIC_PREFIX}{token}").as_bytes()),
        }
    }

    /// Compare the raw `Authorization` header value (including the `Basic `
    /// scheme prefix) against the expected credential.
    pub fn verify(&self, authorization_header: Option<&str>) -> bool {
        match authorization_header {
            Some(val) if !val.is_empty() => {
                let actual = sha512_sum(val.as_bytes());
                self.expected.ct_eq(&actual).into()
            }
            _ => false,
        }
    }
}

fn sha512_sum(data: &[u8]) -> [u8; 64] {
    let mut hasher = Sha512::new();
    hasher.update(data);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_matching_credentials() {
        let auth = BasicAuth::new("alice", "hunter2");
        let token = base64::engine::general_purpose::STANDARD.encode("alice:hunter2");
        assert!(auth.verify(Some(&format!("Basic {token}"))));
    }

    #[test]
    fn rejects_wrong_password() {
        let auth = BasicAuth::new("alice", "hunter2");
        let token = base64::engine::general_purpose::STANDARD.encode("alice:wrong");
        assert!(!auth.verify(Some(&format!("Basic {token}"))));
    }

    #[test]
    fn rejects_missing_header() {
        let auth = BasicAuth::new("alice", "hunter2");
        assert!(!auth.verify(None));
    }

    #[test]
    fn rejects_empty_header() {
        let auth = BasicAuth::new("alice", "hunter2");
        assert!(!auth.verify(Some("")));
    }
}
