//! Salted passcode hashing for rooms that opt into one (§4.1 create/validate).
//! A fresh random salt per room, `sha2` digest over `salt || passcode`,
//! constant-time comparison on verify via [`super::secrets_match`].

use rand::Rng;
use sha2::{Digest, Sha256};

use super::secrets_match;

const SALT_BYTES: usize = 16;

/// Returns `"<salt-hex>:<digest-hex>"`. Never returns the plaintext.
pub fn hash_passcode(passcode: &str) -> String {
    let mut salt = [0u8; SALT_BYTES];
    rand::rng().fill(&mut salt);
    let digest = digest_with_salt(&salt, passcode);
    format!("{}:{}", hex::encode(salt), hex::encode(digest))
}

pub fn verify_passcode(passcode: &str, stored: &str) -> bool {
    let Some((salt_hex, digest_hex)) = stored.split_once(':') else {
        return false;
    };
    let Ok(salt) = hex::decode(salt_hex) else {
        return false;
    };
    let expected = digest_with_salt(&salt, passcode);
    secrets_match(&hex::encode(expected), digest_hex)
}

fn digest_with_salt(salt: &[u8], passcode: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(passcode.as_bytes());
    hasher.finalize().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correct_passcode_verifies() {
        let stored = hash_passcode("1234");
        assert!(verify_passcode("1234", &stored));
    }

    #[test]
    fn wrong_passcode_fails() {
        let stored = hash_passcode("1234");
        assert!(!verify_passcode("9999", &stored));
    }

    #[test]
    fn two_hashes_of_the_same_passcode_differ_by_salt() {
        let a = hash_passcode("1234");
        let b = hash_passcode("1234");
        assert_ne!(a, b);
        assert!(verify_passcode("1234", &a));
        assert!(verify_passcode("1234", &b));
    }

    #[test]
    fn malformed_stored_value_is_rejected_not_panicking() {
        assert!(!verify_passcode("1234", "not-a-valid-format"));
    }
}
