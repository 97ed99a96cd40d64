//! Salted password hashing.
//!
//! Passwords are stored as PBKDF2-HMAC-SHA256 output next to the random salt
//! that produced it. Verification re-derives with the stored salt and compares
//! the two digests without short-circuiting.

use password_hash::rand_core::{OsRng, RngCore};
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use tokio::task::spawn_blocking;

use crate::error::{AppError, AppResult};

pub const DEFAULT_ROUNDS: u32 = 310_000;
pub const HASH_LEN: usize = 32;
pub const SALT_LEN: usize = 16;

// Used when the account does not exist so the lookup miss costs the same
// as a real verification.
const DUMMY_SALT: [u8; SALT_LEN] = *b"shopfront-dummy!";

#[derive(Debug, Clone)]
pub struct HashedPassword {
    pub hash: Vec<u8>,
    pub salt: Vec<u8>,
}

#[derive(Debug, Clone, Copy)]
pub struct PasswordKdf {
    rounds: u32,
}

impl Default for PasswordKdf {
    fn default() -> Self {
        Self {
            rounds: DEFAULT_ROUNDS,
        }
    }
}

impl PasswordKdf {
    pub fn new(rounds: u32) -> Self {
        Self {
            rounds: rounds.max(1),
        }
    }

    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    pub fn derive(&self, password: &[u8], salt: &[u8]) -> [u8; HASH_LEN] {
        let mut out = [0u8; HASH_LEN];
        pbkdf2_hmac::<Sha256>(password, salt, self.rounds, &mut out);
        out
    }

    pub fn hash(&self, password: &str) -> HashedPassword {
        let mut salt = vec![0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);
        let hash = self.derive(password.as_bytes(), &salt).to_vec();
        HashedPassword { hash, salt }
    }

    pub fn verify(&self, password: &str, salt: &[u8], expected: &[u8]) -> bool {
        let derived = self.derive(password.as_bytes(), salt);
        constant_time_eq(&derived, expected)
    }

    /// Burn one derivation and report failure.
    pub fn verify_dummy(&self, password: &str) -> bool {
        let _ = self.derive(password.as_bytes(), &DUMMY_SALT);
        false
    }

    pub async fn hash_blocking(self, password: String) -> AppResult<HashedPassword> {
        spawn_blocking(move || self.hash(&password))
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "password hashing task failed");
                AppError::Internal(anyhow::anyhow!("password hashing task failed"))
            })
    }

    /// Verify on the blocking pool. `None` for `stored` runs the dummy path.
    pub async fn verify_blocking(
        self,
        password: String,
        stored: Option<HashedPassword>,
    ) -> AppResult<bool> {
        spawn_blocking(move || match stored {
            Some(stored) => self.verify(&password, &stored.salt, &stored.hash),
            None => self.verify_dummy(&password),
        })
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "password verification task failed");
            AppError::Internal(anyhow::anyhow!("password verification task failed"))
        })
    }
}

/// Compare two byte strings in time that depends only on their length.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_matches_rfc7914_vector() {
        // PBKDF2-HMAC-SHA256("passwd", "salt", 1), first 32 bytes.
        let expected: [u8; 32] = [
            0x55, 0xac, 0x04, 0x6e, 0x56, 0xe3, 0x08, 0x9f, 0xec, 0x16, 0x91, 0xc2, 0x25, 0x44,
            0xb6, 0x05, 0xf9, 0x41, 0x85, 0x21, 0x6d, 0xde, 0x04, 0x65, 0xe6, 0x8b, 0x9d, 0x57,
            0xc2, 0x0d, 0xac, 0xbc,
        ];
        let kdf = PasswordKdf::new(1);
        assert_eq!(kdf.derive(b"passwd", b"salt"), expected);
    }

    #[test]
    fn default_uses_high_round_count() {
        assert_eq!(PasswordKdf::default().rounds(), 310_000);
        assert_eq!(PasswordKdf::new(0).rounds(), 1);
    }

    #[test]
    fn hash_then_verify() {
        let kdf = PasswordKdf::new(1_000);
        let stored = kdf.hash("correct horse battery");
        assert_eq!(stored.hash.len(), HASH_LEN);
        assert_eq!(stored.salt.len(), SALT_LEN);
        assert!(kdf.verify("correct horse battery", &stored.salt, &stored.hash));
    }

    #[test]
    fn any_single_character_mutation_fails() {
        let kdf = PasswordKdf::new(1_000);
        let password = "hunter2-plus";
        let stored = kdf.hash(password);

        for (idx, ch) in password.char_indices() {
            let replacement = if ch == 'x' { 'y' } else { 'x' };
            let mut mutated = password.to_string();
            mutated.replace_range(idx..idx + ch.len_utf8(), &replacement.to_string());
            assert!(
                !kdf.verify(&mutated, &stored.salt, &stored.hash),
                "mutation at {idx} verified: {mutated}"
            );
        }
    }

    #[test]
    fn salts_are_unique_per_hash() {
        let kdf = PasswordKdf::new(1_000);
        let a = kdf.hash("same password");
        let b = kdf.hash("same password");
        assert_ne!(a.salt, b.salt);
        assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn constant_time_eq_cases() {
        assert!(constant_time_eq(b"abc123", b"abc123"));
        assert!(!constant_time_eq(b"abc123", b"abc124"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
        assert!(constant_time_eq(b"", b""));
    }

    #[tokio::test]
    async fn blocking_verify_handles_missing_user() {
        let kdf = PasswordKdf::new(1_000);
        let stored = kdf.hash_blocking("s3cret-pass".into()).await.unwrap();

        assert!(
            kdf.verify_blocking("s3cret-pass".into(), Some(stored.clone()))
                .await
                .unwrap()
        );
        assert!(
            !kdf.verify_blocking("s3cret-pasS".into(), Some(stored))
                .await
                .unwrap()
        );
        assert!(!kdf.verify_blocking("s3cret-pass".into(), None).await.unwrap());
    }
}
