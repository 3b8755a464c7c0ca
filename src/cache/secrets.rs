//! One-time render secrets.
//!
//! A secret authorizes exactly one render callback for one `(template, id)`
//! pair within a fixed time window. Only the SHA-256 hash is stored; the
//! plaintext travels once, inside the outbound render payload. Issuing a new
//! secret overwrites any prior one, so only the most recent in-flight render
//! can complete.

use std::sync::Arc;

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::application::error::PrerenderError;
use crate::application::repos::{RepoError, SecretsRepo};

/// Fixed secret lifetime, independent of any render-duration expectations.
/// A renderer that responds later is rejected and must be re-scheduled.
pub const SECRET_TTL: Duration = Duration::minutes(20);

pub struct SecretsManager {
    repo: Arc<dyn SecretsRepo>,
}

impl SecretsManager {
    pub fn new(repo: Arc<dyn SecretsRepo>) -> Self {
        Self { repo }
    }

    /// Issues a fresh secret for the pair and returns the plaintext for the
    /// outbound payload. A storage failure here must abort the dependent
    /// dispatch: the callback could never authenticate.
    pub async fn init(&self, template: &str, id: &str) -> Result<String, PrerenderError> {
        let (secret, hash) = Self::generate();
        let expires = OffsetDateTime::now_utc() + SECRET_TTL;
        self.repo.put(template, id, &hash, expires).await?;
        Ok(secret)
    }

    pub fn generate() -> (String, Vec<u8>) {
        let secret = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
        let hash = Self::hash(&secret);
        (secret, hash)
    }

    pub fn hash(secret: &str) -> Vec<u8> {
        let mut hasher = Sha256::new();
        hasher.update(secret.as_bytes());
        hasher.finalize().to_vec()
    }

    /// Verifies a presented plaintext against the stored hash. Absent or
    /// expired secrets and mismatches are authorization rejections.
    pub async fn authorize(
        &self,
        template: &str,
        id: &str,
        secret: &str,
    ) -> Result<(), PrerenderError> {
        let stored = self
            .repo
            .find(template, id, OffsetDateTime::now_utc())
            .await?
            .ok_or_else(|| {
                PrerenderError::authorization(format!(
                    "no secret outstanding for `{template}:{id}`"
                ))
            })?;

        let candidate = Self::hash(secret);
        if stored.as_slice().ct_eq(candidate.as_slice()).unwrap_u8() == 0 {
            return Err(PrerenderError::authorization(format!(
                "secret mismatch for `{template}:{id}`"
            )));
        }

        Ok(())
    }

    /// Consumes the secret for the pair; it cannot authorize again.
    pub async fn delete(&self, template: &str, id: &str) -> Result<bool, RepoError> {
        self.repo.delete(template, id).await
    }

    pub async fn flush(&self) -> Result<u64, RepoError> {
        self.repo.delete_all().await
    }

    pub async fn flush_expired(&self) -> Result<u64, RepoError> {
        self.repo.delete_expired(OffsetDateTime::now_utc()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_secret_matches_its_hash() {
        let (secret, hash) = SecretsManager::generate();

        assert_eq!(secret.len(), 64);
        assert_eq!(hash, SecretsManager::hash(&secret));
    }

    #[test]
    fn distinct_secrets_hash_differently() {
        let (_, first) = SecretsManager::generate();
        let (_, second) = SecretsManager::generate();

        assert_ne!(first, second);
    }
}
