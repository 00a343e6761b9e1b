//! Identity verification against a hosted provider.
//!
//! The provider is a stub: creating a session yields a reference and a
//! hosted URL under `IDENTITY_PROVIDER_URL`, and the result arrives later
//! through the admin-only completion endpoint standing in for a webhook.

use sqlx::PgPool;
use uuid::Uuid;

use livestall_core::{IdentityStatus, UserId};

use crate::db::{IdentityRepository, RepositoryError};
use crate::models::IdentitySession;

pub struct IdentityService<'a> {
    sessions: IdentityRepository<'a>,
    provider_url: &'a str,
}

impl<'a> IdentityService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, provider_url: &'a str) -> Self {
        Self {
            sessions: IdentityRepository::new(pool),
            provider_url,
        }
    }

    /// Start a verification session for a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the session cannot be stored.
    pub async fn start(&self, user_id: UserId) -> Result<IdentitySession, RepositoryError> {
        let reference = Uuid::new_v4();
        let hosted_url = hosted_url(self.provider_url, reference);
        let session = self.sessions.create(user_id, reference, &hosted_url).await?;
        tracing::info!(user_id = %user_id, reference = %reference, "Identity session started");
        Ok(session)
    }

    /// Look up a session by reference.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown reference.
    pub async fn get(&self, reference: Uuid) -> Result<IdentitySession, RepositoryError> {
        self.sessions.get_by_reference(reference).await
    }

    /// Record the provider's verdict.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` for a `pending` verdict and
    /// `RepositoryError::NotFound` when no pending session matches.
    pub async fn complete(
        &self,
        reference: Uuid,
        verdict: IdentityStatus,
    ) -> Result<IdentitySession, RepositoryError> {
        if verdict == IdentityStatus::Pending {
            return Err(RepositoryError::Conflict(
                "a verdict must be verified or failed".to_owned(),
            ));
        }
        let session = self.sessions.complete(reference, verdict).await?;
        tracing::info!(reference = %reference, status = %verdict, "Identity session completed");
        Ok(session)
    }
}

/// Provider page for a session.
#[must_use]
pub fn hosted_url(provider_url: &str, reference: Uuid) -> String {
    format!("{}/{reference}", provider_url.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hosted_url_joins_reference() {
        let reference = Uuid::nil();
        assert_eq!(
            hosted_url("https://id.example.com/hosted/", reference),
            "https://id.example.com/hosted/00000000-0000-0000-0000-000000000000"
        );
    }
}
