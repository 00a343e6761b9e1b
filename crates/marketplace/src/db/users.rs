//! User repository for database operations.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use livestall_core::{AccountStatus, Email, UserId, UserRole};

use super::{RepositoryError, conflict_on_unique};
use crate::models::User;

const USER_COLUMNS: &str = "id, email, display_name, role, status, email_verified, \
                            identity_verified, created_at";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i32,
    email: String,
    display_name: String,
    role: UserRole,
    status: AccountStatus,
    email_verified: bool,
    identity_verified: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(r: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&r.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        Ok(Self {
            id: UserId::new(r.id),
            email,
            display_name: r.display_name,
            role: r.role,
            status: r.status,
            email_verified: r.email_verified,
            identity_verified: r.identity_verified,
            created_at: r.created_at,
        })
    }
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by their email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored email is invalid.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM marketplace.user WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM marketplace.user WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    /// Create a user with a password hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    pub async fn create_with_password(
        &self,
        email: &Email,
        display_name: &str,
        role: UserRole,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO marketplace.user (email, display_name, role) \
             VALUES ($1, $2, $3) RETURNING {USER_COLUMNS}"
        ))
        .bind(email.as_str())
        .bind(display_name)
        .bind(role)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| conflict_on_unique(e, "email already exists"))?;

        sqlx::query("INSERT INTO marketplace.user_password (user_id, password_hash) VALUES ($1, $2)")
            .bind(row.id)
            .bind(password_hash)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        User::try_from(row)
    }

    /// Get a user together with their password hash.
    ///
    /// Returns `None` if the user does not exist or has no password.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_with_password(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        #[derive(sqlx::FromRow)]
        struct Row {
            #[sqlx(flatten)]
            user: UserRow,
            password_hash: String,
        }

        let row = sqlx::query_as::<_, Row>(
            "SELECT u.id, u.email, u.display_name, u.role, u.status, u.email_verified, \
                    u.identity_verified, u.created_at, p.password_hash \
             FROM marketplace.user u \
             JOIN marketplace.user_password p ON p.user_id = u.id \
             WHERE u.email = $1",
        )
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(|r| Ok((User::try_from(r.user)?, r.password_hash)))
            .transpose()
    }

    /// Replace a user's password hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn set_password(&self, id: UserId, password_hash: &str) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO marketplace.user_password (user_id, password_hash) VALUES ($1, $2) \
             ON CONFLICT (user_id) DO UPDATE SET password_hash = $2, updated_at = now()",
        )
        .bind(id)
        .bind(password_hash)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Change a user's role.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn set_role(&self, id: UserId, role: UserRole) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE marketplace.user SET role = $2, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(role)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Suspend or reactivate an account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn set_status(&self, id: UserId, status: AccountStatus) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE marketplace.user SET status = $2, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(status)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Mark the user's email as verified.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn mark_email_verified(&self, id: UserId) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE marketplace.user SET email_verified = TRUE, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// List users, newest first, optionally filtered by email or name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<User>, RepositoryError> {
        let pattern = search.map(|s| format!("%{}%", escape_like(s)));
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM marketplace.user \
             WHERE $1::text IS NULL OR email ILIKE $1 OR display_name ILIKE $1 \
             ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3"
        ))
        .bind(pattern)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(User::try_from).collect()
    }

    /// Count users, optionally only those with a given role.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self, role: Option<UserRole>) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM marketplace.user WHERE $1::marketplace.user_role IS NULL OR role = $1",
        )
        .bind(role)
        .fetch_one(self.pool)
        .await?;
        Ok(count)
    }
}

/// Escape `%`, `_` and `\` for use inside an `ILIKE` pattern.
#[must_use]
pub fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.trim().chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like(" 50%_off "), "50\\%\\_off");
        assert_eq!(escape_like("mug"), "mug");
    }
}
