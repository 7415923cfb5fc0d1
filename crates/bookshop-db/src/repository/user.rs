//! # User Repository
//!
//! Database operations for the account directory.
//!
//! ## Uniqueness
//! Username, email, and telephone are each unique. Inserts and profile
//! updates pre-check all three so the caller learns *which* field collided;
//! the UNIQUE indexes remain the authoritative guard against races.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use bookshop_core::validation;
use bookshop_core::{CoreError, User, UserRole};

/// Repository for account database operations.
///
/// Passwords arrive here already hashed; this repository never sees or
/// stores plaintext.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Creates a new UserRepository.
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Gets a user by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, username, email, password_hash,
                   address, telephone, role, created_at
            FROM users
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Gets a user by username (login identifier).
    pub async fn get_by_username(&self, username: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, username, email, password_hash,
                   address, telephone, role, created_at
            FROM users
            WHERE username = ?1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Gets a user by email.
    pub async fn get_by_email(&self, email: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, username, email, password_hash,
                   address, telephone, role, created_at
            FROM users
            WHERE email = ?1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Lists all accounts, sorted by username.
    pub async fn list_all(&self) -> DbResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, username, email, password_hash,
                   address, telephone, role, created_at
            FROM users
            ORDER BY username
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    /// Lists accounts with a given role, sorted by username.
    pub async fn list_by_role(&self, role: UserRole) -> DbResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, username, email, password_hash,
                   address, telephone, role, created_at
            FROM users
            WHERE role = ?1
            ORDER BY username
            "#,
        )
        .bind(role)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    /// Inserts a new account.
    ///
    /// ## Returns
    /// * `Ok(User)` - Inserted account
    /// * `Err(DbError::UniqueViolation)` - Username, email, or telephone taken
    /// * `Err(DbError::Core(Validation))` - Malformed field
    pub async fn insert(&self, user: &User) -> DbResult<User> {
        validation::validate_display_name(&user.name).map_err(CoreError::from)?;
        validation::validate_username(&user.username).map_err(CoreError::from)?;
        validation::validate_email(&user.email).map_err(CoreError::from)?;
        validation::validate_telephone(&user.telephone).map_err(CoreError::from)?;

        debug!(username = %user.username, role = ?user.role, "Inserting user");

        self.check_unique(&user.username, &user.email, &user.telephone, None)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO users (
                id, name, username, email, password_hash,
                address, telephone, role, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.address)
        .bind(&user.telephone)
        .bind(user.role)
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;

        Ok(user.clone())
    }

    /// Updates an account's profile fields.
    ///
    /// The username and role are immutable here; role changes go through
    /// [`set_role`](Self::set_role).
    pub async fn update_profile(
        &self,
        id: &str,
        name: &str,
        email: &str,
        address: Option<&str>,
        telephone: &str,
    ) -> DbResult<()> {
        validation::validate_display_name(name).map_err(CoreError::from)?;
        validation::validate_email(email).map_err(CoreError::from)?;
        validation::validate_telephone(telephone).map_err(CoreError::from)?;

        let user = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("User", id))?;

        self.check_unique(&user.username, email, telephone, Some(id))
            .await?;

        sqlx::query(
            r#"
            UPDATE users SET
                name = ?2,
                email = ?3,
                address = ?4,
                telephone = ?5
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(email)
        .bind(address)
        .bind(telephone)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Replaces an account's password hash.
    pub async fn update_password(&self, id: &str, password_hash: &str) -> DbResult<()> {
        let result = sqlx::query("UPDATE users SET password_hash = ?2 WHERE id = ?1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        Ok(())
    }

    /// Changes an account's role.
    pub async fn set_role(&self, id: &str, role: UserRole) -> DbResult<()> {
        debug!(id = %id, role = ?role, "Changing user role");

        let result = sqlx::query("UPDATE users SET role = ?2 WHERE id = ?1")
            .bind(id)
            .bind(role)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        Ok(())
    }

    /// Deletes an account.
    ///
    /// Fails with a foreign key violation while the account still owns a
    /// cart or bills.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting user");

        let result = sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        Ok(())
    }

    /// Counts all accounts.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Pre-checks the three unique fields so collisions report which field
    /// clashed. `exclude_id` skips the account being updated.
    async fn check_unique(
        &self,
        username: &str,
        email: &str,
        telephone: &str,
        exclude_id: Option<&str>,
    ) -> DbResult<()> {
        let exclude = exclude_id.unwrap_or("");

        let row: Option<(String, String, String)> = sqlx::query_as(
            r#"
            SELECT username, email, telephone
            FROM users
            WHERE (username = ?1 OR email = ?2 OR telephone = ?3)
              AND id != ?4
            LIMIT 1
            "#,
        )
        .bind(username)
        .bind(email)
        .bind(telephone)
        .bind(exclude)
        .fetch_optional(&self.pool)
        .await?;

        if let Some((u, e, t)) = row {
            if u == username {
                return Err(DbError::duplicate("username", username));
            }
            if e == email {
                return Err(DbError::duplicate("email", email));
            }
            if t == telephone {
                return Err(DbError::duplicate("telephone", telephone));
            }
        }

        Ok(())
    }
}
