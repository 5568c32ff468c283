//! `PostgreSQL` credential store.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use sqlx::{PgPool, Row, migrate::Migrator, postgres::PgRow};
use tracing::Instrument;

use super::{CredentialStore, ProfileStore, StorageError, StorageResult};
use crate::domain::{Filters, Metadata, NewUser, Role, User};

pub static MIGRATOR: Migrator = sqlx::migrate!();

const USER_COLUMNS: &str = r"
    u.id, u.email, u.pass_hash, u.first_name, u.last_name, u.activated,
    EXTRACT(EPOCH FROM u.created_at)::BIGINT AS created_at_unix,
    u.barcode, u.major, u.group_name, u.year, u.phone_number, u.avatar_url,
    r.name AS role
";

/// Apply embedded schema migrations.
///
/// # Errors
/// Returns an error if a migration fails to apply.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    MIGRATOR
        .run(pool)
        .await
        .context("failed to apply database migrations")
}

#[derive(Clone, Debug)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn db_span(operation: &'static str, statement: &str) -> tracing::Span {
    tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

fn parse_role(name: &str) -> Result<Role> {
    name.parse::<Role>()
        .map_err(|err| anyhow!("corrupt role column: {err}"))
}

fn user_from_row(row: &PgRow) -> Result<User> {
    let role: String = row.try_get("role")?;
    Ok(User {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("pass_hash")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        role: parse_role(&role)?,
        activated: row.try_get("activated")?,
        created_at_unix: row.try_get("created_at_unix")?,
        barcode: row.try_get("barcode")?,
        major: row.try_get("major")?,
        group_name: row.try_get("group_name")?,
        year: row.try_get("year")?,
        phone_number: row.try_get("phone_number")?,
        avatar_url: row.try_get("avatar_url")?,
    })
}

#[async_trait]
impl CredentialStore for PgUserStore {
    async fn save_user(&self, user: NewUser) -> StorageResult<i64> {
        let query = r"
            INSERT INTO users
                (email, pass_hash, first_name, last_name, barcode, major, group_name, year)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
        ";
        let row = sqlx::query(query)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.barcode)
            .bind(&user.major)
            .bind(&user.group_name)
            .bind(user.year)
            .fetch_one(&self.pool)
            .instrument(db_span("INSERT", query))
            .await;

        match row {
            Ok(row) => Ok(row.try_get("id").context("failed to read user id")?),
            Err(err) if is_unique_violation(&err) => Err(StorageError::UserExists),
            Err(err) => Err(anyhow::Error::new(err).context("failed to insert user").into()),
        }
    }

    async fn get_user_by_email(&self, email: &str) -> StorageResult<User> {
        let query = format!(
            "SELECT {USER_COLUMNS}
             FROM users u JOIN roles r ON u.role_id = r.id
             WHERE LOWER(u.email) = LOWER($1) AND u.activated"
        );
        let row = sqlx::query(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", &query))
            .await
            .context("failed to lookup user by email")?
            .ok_or(StorageError::UserNotExists)?;
        Ok(user_from_row(&row)?)
    }

    async fn get_user_by_id(&self, user_id: i64) -> StorageResult<User> {
        let query = format!(
            "SELECT {USER_COLUMNS}
             FROM users u JOIN roles r ON u.role_id = r.id
             WHERE u.id = $1"
        );
        let row = sqlx::query(&query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", &query))
            .await
            .context("failed to lookup user by id")?
            .ok_or(StorageError::UserNotExists)?;
        Ok(user_from_row(&row)?)
    }

    async fn get_user_role(&self, user_id: i64) -> StorageResult<Role> {
        let query = r"
            SELECT r.name
            FROM users u JOIN roles r ON u.role_id = r.id
            WHERE u.id = $1 AND u.activated
        ";
        let row = sqlx::query(query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", query))
            .await
            .context("failed to lookup user role")?
            .ok_or(StorageError::UserNotExists)?;
        let name: String = row.try_get("name").context("failed to read role")?;
        Ok(parse_role(&name)?)
    }

    async fn activate_user(&self, user_id: i64) -> StorageResult<()> {
        let query = "UPDATE users SET activated = TRUE WHERE id = $1";
        let result = sqlx::query(query)
            .bind(user_id)
            .execute(&self.pool)
            .instrument(db_span("UPDATE", query))
            .await
            .context("failed to activate user")?;
        if result.rows_affected() == 0 {
            return Err(StorageError::UserNotExists);
        }
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for PgUserStore {
    async fn update_user(&self, user: &User) -> StorageResult<()> {
        let query = r"
            UPDATE users
            SET first_name = $2, last_name = $3, phone_number = $4,
                major = $5, group_name = $6, year = $7, avatar_url = $8
            WHERE id = $1 AND activated
        ";
        let result = sqlx::query(query)
            .bind(user.id)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.phone_number)
            .bind(&user.major)
            .bind(&user.group_name)
            .bind(user.year)
            .bind(&user.avatar_url)
            .execute(&self.pool)
            .instrument(db_span("UPDATE", query))
            .await
            .context("failed to update user")?;
        if result.rows_affected() == 0 {
            return Err(StorageError::UserNotExists);
        }
        Ok(())
    }

    async fn delete_user(&self, user_id: i64) -> StorageResult<()> {
        let query = "DELETE FROM users WHERE id = $1 AND activated";
        let result = sqlx::query(query)
            .bind(user_id)
            .execute(&self.pool)
            .instrument(db_span("DELETE", query))
            .await
            .context("failed to delete user")?;
        if result.rows_affected() == 0 {
            return Err(StorageError::UserNotExists);
        }
        Ok(())
    }

    async fn search_users(
        &self,
        query_text: &str,
        filters: Filters,
    ) -> StorageResult<(Vec<User>, Metadata)> {
        // STRPOS keeps user input out of LIKE pattern syntax.
        let query = format!(
            "SELECT COUNT(*) OVER() AS total_records, {USER_COLUMNS}
             FROM users u JOIN roles r ON u.role_id = r.id
             WHERE ($1 = ''
                    OR STRPOS(LOWER(u.email), LOWER($1)) > 0
                    OR STRPOS(LOWER(u.first_name), LOWER($1)) > 0
                    OR STRPOS(LOWER(u.last_name), LOWER($1)) > 0)
               AND u.activated
             ORDER BY u.id ASC
             LIMIT $2 OFFSET $3"
        );
        let rows = sqlx::query(&query)
            .bind(query_text)
            .bind(filters.limit())
            .bind(filters.offset())
            .fetch_all(&self.pool)
            .instrument(db_span("SELECT", &query))
            .await
            .context("failed to search users")?;

        let mut total_records: i64 = 0;
        let mut users = Vec::with_capacity(rows.len());
        for row in &rows {
            total_records = row
                .try_get("total_records")
                .context("failed to read total_records")?;
            users.push(user_from_row(row)?);
        }

        let total_records = u64::try_from(total_records).unwrap_or_default();
        Ok((users, Metadata::calculate(total_records, filters)))
    }
}
