use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::PgPool;
use sqlx::Row;

use crate::domain::principal::errors::PrincipalError;
use crate::domain::principal::models::Identifier;
use crate::domain::principal::models::NewPrincipal;
use crate::domain::principal::models::Principal;
use crate::domain::principal::models::PrincipalId;
use crate::domain::principal::models::Role;
use crate::domain::principal::ports::PrincipalRepository;

const PRINCIPAL_COLUMNS: &str =
    "id, identifier, password_hash, role, failed_attempts, lock_until, is_locked, version";

pub struct PostgresPrincipalRepository {
    pool: PgPool,
}

impl PostgresPrincipalRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn principal_from_row(row: &PgRow) -> Result<Principal, PrincipalError> {
        let failed_attempts: i32 = row.try_get("failed_attempts").map_err(database_error)?;
        let role: String = row.try_get("role").map_err(database_error)?;

        Ok(Principal {
            id: PrincipalId(row.try_get("id").map_err(database_error)?),
            identifier: Identifier::new(row.try_get("identifier").map_err(database_error)?)?,
            password_hash: row.try_get("password_hash").map_err(database_error)?,
            role: role.parse::<Role>()?,
            failed_attempts: u32::try_from(failed_attempts).unwrap_or(0),
            lock_until: row.try_get("lock_until").map_err(database_error)?,
            is_locked: row.try_get("is_locked").map_err(database_error)?,
            version: row.try_get("version").map_err(database_error)?,
        })
    }

    async fn exists(&self, id: PrincipalId) -> Result<bool, PrincipalError> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM principals WHERE id = $1)")
            .bind(id.0)
            .fetch_one(&self.pool)
            .await
            .map_err(database_error)
    }
}

fn database_error(e: sqlx::Error) -> PrincipalError {
    PrincipalError::DatabaseError(e.to_string())
}

#[async_trait]
impl PrincipalRepository for PostgresPrincipalRepository {
    async fn create(&self, principal: NewPrincipal) -> Result<Principal, PrincipalError> {
        let query = format!(
            r#"
            INSERT INTO principals (identifier, password_hash, role)
            VALUES ($1, $2, $3)
            RETURNING {}
            "#,
            PRINCIPAL_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(principal.identifier.as_str())
            .bind(&principal.password_hash)
            .bind(principal.role.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if let Some(db_err) = e.as_database_error() {
                    if db_err.is_unique_violation()
                        && db_err.constraint() == Some("principals_identifier_key")
                    {
                        return PrincipalError::AlreadyExists(principal.identifier.to_string());
                    }
                }
                database_error(e)
            })?;

        Self::principal_from_row(&row)
    }

    async fn find_by_id(&self, id: PrincipalId) -> Result<Option<Principal>, PrincipalError> {
        let query = format!("SELECT {} FROM principals WHERE id = $1", PRINCIPAL_COLUMNS);

        sqlx::query(&query)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(database_error)?
            .as_ref()
            .map(Self::principal_from_row)
            .transpose()
    }

    async fn find_by_identifier(
        &self,
        identifier: &Identifier,
    ) -> Result<Option<Principal>, PrincipalError> {
        let query = format!(
            "SELECT {} FROM principals WHERE identifier = $1",
            PRINCIPAL_COLUMNS
        );

        sqlx::query(&query)
            .bind(identifier.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(database_error)?
            .as_ref()
            .map(Self::principal_from_row)
            .transpose()
    }

    async fn save(&self, principal: &Principal) -> Result<Principal, PrincipalError> {
        let failed_attempts = i32::try_from(principal.failed_attempts).unwrap_or(i32::MAX);
        let query = format!(
            r#"
            UPDATE principals
            SET password_hash = $3,
                role = $4,
                failed_attempts = $5,
                lock_until = $6,
                is_locked = $7,
                version = version + 1
            WHERE id = $1 AND version = $2
            RETURNING {}
            "#,
            PRINCIPAL_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(principal.id.0)
            .bind(principal.version)
            .bind(&principal.password_hash)
            .bind(principal.role.as_str())
            .bind(failed_attempts)
            .bind(principal.lock_until)
            .bind(principal.is_locked)
            .fetch_optional(&self.pool)
            .await
            .map_err(database_error)?;

        if let Some(row) = row {
            return Self::principal_from_row(&row);
        }

        // No row updated: either the version moved on or the principal is gone.
        if self.exists(principal.id).await? {
            Err(PrincipalError::Conflict(principal.id.to_string()))
        } else {
            Err(PrincipalError::NotFound(principal.id.to_string()))
        }
    }
}
