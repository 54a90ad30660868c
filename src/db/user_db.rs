use shortener_db::{params, Db, DbError, DbResult, FromRow, Row};
use time::OffsetDateTime;

use crate::identity::Identity;

use super::timestamp;

struct IdentityRow {
    id: String,
    login: String,
    created_at: i64,
}

impl FromRow for IdentityRow {
    fn from_row(row: &mut impl Row) -> Self {
        Self {
            id: row.get_text("id"),
            login: row.get_text("login"),
            created_at: row.get_int("created_at"),
        }
    }
}

impl IdentityRow {
    fn into_identity(self) -> DbResult<Identity> {
        Ok(Identity {
            login: self.login,
            id: self.id,
            created_at: timestamp(self.created_at)?,
        })
    }
}

pub struct PasswordHash {
    pub identity: Identity,
    pub hash: String,
}

struct PasswordHashRow(IdentityRow, String);

impl FromRow for PasswordHashRow {
    fn from_row(row: &mut impl Row) -> Self {
        Self(IdentityRow::from_row(row), row.get_text("password_hash"))
    }
}

pub async fn find_identity_by_login(deps: &impl Db, login: &str) -> DbResult<Option<Identity>> {
    deps.query_map_opt::<IdentityRow>(
        "SELECT id, login, created_at FROM users WHERE login = $1".into(),
        params!(login.to_string()),
    )
    .await?
    .map(IdentityRow::into_identity)
    .transpose()
}

pub async fn find_identity_by_id(deps: &impl Db, id: &str) -> DbResult<Option<Identity>> {
    deps.query_map_opt::<IdentityRow>(
        "SELECT id, login, created_at FROM users WHERE id = $1".into(),
        params!(id.to_string()),
    )
    .await?
    .map(IdentityRow::into_identity)
    .transpose()
}

/// Used only by the login action
pub async fn find_password_hash_by_login(
    deps: &impl Db,
    login: &str,
) -> DbResult<Option<PasswordHash>> {
    let Some(PasswordHashRow(identity, hash)) = deps
        .query_map_opt::<PasswordHashRow>(
            "SELECT id, login, created_at, password_hash FROM users WHERE login = $1".into(),
            params!(login.to_string()),
        )
        .await?
    else {
        return Ok(None);
    };

    Ok(Some(PasswordHash {
        identity: identity.into_identity()?,
        hash,
    }))
}

#[derive(Debug)]
pub enum InsertUserError {
    LoginTaken,
    Db(DbError),
}

pub async fn insert_user(
    deps: &impl Db,
    login: &str,
    password_hash: String,
    now: OffsetDateTime,
) -> Result<Identity, InsertUserError> {
    let identity = Identity {
        login: login.to_string(),
        id: uuid::Uuid::new_v4().to_string(),
        created_at: now.replace_nanosecond(0).unwrap_or(now),
    };

    deps.execute(
        "INSERT INTO users (id, login, password_hash, created_at) VALUES ($1, $2, $3, $4)".into(),
        params!(
            identity.id.clone(),
            identity.login.clone(),
            password_hash,
            identity.created_at.unix_timestamp()
        ),
    )
    .await
    .map_err(|err| match err {
        DbError::UniqueViolation(_) => InsertUserError::LoginTaken,
        err => InsertUserError::Db(err),
    })?;

    Ok(identity)
}

pub async fn delete_user(deps: &impl Db, id: &str) -> DbResult<bool> {
    let deleted = deps
        .execute(
            "DELETE FROM users WHERE id = $1".into(),
            params!(id.to_string()),
        )
        .await?;

    Ok(deleted > 0)
}
