//! Username/password signup and login

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::RngCore;
use shortener_db::{Db, DbError};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::warn;

use crate::{
    access_token::{AccessToken, SigningError, TokenService},
    db::user_db::{self, InsertUserError},
    identity::Identity,
};

#[derive(Error, Debug)]
pub enum LoginError {
    #[error("user is not authorized")]
    Credentials,

    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Signing(#[from] SigningError),
}

#[derive(Error, Debug)]
pub enum SignupError {
    #[error("{0}")]
    InvalidInput(&'static str),

    #[error("user with login {0} already exists")]
    LoginTaken(String),

    #[error("password hashing failed")]
    Hash,

    #[error(transparent)]
    Db(#[from] DbError),
}

pub async fn signup(
    deps: &impl Db,
    login: String,
    password: String,
) -> Result<Identity, SignupError> {
    let login = login.trim().to_string();
    if login.is_empty() {
        return Err(SignupError::InvalidInput("login must not be empty"));
    }
    if password.is_empty() {
        return Err(SignupError::InvalidInput("password must not be empty"));
    }

    let password_hash = tokio::task::spawn_blocking(move || hash_secret(&password))
        .await
        .map_err(|err| {
            warn!(?err, "failed to join");
            SignupError::Hash
        })??;

    user_db::insert_user(deps, &login, password_hash, OffsetDateTime::now_utc())
        .await
        .map_err(|err| match err {
            InsertUserError::LoginTaken => SignupError::LoginTaken(login),
            InsertUserError::Db(err) => SignupError::Db(err),
        })
}

pub async fn try_login(
    deps: &impl Db,
    tokens: &TokenService,
    login: &str,
    password: String,
) -> Result<AccessToken, LoginError> {
    let user_db::PasswordHash { identity, hash } = user_db::find_password_hash_by_login(deps, login)
        .await?
        .ok_or(LoginError::Credentials)?;

    verify_secret(hash, password).await?;

    Ok(tokens.issue_token(&identity)?)
}

fn hash_secret(secret: &str) -> Result<String, SignupError> {
    let mut salt = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt);
    let salt = SaltString::encode_b64(&salt).map_err(|err| {
        warn!(?err, "salt encoding");
        SignupError::Hash
    })?;

    Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| {
            warn!(?err, "failed to hash secret");
            SignupError::Hash
        })
}

async fn verify_secret(secret_hash: String, secret: String) -> Result<(), LoginError> {
    // check Argon2 hash
    tokio::task::spawn_blocking(move || -> Result<(), LoginError> {
        let hash = PasswordHash::new(&secret_hash).map_err(|err| {
            warn!(?err, "invalid secret hash");
            LoginError::Credentials
        })?;

        Argon2::default()
            .verify_password(secret.as_bytes(), &hash)
            .map_err(|err| match err {
                argon2::password_hash::Error::Password => LoginError::Credentials,
                _ => {
                    warn!(?err, "failed to verify secret hash");
                    LoginError::Credentials
                }
            })
    })
    .await
    .map_err(|err| {
        warn!(?err, "failed to join");
        LoginError::Credentials
    })?
}
