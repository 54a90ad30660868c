//! The well-known anonymous identity.
//!
//! Callers without credentials act as this identity. It is looked up once before the
//! server accepts requests, and a server without it must not start.

use std::sync::Arc;

use arc_swap::ArcSwap;
use shortener_db::{Db, DbError};
use thiserror::Error;
use tracing::info;

use crate::{db::user_db, identity::Identity};

pub const DEFAULT_ANONYMOUS_LOGIN: &str = "anon";

#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error("anonymous identity `{0}` not found")]
    IdentityNotFound(String),

    #[error("anonymous identity lookup failed: {0}")]
    Db(#[from] DbError),
}

pub struct AnonymousIdentity {
    login: String,
    identity: ArcSwap<Identity>,
}

impl AnonymousIdentity {
    /// Resolve the anonymous identity by its login
    pub async fn bootstrap(deps: &impl Db, login: &str) -> Result<Self, BootstrapError> {
        let identity = lookup(deps, login).await?;

        info!(login, id = %identity.id, "resolved anonymous identity");

        Ok(Self {
            login: login.to_string(),
            identity: ArcSwap::new(Arc::new(identity)),
        })
    }

    /// The cached identity. Never touches storage.
    pub fn get(&self) -> Arc<Identity> {
        self.identity.load_full()
    }

    pub fn login(&self) -> &str {
        &self.login
    }

    /// Look the identity up again, for test harnesses that rewrite the users table.
    ///
    /// On failure the previously cached identity stays in place.
    pub async fn reload(&self, deps: &impl Db) -> Result<Arc<Identity>, BootstrapError> {
        let identity = Arc::new(lookup(deps, &self.login).await?);
        self.identity.store(identity.clone());

        Ok(identity)
    }
}

async fn lookup(deps: &impl Db, login: &str) -> Result<Identity, BootstrapError> {
    user_db::find_identity_by_login(deps, login)
        .await?
        .ok_or_else(|| BootstrapError::IdentityNotFound(login.to_string()))
}
