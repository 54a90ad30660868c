use std::sync::Arc;

use shortener_sqlite::SqlitePool;

use crate::{access_token::TokenService, anonymous::AnonymousIdentity, usage::UsageRecorder};

/// Common context for the whole application.
///
/// Everything in here is read-only after startup and shared between all requests.
#[derive(Clone)]
pub struct ShortenerCtx {
    pub db: SqlitePool,
    pub tokens: Arc<TokenService>,
    pub anonymous: Arc<AnonymousIdentity>,
    pub usage: UsageRecorder<SqlitePool>,
}

impl ShortenerCtx {
    pub fn new(db: SqlitePool, tokens: TokenService, anonymous: AnonymousIdentity) -> Self {
        Self {
            usage: UsageRecorder::new(db.clone()),
            db,
            tokens: Arc::new(tokens),
            anonymous: Arc::new(anonymous),
        }
    }
}
