//! Test context with an in-memory database, so tests don't require the whole app running.

use shortener_sqlite::{SqlitePool, Storage};
use time::{Duration, OffsetDateTime};

use crate::{
    access_token::{TokenConfig, TokenService},
    anonymous::{AnonymousIdentity, DEFAULT_ANONYMOUS_LOGIN},
    db::{self, link_db, user_db},
    identity::Identity,
    link::Link,
    Migrations, ShortenerCtx,
};

pub const TEST_SECRET: &str = "test-secret";
pub const TEST_TTL: u64 = 600;

/// A migrated in-memory database, private to the calling test
pub async fn inmemory_db() -> SqlitePool {
    let pool = SqlitePool::new(Storage::Memory(uuid::Uuid::new_v4().to_string()), 4).unwrap();
    db::migrate::<Migrations>(&pool).await.unwrap();
    pool
}

pub fn test_token_service() -> TokenService {
    TokenService::new(TokenConfig::new(TEST_SECRET, TEST_TTL))
}

/// Full application context on top of [inmemory_db]
pub async fn inmemory_ctx() -> ShortenerCtx {
    let db = inmemory_db().await;
    let anonymous = AnonymousIdentity::bootstrap(&db, DEFAULT_ANONYMOUS_LOGIN)
        .await
        .unwrap();

    ShortenerCtx::new(db, test_token_service(), anonymous)
}

/// A user that cannot log in
pub async fn create_user(db: &SqlitePool, login: &str) -> Identity {
    user_db::insert_user(db, login, "!".to_string(), OffsetDateTime::now_utc())
        .await
        .unwrap()
}

/// Create `count` links for `owner`, one second apart, returned newest first
pub async fn create_links(db: &SqlitePool, owner: &Identity, count: usize) -> Vec<Link> {
    let start = OffsetDateTime::now_utc() - Duration::hours(1);
    let mut links = vec![];

    for index in 0..count {
        links.push(
            link_db::insert_link(
                db,
                &owner.id,
                &format!("https://example.com/{index}"),
                start + Duration::seconds(index as i64),
            )
            .await
            .unwrap(),
        );
    }

    links.reverse();
    links
}

pub fn bearer(ctx: &ShortenerCtx, identity: &Identity) -> String {
    format!("Bearer {}", ctx.tokens.issue_token(identity).unwrap().token)
}
