use std::path::PathBuf;

use anyhow::anyhow;
use figment::{
    providers::{Env, Serialized},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::{access_token::TokenConfig, anonymous::DEFAULT_ANONYMOUS_LOGIN};

/// Upper bound of `SHORTENER_TOKEN_TTL`: one year
pub const MAX_TOKEN_TTL: u64 = 366 * 24 * 60 * 60;

#[derive(Serialize, Deserialize)]
pub struct EnvConfig {
    /// Port of the link API
    pub server_port: u16,

    /// Port serving `/health/readiness`
    pub health_port: u16,

    /// Database directory
    pub data_dir: PathBuf,

    pub db_pool_size: usize,

    /// HMAC secret for access tokens. Must be set.
    pub token_secret: String,

    /// Access token lifetime in seconds
    pub token_ttl: u64,

    /// Login of the identity used for requests without credentials
    pub anon_user_login: String,
}

impl EnvConfig {
    pub fn load() -> anyhow::Result<Self> {
        Ok(Figment::from(Serialized::defaults(Self::default()))
            .merge(Env::prefixed("SHORTENER_"))
            .extract()?)
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("shortener.db")
    }

    pub fn token_config(&self) -> anyhow::Result<TokenConfig> {
        if self.token_secret.is_empty() {
            return Err(anyhow!("SHORTENER_TOKEN_SECRET is not set"));
        }
        if self.token_ttl == 0 || self.token_ttl > MAX_TOKEN_TTL {
            return Err(anyhow!(
                "SHORTENER_TOKEN_TTL must be between 1 and {MAX_TOKEN_TTL} seconds"
            ));
        }

        Ok(TokenConfig::new(self.token_secret.clone(), self.token_ttl))
    }
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            server_port: 8000,
            health_port: 5555,
            data_dir: PathBuf::from("/var/lib/shortener"),
            db_pool_size: 4,
            token_secret: String::new(),
            token_ttl: 3600,
            anon_user_login: DEFAULT_ANONYMOUS_LOGIN.to_string(),
        }
    }
}

impl std::fmt::Debug for EnvConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvConfig")
            .field("server_port", &self.server_port)
            .field("health_port", &self.health_port)
            .field("data_dir", &self.data_dir)
            .field("db_pool_size", &self.db_pool_size)
            .field("token_secret", &"<redacted>")
            .field("token_ttl", &self.token_ttl)
            .field("anon_user_login", &self.anon_user_login)
            .finish()
    }
}
