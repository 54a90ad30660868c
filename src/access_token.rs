//! Access tokens identify the caller of the link API.
//!
//! The access token is implemented as an HMAC-signed JSON Web Token carrying
//! `{"user": {"login", "id"}, "exp"}`. Tokens are created per login (or per anonymous request)
//! and never mutated.
//!

use std::fmt::Debug;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::{errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use time::OffsetDateTime;

use crate::identity::{Identity, TokenSubject};

/// Tokens are issued with this algorithm
const ISSUE_ALGORITHM: Algorithm = Algorithm::HS256;

/// The accepted signature algorithm family: symmetric MACs only.
const ACCEPTED_ALGORITHMS: [(&str, Algorithm); 3] = [
    ("HS256", Algorithm::HS256),
    ("HS384", Algorithm::HS384),
    ("HS512", Algorithm::HS512),
];

#[derive(Error, Debug)]
pub enum SigningError {
    #[error("token signing secret is empty")]
    EmptySecret,

    #[error("token signing failed: {0}")]
    Encode(String),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed authentication token")]
    Malformed,

    #[error("unsupported token algorithm `{0}`")]
    UnsupportedAlgorithm(String),

    #[error("invalid token signature")]
    InvalidSignature,

    #[error("authentication token has expired")]
    Expired,

    #[error("token claim `{0}` is missing or malformed")]
    MissingClaim(&'static str),
}

/// Signing secret and token lifetime.
#[derive(Clone)]
pub struct TokenConfig {
    secret: String,
    ttl: time::Duration,
}

impl TokenConfig {
    pub fn new(secret: impl Into<String>, ttl_secs: u64) -> Self {
        Self {
            secret: secret.into(),
            ttl: time::Duration::seconds(i64::try_from(ttl_secs).unwrap_or(i64::MAX)),
        }
    }
}

impl Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"<redacted>")
            .field("ttl", &self.ttl)
            .finish()
    }
}

/// Issued access token, as returned to clients
#[derive(Clone, Debug, Serialize)]
pub struct AccessToken {
    pub token: String,
    #[serde(skip)]
    pub expires_at: OffsetDateTime,
}

/// The verified content of an access token
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Claims {
    pub user: TokenSubject,
    pub expires_at: OffsetDateTime,
}

#[derive(Serialize)]
struct EncodedClaims<'a> {
    user: &'a TokenSubject,
    exp: i64,
}

#[derive(Deserialize)]
struct PeekedHeader {
    alg: String,
}

/// Issues and verifies access tokens under one [TokenConfig].
///
/// The service holds no mutable state and does no I/O, it is shared read-only between requests.
pub struct TokenService {
    config: TokenConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenService {
    pub fn new(config: TokenConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    pub fn issue_token(&self, identity: &Identity) -> Result<AccessToken, SigningError> {
        self.issue_token_at(identity, OffsetDateTime::now_utc())
    }

    /// Issue a token as if the current time was `now`.
    ///
    /// `exp` is encoded in whole epoch seconds, so the issue instant is truncated to the second.
    pub fn issue_token_at(
        &self,
        identity: &Identity,
        now: OffsetDateTime,
    ) -> Result<AccessToken, SigningError> {
        if self.config.secret.is_empty() {
            return Err(SigningError::EmptySecret);
        }

        let issued_at = now
            .replace_nanosecond(0)
            .map_err(|err| SigningError::Encode(err.to_string()))?;
        let expires_at = issued_at
            .checked_add(self.config.ttl)
            .ok_or_else(|| SigningError::Encode("token expiry out of range".to_string()))?;

        let subject = identity.token_subject();
        let claims = EncodedClaims {
            user: &subject,
            exp: expires_at.unix_timestamp(),
        };

        let token = jsonwebtoken::encode(&Header::new(ISSUE_ALGORITHM), &claims, &self.encoding_key)
            .map_err(|err| SigningError::Encode(err.to_string()))?;

        Ok(AccessToken { token, expires_at })
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_token_at(token, OffsetDateTime::now_utc())
    }

    /// Verify a token against the instant `now`.
    ///
    /// Checks, in order: envelope shape, algorithm family, signature, expiry and the user claim.
    /// A token is expired unless `now` is strictly before its `exp`, there is no leeway.
    pub fn verify_token_at(&self, token: &str, now: OffsetDateTime) -> Result<Claims, TokenError> {
        let algorithm = accepted_algorithm(token)?;

        if self.config.secret.is_empty() {
            return Err(TokenError::InvalidSignature);
        }

        let mut validation = Validation::new(algorithm);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;

        let token_data =
            jsonwebtoken::decode::<Map<String, Value>>(token, &self.decoding_key, &validation)
                .map_err(|err| match err.kind() {
                    ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                    ErrorKind::InvalidAlgorithm => {
                        TokenError::UnsupportedAlgorithm(format!("{algorithm:?}"))
                    }
                    _ => TokenError::Malformed,
                })?;
        let mut claims = token_data.claims;

        let expires_at = claims
            .get("exp")
            .and_then(Value::as_i64)
            .and_then(|exp| OffsetDateTime::from_unix_timestamp(exp).ok())
            .ok_or(TokenError::MissingClaim("exp"))?;

        if now >= expires_at {
            return Err(TokenError::Expired);
        }

        let user = claims
            .remove("user")
            .and_then(|user| serde_json::from_value::<TokenSubject>(user).ok())
            .ok_or(TokenError::MissingClaim("user"))?;

        Ok(Claims { user, expires_at })
    }
}

/// Read the `alg` of the token header, before any cryptography is involved.
///
/// Anything outside the HMAC family, including `none`, is refused here.
fn accepted_algorithm(token: &str) -> Result<Algorithm, TokenError> {
    let mut segments = token.split('.');
    let (Some(header), Some(_), Some(_), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(TokenError::Malformed);
    };

    let header = URL_SAFE_NO_PAD
        .decode(header)
        .map_err(|_| TokenError::Malformed)?;
    let PeekedHeader { alg } =
        serde_json::from_slice(&header).map_err(|_| TokenError::Malformed)?;

    ACCEPTED_ALGORITHMS
        .iter()
        .find(|(name, _)| *name == alg)
        .map(|(_, algorithm)| *algorithm)
        .ok_or(TokenError::UnsupportedAlgorithm(alg))
}

#[cfg(test)]
mod tests {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    use jsonwebtoken::{Algorithm, EncodingKey, Header};
    use serde_json::json;
    use time::{macros::datetime, Duration, OffsetDateTime};

    use super::{TokenConfig, TokenError, TokenService};
    use crate::identity::{Identity, TokenSubject};

    const SECRET: &str = "unit-test-secret";
    const TTL: u64 = 60;
    const ISSUED: OffsetDateTime = datetime!(2024-05-01 12:00:00 UTC);

    fn service() -> TokenService {
        TokenService::new(TokenConfig::new(SECRET, TTL))
    }

    fn identity() -> Identity {
        Identity {
            login: "alice".to_string(),
            id: "f0c4a9b2-1d7e-4c55-9a53-2b3c0f1e8d11".to_string(),
            created_at: datetime!(2024-01-01 0:00 UTC),
        }
    }

    fn sign(alg: Algorithm, claims: &serde_json::Value, secret: &str) -> String {
        jsonwebtoken::encode(
            &Header::new(alg),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn unsigned(header: serde_json::Value, claims: serde_json::Value, signature: &str) -> String {
        format!(
            "{}.{}.{signature}",
            URL_SAFE_NO_PAD.encode(header.to_string()),
            URL_SAFE_NO_PAD.encode(claims.to_string()),
        )
    }

    fn valid_claims() -> serde_json::Value {
        json!({
            "user": { "login": "alice", "id": "f0c4a9b2-1d7e-4c55-9a53-2b3c0f1e8d11" },
            "exp": (ISSUED + Duration::hours(1)).unix_timestamp(),
        })
    }

    #[test]
    fn issue_then_verify_returns_identity() {
        let service = service();
        let token = service.issue_token_at(&identity(), ISSUED).unwrap();

        let claims = service
            .verify_token_at(&token.token, ISSUED + Duration::seconds(1))
            .unwrap();

        assert_eq!(
            claims.user,
            TokenSubject {
                login: "alice".to_string(),
                id: identity().id,
            }
        );
        assert_eq!(claims.expires_at, ISSUED + Duration::seconds(TTL as i64));
    }

    #[test]
    fn issue_with_current_clock() {
        let service = service();
        let token = service.issue_token(&identity()).unwrap();

        assert_eq!(
            service.verify_token(&token.token).unwrap().user,
            identity().token_subject()
        );
    }

    #[test]
    fn expiry_is_strict() {
        let service = service();
        let token = service.issue_token_at(&identity(), ISSUED).unwrap().token;
        let ttl = Duration::seconds(TTL as i64);

        assert!(service
            .verify_token_at(&token, ISSUED + ttl - Duration::milliseconds(1))
            .is_ok());
        assert_eq!(
            service.verify_token_at(&token, ISSUED + ttl),
            Err(TokenError::Expired)
        );
        assert_eq!(
            service.verify_token_at(&token, ISSUED + ttl + Duration::days(3)),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn sub_second_issue_instant_is_truncated() {
        let service = service();
        let issued = ISSUED + Duration::milliseconds(700);
        let token = service.issue_token_at(&identity(), issued).unwrap();

        assert_eq!(token.expires_at, ISSUED + Duration::seconds(TTL as i64));
    }

    #[test]
    fn none_algorithm_is_rejected() {
        let token = unsigned(json!({ "alg": "none", "typ": "JWT" }), valid_claims(), "");

        assert_eq!(
            service().verify_token_at(&token, ISSUED),
            Err(TokenError::UnsupportedAlgorithm("none".to_string()))
        );
    }

    #[test]
    fn asymmetric_algorithms_are_rejected_before_signature_check() {
        for alg in ["RS256", "ES256", "PS512", "EdDSA"] {
            let token = unsigned(
                json!({ "alg": alg, "typ": "JWT" }),
                valid_claims(),
                "c2lnbmF0dXJl",
            );

            assert_eq!(
                service().verify_token_at(&token, ISSUED),
                Err(TokenError::UnsupportedAlgorithm(alg.to_string())),
                "{alg}"
            );
        }
    }

    #[test]
    fn other_hmac_variants_are_accepted() {
        let token = sign(Algorithm::HS512, &valid_claims(), SECRET);

        let claims = service().verify_token_at(&token, ISSUED).unwrap();
        assert_eq!(claims.user.login, "alice");
    }

    #[test]
    fn wrong_secret_is_invalid_signature() {
        let token = sign(Algorithm::HS256, &valid_claims(), "another secret");

        assert_eq!(
            service().verify_token_at(&token, ISSUED),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn tampered_payload_is_invalid_signature() {
        let token = service().issue_token_at(&identity(), ISSUED).unwrap().token;
        let mut segments: Vec<&str> = token.split('.').collect();
        let forged_payload = URL_SAFE_NO_PAD.encode(
            json!({
                "user": { "login": "admin", "id": "1" },
                "exp": (ISSUED + Duration::hours(1)).unix_timestamp(),
            })
            .to_string(),
        );
        segments[1] = &forged_payload;

        assert_eq!(
            service().verify_token_at(&segments.join("."), ISSUED),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn missing_claims() {
        let no_user = sign(
            Algorithm::HS256,
            &json!({ "exp": (ISSUED + Duration::hours(1)).unix_timestamp() }),
            SECRET,
        );
        assert_eq!(
            service().verify_token_at(&no_user, ISSUED),
            Err(TokenError::MissingClaim("user"))
        );

        let bad_user = sign(
            Algorithm::HS256,
            &json!({ "user": "alice", "exp": (ISSUED + Duration::hours(1)).unix_timestamp() }),
            SECRET,
        );
        assert_eq!(
            service().verify_token_at(&bad_user, ISSUED),
            Err(TokenError::MissingClaim("user"))
        );

        let no_exp = sign(
            Algorithm::HS256,
            &json!({ "user": { "login": "alice", "id": "1" } }),
            SECRET,
        );
        assert_eq!(
            service().verify_token_at(&no_exp, ISSUED),
            Err(TokenError::MissingClaim("exp"))
        );
    }

    #[test]
    fn garbage_is_malformed() {
        for token in ["", "abc", "a.b", "a.b.c.d", "!!!.e30.sig"] {
            assert_eq!(
                service().verify_token_at(token, ISSUED),
                Err(TokenError::Malformed),
                "{token:?}"
            );
        }
    }

    #[test]
    fn empty_secret_cannot_sign_or_verify() {
        let empty = TokenService::new(TokenConfig::new("", TTL));
        assert!(matches!(
            empty.issue_token_at(&identity(), ISSUED),
            Err(super::SigningError::EmptySecret)
        ));

        let token = sign(Algorithm::HS256, &valid_claims(), "");
        assert_eq!(
            empty.verify_token_at(&token, ISSUED),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn expiry_beyond_calendar_range_is_a_signing_error() {
        for ttl in [1_000_000_000_000, u64::MAX] {
            let service = TokenService::new(TokenConfig::new(SECRET, ttl));
            assert!(matches!(
                service.issue_token_at(&identity(), ISSUED),
                Err(super::SigningError::Encode(_))
            ));
        }
    }

    #[test]
    fn secret_is_not_debug_printed() {
        let debug = format!("{:?}", TokenConfig::new(SECRET, TTL));
        assert!(!debug.contains(SECRET));
    }
}
