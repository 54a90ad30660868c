//! Request authorization.
//!
//! Every protected request goes through [authorize_request]:
//!
//! 1. No (or an empty) `Authorization` header: the request is anonymous. A bearer token for
//!    the anonymous identity is issued and injected as if the client had sent it.
//! 2. The header must read exactly `Bearer <token>`, and the token must verify.
//! 3. The verified subject is attached to the request as [Authenticated].
//!
//! Everything here is CPU-bound and synchronous, there is no storage access per request.

use axum::{
    extract::{FromRequestParts, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use http::{header::AUTHORIZATION, request::Parts, HeaderMap, HeaderValue};
use thiserror::Error;
use tracing::debug;

use crate::{
    access_token::{SigningError, TokenError, TokenService},
    anonymous::AnonymousIdentity,
    ctx::ShortenerCtx,
    error::ApiError,
    identity::TokenSubject,
};

const BEARER_PREFIX: &str = "Bearer ";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Classification {
    Anonymous,
    Credentialed,
}

#[derive(Error, Debug)]
pub enum AuthRejection {
    #[error("user is not authorized")]
    MalformedHeader,

    #[error("{0}")]
    Token(#[from] TokenError),

    #[error("could not issue anonymous credential: {0}")]
    AnonymousCredential(#[from] SigningError),
}

/// The caller of a request that passed authorization
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Authenticated(pub TokenSubject);

pub fn classify(headers: &HeaderMap) -> Classification {
    match headers.get(AUTHORIZATION) {
        Some(value) if !value.is_empty() => Classification::Credentialed,
        _ => Classification::Anonymous,
    }
}

/// Extract the token of a `Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthRejection> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix(BEARER_PREFIX))
        .filter(|token| !token.is_empty())
        .ok_or(AuthRejection::MalformedHeader)
}

/// Resolve the caller of a request.
///
/// For anonymous requests the synthesized credential is written into `headers`.
pub fn authorize_request(
    headers: &mut HeaderMap,
    tokens: &TokenService,
    anonymous: &AnonymousIdentity,
) -> Result<TokenSubject, AuthRejection> {
    if classify(headers) == Classification::Anonymous {
        let token = tokens.issue_token(&anonymous.get())?;
        let value = HeaderValue::try_from(format!("{BEARER_PREFIX}{}", token.token))
            .map_err(|err| SigningError::Encode(err.to_string()))?;

        headers.insert(AUTHORIZATION, value);
    }

    let claims = tokens.verify_token(bearer_token(headers)?)?;

    Ok(claims.user)
}

/// Axum middleware running [authorize_request]
pub async fn authorization_layer(
    State(ctx): State<ShortenerCtx>,
    mut request: Request,
    next: Next,
) -> Response {
    match authorize_request(request.headers_mut(), &ctx.tokens, &ctx.anonymous) {
        Ok(subject) => {
            request.extensions_mut().insert(Authenticated(subject));
            next.run(request).await
        }
        Err(rejection) => {
            debug!(%rejection, "request rejected");
            ApiError::from(rejection).into_response()
        }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Authenticated>()
            .cloned()
            .ok_or_else(|| ApiError::Unauthorized("user is not authorized".to_string()))
    }
}
