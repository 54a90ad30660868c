use axum::{extract::State, Json};
use http::StatusCode;
use serde::Deserialize;

use crate::{
    access_token::AccessToken,
    authorize::Authenticated,
    db::user_db,
    error::ApiError,
    identity::{Identity, Profile},
    link::Pagination,
    login,
    profile::aggregate_profile,
    ShortenerCtx,
};

#[derive(Deserialize)]
pub struct Credentials {
    login: String,
    password: String,
}

pub async fn signup(
    State(ctx): State<ShortenerCtx>,
    Json(body): Json<Credentials>,
) -> Result<(StatusCode, Json<Identity>), ApiError> {
    let identity = login::signup(&ctx.db, body.login, body.password).await?;

    Ok((StatusCode::CREATED, Json(identity)))
}

pub async fn login(
    State(ctx): State<ShortenerCtx>,
    Json(body): Json<Credentials>,
) -> Result<Json<AccessToken>, ApiError> {
    let token = login::try_login(&ctx.db, &ctx.tokens, &body.login, body.password).await?;

    Ok(Json(token))
}

/// The caller's profile with link count and one page of links.
///
/// A failure of either derived value fails the whole request.
pub async fn profile(
    State(ctx): State<ShortenerCtx>,
    Authenticated(subject): Authenticated,
    page: Pagination,
) -> Result<Json<Profile>, ApiError> {
    let identity = user_db::find_identity_by_id(&ctx.db, &subject.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".to_string()))?;

    Ok(Json(aggregate_profile(&ctx.db, identity, page).await?))
}
