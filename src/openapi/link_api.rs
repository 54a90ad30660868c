use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    Json,
};
use http::{header::LOCATION, StatusCode};
use serde::Deserialize;
use time::OffsetDateTime;

use crate::{
    authorize::Authenticated,
    db::link_db,
    error::ApiError,
    link::{Link, Pagination},
    ShortenerCtx,
};

#[derive(Deserialize)]
pub struct CreateLink {
    url: String,
}

pub async fn create_link(
    State(ctx): State<ShortenerCtx>,
    Authenticated(subject): Authenticated,
    Json(body): Json<CreateLink>,
) -> Result<(StatusCode, Json<Link>), ApiError> {
    let url = body.url.trim();
    if url.is_empty() {
        return Err(ApiError::BadRequest("url must not be empty".to_string()));
    }

    let link = link_db::insert_link(&ctx.db, &subject.id, url, OffsetDateTime::now_utc()).await?;

    Ok((StatusCode::CREATED, Json(link)))
}

pub async fn list_links(
    State(ctx): State<ShortenerCtx>,
    Authenticated(subject): Authenticated,
    page: Pagination,
) -> Result<Json<Vec<Link>>, ApiError> {
    Ok(Json(
        link_db::list_links_for_identity(&ctx.db, &subject.id, page).await?,
    ))
}

/// Redirect to the link target. The visit is recorded in the background.
pub async fn follow_link(
    State(ctx): State<ShortenerCtx>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let link = link_db::find_link_by_id(&ctx.db, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("link {id} not found")))?;

    ctx.usage.record(link.id);

    Ok((StatusCode::MOVED_PERMANENTLY, [(LOCATION, link.url)]).into_response())
}
