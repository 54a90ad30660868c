use std::convert::Infallible;

use axum::extract::{FromRequestParts, Query};
use http::request::Parts;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

pub const DEFAULT_LIMIT: i64 = 25;
pub const DEFAULT_OFFSET: i64 = 0;

/// A shortened link, owned by one identity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    pub id: String,
    pub url: String,
    pub user_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created: OffsetDateTime,
    pub usages_count: i64,
}

/// One recorded visit of a link
#[derive(Clone, Debug)]
pub struct Usage {
    pub id: i64,
    pub link_id: String,
    pub created: OffsetDateTime,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pagination {
    pub limit: i64,
    pub offset: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: DEFAULT_OFFSET,
        }
    }
}

#[derive(Deserialize, Default)]
struct PaginationQuery {
    limit: Option<String>,
    offset: Option<String>,
}

impl Pagination {
    /// Missing or unparsable values fall back to the defaults, negative values are clamped to zero.
    fn from_query(query: PaginationQuery) -> Self {
        let parse = |value: Option<String>, default: i64| {
            value
                .and_then(|value| value.trim().parse::<i64>().ok())
                .map(|value| value.max(0))
                .unwrap_or(default)
        };

        Self {
            limit: parse(query.limit, DEFAULT_LIMIT),
            offset: parse(query.offset, DEFAULT_OFFSET),
        }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Pagination {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _: &S) -> Result<Self, Self::Rejection> {
        let query = Query::<PaginationQuery>::try_from_uri(&parts.uri)
            .map(|Query(query)| query)
            .unwrap_or_default();

        Ok(Self::from_query(query))
    }
}
