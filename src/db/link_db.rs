use indoc::indoc;
use rand::{distributions::Alphanumeric, Rng};
use shortener_db::{params, Count, Db, DbResult, FromRow, Row};
use time::OffsetDateTime;

use crate::link::{Link, Pagination};

use super::timestamp;

pub const LINK_ID_LEN: usize = 7;

struct LinkRow {
    id: String,
    url: String,
    user_id: String,
    created_at: i64,
    usages_count: i64,
}

impl FromRow for LinkRow {
    fn from_row(row: &mut impl Row) -> Self {
        Self {
            id: row.get_text("id"),
            url: row.get_text("url"),
            user_id: row.get_text("user_id"),
            created_at: row.get_int("created_at"),
            usages_count: row.get_int("usages_count"),
        }
    }
}

impl LinkRow {
    fn into_link(self) -> DbResult<Link> {
        Ok(Link {
            id: self.id,
            url: self.url,
            user_id: self.user_id,
            created: timestamp(self.created_at)?,
            usages_count: self.usages_count,
        })
    }
}

fn new_link_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(LINK_ID_LEN)
        .map(char::from)
        .collect()
}

pub async fn insert_link(
    deps: &impl Db,
    user_id: &str,
    url: &str,
    now: OffsetDateTime,
) -> DbResult<Link> {
    let link = Link {
        id: new_link_id(),
        url: url.to_string(),
        user_id: user_id.to_string(),
        created: now.replace_nanosecond(0).unwrap_or(now),
        usages_count: 0,
    };

    deps.execute(
        "INSERT INTO links (id, url, user_id, created_at) VALUES ($1, $2, $3, $4)".into(),
        params!(
            link.id.clone(),
            link.url.clone(),
            link.user_id.clone(),
            link.created.unix_timestamp()
        ),
    )
    .await?;

    Ok(link)
}

pub async fn find_link_by_id(deps: &impl Db, id: &str) -> DbResult<Option<Link>> {
    deps.query_map_opt::<LinkRow>(
        indoc! {
            "
            SELECT l.id, l.url, l.user_id, l.created_at, count(u.id) AS usages_count
            FROM links l
            LEFT JOIN usages u ON u.link_id = l.id
            WHERE l.id = $1
            GROUP BY l.id
            "
        }
        .into(),
        params!(id.to_string()),
    )
    .await?
    .map(LinkRow::into_link)
    .transpose()
}

/// Total number of links owned by the identity
pub async fn count_links_for_identity(deps: &impl Db, user_id: &str) -> DbResult<i64> {
    let count = deps
        .query_map_opt::<Count>(
            "SELECT count(*) AS count FROM links WHERE user_id = $1".into(),
            params!(user_id.to_string()),
        )
        .await?;

    Ok(count.map(|Count(count)| count).unwrap_or(0))
}

/// One page of the identity's links, newest first, each with its usage count
pub async fn list_links_for_identity(
    deps: &impl Db,
    user_id: &str,
    page: Pagination,
) -> DbResult<Vec<Link>> {
    deps.query_map::<LinkRow>(
        indoc! {
            "
            SELECT l.id, l.url, l.user_id, l.created_at, count(u.id) AS usages_count
            FROM links l
            LEFT JOIN usages u ON u.link_id = l.id
            WHERE l.user_id = $1
            GROUP BY l.id
            ORDER BY l.created_at DESC, l.rowid DESC
            LIMIT $2 OFFSET $3
            "
        }
        .into(),
        params!(user_id.to_string(), page.limit, page.offset),
    )
    .await?
    .into_iter()
    .map(LinkRow::into_link)
    .collect()
}
