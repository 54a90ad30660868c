use shortener_db::{params, Db, DbResult, FromRow, Row};
use time::OffsetDateTime;

use crate::link::Usage;

use super::timestamp;

struct UsageId(i64);

impl FromRow for UsageId {
    fn from_row(row: &mut impl Row) -> Self {
        Self(row.get_int("id"))
    }
}

pub async fn insert_usage(
    deps: &impl Db,
    link_id: &str,
    now: OffsetDateTime,
) -> DbResult<Usage> {
    let created_at = now.unix_timestamp();

    let UsageId(id) = deps
        .query_map_opt::<UsageId>(
            "INSERT INTO usages (link_id, created_at) VALUES ($1, $2) RETURNING id".into(),
            params!(link_id.to_string(), created_at),
        )
        .await?
        .ok_or(shortener_db::DbError::Sql("usage insert returned no id".into()))?;

    Ok(Usage {
        id,
        link_id: link_id.to_string(),
        created: timestamp(created_at)?,
    })
}
