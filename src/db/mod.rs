use std::fmt::Display;

use indoc::indoc;
use shortener_db::{params, Db, DbError, FromRow, Row};
use shortener_sqlite::SqlitePool;
use tracing::info;

pub mod link_db;
pub mod usage_db;
pub mod user_db;

/// Apply all embedded migrations not yet recorded in the `_migration` table, in file name order.
pub async fn migrate<T: rust_embed::RustEmbed>(pool: &SqlitePool) -> Result<(), DbError> {
    let mut files: Vec<_> = T::iter().collect();
    files.sort();

    pool.execute(
        indoc! {
            "
            CREATE TABLE IF NOT EXISTS _migration (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                ts INTEGER NOT NULL
            )
            "
        }
        .into(),
        params!(),
    )
    .await?;

    let applied = pool
        .query_map::<AppliedMigration>(
            "SELECT name FROM _migration ORDER BY id ASC".into(),
            params!(),
        )
        .await?;

    for file in files {
        if applied.iter().any(|applied| applied.name == file.as_ref()) {
            continue;
        }

        let Some(migration) = T::get(&file) else {
            continue;
        };
        let sql = String::from_utf8_lossy(&migration.data).into_owned();

        pool.execute_batch_txn(vec![
            sql.into(),
            format!(
                "INSERT INTO _migration (name, ts) VALUES ({}, {})",
                StrLiteral(&file),
                time::OffsetDateTime::now_utc().unix_timestamp()
            )
            .into(),
        ])
        .await?;

        info!(migration = %file, "applied migration");
    }

    Ok(())
}

struct AppliedMigration {
    name: String,
}

impl FromRow for AppliedMigration {
    fn from_row(row: &mut impl Row) -> Self {
        Self {
            name: row.get_text("name"),
        }
    }
}

/// SQL string literal with quotes escaped
struct StrLiteral<'a>(&'a str);

impl Display for StrLiteral<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "'")?;

        for char in self.0.chars() {
            if char == '\'' {
                write!(f, "''")?;
            } else {
                write!(f, "{char}")?;
            }
        }

        write!(f, "'")?;

        Ok(())
    }
}

/// Convert a stored unix timestamp
pub(crate) fn timestamp(secs: i64) -> Result<time::OffsetDateTime, DbError> {
    time::OffsetDateTime::from_unix_timestamp(secs).map_err(|_| DbError::Timestamp)
}
