use std::{borrow::Cow, path::PathBuf};

use deadpool::managed::{Object, Pool, PoolConfig};
use manager::SqlitePoolManager;
use param::rusqlite_params;
use row::RusqliteRowBorrowed;
use shortener_db::{Db, DbError, FromRow};

pub use param::RusqliteParam;

mod manager;
mod param;
mod row;

#[derive(Clone, Debug)]
pub enum Storage {
    File(PathBuf),
    /// A shared-cache in-memory database.
    ///
    /// All connections of one pool see the same data, the name keeps separate pools apart.
    Memory(String),
}

#[derive(Clone)]
pub struct SqlitePool {
    pool: Pool<SqlitePoolManager>,
}

impl SqlitePool {
    pub fn new(storage: Storage, pool_size: usize) -> Result<Self, DbError> {
        let pool = Pool::builder(SqlitePoolManager::new(storage))
            .config(PoolConfig::new(pool_size))
            .build()
            .map_err(|err| DbError::Pool(format!("{err:?}")))?;

        Ok(Self { pool })
    }

    pub async fn get(&self) -> Result<Object<SqlitePoolManager>, DbError> {
        self.pool
            .get()
            .await
            .map_err(|err| DbError::Pool(format!("{err:?}")))
    }

    /// Run a batch of statements inside one transaction, on a blocking thread.
    pub async fn execute_batch_txn(&self, sql: Vec<Cow<'static, str>>) -> Result<(), DbError> {
        let mut conn = self.get().await?;

        tokio::task::spawn_blocking(move || {
            let txn = conn.transaction().map_err(e)?;
            for sql in sql {
                txn.execute_batch(&sql).map_err(e)?;
            }
            txn.commit().map_err(e)
        })
        .await?
    }
}

impl Db for SqlitePool {
    type Param = RusqliteParam;

    async fn query_map<T>(
        &self,
        stmt: Cow<'static, str>,
        params: Vec<RusqliteParam>,
    ) -> Result<Vec<T>, DbError>
    where
        T: FromRow + Send + 'static,
    {
        let conn = self.get().await?;

        tokio::task::spawn_blocking(move || {
            let mut stmt = conn.prepare_cached(&stmt).map_err(e)?;
            let mut rows = stmt.query(rusqlite_params(params)).map_err(e)?;

            let mut output = vec![];

            while let Some(row) = rows.next().map_err(e)? {
                output.push(T::from_row(&mut RusqliteRowBorrowed { row }));
            }

            Ok(output)
        })
        .await?
    }

    async fn query_map_opt<T>(
        &self,
        stmt: Cow<'static, str>,
        params: Vec<RusqliteParam>,
    ) -> Result<Option<T>, DbError>
    where
        T: FromRow + Send + 'static,
    {
        let conn = self.get().await?;

        tokio::task::spawn_blocking(move || {
            let mut stmt = conn.prepare_cached(&stmt).map_err(e)?;
            let mut rows = stmt.query(rusqlite_params(params)).map_err(e)?;

            let mut output = None;

            if let Some(row) = rows.next().map_err(e)? {
                output = Some(T::from_row(&mut RusqliteRowBorrowed { row }));

                if rows.next().map_err(e)?.is_some() {
                    return Err(DbError::TooManyRows);
                }
            }

            Ok(output)
        })
        .await?
    }

    async fn execute(
        &self,
        stmt: Cow<'static, str>,
        params: Vec<RusqliteParam>,
    ) -> Result<usize, DbError> {
        let conn = self.get().await?;

        tokio::task::spawn_blocking(move || {
            rusqlite::Connection::execute(&conn, &stmt, rusqlite_params(params)).map_err(e)
        })
        .await?
    }
}

fn e(err: rusqlite::Error) -> DbError {
    match &err {
        rusqlite::Error::SqliteFailure(code, msg)
            if code.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            DbError::UniqueViolation(msg.clone().unwrap_or_default().into())
        }
        _ => DbError::Sql(format!("{err:?}").into()),
    }
}
