use std::{borrow::Cow, future::Future};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("db: {0}")]
    Sql(Cow<'static, str>),

    #[error("unique constraint violated: {0}")]
    UniqueViolation(Cow<'static, str>),

    #[error("pool: {0}")]
    Pool(String),

    #[error("too many rows")]
    TooManyRows,

    #[error("timestamp encoding")]
    Timestamp,

    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type DbResult<T> = Result<T, DbError>;

/// Build a parameter list for [Db] statements.
///
/// Every argument is converted with `Into` to the `Param` type of the target database.
#[macro_export]
macro_rules! params {
    () => {
        ::std::vec::Vec::new()
    };
    ($($param:expr),+ $(,)?) => {
        ::std::vec![$(::core::convert::Into::into($param)),+]
    };
}

/// Db abstraction around SQLite.
///
/// Implementors are cheap to clone handles (connection pools),
/// which allows issuing independent queries from concurrently running tasks.
pub trait Db: Send + Sync + 'static {
    type Param: From<i64> + From<String> + Send + 'static;

    /// Run a query and map every row
    fn query_map<T>(
        &self,
        stmt: Cow<'static, str>,
        params: Vec<Self::Param>,
    ) -> impl Future<Output = Result<Vec<T>, DbError>> + Send
    where
        T: FromRow + Send + 'static;

    /// Run a query expected to produce at most one row
    fn query_map_opt<T>(
        &self,
        stmt: Cow<'static, str>,
        params: Vec<Self::Param>,
    ) -> impl Future<Output = Result<Option<T>, DbError>> + Send
    where
        T: FromRow + Send + 'static;

    fn execute(
        &self,
        stmt: Cow<'static, str>,
        params: Vec<Self::Param>,
    ) -> impl Future<Output = Result<usize, DbError>> + Send;
}

pub trait Row {
    fn get_int(&mut self, idx: &str) -> i64;

    fn get_text(&mut self, idx: &str) -> String;
}

pub trait FromRow {
    fn from_row(row: &mut impl Row) -> Self;
}

/// Single-column integer results, e.g. `SELECT count(*) AS count`.
#[derive(Debug)]
pub struct Count(pub i64);

impl FromRow for Count {
    fn from_row(row: &mut impl Row) -> Self {
        Self(row.get_int("count"))
    }
}
