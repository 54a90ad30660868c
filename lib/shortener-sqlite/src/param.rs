use rusqlite::{params_from_iter, types::ToSqlOutput, ParamsFromIter};

#[derive(Clone, Debug)]
pub struct RusqliteParam(rusqlite::types::Value);

impl From<i64> for RusqliteParam {
    fn from(value: i64) -> Self {
        Self(value.into())
    }
}

impl From<String> for RusqliteParam {
    fn from(value: String) -> Self {
        Self(value.into())
    }
}

pub(super) fn rusqlite_params(
    params: Vec<RusqliteParam>,
) -> ParamsFromIter<impl Iterator<Item = ToSqlOutput<'static>>> {
    params_from_iter(params.into_iter().map(|p| ToSqlOutput::Owned(p.0)))
}
