use shortener_db::Row;

pub struct RusqliteRowBorrowed<'a, 'b> {
    pub(super) row: &'a rusqlite::Row<'b>,
}

impl Row for RusqliteRowBorrowed<'_, '_> {
    fn get_int(&mut self, idx: &str) -> i64 {
        self.row.get(idx).unwrap()
    }

    fn get_text(&mut self, idx: &str) -> String {
        self.row.get(idx).unwrap()
    }
}
