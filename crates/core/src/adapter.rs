use crate::{
    Result,
    value::{Row, SqlValue},
};

/// Narrow connection contract the introspector and the migration executor
/// run against. Implementations are single-threaded; the executor assumes
/// no concurrent writer exists on the same connection.
pub trait DatabaseAdapter {
    /// Runs one statement with named parameters and returns its rows
    /// (empty for DDL and writes).
    fn execute(&mut self, sql: &str, params: &[(&str, SqlValue)]) -> Result<Vec<Row>>;

    /// Runs one statement once per positional-parameter row.
    fn executemany(&mut self, sql: &str, rows: &[Vec<SqlValue>]) -> Result<()>;

    fn begin(&mut self) -> Result<()>;

    fn commit(&mut self) -> Result<()>;

    fn rollback(&mut self) -> Result<()>;

    fn in_transaction(&self) -> bool;

    /// Reads (`value = None`) or writes a pragma. Returns the first value
    /// the pragma statement produced, if any.
    fn pragma(&mut self, name: &str, value: Option<&str>) -> Result<Option<SqlValue>>;
}
