use std::path::Path;

use declite_core::{
    DatabaseAdapter, Error, ExecutionError, Result, Row, SchemaError, SqlValue,
    is_valid_identifier,
};
use rusqlite::{
    Connection, OpenFlags, params_from_iter,
    types::{ToSql, ToSqlOutput, Value as DriverValue, ValueRef},
};

use crate::catalog;

const MINIMUM_SQLITE_MAJOR_VERSION: u16 = 3;
const MINIMUM_SQLITE_MINOR_VERSION: u16 = 35;

/// rusqlite-backed implementation of the connection façade. One connection,
/// owned by one thread, no internal locking.
pub struct SqliteAdapter {
    connection: Connection,
}

impl SqliteAdapter {
    pub fn open(path: &Path, readonly: bool) -> Result<Self> {
        let flags = if readonly {
            OpenFlags::SQLITE_OPEN_READ_ONLY
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX
        } else {
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX
        };
        let connection = Connection::open_with_flags(path, flags)
            .map_err(|source| statement_error("OPEN", source))?;

        let adapter = Self { connection };
        ensure_minimum_version(&adapter)?;
        Ok(adapter)
    }

    pub fn close(self) -> Result<()> {
        self.connection
            .close()
            .map_err(|(_, source)| statement_error("CLOSE", source))
    }
}

impl DatabaseAdapter for SqliteAdapter {
    fn execute(&mut self, sql: &str, params: &[(&str, SqlValue)]) -> Result<Vec<Row>> {
        let mut statement = self
            .connection
            .prepare(sql)
            .map_err(|source| statement_error(sql, source))?;
        let column_count = statement.column_count();

        let bound = params
            .iter()
            .map(|(name, value)| (*name, Param(value)))
            .collect::<Vec<_>>();
        let named = bound
            .iter()
            .map(|(name, param)| (*name, param as &dyn ToSql))
            .collect::<Vec<_>>();

        let mut rows = statement
            .query(named.as_slice())
            .map_err(|source| statement_error(sql, source))?;

        let mut collected = Vec::new();
        while let Some(row) = rows.next().map_err(|source| statement_error(sql, source))? {
            let mut values = Vec::with_capacity(column_count);
            for index in 0..column_count {
                let value = row
                    .get_ref(index)
                    .map_err(|source| statement_error(sql, source))?;
                values.push(value_from_ref(value));
            }
            collected.push(values);
        }
        Ok(collected)
    }

    fn executemany(&mut self, sql: &str, rows: &[Vec<SqlValue>]) -> Result<()> {
        let mut statement = self
            .connection
            .prepare(sql)
            .map_err(|source| statement_error(sql, source))?;
        for row in rows {
            statement
                .execute(params_from_iter(row.iter().map(Param)))
                .map_err(|source| statement_error(sql, source))?;
        }
        Ok(())
    }

    fn begin(&mut self) -> Result<()> {
        self.connection
            .execute_batch("BEGIN")
            .map_err(|source| statement_error("BEGIN", source))
    }

    fn commit(&mut self) -> Result<()> {
        self.connection
            .execute_batch("COMMIT")
            .map_err(|source| statement_error("COMMIT", source))
    }

    fn rollback(&mut self) -> Result<()> {
        self.connection
            .execute_batch("ROLLBACK")
            .map_err(|source| statement_error("ROLLBACK", source))
    }

    fn in_transaction(&self) -> bool {
        !self.connection.is_autocommit()
    }

    fn pragma(&mut self, name: &str, value: Option<&str>) -> Result<Option<SqlValue>> {
        if !is_valid_identifier(name) {
            return Err(SchemaError::InvalidIdentifier {
                identifier: name.to_string(),
            }
            .into());
        }
        let sql = match value {
            Some(value) => format!("PRAGMA {name} = {value}"),
            None => format!("PRAGMA {name}"),
        };
        let rows = self.execute(&sql, &[])?;
        Ok(rows.into_iter().next().and_then(|row| row.into_iter().next()))
    }
}

struct Param<'a>(&'a SqlValue);

impl ToSql for Param<'_> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self.0 {
            SqlValue::Null => ToSqlOutput::Owned(DriverValue::Null),
            SqlValue::Integer(value) => ToSqlOutput::Owned(DriverValue::Integer(*value)),
            SqlValue::Real(value) => ToSqlOutput::Owned(DriverValue::Real(*value)),
            SqlValue::Text(value) => ToSqlOutput::Borrowed(ValueRef::Text(value.as_bytes())),
            SqlValue::Blob(bytes) => ToSqlOutput::Borrowed(ValueRef::Blob(bytes)),
        })
    }
}

fn value_from_ref(value: ValueRef<'_>) -> SqlValue {
    match value {
        ValueRef::Null => SqlValue::Null,
        ValueRef::Integer(value) => SqlValue::Integer(value),
        ValueRef::Real(value) => SqlValue::Real(value),
        ValueRef::Text(bytes) => SqlValue::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => SqlValue::Blob(bytes.to_vec()),
    }
}

fn ensure_minimum_version(adapter: &SqliteAdapter) -> Result<()> {
    let raw: String = adapter
        .connection
        .query_row(catalog::SERVER_VERSION_QUERY, [], |row| row.get(0))
        .map_err(|source| statement_error(catalog::SERVER_VERSION_QUERY, source))?;

    let supported = parse_version(&raw).is_some_and(|(major, minor)| {
        major > MINIMUM_SQLITE_MAJOR_VERSION
            || (major == MINIMUM_SQLITE_MAJOR_VERSION && minor >= MINIMUM_SQLITE_MINOR_VERSION)
    });
    if supported {
        return Ok(());
    }

    Err(ExecutionError::Connection {
        message: format!(
            "sqlite version `{raw}` is not supported; requires \
             {MINIMUM_SQLITE_MAJOR_VERSION}.{MINIMUM_SQLITE_MINOR_VERSION}+"
        ),
    }
    .into())
}

fn parse_version(raw: &str) -> Option<(u16, u16)> {
    let mut parts = raw.split('.');
    let major = parts.next()?.parse::<u16>().ok()?;
    let minor = parts.next()?.parse::<u16>().ok()?;
    Some((major, minor))
}

fn statement_error<E>(sql: &str, source: E) -> Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    ExecutionError::Statement {
        sql: sql.to_string(),
        source: Box::new(source),
    }
    .into()
}
