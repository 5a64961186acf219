use std::path::Path;

use declite_core::{
    AUTO_CREATED_AT_COLUMN, AUTO_LAST_UPDATED_AT_COLUMN, DatabaseAdapter as _, DiffOptions,
    Operation, Result, Row, Schema, SchemaError, SqlValue, TimestampFormat, diff_schemas,
};
use tracing::{debug, info, warn};

use crate::{adapter::SqliteAdapter, executor, introspect};

/// Connection-level knobs fixed at open time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatabaseOptions {
    pub readonly: bool,
    pub enforce_foreign_keys: bool,
    pub use_epoch_timestamps: bool,
    pub transaction: bool,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            readonly: false,
            enforce_foreign_keys: true,
            use_epoch_timestamps: false,
            transaction: true,
        }
    }
}

/// One SQLite database under schema management. Owns its connection for its
/// whole lifetime; bound to the opening thread.
///
/// With `transaction = true` a session transaction is held open between
/// calls. On drop it commits on a clean exit and rolls back when the thread
/// is panicking; the connection closes on every exit path.
pub struct Database {
    adapter: Option<SqliteAdapter>,
    timestamp_format: TimestampFormat,
    session_transaction: bool,
}

impl Database {
    pub fn open(path: impl AsRef<Path>, options: DatabaseOptions) -> Result<Self> {
        let mut adapter = SqliteAdapter::open(path.as_ref(), options.readonly)?;
        adapter.pragma(
            "foreign_keys",
            Some(if options.enforce_foreign_keys { "ON" } else { "OFF" }),
        )?;
        if options.transaction {
            adapter.begin()?;
        }
        Ok(Self {
            adapter: Some(adapter),
            timestamp_format: if options.use_epoch_timestamps {
                TimestampFormat::EpochSeconds
            } else {
                TimestampFormat::Iso8601
            },
            session_transaction: options.transaction,
        })
    }

    pub fn in_memory(options: DatabaseOptions) -> Result<Self> {
        Self::open(":memory:", options)
    }

    #[must_use]
    pub fn timestamp_format(&self) -> TimestampFormat {
        self.timestamp_format
    }

    /// Façade passthrough for row-level work layered on top of the schema
    /// manager.
    pub fn execute(&mut self, sql: &str, params: &[(&str, SqlValue)]) -> Result<Vec<Row>> {
        self.adapter().execute(sql, params)
    }

    /// The live schema, recovered from `sqlite_master`.
    pub fn introspect(&mut self) -> Result<Schema> {
        introspect::introspect_schema(self.adapter())
    }

    /// Pure comparison of `declared` against the live schema: no writes.
    /// Rename ambiguities are logged as warnings (or fail in strict mode).
    pub fn diff(&mut self, declared: &Schema, options: &DiffOptions) -> Result<Vec<Operation>> {
        self.check_timestamp_format(declared)?;
        let live = self.introspect()?;
        let outcome = diff_schemas(declared, &live, options)?;
        for ambiguity in &outcome.ambiguities {
            warn!(
                table = %ambiguity.table,
                column = %ambiguity.dropped,
                candidates = ?ambiguity.candidates,
                "rename detection is ambiguous; emitting drop+add instead"
            );
        }
        Ok(outcome.ops)
    }

    /// Applies an operation list per the executor contract. The session
    /// transaction, when configured, is reopened afterwards.
    pub fn apply_diff(&mut self, operations: &[Operation]) -> Result<()> {
        let outcome = executor::apply_operations(self.adapter(), operations);
        if self.session_transaction && !self.adapter().in_transaction() {
            self.adapter().begin()?;
        }
        outcome
    }

    /// Diff plus apply.
    pub fn migrate(&mut self, declared: &Schema, options: &DiffOptions) -> Result<()> {
        let operations = self.diff(declared, options)?;
        if operations.is_empty() {
            debug!("live schema already matches the declaration");
            return Ok(());
        }
        info!(operations = operations.len(), "migrating schema");
        self.apply_diff(&operations)
    }

    /// Explicit single-operation migration; renames are never inferred.
    pub fn rename_column(
        &mut self,
        table: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Result<()> {
        self.apply_diff(&[Operation::RenameColumn {
            table: table.into(),
            from: from.into(),
            to: to.into(),
        }])
    }

    /// Explicit single-operation migration; renames are never inferred.
    pub fn rename_table(&mut self, from: impl Into<String>, to: impl Into<String>) -> Result<()> {
        self.apply_diff(&[Operation::RenameTable {
            from: from.into(),
            to: to.into(),
        }])
    }

    /// Commits the session transaction and closes the connection.
    pub fn close(mut self) -> Result<()> {
        let mut adapter = self
            .adapter
            .take()
            .expect("connection is open until close or drop");
        if adapter.in_transaction() {
            adapter.commit()?;
        }
        adapter.close()
    }

    fn adapter(&mut self) -> &mut SqliteAdapter {
        self.adapter
            .as_mut()
            .expect("connection is open until close or drop")
    }

    /// Auto-timestamp columns in the declared schema must agree with this
    /// database's configured representation.
    fn check_timestamp_format(&self, declared: &Schema) -> Result<()> {
        for table in declared {
            for name in [AUTO_CREATED_AT_COLUMN, AUTO_LAST_UPDATED_AT_COLUMN] {
                if let Some(column) = table.column(name)
                    && column.default().is_some_and(|default| !default.is_constant())
                    && column.sql_type() != self.timestamp_format.sql_type()
                {
                    return Err(SchemaError::TimestampFormatMismatch {
                        table: table.name().to_string(),
                        column: name.to_string(),
                        expected: self.timestamp_format.sql_type(),
                    }
                    .into());
                }
            }
        }
        Ok(())
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        if let Some(adapter) = self.adapter.as_mut()
            && adapter.in_transaction()
        {
            if std::thread::panicking() {
                let _ = adapter.rollback();
            } else {
                let _ = adapter.commit();
            }
        }
    }
}
