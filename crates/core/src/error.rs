use thiserror::Error;

/// Boxed source error for wrapping driver/parser failures at the crate
/// boundary.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Invalid Column/Table/Schema construction. Raised at build time, before
/// any I/O happens.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("invalid identifier `{identifier}`")]
    InvalidIdentifier { identifier: String },
    #[error("table `{table}` declares column `{column}` more than once")]
    DuplicateColumn { table: String, column: String },
    #[error("schema declares table `{table}` more than once")]
    DuplicateTable { table: String },
    #[error("table `{table}` declares more than one PRIMARY KEY column")]
    MultiplePrimaryKeys { table: String },
    #[error("column `{column}` cannot be both PRIMARY KEY and a foreign key")]
    PrimaryKeyForeignKeyConflict { column: String },
    #[error("column `{column}` has a choices value incompatible with type `{sql_type}`")]
    ChoiceTypeMismatch { column: String, sql_type: String },
    #[error(
        "column `{table}.{column}` references a rowid table and must be INTEGER"
    )]
    ForeignKeyTypeMismatch { table: String, column: String },
    #[error(
        "column `{table}.{column}` does not match the database timestamp format `{expected}`"
    )]
    TimestampFormatMismatch {
        table: String,
        column: String,
        expected: &'static str,
    },
}

/// The live database holds SQL the introspector cannot translate, or the
/// catalog is missing expected rows.
#[derive(Debug, Error)]
pub enum IntrospectionError {
    #[error("failed to parse the stored definition of table `{table}`")]
    UnparsableTableSql {
        table: String,
        #[source]
        source: BoxedError,
    },
    #[error("sqlite_master has no stored definition for table `{table}`")]
    MissingTableSql { table: String },
    #[error("the stored definition of `{table}` is not a CREATE TABLE statement")]
    NotACreateTable { table: String },
    #[error("the introspected definition of table `{table}` is outside the schema model")]
    ModelMismatch {
        table: String,
        #[source]
        source: Box<SchemaError>,
    },
}

/// Rename detection refused to guess. Only surfaced as an error in strict
/// mode; otherwise the engine emits the drop+add pair and reports the
/// ambiguity as a diagnostic.
#[derive(Debug, Error)]
pub enum DiffError {
    #[error(
        "rename detection for `{table}.{column}` is ambiguous (candidates: {})",
        candidates.join(", ")
    )]
    AmbiguousRename {
        table: String,
        column: String,
        candidates: Vec<String>,
    },
}

/// DDL or DML failure while applying a diff. The transaction is rolled back
/// and the foreign-key pragma restored before this surfaces.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("statement failed: {sql}")]
    Statement {
        sql: String,
        #[source]
        source: BoxedError,
    },
    #[error("migration aborted at operation `{operation}` after {applied} prior operations")]
    Operation {
        operation: String,
        applied: usize,
        #[source]
        source: Box<Error>,
    },
    #[error("connection failed: {message}")]
    Connection { message: String },
}

/// One row reported by `PRAGMA foreign_key_check`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FkViolation {
    pub table: String,
    pub rowid: Option<i64>,
    pub parent: String,
}

/// `PRAGMA foreign_key_check` reported rows after the migration committed.
#[derive(Debug, Error)]
#[error("foreign key check reported {} violation(s) after commit", violations.len())]
pub struct IntegrityError {
    pub violations: Vec<FkViolation>,
}

/// A required precondition does not hold. Raised before any mutation.
#[derive(Debug, Error)]
pub enum PreconditionError {
    #[error("temporary table name `{name}` already exists")]
    TempTableExists { name: String },
    #[error("no such table: `{table}`")]
    NoSuchTable { table: String },
    #[error("table `{table}` has no column `{column}`")]
    NoSuchColumn { table: String, column: String },
    #[error("cannot rename `{from}` to `{to}`: the target already exists")]
    RenameTargetExists { from: String, to: String },
    #[error("reorder list for table `{table}` is not a permutation of its columns")]
    ReorderMismatch { table: String },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),
    #[error("introspection error: {0}")]
    Introspection(#[from] IntrospectionError),
    #[error("diff error: {0}")]
    Diff(#[from] DiffError),
    #[error("execution error: {0}")]
    Execution(#[from] ExecutionError),
    #[error("integrity error: {0}")]
    Integrity(#[from] IntegrityError),
    #[error("precondition error: {0}")]
    Precondition(#[from] PreconditionError),
}

pub type Result<T> = std::result::Result<T, Error>;
