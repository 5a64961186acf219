mod adapter;
mod diff;
mod error;
mod model;
mod value;

pub use adapter::DatabaseAdapter;
pub use diff::{DiffOptions, DiffOutcome, Operation, RenameAmbiguity, diff_schemas};
pub use error::{
    BoxedError, DiffError, Error, ExecutionError, FkViolation, IntegrityError, IntrospectionError,
    PreconditionError, Result, SchemaError,
};
pub use model::{
    AUTO_CREATED_AT_COLUMN, AUTO_ID_COLUMN, AUTO_LAST_UPDATED_AT_COLUMN, Column, ColumnBuilder,
    DefaultValue, ForeignKey, OnDelete, Schema, Table, TimestampFormat,
};
pub use value::{Row, SqlValue, canonical_sql_type, is_valid_identifier, quote_ident, quote_text};
