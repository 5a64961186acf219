mod adapter;
mod catalog;
mod database;
mod executor;
mod introspect;

pub use adapter::SqliteAdapter;
pub use database::{Database, DatabaseOptions};
pub use executor::{apply_operations, foreign_key_violations};
pub use introspect::{
    column_from_sql, introspect_schema, live_table, schema_from_sql, table_from_sql,
};
