mod column;
mod schema;
mod table;

pub use column::{Column, ColumnBuilder, DefaultValue, ForeignKey, OnDelete};
pub use schema::Schema;
pub use table::{
    AUTO_CREATED_AT_COLUMN, AUTO_ID_COLUMN, AUTO_LAST_UPDATED_AT_COLUMN, Table, TimestampFormat,
};
