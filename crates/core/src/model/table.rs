use std::collections::BTreeSet;

use crate::{
    SchemaError,
    model::column::Column,
    value::{is_valid_identifier, quote_ident},
};

/// Storage form of the automatic `created_at` / `last_updated_at` columns.
/// Fixed per database; mixing forms within one database is undefined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimestampFormat {
    #[default]
    Iso8601,
    EpochSeconds,
}

impl TimestampFormat {
    #[must_use]
    pub fn sql_type(self) -> &'static str {
        match self {
            Self::Iso8601 => "TEXT",
            Self::EpochSeconds => "INTEGER",
        }
    }

    #[must_use]
    pub fn default_expression(self) -> &'static str {
        match self {
            Self::Iso8601 => "(datetime('now'))",
            Self::EpochSeconds => "(unixepoch())",
        }
    }
}

pub const AUTO_ID_COLUMN: &str = "id";
pub const AUTO_CREATED_AT_COLUMN: &str = "created_at";
pub const AUTO_LAST_UPDATED_AT_COLUMN: &str = "last_updated_at";

/// An ordered list of columns plus opaque table-level constraint fragments.
/// Column positions are the table's on-disk column order.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    name: String,
    columns: Vec<Column>,
    constraints: Vec<String>,
    without_rowid: bool,
}

impl Table {
    pub fn new(
        name: impl Into<String>,
        columns: Vec<Column>,
        constraints: Vec<String>,
    ) -> Result<Self, SchemaError> {
        let name = name.into();
        if !is_valid_identifier(&name) {
            return Err(SchemaError::InvalidIdentifier { identifier: name });
        }

        let mut seen = BTreeSet::new();
        let mut primary_keys = 0usize;
        for column in &columns {
            if !seen.insert(column.name().to_string()) {
                return Err(SchemaError::DuplicateColumn {
                    table: name,
                    column: column.name().to_string(),
                });
            }
            if column.is_primary_key() {
                primary_keys += 1;
            }
        }
        if primary_keys > 1 {
            return Err(SchemaError::MultiplePrimaryKeys { table: name });
        }

        Ok(Self {
            name,
            columns,
            constraints,
            without_rowid: false,
        })
    }

    /// The auto-timestamped variant: prepends `id INTEGER PRIMARY KEY` and
    /// appends the two timestamp columns, then expands into a plain Table.
    /// Downstream components never see "auto" specially.
    pub fn auto(
        name: impl Into<String>,
        columns: Vec<Column>,
        constraints: Vec<String>,
        format: TimestampFormat,
    ) -> Result<Self, SchemaError> {
        let mut expanded = Vec::with_capacity(columns.len() + 3);
        expanded.push(
            Column::new(AUTO_ID_COLUMN, "INTEGER")
                .primary_key()
                .build()?,
        );
        expanded.extend(columns);
        for timestamp in [AUTO_CREATED_AT_COLUMN, AUTO_LAST_UPDATED_AT_COLUMN] {
            expanded.push(
                Column::new(timestamp, format.sql_type())
                    .required()
                    .default_expression(format.default_expression())
                    .build()?,
            );
        }
        Self::new(name, expanded, constraints)
    }

    #[must_use]
    pub fn without_rowid(mut self) -> Self {
        self.without_rowid = true;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name() == name)
    }

    #[must_use]
    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.name() == name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(Column::name)
    }

    #[must_use]
    pub fn constraints(&self) -> &[String] {
        &self.constraints
    }

    #[must_use]
    pub fn is_without_rowid(&self) -> bool {
        self.without_rowid
    }

    /// `CREATE TABLE` statement for this definition (no trailing semicolon).
    #[must_use]
    pub fn create_table_sql(&self) -> String {
        self.create_table_sql_named(&self.name)
    }

    /// Same statement rendered under a different table name. The rebuild
    /// protocol uses this to create the temporary shadow table.
    #[must_use]
    pub fn create_table_sql_named(&self, name: &str) -> String {
        let mut definitions = self
            .columns
            .iter()
            .map(Column::render)
            .collect::<Vec<_>>();
        definitions.extend(self.constraints.iter().cloned());

        let mut sql = format!(
            "CREATE TABLE {} ({})",
            quote_ident(name),
            definitions.join(", ")
        );
        if self.without_rowid {
            sql.push_str(" WITHOUT ROWID");
        }
        sql
    }

    /// A copy of this definition with `columns` replaced and revalidated.
    /// The executor builds rebuild targets through this.
    pub fn with_columns(&self, columns: Vec<Column>) -> Result<Self, SchemaError> {
        let mut table = Self::new(self.name.clone(), columns, self.constraints.clone())?;
        table.without_rowid = self.without_rowid;
        Ok(table)
    }

    /// Name of the column SQLite treats as an alias of `rowid`, if any.
    #[must_use]
    pub fn integer_primary_key(&self) -> Option<&str> {
        self.columns
            .iter()
            .find(|column| column.is_primary_key() && column.sql_type() == "INTEGER")
            .map(Column::name)
    }
}
