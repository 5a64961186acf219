use std::collections::BTreeSet;

use crate::{SchemaError, model::table::Table};

/// Ordered collection of tables. Table order is significant for creation
/// (referenced tables must exist before referencing tables when foreign-key
/// enforcement is on) but not for diffing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Schema {
    tables: Vec<Table>,
}

impl Schema {
    pub fn new(tables: Vec<Table>) -> Result<Self, SchemaError> {
        let mut seen = BTreeSet::new();
        for table in &tables {
            if !seen.insert(table.name().to_string()) {
                return Err(SchemaError::DuplicateTable {
                    table: table.name().to_string(),
                });
            }
        }

        // A column referencing a table keyed by an auto-integer primary key
        // holds rowid values, so it must itself be INTEGER.
        for table in &tables {
            for column in table.columns() {
                if let Some(foreign_key) = column.foreign_key()
                    && let Some(target) = tables.iter().find(|t| t.name() == foreign_key.table)
                    && target.integer_primary_key().is_some()
                    && column.sql_type() != "INTEGER"
                {
                    return Err(SchemaError::ForeignKeyTypeMismatch {
                        table: table.name().to_string(),
                        column: column.name().to_string(),
                    });
                }
            }
        }

        Ok(Self { tables })
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|table| table.name() == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(Table::name)
    }

    #[must_use]
    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Table> {
        self.tables.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl<'a> IntoIterator for &'a Schema {
    type Item = &'a Table;
    type IntoIter = std::slice::Iter<'a, Table>;

    fn into_iter(self) -> Self::IntoIter {
        self.tables.iter()
    }
}
