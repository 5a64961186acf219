use std::fmt::Write as _;

use crate::{
    SchemaError, SqlValue,
    value::{canonical_sql_type, is_valid_identifier, quote_ident},
};

/// Referential action applied when the referenced row is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnDelete {
    #[default]
    NoAction,
    Restrict,
    SetNull,
    SetDefault,
    Cascade,
}

impl OnDelete {
    #[must_use]
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::NoAction => "NO ACTION",
            Self::Restrict => "RESTRICT",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
            Self::Cascade => "CASCADE",
        }
    }
}

/// Column-level reference to another table. The referenced table is held by
/// name; the relationship graph is resolved by SQLite at execution time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub table: String,
    pub on_delete: OnDelete,
}

/// A column default: either a constant literal or a raw SQL expression
/// (e.g. `(datetime('now'))`). Only constant defaults are eligible for
/// in-place `ALTER TABLE ADD COLUMN`.
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    Value(SqlValue),
    Expression(String),
}

impl DefaultValue {
    #[must_use]
    pub fn as_sql(&self) -> String {
        match self {
            Self::Value(value) => value.to_literal(),
            Self::Expression(raw) => raw.trim().to_string(),
        }
    }

    #[must_use]
    pub fn is_constant(&self) -> bool {
        matches!(self, Self::Value(_))
    }
}

/// A single column declaration. Immutable once built; construct through
/// [`Column::new`] and the chained setters on [`ColumnBuilder`].
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    sql_type: String,
    required: bool,
    choices: Option<Vec<SqlValue>>,
    default: Option<DefaultValue>,
    unique: bool,
    primary_key: bool,
    foreign_key: Option<ForeignKey>,
}

impl Column {
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> ColumnBuilder {
        ColumnBuilder {
            name: name.into(),
            sql_type: canonical_sql_type(&sql_type.into()),
            required: false,
            choices: None,
            default: None,
            unique: false,
            primary_key: false,
            foreign_key: None,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn sql_type(&self) -> &str {
        &self.sql_type
    }

    #[must_use]
    pub fn is_required(&self) -> bool {
        self.required
    }

    #[must_use]
    pub fn choices(&self) -> Option<&[SqlValue]> {
        self.choices.as_deref()
    }

    #[must_use]
    pub fn default(&self) -> Option<&DefaultValue> {
        self.default.as_ref()
    }

    #[must_use]
    pub fn is_unique(&self) -> bool {
        self.unique
    }

    #[must_use]
    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    #[must_use]
    pub fn foreign_key(&self) -> Option<&ForeignKey> {
        self.foreign_key.as_ref()
    }

    /// True when every attribute other than the name is equal. This is the
    /// structural comparison rename detection runs on.
    #[must_use]
    pub fn equal_modulo_name(&self, other: &Column) -> bool {
        self.sql_type == other.sql_type
            && self.required == other.required
            && self.choices == other.choices
            && self.default == other.default
            && self.unique == other.unique
            && self.primary_key == other.primary_key
            && self.foreign_key == other.foreign_key
    }

    /// A copy of this column under a different (validated) name.
    pub fn renamed(&self, name: impl Into<String>) -> Result<Column, SchemaError> {
        let name = name.into();
        if !is_valid_identifier(&name) {
            return Err(SchemaError::InvalidIdentifier { identifier: name });
        }
        let mut column = self.clone();
        column.name = name;
        Ok(column)
    }

    /// Canonical column fragment, clause order fixed:
    /// name, type, NOT NULL, DEFAULT, UNIQUE, PRIMARY KEY, REFERENCES, CHECK.
    #[must_use]
    pub fn render(&self) -> String {
        let mut sql = format!("{} {}", quote_ident(&self.name), self.sql_type);

        if self.required {
            sql.push_str(" NOT NULL");
        }
        if let Some(default) = &self.default {
            write!(sql, " DEFAULT {}", default.as_sql())
                .expect("writing to String should not fail");
        }
        if self.unique {
            sql.push_str(" UNIQUE");
        }
        if self.primary_key {
            sql.push_str(" PRIMARY KEY");
        }
        if let Some(foreign_key) = &self.foreign_key {
            write!(
                sql,
                " REFERENCES {} ON DELETE {}",
                quote_ident(&foreign_key.table),
                foreign_key.on_delete.as_sql()
            )
            .expect("writing to String should not fail");
        }
        if let Some(choices) = &self.choices {
            let values = choices
                .iter()
                .map(SqlValue::to_literal)
                .collect::<Vec<_>>()
                .join(", ");
            write!(sql, " CHECK({} IN ({values}))", quote_ident(&self.name))
                .expect("writing to String should not fail");
        }

        sql
    }
}

#[derive(Debug, Clone)]
pub struct ColumnBuilder {
    name: String,
    sql_type: String,
    required: bool,
    choices: Option<Vec<SqlValue>>,
    default: Option<DefaultValue>,
    unique: bool,
    primary_key: bool,
    foreign_key: Option<ForeignKey>,
}

impl ColumnBuilder {
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    #[must_use]
    pub fn default_value(mut self, value: SqlValue) -> Self {
        self.default = Some(DefaultValue::Value(value));
        self
    }

    #[must_use]
    pub fn default_expression(mut self, raw: impl Into<String>) -> Self {
        self.default = Some(DefaultValue::Expression(raw.into()));
        self
    }

    #[must_use]
    pub fn choices(mut self, values: impl IntoIterator<Item = SqlValue>) -> Self {
        self.choices = Some(values.into_iter().collect());
        self
    }

    #[must_use]
    pub fn references(mut self, table: impl Into<String>, on_delete: OnDelete) -> Self {
        self.foreign_key = Some(ForeignKey {
            table: table.into(),
            on_delete,
        });
        self
    }

    pub fn build(self) -> Result<Column, SchemaError> {
        if !is_valid_identifier(&self.name) {
            return Err(SchemaError::InvalidIdentifier {
                identifier: self.name,
            });
        }
        if let Some(foreign_key) = &self.foreign_key {
            if self.primary_key {
                return Err(SchemaError::PrimaryKeyForeignKeyConflict {
                    column: self.name.clone(),
                });
            }
            if !is_valid_identifier(&foreign_key.table) {
                return Err(SchemaError::InvalidIdentifier {
                    identifier: foreign_key.table.clone(),
                });
            }
        }
        if let Some(choices) = &self.choices {
            for value in choices {
                if !choice_compatible(&self.sql_type, value) {
                    return Err(SchemaError::ChoiceTypeMismatch {
                        column: self.name.clone(),
                        sql_type: self.sql_type.clone(),
                    });
                }
            }
        }

        Ok(Column {
            name: self.name,
            sql_type: self.sql_type,
            required: self.required,
            choices: self.choices,
            default: self.default,
            unique: self.unique,
            primary_key: self.primary_key,
            foreign_key: self.foreign_key,
        })
    }
}

// Affinity buckets follow SQLite's type-affinity rules closely enough to
// reject nonsense like text choices on an INTEGER column.
fn choice_compatible(sql_type: &str, value: &SqlValue) -> bool {
    let canonical = sql_type.to_ascii_lowercase();
    match value {
        SqlValue::Null | SqlValue::Blob(_) => false,
        SqlValue::Integer(_) => !is_text_affinity(&canonical),
        SqlValue::Real(_) => !is_text_affinity(&canonical) && !is_integer_affinity(&canonical),
        SqlValue::Text(_) => !is_integer_affinity(&canonical) && !is_real_affinity(&canonical),
    }
}

fn is_integer_affinity(canonical: &str) -> bool {
    canonical.contains("int")
}

fn is_text_affinity(canonical: &str) -> bool {
    canonical.contains("char") || canonical.contains("clob") || canonical.contains("text")
}

fn is_real_affinity(canonical: &str) -> bool {
    canonical.contains("real") || canonical.contains("floa") || canonical.contains("doub")
}
