use std::io;

use declite_core::{
    Column, DatabaseAdapter, DefaultValue, Error, IntrospectionError, OnDelete,
    PreconditionError, Result, Schema, SqlValue, Table,
};
use sqlparser::{
    ast::{
        ColumnDef, ColumnOption, CreateTable, Expr, ObjectName, ObjectNamePart,
        ReferentialAction, Statement, UnaryOperator, Value as AstValue,
    },
    dialect::SQLiteDialect,
    parser::Parser,
};

use crate::catalog;

/// Reads every user table out of `sqlite_master` and translates the stored
/// `CREATE TABLE` text into the schema model. Column order matches the
/// storage order.
pub fn introspect_schema(adapter: &mut dyn DatabaseAdapter) -> Result<Schema> {
    let rows = adapter.execute(catalog::TABLE_DEFINITIONS_QUERY, &[])?;

    let mut tables = Vec::with_capacity(rows.len());
    for row in rows {
        let [name, sql] = row.as_slice() else {
            continue;
        };
        let Some(name) = name.as_str() else {
            continue;
        };
        let Some(sql) = sql.as_str() else {
            return Err(IntrospectionError::MissingTableSql {
                table: name.to_string(),
            }
            .into());
        };
        tables.push(table_from_sql(name, sql)?);
    }

    Schema::new(tables).map_err(Error::from)
}

/// The current definition of one table, straight from the catalog.
pub fn live_table(adapter: &mut dyn DatabaseAdapter, table: &str) -> Result<Table> {
    let rows = adapter.execute(
        catalog::TABLE_DEFINITION_QUERY,
        &[(":name", SqlValue::Text(table.to_string()))],
    )?;
    let Some(row) = rows.into_iter().next() else {
        return Err(PreconditionError::NoSuchTable {
            table: table.to_string(),
        }
        .into());
    };
    let Some(sql) = row.first().and_then(SqlValue::as_str) else {
        return Err(IntrospectionError::MissingTableSql {
            table: table.to_string(),
        }
        .into());
    };
    table_from_sql(table, sql)
}

/// Parses one `CREATE TABLE` statement into a [`Table`]. `table` only labels
/// errors; the parsed statement supplies the real name.
pub fn table_from_sql(table: &str, sql: &str) -> Result<Table> {
    let statements = Parser::parse_sql(&SQLiteDialect {}, sql).map_err(|source| {
        Error::from(IntrospectionError::UnparsableTableSql {
            table: table.to_string(),
            source: Box::new(source),
        })
    })?;

    let Some(statement) = statements.into_iter().next() else {
        return Err(not_a_create_table(table));
    };
    match statement {
        Statement::CreateTable(create) => convert_create_table(&create),
        _ => Err(not_a_create_table(table)),
    }
}

/// Parses a whole schema file: one `CREATE TABLE` statement per declared
/// table, in declaration order. The CLI loads declared schemas through this.
pub fn schema_from_sql(sql: &str) -> Result<Schema> {
    let statements = Parser::parse_sql(&SQLiteDialect {}, sql).map_err(|source| {
        Error::from(IntrospectionError::UnparsableTableSql {
            table: "schema".to_string(),
            source: Box::new(source),
        })
    })?;

    let mut tables = Vec::with_capacity(statements.len());
    for (index, statement) in statements.into_iter().enumerate() {
        match statement {
            Statement::CreateTable(create) => tables.push(convert_create_table(&create)?),
            _ => return Err(not_a_create_table(&format!("statement {}", index + 1))),
        }
    }
    Schema::new(tables).map_err(Error::from)
}

/// Parses a single column definition fragment, e.g. `price DECIMAL NOT NULL`.
pub fn column_from_sql(fragment: &str) -> Result<Column> {
    let sql = format!("CREATE TABLE fragment_holder ({fragment})");
    let table = table_from_sql("fragment_holder", &sql)?;
    if table.columns().len() != 1 || !table.constraints().is_empty() {
        return Err(IntrospectionError::UnparsableTableSql {
            table: "fragment_holder".to_string(),
            source: Box::new(io::Error::other(
                "expected exactly one column definition",
            )),
        }
        .into());
    }
    Ok(table.columns()[0].clone())
}

fn not_a_create_table(table: &str) -> Error {
    IntrospectionError::NotACreateTable {
        table: table.to_string(),
    }
    .into()
}

fn convert_create_table(create: &CreateTable) -> Result<Table> {
    let name = object_name_text(&create.name);

    let mut constraints = Vec::new();
    for constraint in &create.constraints {
        constraints.push(constraint.to_string());
    }

    let mut columns = Vec::with_capacity(create.columns.len());
    for column_def in &create.columns {
        columns.push(convert_column(&name, column_def, &mut constraints)?);
    }

    let mut table = Table::new(name.clone(), columns, constraints).map_err(|source| {
        Error::from(IntrospectionError::ModelMismatch {
            table: name,
            source: Box::new(source),
        })
    })?;
    if create.without_rowid {
        table = table.without_rowid();
    }
    Ok(table)
}

fn convert_column(
    table: &str,
    column_def: &ColumnDef,
    constraints: &mut Vec<String>,
) -> Result<Column> {
    let name = column_def.name.value.clone();
    let mut builder = Column::new(name.clone(), column_def.data_type.to_string());

    for option_def in &column_def.options {
        match &option_def.option {
            ColumnOption::NotNull => builder = builder.required(),
            ColumnOption::Null => {}
            ColumnOption::Default(expr) => {
                builder = match default_from_expr(expr) {
                    DefaultValue::Value(value) => builder.default_value(value),
                    DefaultValue::Expression(raw) => builder.default_expression(raw),
                };
            }
            ColumnOption::Unique { is_primary, .. } => {
                builder = if *is_primary {
                    builder.primary_key()
                } else {
                    builder.unique()
                };
            }
            ColumnOption::ForeignKey {
                foreign_table,
                on_delete,
                ..
            } => {
                let action = on_delete
                    .as_ref()
                    .map_or(OnDelete::NoAction, convert_on_delete);
                builder = builder.references(object_name_text(foreign_table), action);
            }
            ColumnOption::Check(expr) => match choices_from_check(&name, expr) {
                Some(choices) => builder = builder.choices(choices),
                None => constraints.push(format!("CHECK ({expr})")),
            },
            // Collation and other engine-specific options sit outside the
            // column model.
            _ => {}
        }
    }

    builder.build().map_err(|source| {
        Error::from(IntrospectionError::ModelMismatch {
            table: table.to_string(),
            source: Box::new(source),
        })
    })
}

/// Recognizes `CHECK(col IN (<literal>, ...))` attached to `column`. Any
/// other shape is kept as an opaque table-level constraint by the caller.
fn choices_from_check(column: &str, expr: &Expr) -> Option<Vec<SqlValue>> {
    let Expr::InList {
        expr: target,
        list,
        negated: false,
    } = unwrap_nested(expr)
    else {
        return None;
    };
    let Expr::Identifier(ident) = unwrap_nested(target) else {
        return None;
    };
    if ident.value != column {
        return None;
    }

    let mut choices = Vec::with_capacity(list.len());
    for item in list {
        let value = literal_from_expr(item)?;
        if value.is_null() {
            return None;
        }
        choices.push(value);
    }
    Some(choices)
}

fn default_from_expr(expr: &Expr) -> DefaultValue {
    literal_from_expr(expr)
        .map(DefaultValue::Value)
        .unwrap_or_else(|| DefaultValue::Expression(expr.to_string()))
}

fn literal_from_expr(expr: &Expr) -> Option<SqlValue> {
    match expr {
        Expr::Value(value) => literal_from_value(&value.value),
        Expr::UnaryOp {
            op: UnaryOperator::Minus,
            expr,
        } => match literal_from_expr(expr)? {
            SqlValue::Integer(value) => Some(SqlValue::Integer(-value)),
            SqlValue::Real(value) => Some(SqlValue::Real(-value)),
            _ => None,
        },
        _ => None,
    }
}

fn literal_from_value(value: &AstValue) -> Option<SqlValue> {
    match value {
        AstValue::Number(text, _) => text
            .parse::<i64>()
            .map(SqlValue::Integer)
            .ok()
            .or_else(|| text.parse::<f64>().map(SqlValue::Real).ok()),
        AstValue::SingleQuotedString(text) => Some(SqlValue::Text(text.clone())),
        AstValue::Boolean(flag) => Some(SqlValue::Integer(i64::from(*flag))),
        AstValue::Null => Some(SqlValue::Null),
        _ => None,
    }
}

fn convert_on_delete(action: &ReferentialAction) -> OnDelete {
    match action {
        ReferentialAction::NoAction => OnDelete::NoAction,
        ReferentialAction::Restrict => OnDelete::Restrict,
        ReferentialAction::SetNull => OnDelete::SetNull,
        ReferentialAction::SetDefault => OnDelete::SetDefault,
        ReferentialAction::Cascade => OnDelete::Cascade,
    }
}

fn unwrap_nested(expr: &Expr) -> &Expr {
    match expr {
        Expr::Nested(inner) => unwrap_nested(inner),
        _ => expr,
    }
}

fn object_name_text(name: &ObjectName) -> String {
    match name.0.last() {
        Some(ObjectNamePart::Identifier(ident)) => ident.value.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}
