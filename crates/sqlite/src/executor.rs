use declite_core::{
    Column, DatabaseAdapter, DefaultValue, ExecutionError, FkViolation, IntegrityError, Operation,
    PreconditionError, Result, SchemaError, SqlValue, Table, is_valid_identifier, quote_ident,
};
use tracing::{debug, info};

use crate::{catalog, introspect};

const TMP_SUFFIX: &str = "_declite_tmp";
const FOREIGN_KEYS_PRAGMA: &str = "foreign_keys";
const LEGACY_ALTER_TABLE_PRAGMA: &str = "legacy_alter_table";

/// Applies one operation list atomically.
///
/// Foreign-key enforcement is recorded and switched off for the duration
/// (the pragma is a no-op inside a transaction, so any in-flight transaction
/// is committed first), the whole list runs inside one transaction, and
/// after commit the pragma is restored and `PRAGMA foreign_key_check` must
/// come back empty. Any failure before commit rolls everything back.
pub fn apply_operations(
    adapter: &mut dyn DatabaseAdapter,
    operations: &[Operation],
) -> Result<()> {
    let enforce = foreign_keys_enabled(adapter)?;
    if adapter.in_transaction() {
        adapter.commit()?;
    }
    adapter.pragma(FOREIGN_KEYS_PRAGMA, Some("OFF"))?;

    let outcome = run_in_transaction(adapter, operations);
    let restored = adapter.pragma(
        FOREIGN_KEYS_PRAGMA,
        Some(if enforce { "ON" } else { "OFF" }),
    );
    outcome?;
    restored?;

    let violations = foreign_key_violations(adapter)?;
    if !violations.is_empty() {
        return Err(IntegrityError { violations }.into());
    }
    Ok(())
}

fn run_in_transaction(adapter: &mut dyn DatabaseAdapter, operations: &[Operation]) -> Result<()> {
    adapter.begin()?;
    for (applied, operation) in operations.iter().enumerate() {
        info!(operation = %operation, "applying");
        if let Err(source) = apply_operation(adapter, operation) {
            let _ = adapter.rollback();
            return Err(ExecutionError::Operation {
                operation: operation.to_string(),
                applied,
                source: Box::new(source),
            }
            .into());
        }
    }
    adapter.commit()
}

fn apply_operation(adapter: &mut dyn DatabaseAdapter, operation: &Operation) -> Result<()> {
    match operation {
        Operation::CreateTable(table) => run(adapter, &table.create_table_sql()),
        Operation::DropTable { table } => {
            ensure_table_exists(adapter, table)?;
            run(adapter, &format!("DROP TABLE {}", quote_ident(table)))
        }
        Operation::AddColumn { table, column } => {
            if add_column_in_place(column) {
                run(
                    adapter,
                    &format!(
                        "ALTER TABLE {} ADD COLUMN {}",
                        quote_ident(table),
                        column.render()
                    ),
                )
            } else {
                rebuild(adapter, table, operation)
            }
        }
        Operation::DropColumn { table, .. }
        | Operation::AlterColumn { table, .. }
        | Operation::ReorderColumns { table, .. } => rebuild(adapter, table, operation),
        Operation::RenameColumn { table, from, to } => rename_column(adapter, table, from, to),
        Operation::RenameTable { from, to } => rename_table(adapter, from, to),
    }
}

/// The SQLite table-rebuild procedure: create the target definition under a
/// temporary name, copy the surviving data, swap the tables, and replay the
/// index and trigger DDL captured from the catalog.
fn rebuild(adapter: &mut dyn DatabaseAdapter, table: &str, operation: &Operation) -> Result<()> {
    let live = introspect::live_table(adapter, table)?;
    let target = rebuild_target(&live, operation)?;

    let tmp = format!("{table}{TMP_SUFFIX}");
    if object_exists(adapter, &tmp)? {
        return Err(PreconditionError::TempTableExists { name: tmp }.into());
    }
    let preserved = preserved_object_sql(adapter, table)?;

    run(adapter, &target.create_table_sql_named(&tmp))?;
    run(adapter, &copy_sql(table, &tmp, &live, &target, operation))?;
    run(adapter, &format!("DROP TABLE {}", quote_ident(table)))?;

    // Without the legacy behavior, RENAME TO would try to rewrite references
    // in the rest of the schema while the original table is gone.
    adapter.pragma(LEGACY_ALTER_TABLE_PRAGMA, Some("ON"))?;
    let renamed = run(
        adapter,
        &format!(
            "ALTER TABLE {} RENAME TO {}",
            quote_ident(&tmp),
            quote_ident(table)
        ),
    );
    adapter.pragma(LEGACY_ALTER_TABLE_PRAGMA, Some("OFF"))?;
    renamed?;

    for sql in preserved {
        run(adapter, &sql)?;
    }
    Ok(())
}

/// The table definition after `operation`, derived from the live definition.
fn rebuild_target(live: &Table, operation: &Operation) -> Result<Table> {
    let columns = match operation {
        Operation::AddColumn { column, .. } => {
            let mut columns = live.columns().to_vec();
            columns.push(column.clone());
            columns
        }
        Operation::DropColumn { table, column } => {
            let position = live.position_of(column).ok_or_else(|| {
                PreconditionError::NoSuchColumn {
                    table: table.clone(),
                    column: column.clone(),
                }
            })?;
            let mut columns = live.columns().to_vec();
            columns.remove(position);
            columns
        }
        Operation::AlterColumn {
            table,
            column,
            new_column,
        } => {
            let position = live.position_of(column).ok_or_else(|| {
                PreconditionError::NoSuchColumn {
                    table: table.clone(),
                    column: column.clone(),
                }
            })?;
            let mut columns = live.columns().to_vec();
            columns[position] = new_column.clone();
            columns
        }
        Operation::ReorderColumns { table, order } => {
            if order.len() != live.columns().len() {
                return Err(PreconditionError::ReorderMismatch {
                    table: table.clone(),
                }
                .into());
            }
            let mut columns = Vec::with_capacity(order.len());
            for name in order {
                let column = live.column(name).ok_or_else(|| {
                    PreconditionError::ReorderMismatch {
                        table: table.clone(),
                    }
                })?;
                columns.push(column.clone());
            }
            columns
        }
        _ => unreachable!("operation does not require a table rebuild"),
    };
    live.with_columns(columns).map_err(Into::into)
}

/// Copies every column that exists on both sides, aligned by name in the
/// target's order. A column new in the target is left to its default, except
/// that a required column without one is backfilled with the zero value of
/// its affinity so existing rows survive; columns gone from the target are
/// dropped with the old table.
fn copy_sql(table: &str, tmp: &str, live: &Table, target: &Table, operation: &Operation) -> String {
    let mut insert_list = target
        .columns()
        .iter()
        .map(Column::name)
        .filter(|name| live.column(name).is_some())
        .map(quote_ident)
        .collect::<Vec<_>>();
    let mut select_list = insert_list.clone();

    if let Operation::AddColumn { column, .. } = operation
        && column.is_required()
        && column.default().is_none()
    {
        insert_list.push(quote_ident(column.name()));
        select_list.push(zero_literal(column.sql_type()).to_string());
    }

    format!(
        "INSERT INTO {} ({}) SELECT {} FROM {}",
        quote_ident(tmp),
        insert_list.join(", "),
        select_list.join(", "),
        quote_ident(table)
    )
}

fn zero_literal(sql_type: &str) -> &'static str {
    let canonical = sql_type.to_ascii_lowercase();
    if canonical.contains("int") {
        "0"
    } else if canonical.contains("real") || canonical.contains("floa") || canonical.contains("doub")
    {
        "0.0"
    } else if canonical.contains("blob") {
        "X''"
    } else if canonical.contains("char") || canonical.contains("clob") || canonical.contains("text")
    {
        "''"
    } else {
        "0"
    }
}

/// In-place `ALTER TABLE ADD COLUMN` eligibility. Everything else goes
/// through the rebuild.
fn add_column_in_place(column: &Column) -> bool {
    if column.is_primary_key() || column.is_unique() {
        return false;
    }
    let default_ok = match column.default() {
        None | Some(DefaultValue::Value(_)) => true,
        Some(DefaultValue::Expression(_)) => false,
    };
    if !default_ok {
        return false;
    }
    if column.is_required()
        && !matches!(column.default(), Some(DefaultValue::Value(value)) if !value.is_null())
    {
        return false;
    }
    if column.foreign_key().is_some()
        && !matches!(
            column.default(),
            None | Some(DefaultValue::Value(SqlValue::Null))
        )
    {
        return false;
    }
    true
}

fn rename_column(
    adapter: &mut dyn DatabaseAdapter,
    table: &str,
    from: &str,
    to: &str,
) -> Result<()> {
    let live = introspect::live_table(adapter, table)?;
    if live.column(from).is_none() {
        return Err(PreconditionError::NoSuchColumn {
            table: table.to_string(),
            column: from.to_string(),
        }
        .into());
    }
    if live.column(to).is_some() {
        return Err(PreconditionError::RenameTargetExists {
            from: from.to_string(),
            to: to.to_string(),
        }
        .into());
    }
    if !is_valid_identifier(to) {
        return Err(SchemaError::InvalidIdentifier {
            identifier: to.to_string(),
        }
        .into());
    }
    run(
        adapter,
        &format!(
            "ALTER TABLE {} RENAME COLUMN {} TO {}",
            quote_ident(table),
            quote_ident(from),
            quote_ident(to)
        ),
    )
}

fn rename_table(adapter: &mut dyn DatabaseAdapter, from: &str, to: &str) -> Result<()> {
    ensure_table_exists(adapter, from)?;
    if object_exists(adapter, to)? {
        return Err(PreconditionError::RenameTargetExists {
            from: from.to_string(),
            to: to.to_string(),
        }
        .into());
    }
    if !is_valid_identifier(to) {
        return Err(SchemaError::InvalidIdentifier {
            identifier: to.to_string(),
        }
        .into());
    }
    run(
        adapter,
        &format!(
            "ALTER TABLE {} RENAME TO {}",
            quote_ident(from),
            quote_ident(to)
        ),
    )
}

fn ensure_table_exists(adapter: &mut dyn DatabaseAdapter, table: &str) -> Result<()> {
    let rows = adapter.execute(
        catalog::TABLE_DEFINITION_QUERY,
        &[(":name", SqlValue::Text(table.to_string()))],
    )?;
    if rows.is_empty() {
        return Err(PreconditionError::NoSuchTable {
            table: table.to_string(),
        }
        .into());
    }
    Ok(())
}

fn object_exists(adapter: &mut dyn DatabaseAdapter, name: &str) -> Result<bool> {
    let rows = adapter.execute(
        catalog::OBJECT_EXISTS_QUERY,
        &[(":name", SqlValue::Text(name.to_string()))],
    )?;
    Ok(!rows.is_empty())
}

fn preserved_object_sql(adapter: &mut dyn DatabaseAdapter, table: &str) -> Result<Vec<String>> {
    let rows = adapter.execute(
        catalog::TABLE_INDEX_TRIGGER_QUERY,
        &[(":name", SqlValue::Text(table.to_string()))],
    )?;
    Ok(rows
        .into_iter()
        .filter_map(|row| match row.into_iter().next() {
            Some(SqlValue::Text(sql)) => Some(sql),
            _ => None,
        })
        .collect())
}

fn foreign_keys_enabled(adapter: &mut dyn DatabaseAdapter) -> Result<bool> {
    let value = adapter.pragma(FOREIGN_KEYS_PRAGMA, None)?;
    Ok(value.and_then(|value| value.as_integer()).unwrap_or(0) != 0)
}

/// Rows reported by `PRAGMA foreign_key_check`, as (table, rowid, parent).
pub fn foreign_key_violations(adapter: &mut dyn DatabaseAdapter) -> Result<Vec<FkViolation>> {
    let rows = adapter.execute(catalog::FOREIGN_KEY_CHECK_QUERY, &[])?;
    Ok(rows
        .into_iter()
        .filter_map(|row| {
            let table = row.first().and_then(SqlValue::as_str)?.to_string();
            let rowid = row.get(1).and_then(SqlValue::as_integer);
            let parent = row.get(2).and_then(SqlValue::as_str)?.to_string();
            Some(FkViolation {
                table,
                rowid,
                parent,
            })
        })
        .collect())
}

fn run(adapter: &mut dyn DatabaseAdapter, sql: &str) -> Result<()> {
    debug!(sql, "executing");
    adapter.execute(sql, &[]).map(|_| ())
}
