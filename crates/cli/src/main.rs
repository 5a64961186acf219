mod error_presentation;

use std::{
    fs,
    path::{Path, PathBuf},
    process::ExitCode,
};

use clap::{Parser, Subcommand};
use declite_core::{DiffOptions, Operation};
use declite_sqlite::{Database, DatabaseOptions, column_from_sql, schema_from_sql, table_from_sql};
use error_presentation::{CliError, CliResult, exit_code, render_runtime_error};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "declite",
    about = "Declarative schema management for SQLite",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Diff a schema file of CREATE TABLE statements against the database.
    Migrate {
        db: PathBuf,
        schema: PathBuf,
        /// Disable rename detection.
        #[arg(long)]
        no_rename: bool,
        /// Fail on ambiguous rename candidates instead of warning.
        #[arg(long)]
        strict: bool,
        /// Apply the printed operations instead of only printing them.
        #[arg(long)]
        write: bool,
    },
    /// Add one column, e.g. `declite add-column app.db users "age INTEGER"`.
    AddColumn {
        db: PathBuf,
        table: String,
        column_def: String,
    },
    DropColumn {
        db: PathBuf,
        table: String,
        column: String,
    },
    RenameColumn {
        db: PathBuf,
        table: String,
        old: String,
        new: String,
    },
    RenameTable {
        db: PathBuf,
        old: String,
        new: String,
    },
    /// Replace one column's definition, keeping its name.
    AlterColumn {
        db: PathBuf,
        table: String,
        column_def: String,
    },
    CreateTable {
        db: PathBuf,
        sql: String,
    },
    DropTable {
        db: PathBuf,
        table: String,
    },
    ReorderColumns {
        db: PathBuf,
        table: String,
        #[arg(required = true)]
        columns: Vec<String>,
    },
    /// Print the live schema as canonical CREATE TABLE statements.
    Export {
        db: PathBuf,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{}", render_runtime_error(&error));
            ExitCode::from(exit_code(&error) as u8)
        }
    }
}

fn run(command: Command) -> CliResult<()> {
    match command {
        Command::Migrate {
            db,
            schema,
            no_rename,
            strict,
            write,
        } => migrate(&db, &schema, no_rename, strict, write),
        Command::AddColumn {
            db,
            table,
            column_def,
        } => {
            let column = column_from_sql(&column_def)?;
            apply_single(&db, Operation::AddColumn { table, column })
        }
        Command::DropColumn { db, table, column } => {
            apply_single(&db, Operation::DropColumn { table, column })
        }
        Command::RenameColumn {
            db,
            table,
            old,
            new,
        } => apply_single(
            &db,
            Operation::RenameColumn {
                table,
                from: old,
                to: new,
            },
        ),
        Command::RenameTable { db, old, new } => {
            apply_single(&db, Operation::RenameTable { from: old, to: new })
        }
        Command::AlterColumn {
            db,
            table,
            column_def,
        } => {
            let column = column_from_sql(&column_def)?;
            apply_single(
                &db,
                Operation::AlterColumn {
                    table,
                    column: column.name().to_string(),
                    new_column: column,
                },
            )
        }
        Command::CreateTable { db, sql } => {
            let table = table_from_sql("create-table argument", &sql)?;
            apply_single(&db, Operation::CreateTable(table))
        }
        Command::DropTable { db, table } => apply_single(&db, Operation::DropTable { table }),
        Command::ReorderColumns { db, table, columns } => apply_single(
            &db,
            Operation::ReorderColumns {
                table,
                order: columns,
            },
        ),
        Command::Export { db } => export(&db),
    }
}

fn migrate(
    db_path: &Path,
    schema_path: &Path,
    no_rename: bool,
    strict: bool,
    write: bool,
) -> CliResult<()> {
    let schema_sql = fs::read_to_string(schema_path).map_err(|source| CliError::ReadFile {
        path: schema_path.to_path_buf(),
        source,
    })?;
    let declared = schema_from_sql(&schema_sql)?;

    let mut db = Database::open(db_path, DatabaseOptions::default())?;
    let options = DiffOptions {
        detect_renaming: !no_rename,
        strict,
    };
    let operations = db.diff(&declared, &options)?;

    if operations.is_empty() {
        println!("schema is up to date");
    } else {
        for operation in &operations {
            println!("{operation}");
        }
        if write {
            db.apply_diff(&operations)?;
            println!("applied {} operation(s)", operations.len());
        } else {
            println!("re-run with --write to apply");
        }
    }
    db.close()?;
    Ok(())
}

fn apply_single(db_path: &Path, operation: Operation) -> CliResult<()> {
    let mut db = Database::open(db_path, DatabaseOptions::default())?;
    println!("{operation}");
    db.apply_diff(std::slice::from_ref(&operation))?;
    db.close()?;
    Ok(())
}

fn export(db_path: &Path) -> CliResult<()> {
    let mut db = Database::open(db_path, DatabaseOptions::default())?;
    let live = db.introspect()?;
    for table in &live {
        println!("{};", table.create_table_sql());
    }
    db.close()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrate_flags_parse() {
        let cli = Cli::try_parse_from([
            "declite",
            "migrate",
            "app.db",
            "schema.sql",
            "--no-rename",
            "--write",
        ])
        .expect("arguments should parse");
        match cli.command {
            Command::Migrate {
                no_rename,
                strict,
                write,
                ..
            } => {
                assert!(no_rename);
                assert!(!strict);
                assert!(write);
            }
            other => panic!("expected migrate, got {other:?}"),
        }
    }

    #[test]
    fn reorder_columns_requires_at_least_one_column() {
        assert!(Cli::try_parse_from(["declite", "reorder-columns", "app.db", "t"]).is_err());

        let cli = Cli::try_parse_from(["declite", "reorder-columns", "app.db", "t", "a", "b"])
            .expect("arguments should parse");
        match cli.command {
            Command::ReorderColumns { columns, .. } => assert_eq!(columns, ["a", "b"]),
            other => panic!("expected reorder-columns, got {other:?}"),
        }
    }

    #[test]
    fn single_operation_commands_map_one_to_one() {
        let cli = Cli::try_parse_from([
            "declite",
            "rename-column",
            "app.db",
            "users",
            "name",
            "full_name",
        ])
        .expect("arguments should parse");
        match cli.command {
            Command::RenameColumn {
                table, old, new, ..
            } => {
                assert_eq!(table, "users");
                assert_eq!(old, "name");
                assert_eq!(new, "full_name");
            }
            other => panic!("expected rename-column, got {other:?}"),
        }
    }
}
