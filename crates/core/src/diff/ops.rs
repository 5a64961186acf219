use std::fmt;

use crate::model::{Column, Table};

/// One structural change transforming the live schema toward the declared
/// schema. Produced by the diff engine, consumed once by the executor.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    CreateTable(Table),
    DropTable {
        table: String,
    },
    AddColumn {
        table: String,
        column: Column,
    },
    DropColumn {
        table: String,
        column: String,
    },
    AlterColumn {
        table: String,
        column: String,
        new_column: Column,
    },
    RenameColumn {
        table: String,
        from: String,
        to: String,
    },
    ReorderColumns {
        table: String,
        order: Vec<String>,
    },
    /// Never inferred by the diff engine; produced only on explicit request.
    RenameTable {
        from: String,
        to: String,
    },
}

impl Operation {
    /// The table this operation targets (the old name for renames).
    #[must_use]
    pub fn table_name(&self) -> &str {
        match self {
            Self::CreateTable(table) => table.name(),
            Self::DropTable { table }
            | Self::AddColumn { table, .. }
            | Self::DropColumn { table, .. }
            | Self::AlterColumn { table, .. }
            | Self::RenameColumn { table, .. }
            | Self::ReorderColumns { table, .. } => table,
            Self::RenameTable { from, .. } => from,
        }
    }

    #[must_use]
    pub fn tag(&self) -> &'static str {
        match self {
            Self::CreateTable(_) => "CreateTable",
            Self::DropTable { .. } => "DropTable",
            Self::AddColumn { .. } => "AddColumn",
            Self::DropColumn { .. } => "DropColumn",
            Self::AlterColumn { .. } => "AlterColumn",
            Self::RenameColumn { .. } => "RenameColumn",
            Self::ReorderColumns { .. } => "ReorderColumns",
            Self::RenameTable { .. } => "RenameTable",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateTable(table) => write!(f, "create table `{}`", table.name()),
            Self::DropTable { table } => write!(f, "drop table `{table}`"),
            Self::AddColumn { table, column } => {
                write!(f, "add column `{}` to `{table}`", column.name())
            }
            Self::DropColumn { table, column } => {
                write!(f, "drop column `{column}` from `{table}`")
            }
            Self::AlterColumn { table, column, .. } => {
                write!(f, "alter column `{column}` of `{table}`")
            }
            Self::RenameColumn { table, from, to } => {
                write!(f, "rename column `{from}` of `{table}` to `{to}`")
            }
            Self::ReorderColumns { table, order } => {
                write!(f, "reorder columns of `{table}` to [{}]", order.join(", "))
            }
            Self::RenameTable { from, to } => write!(f, "rename table `{from}` to `{to}`"),
        }
    }
}
