use crate::{
    DiffError,
    diff::{
        ops::Operation,
        rename::{RenameAmbiguity, RenameMatch, match_renames},
    },
    model::{Schema, Table},
};

/// Diff behavior knobs. `strict` turns rename ambiguities from diagnostics
/// into hard errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffOptions {
    pub detect_renaming: bool,
    pub strict: bool,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            detect_renaming: true,
            strict: false,
        }
    }
}

/// Ordered operations plus the ambiguities rename detection refused to
/// resolve. Callers surface the ambiguities as warnings.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DiffOutcome {
    pub ops: Vec<Operation>,
    pub ambiguities: Vec<RenameAmbiguity>,
}

/// Pure schema comparison: no database access, identical inputs produce
/// identical outputs. Operation order is `CreateTable` first (declared
/// order), then per-table modifications, then `DropTable` last.
pub fn diff_schemas(
    declared: &Schema,
    live: &Schema,
    options: &DiffOptions,
) -> Result<DiffOutcome, DiffError> {
    let mut outcome = DiffOutcome::default();
    let mut modifications = Vec::new();

    for table in declared {
        match live.get(table.name()) {
            None => outcome.ops.push(Operation::CreateTable(table.clone())),
            Some(live_table) => {
                modifications.extend(diff_table(table, live_table, options, &mut outcome)?);
            }
        }
    }

    outcome.ops.append(&mut modifications);

    for live_table in live {
        if declared.get(live_table.name()).is_none() {
            outcome.ops.push(Operation::DropTable {
                table: live_table.name().to_string(),
            });
        }
    }

    Ok(outcome)
}

/// Per-table diff. Emitted order within the table is fixed:
/// AlterColumn, RenameColumn, DropColumn, AddColumn, ReorderColumns.
fn diff_table(
    declared: &Table,
    live: &Table,
    options: &DiffOptions,
    outcome: &mut DiffOutcome,
) -> Result<Vec<Operation>, DiffError> {
    let table = declared.name().to_string();
    let mut ops = Vec::new();

    for column in declared.columns() {
        if let Some(live_column) = live.column(column.name())
            && live_column != column
        {
            ops.push(Operation::AlterColumn {
                table: table.clone(),
                column: column.name().to_string(),
                new_column: column.clone(),
            });
        }
    }

    let mut dropped = live
        .columns()
        .iter()
        .filter(|column| declared.column(column.name()).is_none())
        .collect::<Vec<_>>();
    let mut added = declared
        .columns()
        .iter()
        .filter(|column| live.column(column.name()).is_none())
        .collect::<Vec<_>>();

    let mut renames = Vec::new();
    if options.detect_renaming {
        let matches = match_renames(declared, live, &dropped, &added);
        for matched in matches {
            match matched {
                RenameMatch::Rename { from, to } => {
                    dropped.retain(|column| column.name() != from);
                    added.retain(|column| column.name() != to);
                    renames.push(Operation::RenameColumn {
                        table: table.clone(),
                        from,
                        to,
                    });
                }
                RenameMatch::Ambiguous(ambiguity) => {
                    if options.strict {
                        return Err(DiffError::AmbiguousRename {
                            table: ambiguity.table,
                            column: ambiguity.dropped,
                            candidates: ambiguity.candidates,
                        });
                    }
                    outcome.ambiguities.push(ambiguity);
                }
            }
        }
    }
    ops.append(&mut renames);

    for column in &dropped {
        ops.push(Operation::DropColumn {
            table: table.clone(),
            column: column.name().to_string(),
        });
    }
    for column in &added {
        ops.push(Operation::AddColumn {
            table: table.clone(),
            column: (*column).clone(),
        });
    }

    if let Some(order) = reorder_after(declared, live, &ops) {
        ops.push(Operation::ReorderColumns { table, order });
    }

    Ok(ops)
}

/// Applies the emitted operations to the live column order in imagination;
/// if the result still differs from the declared order, a reorder is needed.
fn reorder_after(declared: &Table, live: &Table, ops: &[Operation]) -> Option<Vec<String>> {
    let mut simulated = live
        .column_names()
        .map(str::to_string)
        .collect::<Vec<_>>();

    for op in ops {
        match op {
            Operation::RenameColumn { from, to, .. } => {
                if let Some(slot) = simulated.iter_mut().find(|name| name.as_str() == from) {
                    *slot = to.clone();
                }
            }
            Operation::DropColumn { column, .. } => {
                simulated.retain(|name| name != column);
            }
            Operation::AddColumn { column, .. } => {
                simulated.push(column.name().to_string());
            }
            _ => {}
        }
    }

    let declared_order = declared
        .column_names()
        .map(str::to_string)
        .collect::<Vec<_>>();
    (simulated != declared_order).then_some(declared_order)
}
