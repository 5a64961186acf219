use crate::model::{Column, Table};

/// Rename detection refused to pick a target for a dropped column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameAmbiguity {
    pub table: String,
    pub dropped: String,
    pub candidates: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub(super) enum RenameMatch {
    Rename { from: String, to: String },
    Ambiguous(RenameAmbiguity),
}

/// Pairs dropped live columns with added declared columns.
///
/// A pair (x, y) is a rename when:
/// - x's definition modulo name equals y's,
/// - x's index in the live table equals y's index in the declared table,
/// - x's name does not survive in the declared table, and
/// - x's definition modulo name is unique among the live table's columns.
///
/// The last rule is the tie-breaker the test suite pins: when another live
/// column shares x's shape, structural matching cannot tell a rename from a
/// drop-plus-add, so the pair is reported as ambiguous instead.
pub(super) fn match_renames(
    declared: &Table,
    live: &Table,
    dropped: &[&Column],
    added: &[&Column],
) -> Vec<RenameMatch> {
    let mut matches = Vec::new();

    for from in dropped.iter().copied() {
        if declared.column(from.name()).is_some() {
            continue;
        }
        let Some(live_index) = live.position_of(from.name()) else {
            continue;
        };

        let candidates = added
            .iter()
            .copied()
            .filter(|to| {
                from.equal_modulo_name(to) && declared.position_of(to.name()) == Some(live_index)
            })
            .collect::<Vec<_>>();
        if candidates.is_empty() {
            continue;
        }

        let shape_twins = live
            .columns()
            .iter()
            .filter(|other| other.name() != from.name() && other.equal_modulo_name(from))
            .count();

        if candidates.len() == 1 && shape_twins == 0 {
            matches.push(RenameMatch::Rename {
                from: from.name().to_string(),
                to: candidates[0].name().to_string(),
            });
        } else {
            matches.push(RenameMatch::Ambiguous(RenameAmbiguity {
                table: declared.name().to_string(),
                dropped: from.name().to_string(),
                candidates: candidates
                    .iter()
                    .map(|column| column.name().to_string())
                    .collect(),
            }));
        }
    }

    matches
}
