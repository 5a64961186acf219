use std::{io, path::PathBuf};

use anyhow::Context;
use declite_core::{Error as CoreError, ExecutionError};
use miette::Report;

pub(crate) const EXIT_USER_ERROR: i32 = 1;
pub(crate) const EXIT_MIGRATION_ABORTED: i32 = 2;
pub(crate) const EXIT_INTEGRITY_FAILURE: i32 = 3;

const MIGRATION_CONTEXT: &str = "while migrating the database";
const FILE_READ_CONTEXT: &str = "while reading the schema file";

pub(crate) type CliResult<T> = std::result::Result<T, CliError>;

#[derive(Debug)]
pub(crate) enum CliError {
    ReadFile { path: PathBuf, source: io::Error },
    Core(CoreError),
}

impl From<CoreError> for CliError {
    fn from(value: CoreError) -> Self {
        Self::Core(value)
    }
}

pub(crate) fn render_runtime_error(error: &CliError) -> String {
    match error {
        CliError::ReadFile { path, source } => {
            let context = format!("{FILE_READ_CONTEXT} `{}`", path.display());
            let report = report_with_context(io::Error::new(source.kind(), source.to_string()), context);
            format!("[io] {report}")
        }
        CliError::Core(source) => {
            let category = core_category(source);
            format!("[{category}] {}", render_core_chain(source))
        }
    }
}

/// Exit codes: 1 for user errors raised before any mutation, 2 for an
/// aborted migration, 3 for a post-commit integrity failure.
pub(crate) fn exit_code(error: &CliError) -> i32 {
    match error {
        CliError::ReadFile { .. } => EXIT_USER_ERROR,
        CliError::Core(source) => core_exit_code(source),
    }
}

fn core_exit_code(error: &CoreError) -> i32 {
    match error {
        CoreError::Schema(_)
        | CoreError::Diff(_)
        | CoreError::Precondition(_)
        | CoreError::Introspection(_) => EXIT_USER_ERROR,
        CoreError::Integrity(_) => EXIT_INTEGRITY_FAILURE,
        // An operation that failed on a precondition never mutated anything;
        // classify by the underlying cause.
        CoreError::Execution(ExecutionError::Operation { source, .. }) => core_exit_code(source),
        CoreError::Execution(_) => EXIT_MIGRATION_ABORTED,
    }
}

fn core_category(error: &CoreError) -> &'static str {
    match error {
        CoreError::Schema(_) => "schema",
        CoreError::Introspection(_) => "introspect",
        CoreError::Diff(_) => "diff",
        CoreError::Execution(_) => "execute",
        CoreError::Integrity(_) => "integrity",
        CoreError::Precondition(_) => "precondition",
    }
}

fn render_core_chain(error: &CoreError) -> String {
    let mut rendered = format!("{MIGRATION_CONTEXT}: {error}");
    // The top-level Display already covers the kind layer; append the causes
    // below it.
    let mut source = std::error::Error::source(error).and_then(std::error::Error::source);
    while let Some(cause) = source {
        rendered.push_str(&format!(": {cause}"));
        source = cause.source();
    }
    rendered
}

fn report_with_context<E, C>(source: E, context: C) -> Report
where
    E: std::error::Error + Send + Sync + 'static,
    C: Into<String>,
{
    let context = context.into();
    let anyhow_error = std::result::Result::<(), E>::Err(source)
        .context(context)
        .expect_err("context wrapping must produce an error");
    miette::miette!("{anyhow_error:#}")
}

#[cfg(test)]
mod tests {
    use declite_core::{
        DiffError, ExecutionError, FkViolation, IntegrityError, PreconditionError, SchemaError,
    };

    use super::*;

    #[test]
    fn user_errors_exit_with_one() {
        let schema = CliError::Core(
            SchemaError::InvalidIdentifier {
                identifier: "bad name".to_string(),
            }
            .into(),
        );
        assert_eq!(exit_code(&schema), EXIT_USER_ERROR);

        let precondition = CliError::Core(
            PreconditionError::NoSuchTable {
                table: "missing".to_string(),
            }
            .into(),
        );
        assert_eq!(exit_code(&precondition), EXIT_USER_ERROR);

        let diff = CliError::Core(
            DiffError::AmbiguousRename {
                table: "t".to_string(),
                column: "y".to_string(),
                candidates: vec!["z".to_string()],
            }
            .into(),
        );
        assert_eq!(exit_code(&diff), EXIT_USER_ERROR);
    }

    #[test]
    fn aborted_migrations_exit_with_two() {
        let error = CliError::Core(
            ExecutionError::Statement {
                sql: "CREATE TABLE t (x)".to_string(),
                source: Box::new(std::io::Error::other("disk full")),
            }
            .into(),
        );
        assert_eq!(exit_code(&error), EXIT_MIGRATION_ABORTED);
    }

    #[test]
    fn integrity_failures_exit_with_three() {
        let error = CliError::Core(
            IntegrityError {
                violations: vec![FkViolation {
                    table: "posts".to_string(),
                    rowid: Some(1),
                    parent: "users".to_string(),
                }],
            }
            .into(),
        );
        assert_eq!(exit_code(&error), EXIT_INTEGRITY_FAILURE);
    }

    #[test]
    fn operation_wrappers_classify_by_their_cause() {
        let precondition_inside = CliError::Core(
            ExecutionError::Operation {
                operation: "drop column `x` from `t`".to_string(),
                applied: 0,
                source: Box::new(
                    PreconditionError::NoSuchColumn {
                        table: "t".to_string(),
                        column: "x".to_string(),
                    }
                    .into(),
                ),
            }
            .into(),
        );
        assert_eq!(exit_code(&precondition_inside), EXIT_USER_ERROR);

        let failure_inside = CliError::Core(
            ExecutionError::Operation {
                operation: "create table `t`".to_string(),
                applied: 0,
                source: Box::new(
                    ExecutionError::Statement {
                        sql: "CREATE TABLE t (x)".to_string(),
                        source: Box::new(std::io::Error::other("malformed")),
                    }
                    .into(),
                ),
            }
            .into(),
        );
        assert_eq!(exit_code(&failure_inside), EXIT_MIGRATION_ABORTED);
    }

    #[test]
    fn rendered_errors_carry_the_category_tag() {
        let error = CliError::Core(
            SchemaError::InvalidIdentifier {
                identifier: "bad name".to_string(),
            }
            .into(),
        );
        let rendered = render_runtime_error(&error);
        assert!(rendered.starts_with("[schema]"), "got: {rendered}");
        assert!(rendered.contains("bad name"));
    }
}
