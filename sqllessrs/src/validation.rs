//! Referential checks run before a query is compiled.
//!
//! Errors block compilation; warnings are surfaced and the query runs anyway.
//! Rules run in a fixed order (main table, joins, filters) so the report for
//! a given state and snapshot is always the same.

use std::fmt;

use crate::catalog::CatalogSnapshot;
use crate::error::{Result, SqllessError};
use crate::query_state::{ConditionKind, QueryState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueScope {
    MainTable,
    /// 1-based join position.
    Join(usize),
    /// 1-based filter position.
    Filter(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub scope: IssueScope,
    pub message: String,
}

impl ValidationIssue {
    fn new(scope: IssueScope, message: impl Into<String>) -> Self {
        Self {
            scope,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.scope {
            IssueScope::MainTable => write!(f, "{}", self.message),
            IssueScope::Join(n) => write!(f, "JOIN {n}: {}", self.message),
            IssueScope::Filter(n) => write!(f, "filter {n}: {}", self.message),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    /// Fold the errors into one `Validation` error; warnings are dropped.
    pub fn into_result(self) -> Result<Vec<ValidationIssue>> {
        if self.errors.is_empty() {
            return Ok(self.warnings);
        }
        let joined: Vec<String> = self.errors.iter().map(ToString::to_string).collect();
        Err(SqllessError::Validation(joined.join("; ")))
    }

    fn error(&mut self, issue: ValidationIssue) {
        self.errors.push(issue);
    }

    fn warn(&mut self, issue: ValidationIssue) {
        self.warnings.push(issue);
    }
}

#[derive(Debug, Clone, Default)]
pub struct Validator {
    warn_only: bool,
}

impl Validator {
    /// `warn_only` reports join columns missing from their target table as
    /// warnings instead of errors.
    pub fn new(warn_only: bool) -> Self {
        Self { warn_only }
    }

    pub fn validate(&self, state: &QueryState, snapshot: &CatalogSnapshot) -> ValidationReport {
        let mut report = ValidationReport::default();

        let main_descriptor = match &state.main_table {
            None => {
                report.error(ValidationIssue::new(
                    IssueScope::MainTable,
                    "no main table selected",
                ));
                None
            }
            Some(main) => {
                let descriptor = snapshot.table(&main.table);
                if descriptor.is_none() {
                    report.warn(ValidationIssue::new(
                        IssueScope::MainTable,
                        format!("columns of table {} could not be fetched", main.table),
                    ));
                }
                descriptor
            }
        };

        for (idx, join) in state.joins.iter().enumerate() {
            let scope = IssueScope::Join(idx + 1);
            let target = join.target_table.trim();
            if target.is_empty() {
                report.error(ValidationIssue::new(scope, "join table is not set"));
            }
            if join.left_column.trim().is_empty() || join.right_column.trim().is_empty() {
                report.error(ValidationIssue::new(scope, "join columns are not set"));
            }
            if target.is_empty() || state.main_table.is_none() {
                continue;
            }
            match snapshot.table(target) {
                Some(descriptor) => {
                    let right = join.right_column.trim();
                    if !right.is_empty() {
                        self.check(
                            &mut report,
                            descriptor.has_column(right),
                            ValidationIssue::new(
                                scope,
                                format!("column {right} does not exist on table {target}"),
                            ),
                        );
                    }
                }
                None => report.warn(ValidationIssue::new(
                    scope,
                    format!("columns of table {target} could not be fetched"),
                )),
            }
        }

        // An undescribed main table has no columns, so every filter column is unknown.
        if let Some(main) = &state.main_table {
            for (idx, filter) in state.filters.iter().enumerate() {
                let scope = IssueScope::Filter(idx + 1);
                let column = filter.column.trim();
                if column.is_empty() {
                    if filter.kind() != ConditionKind::Custom {
                        report.warn(ValidationIssue::new(scope, "filter column is not set"));
                    }
                    continue;
                }
                if !main_descriptor.is_some_and(|d| d.has_column(column)) {
                    report.warn(ValidationIssue::new(
                        scope,
                        format!("column {column} not found on table {}", main.table),
                    ));
                }
            }
        }

        tracing::debug!(
            errors = report.errors.len(),
            warnings = report.warnings.len(),
            "validated query state"
        );
        report
    }

    fn check(&self, report: &mut ValidationReport, condition: bool, issue: ValidationIssue) {
        if condition {
            return;
        }
        if self.warn_only {
            tracing::warn!(issue = %issue, "validation downgraded to warning");
            report.warn(issue);
        } else {
            report.error(issue);
        }
    }
}
