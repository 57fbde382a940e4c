//! INSERT statement construction for one batch.
//!
//! Values are never interpolated into the SQL text: every surviving field
//! becomes one positional placeholder and one entry in the argument list,
//! row-major and in column order.

use crate::config::{Dialect, ShapePolicy};
use crate::error::{ConfigError, LoadError, LoadResult};
use crate::import::columns::ColumnPlan;
use crate::import::reader::Row;

/// Bind-parameter ceiling shared by the MySQL and PostgreSQL wire protocols.
pub const MAX_BIND_PARAMETERS: usize = 65_535;

/// One parameterized insert and the arguments it binds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertStatement {
    pub sql: String,
    pub args: Vec<String>,
    /// Number of value groups, one per inserted row.
    pub rows: usize,
    /// Rows left out because their width did not match the header.
    pub skipped: usize,
}

impl InsertStatement {
    /// True when no value group was produced; such a statement must not be
    /// executed.
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }
}

/// Reject batch sizes whose statements could never be bound.
pub fn check_parameter_budget(batch_size: usize, plan: &ColumnPlan) -> Result<(), ConfigError> {
    let required = batch_size.saturating_mul(plan.width());
    if required > MAX_BIND_PARAMETERS {
        return Err(ConfigError::TooManyParameters {
            batch_size,
            columns: plan.width(),
            required,
            limit: MAX_BIND_PARAMETERS,
        });
    }
    Ok(())
}

/// `INSERT ... INTO <table> (<cols>)` up to, not including, `VALUES`.
fn statement_head(table: &str, plan: &ColumnPlan, dialect: Dialect) -> String {
    let verb = match dialect {
        Dialect::MySql => "INSERT IGNORE INTO",
        Dialect::Postgres => "INSERT INTO",
    };
    format!("{verb} {table} ({})", plan.columns().join(", "))
}

/// Build the statement for `rows`.
///
/// A row whose raw width differs from the raw header width is skipped or
/// aborts the build, depending on `shape`.
pub fn build_insert(
    table: &str,
    plan: &ColumnPlan,
    rows: &[Row],
    dialect: Dialect,
    shape: ShapePolicy,
) -> LoadResult<InsertStatement> {
    let width = plan.width();
    let mut values = String::new();

    let mut args = Vec::with_capacity(rows.len() * width);
    let mut groups = 0usize;
    let mut skipped = 0usize;

    for row in rows {
        if row.len() != plan.raw_width() {
            match shape {
                ShapePolicy::Strict => {
                    return Err(LoadError::RowShape {
                        line: row.line,
                        expected: plan.raw_width(),
                        found: row.len(),
                    });
                }
                ShapePolicy::Skip => {
                    log::debug!(
                        "line {}: skipping row with {} fields, header has {}",
                        row.line,
                        row.len(),
                        plan.raw_width()
                    );
                    skipped += 1;
                    continue;
                }
            }
        }

        if groups > 0 {
            values.push_str(", ");
        }
        values.push('(');
        for column in 0..width {
            if column > 0 {
                values.push_str(", ");
            }
            match dialect {
                Dialect::MySql => values.push('?'),
                Dialect::Postgres => values.push_str(&format!("${}", args.len() + column + 1)),
            }
        }
        values.push(')');

        args.extend(plan.project(&row.fields).cloned());
        groups += 1;
    }

    // Zero groups leave just the head, which is never dispatched.
    let mut sql = statement_head(table, plan, dialect);
    if groups > 0 {
        sql.push_str(" VALUES ");
        sql.push_str(&values);
        if dialect == Dialect::Postgres {
            sql.push_str(" ON CONFLICT DO NOTHING");
        }
    }

    Ok(InsertStatement {
        sql,
        args,
        rows: groups,
        skipped,
    })
}
