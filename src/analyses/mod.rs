//! Specialized analyses: Funnel, Flow, and Retention each compile a
//! purpose-built CTE chain rather than going through the general
//! [`crate::planner::Planner`]/[`crate::builder::SqlBuilder`] pipeline —
//! their shapes (per-step joins, lateral/window traversal, cohort-vs-
//! activity joins) don't reduce to a single Plan.

pub mod flow;
pub mod funnel;
pub mod retention;

pub use flow::{FlowCompiler, FlowPlan, FlowQuery, JoinStrategy};
pub use funnel::{FunnelCompiler, FunnelQuery, FunnelStep};
pub use retention::{RetentionCompiler, RetentionQuery, RetentionType};

use crate::sql::{col, raw_sql, Expr};

/// A member's `sql` may be a bare column name or an arbitrary expression
/// (e.g. `"a.created_at"`, `"COALESCE(a, b)"`). Bare names render through
/// `col()` so they pick up normal identifier quoting; anything with a
/// call or a space is passed through as-is via `raw_sql()`. Mirrors
/// `filter::col_expr_raw`.
pub(crate) fn column_expr(sql: &str) -> Expr {
    if sql.contains('(') || sql.contains(' ') {
        raw_sql(sql)
    } else {
        col(sql)
    }
}
