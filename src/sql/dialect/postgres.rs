//! PostgreSQL SQL dialect.
//!
//! PostgreSQL features relevant to query generation:
//! - ANSI identifier quoting (`"`)
//! - Native boolean type (true/false)
//! - DISTINCT ON
//! - FILTER (WHERE ...) clause for conditional aggregates
//! - Native DATE_TRUNC, DATE_PART('epoch', ...), PERCENTILE_CONT

use super::helpers;
use super::{DialectCapabilities, SqlDialect, TimeGranularity};
use crate::sql::expr::{
    cast, func, lit_float, lit_str, ordered_set_agg, raw_sql, BinaryOperator, Expr,
};

/// PostgreSQL SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct Postgres;

impl SqlDialect for Postgres {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        helpers::format_bool_literal(b)
    }

    fn supports_distinct_on(&self) -> bool {
        true
    }

    fn supports_aggregate_filter(&self) -> bool {
        true
    }

    fn supports_named_windows(&self) -> bool {
        true
    }

    fn remap_function(&self, name: &str) -> Option<&'static str> {
        helpers::remap_function_postgres(name)
    }

    fn truncate_time(&self, granularity: TimeGranularity, expr: Expr) -> Expr {
        func(
            "DATE_TRUNC",
            vec![lit_str(granularity.as_str()), expr],
        )
    }

    fn interval_from_iso(&self, duration: &str) -> Expr {
        let (n, unit) = helpers::parse_iso8601_duration(duration);
        raw_sql(&format!("INTERVAL '{} {}s'", n, unit))
    }

    fn ilike_match(&self, expr: Expr, value: Expr) -> Expr {
        Expr::BinaryOp {
            left: Box::new(expr),
            op: BinaryOperator::Raw("ILIKE"),
            right: Box::new(helpers::wrap_wildcard(value, true, true)),
        }
    }

    fn regex_match(&self, expr: Expr, value: Expr, negate: bool) -> Option<Expr> {
        let op = if negate { "!~" } else { "~" };
        Some(Expr::BinaryOp {
            left: Box::new(expr),
            op: BinaryOperator::Raw(op),
            right: Box::new(value),
        })
    }

    fn time_difference_seconds(&self, end: Expr, start: Expr) -> Expr {
        let diff = Expr::BinaryOp {
            left: Box::new(end),
            op: BinaryOperator::Minus,
            right: Box::new(start),
        };
        cast(func("DATE_PART", vec![lit_str("epoch"), diff]), "BIGINT")
    }

    fn stddev(&self, expr: Expr) -> Option<Expr> {
        Some(func("STDDEV_POP", vec![expr]))
    }

    fn variance(&self, expr: Expr) -> Option<Expr> {
        Some(func("VAR_POP", vec![expr]))
    }

    fn percentile(&self, expr: Expr, p: f64) -> Option<Expr> {
        Some(ordered_set_agg("PERCENTILE_CONT", vec![lit_float(p)], expr))
    }

    fn capabilities(&self) -> DialectCapabilities {
        DialectCapabilities {
            supports_stddev: true,
            supports_variance: true,
            supports_percentile: true,
            supports_window_functions: true,
            supports_frame_clause: true,
            supports_lateral_joins: true,
            supports_percentile_subqueries: true,
        }
    }
}
