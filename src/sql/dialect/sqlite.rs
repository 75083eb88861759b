//! SQLite SQL dialect.
//!
//! SQLite has no native temporal type; this compiler assumes timestamp
//! columns are stored as integer Unix epoch seconds (`timestamp_storage_is_integer`
//! returns true), which is the conventional SQLite representation. Every
//! time operation therefore round-trips through `datetime()`/`strftime()`
//! text values and casts back to an integer epoch with `strftime('%s', ...)`.
//!
//! SQLite also lacks STDDEV/VARIANCE and PERCENTILE_CONT entirely, and has
//! no ordered-set aggregate syntax, so those capabilities are unsupported.

use super::helpers;
use super::{DialectCapabilities, SqlDialect, TimeGranularity};
use crate::sql::expr::{cast, func, lit_int, lit_str, BinaryOperator, Expr, ExprExt};

/// SQLite SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct Sqlite;

impl SqlDialect for Sqlite {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        helpers::format_bool_numeric(b)
    }

    fn supports_nulls_ordering(&self) -> bool {
        // SQLite 3.30+ supports NULLS FIRST/LAST; assume a recent version.
        true
    }

    fn remap_function(&self, name: &str) -> Option<&'static str> {
        helpers::remap_function_sqlite(name)
    }

    fn truncate_time(&self, granularity: TimeGranularity, expr: Expr) -> Expr {
        truncate_epoch(granularity, expr)
    }

    fn interval_from_iso(&self, duration: &str) -> Expr {
        let (n, unit) = helpers::parse_iso8601_duration(duration);
        lit_int(helpers::duration_seconds(n, unit))
    }

    fn time_difference_seconds(&self, end: Expr, start: Expr) -> Expr {
        // Timestamps are already epoch seconds, so the difference is direct.
        Expr::BinaryOp {
            left: Box::new(end),
            op: BinaryOperator::Minus,
            right: Box::new(start),
        }
    }

    fn timestamp_storage_is_integer(&self) -> bool {
        true
    }

    fn capabilities(&self) -> DialectCapabilities {
        DialectCapabilities {
            supports_stddev: false,
            supports_variance: false,
            supports_percentile: false,
            supports_window_functions: true,
            supports_frame_clause: true,
            supports_lateral_joins: false,
            supports_percentile_subqueries: false,
        }
    }
}

/// Re-parse an epoch-seconds `datetime`-formatted string back into an
/// integer epoch via `strftime('%s', ...)`.
fn epoch_of(time_value: Expr) -> Expr {
    cast(func("STRFTIME", vec![lit_str("%s"), time_value]), "INTEGER")
}

fn truncate_epoch(granularity: TimeGranularity, expr: Expr) -> Expr {
    use TimeGranularity::*;
    match granularity {
        Second => cast(expr, "INTEGER"),
        Minute => epoch_of(func(
            "STRFTIME",
            vec![lit_str("%Y-%m-%d %H:%M:00"), expr, lit_str("unixepoch")],
        )),
        Hour => epoch_of(func(
            "STRFTIME",
            vec![lit_str("%Y-%m-%d %H:00:00"), expr, lit_str("unixepoch")],
        )),
        Day => epoch_of(func(
            "DATETIME",
            vec![expr, lit_str("unixepoch"), lit_str("start of day")],
        )),
        Week => epoch_of(start_of_week(expr)),
        Month => epoch_of(func(
            "DATETIME",
            vec![expr, lit_str("unixepoch"), lit_str("start of month")],
        )),
        Quarter => epoch_of(start_of_quarter(expr)),
        Year => epoch_of(func(
            "DATETIME",
            vec![expr, lit_str("unixepoch"), lit_str("start of year")],
        )),
    }
}

/// `datetime(expr, 'unixepoch', '-N days', 'start of day')` where `N` is the
/// number of days since the preceding Monday (`%w` is 0=Sunday..6=Saturday).
fn start_of_week(expr: Expr) -> Expr {
    let day_of_week = cast(
        func("STRFTIME", vec![lit_str("%w"), expr.clone(), lit_str("unixepoch")]),
        "INTEGER",
    );
    let monday_offset = Expr::BinaryOp {
        left: Box::new(Expr::BinaryOp {
            left: Box::new(day_of_week),
            op: BinaryOperator::Plus,
            right: Box::new(lit_int(6)),
        }),
        op: BinaryOperator::Mod,
        right: Box::new(lit_int(7)),
    };
    let modifier = lit_str("-")
        .concat(cast(monday_offset, "TEXT"))
        .concat(lit_str(" days"));
    func(
        "DATETIME",
        vec![expr, lit_str("unixepoch"), modifier, lit_str("start of day")],
    )
}

/// Build the `YYYY-MM-01` string for the first month of the expression's
/// quarter, then hand it to `datetime()` to normalize.
fn start_of_quarter(expr: Expr) -> Expr {
    let month = cast(
        func("STRFTIME", vec![lit_str("%m"), expr.clone(), lit_str("unixepoch")]),
        "INTEGER",
    );
    let zero_based_start_month = Expr::BinaryOp {
        left: Box::new(Expr::BinaryOp {
            left: Box::new(Expr::BinaryOp {
                left: Box::new(month),
                op: BinaryOperator::Minus,
                right: Box::new(lit_int(1)),
            }),
            op: BinaryOperator::Div,
            right: Box::new(lit_int(3)),
        }),
        op: BinaryOperator::Mul,
        right: Box::new(lit_int(3)),
    };
    let start_month = Expr::BinaryOp {
        left: Box::new(zero_based_start_month),
        op: BinaryOperator::Plus,
        right: Box::new(lit_int(1)),
    };
    let year = func("STRFTIME", vec![lit_str("%Y"), expr.clone(), lit_str("unixepoch")]);
    let padded_month = func("PRINTF", vec![lit_str("%02d"), start_month]);
    let date_str = year.concat(lit_str("-")).concat(padded_month).concat(lit_str("-01"));
    func("DATETIME", vec![date_str, lit_str("start of day")])
}
