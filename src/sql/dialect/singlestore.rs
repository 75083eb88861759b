//! SingleStore (formerly MemSQL) SQL dialect.
//!
//! SingleStore is wire- and function-compatible with MySQL for everything
//! this compiler emits, so quoting, boolean formatting, function remapping,
//! and time truncation all delegate to the MySQL helpers. The one behavioral
//! difference that matters for query planning is that SingleStore supports
//! `LATERAL` joins, which vanilla MySQL does not.

use super::helpers;
use super::mysql::{regex_match_mysql_family, truncate_time_mysql_family};
use super::{DialectCapabilities, SqlDialect, TimeGranularity};
use crate::sql::expr::{func, interval, lit_int, raw_sql, Expr};

/// SingleStore SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct SingleStore;

impl SqlDialect for SingleStore {
    fn name(&self) -> &'static str {
        "singlestore"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_backtick(ident)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        helpers::format_bool_numeric(b)
    }

    fn concat_operator(&self) -> &'static str {
        "||"
    }

    fn supports_concat_operator(&self) -> bool {
        false
    }

    fn supports_nulls_ordering(&self) -> bool {
        false
    }

    fn remap_function(&self, name: &str) -> Option<&'static str> {
        helpers::remap_function_mysql(name)
    }

    fn truncate_time(&self, granularity: TimeGranularity, expr: Expr) -> Expr {
        truncate_time_mysql_family(granularity, expr)
    }

    fn interval_from_iso(&self, duration: &str) -> Expr {
        let (n, unit) = helpers::parse_iso8601_duration(duration);
        interval(lit_int(n), &unit.to_uppercase())
    }

    fn time_difference_seconds(&self, end: Expr, start: Expr) -> Expr {
        func("TIMESTAMPDIFF", vec![raw_sql("SECOND"), start, end])
    }

    fn stddev(&self, expr: Expr) -> Option<Expr> {
        Some(func("STD", vec![expr]))
    }

    fn variance(&self, expr: Expr) -> Option<Expr> {
        Some(func("VARIANCE", vec![expr]))
    }

    fn regex_match(&self, expr: Expr, value: Expr, negate: bool) -> Option<Expr> {
        Some(regex_match_mysql_family(expr, value, negate))
    }

    fn capabilities(&self) -> DialectCapabilities {
        DialectCapabilities {
            supports_stddev: true,
            supports_variance: true,
            supports_percentile: false,
            supports_window_functions: true,
            supports_frame_clause: true,
            supports_lateral_joins: true,
            supports_percentile_subqueries: false,
        }
    }
}
