//! Shared helper functions for SQL dialect implementations.
//!
//! This module provides reusable building blocks that dialects can compose
//! to implement the `SqlDialect` trait with minimal duplication.

use super::StringMatchOp;
use crate::sql::expr::{lit_str, Expr, ExprExt, UnaryOperator};
use regex::Regex;

// =============================================================================
// Identifier Quoting
// =============================================================================

/// Quote identifier with double quotes (ANSI style).
/// Used by: Postgres, DuckDB, SQLite
pub fn quote_double(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote identifier with backticks.
/// Used by: MySQL, SingleStore
pub fn quote_backtick(ident: &str) -> String {
    format!("`{}`", ident.replace('`', "``"))
}

// =============================================================================
// Boolean Formatting
// =============================================================================

/// Format boolean as literal true/false.
/// Used by: Postgres, DuckDB
pub fn format_bool_literal(b: bool) -> &'static str {
    if b {
        "true"
    } else {
        "false"
    }
}

/// Format boolean as numeric 1/0.
/// Used by: MySQL, SingleStore, SQLite (no native boolean type)
pub fn format_bool_numeric(b: bool) -> &'static str {
    if b {
        "1"
    } else {
        "0"
    }
}

// =============================================================================
// Pagination
// =============================================================================

use super::super::token::{Token, TokenStream};

/// Emit LIMIT ... OFFSET ... (standard SQL). All five target dialects share
/// this syntax, so there's only one implementation to keep.
pub fn emit_limit_offset_standard(limit: Option<u64>, offset: Option<u64>) -> TokenStream {
    let mut ts = TokenStream::new();

    if let Some(lim) = limit {
        ts.push(Token::Limit)
            .space()
            .push(Token::LitInt(lim as i64));
    }

    if let Some(off) = offset {
        if limit.is_some() {
            ts.space();
        }
        ts.push(Token::Offset)
            .space()
            .push(Token::LitInt(off as i64));
    }

    ts
}

// =============================================================================
// String Matching
// =============================================================================

/// Build a `LIKE`-based string-match predicate shared by all five dialects.
/// `op` is always one of the case-sensitive variants here; `Ilike` is
/// peeled off by `SqlDialect::string_match` before reaching this helper.
pub fn string_match_like(expr: Expr, op: StringMatchOp, value: Expr) -> Expr {
    let (pattern, negate) = match op {
        StringMatchOp::Contains => (wrap_wildcard(value, true, true), false),
        StringMatchOp::NotContains => (wrap_wildcard(value, true, true), true),
        StringMatchOp::StartsWith => (wrap_wildcard(value, false, true), false),
        StringMatchOp::NotStartsWith => (wrap_wildcard(value, false, true), true),
        StringMatchOp::EndsWith => (wrap_wildcard(value, true, false), false),
        StringMatchOp::NotEndsWith => (wrap_wildcard(value, true, false), true),
        StringMatchOp::Ilike => unreachable!("Ilike is handled by SqlDialect::string_match"),
    };
    let like = expr.like(pattern);
    if negate {
        Expr::UnaryOp {
            op: UnaryOperator::Not,
            expr: Box::new(like),
        }
    } else {
        like
    }
}

/// Wrap `value` in `%`-wildcards for a `LIKE`-based match. Exposed so the
/// dialect trait's `ilike_match` default can reuse the same wildcarding as
/// `string_match_like` for the `contains`-shaped case-insensitive match.
pub(crate) fn wrap_wildcard(value: Expr, leading: bool, trailing: bool) -> Expr {
    let mut out = value;
    if leading {
        out = lit_str("%").concat(out);
    }
    if trailing {
        out = out.concat(lit_str("%"));
    }
    out
}

// =============================================================================
// ISO-8601 Duration Parsing
// =============================================================================

/// Parse a single-unit ISO-8601 duration (`P1D`, `PT30M`, `P2W`, `P1M`, `P1Y`,
/// `PT1H`, `PT45S`) into `(count, unit_word)`. Composite durations with more
/// than one field fall back to the first field present. This covers the
/// relative date-range grammar's duration vocabulary; it is not a general
/// ISO-8601 parser.
pub fn parse_iso8601_duration(duration: &str) -> (i64, &'static str) {
    static PATTERN: once_cell::sync::Lazy<Regex> = once_cell::sync::Lazy::new(|| {
        Regex::new(
            r"^P(?:(?P<years>\d+)Y)?(?:(?P<months>\d+)M)?(?:(?P<weeks>\d+)W)?(?:(?P<days>\d+)D)?(?:T(?:(?P<hours>\d+)H)?(?:(?P<minutes>\d+)M)?(?:(?P<seconds>\d+)S)?)?$",
        )
        .expect("static duration regex is valid")
    });

    let Some(caps) = PATTERN.captures(duration) else {
        return (0, "second");
    };

    let field = |name: &str| -> Option<i64> { caps.name(name).map(|m| m.as_str().parse().unwrap_or(0)) };

    if let Some(n) = field("years") {
        return (n, "year");
    }
    if let Some(n) = field("months") {
        return (n, "month");
    }
    if let Some(n) = field("weeks") {
        return (n, "week");
    }
    if let Some(n) = field("days") {
        return (n, "day");
    }
    if let Some(n) = field("hours") {
        return (n, "hour");
    }
    if let Some(n) = field("minutes") {
        return (n, "minute");
    }
    if let Some(n) = field("seconds") {
        return (n, "second");
    }
    (0, "second")
}

/// Convert a duration unit word into its whole-seconds count, for dialects
/// (SQLite) that store timestamps as integer epoch seconds. Calendar units
/// (month/quarter/year) use fixed-length approximations since exact lengths
/// depend on the anchor date; callers needing calendar-accurate month/year
/// arithmetic should use `truncate_time` instead.
pub fn duration_seconds(count: i64, unit: &str) -> i64 {
    let unit_seconds = match unit {
        "second" => 1,
        "minute" => 60,
        "hour" => 3_600,
        "day" => 86_400,
        "week" => 604_800,
        "month" => 2_592_000,  // 30 days
        "quarter" => 7_776_000, // 90 days
        "year" => 31_536_000,  // 365 days
        _ => 1,
    };
    count * unit_seconds
}

// =============================================================================
// Function Remapping
// =============================================================================

/// Remap functions for Postgres dialect.
pub fn remap_function_postgres(name: &str) -> Option<&'static str> {
    match name.to_uppercase().as_str() {
        "STRFTIME" => Some("TO_CHAR"),
        "DATE_FORMAT" => Some("TO_CHAR"),
        "FORMAT" => Some("TO_CHAR"),
        "NVL" => Some("COALESCE"),
        "IFNULL" => Some("COALESCE"),
        "ISNULL" => Some("COALESCE"),
        _ => None,
    }
}

/// Remap functions for DuckDB dialect.
pub fn remap_function_duckdb(name: &str) -> Option<&'static str> {
    match name.to_uppercase().as_str() {
        "TO_CHAR" => Some("STRFTIME"),
        "DATE_FORMAT" => Some("STRFTIME"),
        "FORMAT" => Some("STRFTIME"),
        "NVL" => Some("COALESCE"),
        "IFNULL" => Some("COALESCE"),
        "ISNULL" => Some("COALESCE"),
        _ => None,
    }
}

/// Remap functions for MySQL dialect.
pub fn remap_function_mysql(name: &str) -> Option<&'static str> {
    match name.to_uppercase().as_str() {
        "STRFTIME" => Some("DATE_FORMAT"),
        "TO_CHAR" => Some("DATE_FORMAT"),
        "NVL" => Some("IFNULL"),
        "ISNULL" => Some("IFNULL"),
        "SUBSTR" => Some("SUBSTRING"),
        _ => None,
    }
}

/// Remap functions for SQLite dialect. SQLite has no native DATE_FORMAT/
/// TO_CHAR; STRFTIME is its native formatting function, so everything else
/// remaps onto it.
pub fn remap_function_sqlite(name: &str) -> Option<&'static str> {
    match name.to_uppercase().as_str() {
        "TO_CHAR" => Some("STRFTIME"),
        "DATE_FORMAT" => Some("STRFTIME"),
        "NVL" => Some("COALESCE"),
        "IFNULL" => Some("COALESCE"),
        "ISNULL" => Some("COALESCE"),
        _ => None,
    }
}
