//! MySQL SQL dialect.
//!
//! MySQL differences from ANSI that matter for query generation:
//! - Backtick identifier quoting (`` `name` ``)
//! - Boolean is TINYINT(1), rendered as 1/0
//! - `||` is logical OR by default (use CONCAT())
//! - No NULLS FIRST/LAST
//! - No native DATE_TRUNC or PERCENTILE_CONT
//! - `expr + INTERVAL n unit` date arithmetic, TIMESTAMPDIFF for differences

use super::helpers;
use super::{DialectCapabilities, SqlDialect, TimeGranularity};
use crate::sql::expr::{cast, func, interval, lit_int, lit_str, raw_sql, BinaryOperator, Expr};

/// MySQL SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct MySql;

impl SqlDialect for MySql {
    fn name(&self) -> &'static str {
        "mysql"
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
        Some(func("STDDEV_POP", vec![expr]))
    }

    fn variance(&self, expr: Expr) -> Option<Expr> {
        Some(func("VAR_POP", vec![expr]))
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
            supports_lateral_joins: false,
            supports_percentile_subqueries: false,
        }
    }
}

/// `expr REGEXP value`, shared by MySQL and SingleStore (same wire-level
/// function surface). There's no `NOT REGEXP` infix in the typed AST, so
/// the negated case wraps the positive match in `NOT (...)`.
pub(super) fn regex_match_mysql_family(expr: Expr, value: Expr, negate: bool) -> Expr {
    use crate::sql::expr::ExprExt;
    let matched = Expr::BinaryOp {
        left: Box::new(expr),
        op: BinaryOperator::Raw("REGEXP"),
        right: Box::new(value),
    };
    if negate {
        matched.not()
    } else {
        matched
    }
}

/// Truncate a timestamp to a calendar grain using MySQL/SingleStore-compatible
/// functions. Shared by both dialects since SingleStore is wire-compatible
/// with MySQL's function surface.
pub(super) fn truncate_time_mysql_family(granularity: TimeGranularity, expr: Expr) -> Expr {
    use TimeGranularity::*;
    match granularity {
        Second => func("DATE_FORMAT", vec![expr, lit_str("%Y-%m-%d %H:%i:%s")]),
        Minute => func("DATE_FORMAT", vec![expr, lit_str("%Y-%m-%d %H:%i:00")]),
        Hour => func("DATE_FORMAT", vec![expr, lit_str("%Y-%m-%d %H:00:00")]),
        Day => func("DATE", vec![expr]),
        Week => {
            let date_expr = func("DATE", vec![expr]);
            let dow_minus_1 = Expr::BinaryOp {
                left: Box::new(func("DAYOFWEEK", vec![date_expr.clone()])),
                op: BinaryOperator::Minus,
                right: Box::new(lit_int(1)),
            };
            func(
                "DATE_SUB",
                vec![date_expr, interval(dow_minus_1, "DAY")],
            )
        }
        Month => func("DATE_FORMAT", vec![expr, lit_str("%Y-%m-01")]),
        Quarter => {
            let quarter = func("QUARTER", vec![expr.clone()]);
            let start_month = Expr::BinaryOp {
                left: Box::new(Expr::BinaryOp {
                    left: Box::new(quarter),
                    op: BinaryOperator::Minus,
                    right: Box::new(lit_int(1)),
                }),
                op: BinaryOperator::Mul,
                right: Box::new(lit_int(3)),
            };
            let month_literal = Expr::BinaryOp {
                left: Box::new(start_month),
                op: BinaryOperator::Plus,
                right: Box::new(lit_int(1)),
            };
            let date_str = func(
                "CONCAT",
                vec![
                    func("YEAR", vec![expr]),
                    lit_str("-"),
                    func("LPAD", vec![month_literal, lit_int(2), lit_str("0")]),
                    lit_str("-01"),
                ],
            );
            cast(date_str, "DATE")
        }
        Year => func("DATE_FORMAT", vec![expr, lit_str("%Y-01-01")]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::dialect::Dialect;
    use crate::sql::expr::col;

    #[test]
    fn test_truncate_time_day() {
        let sql = MySql
            .truncate_time(TimeGranularity::Day, col("created_at"))
            .to_tokens()
            .serialize(Dialect::MySql);
        assert_eq!(sql, "DATE(`created_at`)");
    }

    #[test]
    fn test_truncate_time_week() {
        let sql = MySql
            .truncate_time(TimeGranularity::Week, col("created_at"))
            .to_tokens()
            .serialize(Dialect::MySql);
        assert!(sql.starts_with("DATE_SUB(DATE(`created_at`), INTERVAL"), "SQL: {}", sql);
    }

    #[test]
    fn test_interval_from_iso() {
        let sql = MySql
            .interval_from_iso("P7D")
            .to_tokens()
            .serialize(Dialect::MySql);
        assert_eq!(sql, "INTERVAL 7 DAY");
    }

    #[test]
    fn test_date_add_interval_default() {
        let sql = MySql
            .date_add_interval(col("created_at"), "P1D")
            .to_tokens()
            .serialize(Dialect::MySql);
        assert_eq!(sql, "`created_at` + INTERVAL 1 DAY");
    }

    #[test]
    fn test_time_difference_seconds() {
        let sql = MySql
            .time_difference_seconds(col("ended_at"), col("started_at"))
            .to_tokens()
            .serialize(Dialect::MySql);
        assert_eq!(
            sql,
            "TIMESTAMPDIFF(SECOND, `started_at`, `ended_at`)"
        );
    }

    #[test]
    fn test_capabilities() {
        let caps = MySql.capabilities();
        assert!(!caps.supports_percentile);
        assert!(!caps.supports_lateral_joins);
    }

    #[test]
    fn test_regex_match_uses_regexp_keyword() {
        use crate::sql::expr::lit_str;
        let sql = MySql
            .regex_match(col("name"), lit_str("^foo"), false)
            .unwrap()
            .to_tokens()
            .serialize(Dialect::MySql);
        assert_eq!(sql, "`name` REGEXP '^foo'");
    }

    #[test]
    fn test_not_regex_wraps_in_not() {
        use crate::sql::expr::lit_str;
        let sql = MySql
            .regex_match(col("name"), lit_str("^foo"), true)
            .unwrap()
            .to_tokens()
            .serialize(Dialect::MySql);
        assert_eq!(sql, "NOT `name` REGEXP '^foo'");
    }
}
