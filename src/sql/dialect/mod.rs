//! SQL dialect definitions and formatting rules.
//!
//! This module is the single place dialect differences are expressed. Every
//! operation the rest of the compiler needs — truncating a timestamp to a
//! grain, building a string-match predicate, casting, computing a stddev —
//! goes through `SqlDialect` rather than hand-formatted SQL strings, so
//! adding a sixth dialect means implementing one trait, not auditing every
//! call site that builds SQL.
//!
//! # Usage
//!
//! ```ignore
//! use semlayer::sql::dialect::{Dialect, SqlDialect};
//!
//! let dialect = Dialect::Postgres;
//! let quoted = dialect.quote_identifier("user"); // "user"
//! ```

mod duckdb;
pub mod helpers;
mod mysql;
mod postgres;
mod singlestore;
mod sqlite;

pub use duckdb::DuckDb;
pub use mysql::MySql;
pub use postgres::Postgres;
pub use singlestore::SingleStore;
pub use sqlite::Sqlite;

use super::expr::{func, Expr, ExprExt, WindowFrame, WindowOrderBy};
use super::token::{Token, TokenStream};

/// Time-truncation grain, shared by the Filter/Time-Range Compiler and the
/// dialect adapter's `truncate_time`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeGranularity {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

impl TimeGranularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeGranularity::Second => "second",
            TimeGranularity::Minute => "minute",
            TimeGranularity::Hour => "hour",
            TimeGranularity::Day => "day",
            TimeGranularity::Week => "week",
            TimeGranularity::Month => "month",
            TimeGranularity::Quarter => "quarter",
            TimeGranularity::Year => "year",
        }
    }
}

/// String-matching filter operators (`contains`, `startsWith`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringMatchOp {
    Contains,
    NotContains,
    StartsWith,
    NotStartsWith,
    EndsWith,
    NotEndsWith,
    /// Case-insensitive `contains`.
    Ilike,
}

/// Capability flags a dialect advertises so upstream components (the
/// planner, the measure compiler) can fail fast with `UnsupportedDialectFeature`
/// instead of emitting SQL the target database will reject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DialectCapabilities {
    pub supports_stddev: bool,
    pub supports_variance: bool,
    pub supports_percentile: bool,
    pub supports_window_functions: bool,
    pub supports_frame_clause: bool,
    pub supports_lateral_joins: bool,
    pub supports_percentile_subqueries: bool,
}

/// SQL dialect trait — every construct the compiler emits is routed through
/// one of these methods rather than built as a raw string.
pub trait SqlDialect: std::fmt::Debug {
    /// Dialect name for display/logging.
    fn name(&self) -> &'static str;

    // =========================================================================
    // Identifier and Literal Quoting
    // =========================================================================

    /// Quote an identifier (table, column, alias).
    fn quote_identifier(&self, ident: &str) -> String;

    /// Quote a string literal. All five target dialects use single quotes
    /// with `''` escaping.
    fn quote_string(&self, s: &str) -> String {
        format!("'{}'", s.replace('\'', "''"))
    }

    /// Format a boolean literal.
    fn format_bool(&self, b: bool) -> &'static str;

    /// Same as `format_bool`, named per the dialect operation contract.
    fn boolean_literal(&self, b: bool) -> &'static str {
        self.format_bool(b)
    }

    // =========================================================================
    // Pagination
    // =========================================================================

    /// Emit a LIMIT/OFFSET clause. All five target dialects share standard
    /// `LIMIT n OFFSET m` syntax.
    fn emit_limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> TokenStream {
        helpers::emit_limit_offset_standard(limit, offset)
    }

    // =========================================================================
    // Operators
    // =========================================================================

    /// String concatenation operator.
    fn concat_operator(&self) -> &'static str {
        "||"
    }

    /// Whether this dialect supports the `||` concat operator (MySQL/SingleStore
    /// treat `||` as logical OR by default and need `CONCAT()` instead).
    fn supports_concat_operator(&self) -> bool {
        true
    }

    // =========================================================================
    // CTE / JOIN
    // =========================================================================

    fn emit_recursive_keyword(&self) -> bool {
        true
    }

    fn supports_full_outer_join(&self) -> bool {
        true
    }

    fn supports_nulls_ordering(&self) -> bool {
        true
    }

    fn supports_distinct_on(&self) -> bool {
        false
    }

    fn supports_aggregate_filter(&self) -> bool {
        false
    }

    fn supports_named_windows(&self) -> bool {
        false
    }

    /// Remap a function name for this dialect (case-insensitive match).
    fn remap_function(&self, name: &str) -> Option<&'static str> {
        let _ = name;
        None
    }

    // =========================================================================
    // Dialect operation contract
    // =========================================================================

    /// Truncate a timestamp expression to the given calendar grain.
    fn truncate_time(&self, granularity: TimeGranularity, expr: Expr) -> Expr;

    /// Build a string-match predicate (`contains`, `startsWith`, ...). The
    /// case-sensitive variants render identically via `LIKE` on all five
    /// target dialects; `ilike` is split out to `ilike_match` since
    /// Postgres and DuckDB have a native case-insensitive operator the
    /// others lack.
    fn string_match(&self, expr: Expr, op: StringMatchOp, value: Expr) -> Expr {
        match op {
            StringMatchOp::Ilike => self.ilike_match(expr, value),
            other => helpers::string_match_like(expr, other, value),
        }
    }

    /// Case-insensitive `contains`. The default lower-cases both sides and
    /// reuses the same `%`-wildcarded `LIKE` the rest of `string_match`
    /// builds; dialects with a native `ILIKE` operator override this.
    fn ilike_match(&self, expr: Expr, value: Expr) -> Expr {
        let pattern = helpers::wrap_wildcard(value, true, true);
        func("LOWER", vec![expr]).like(func("LOWER", vec![pattern]))
    }

    /// `regex`/`notRegex` filter predicate. `None` means this dialect has no
    /// safe regex rendering (SQLite's `GLOB` is a different pattern
    /// language, not a regex engine, so it isn't used here as a stand-in).
    fn regex_match(&self, expr: Expr, value: Expr, negate: bool) -> Option<Expr> {
        let _ = (expr, value, negate);
        None
    }

    /// `CAST(expr AS sql_type)`, with `sql_type` already dialect-appropriate.
    fn cast(&self, expr: Expr, sql_type: &str) -> Expr {
        super::expr::cast(expr, sql_type)
    }

    /// Null-safe average. All five dialects' native `AVG` already ignores
    /// NULLs and returns NULL over an empty/all-NULL set, so the default
    /// just wraps `AVG`; dialects whose integer division would otherwise
    /// truncate the result (SQLite) override this.
    fn avg(&self, expr: Expr) -> Expr {
        super::expr::avg(expr)
    }

    /// `CASE WHEN ... THEN ... ELSE ... END`.
    fn case_when(&self, cases: Vec<(Expr, Expr)>, else_branch: Option<Expr>) -> Expr {
        Expr::Case {
            operand: None,
            when_clauses: cases,
            else_clause: else_branch.map(Box::new),
        }
    }

    /// Coerce a raw filter value from the query JSON into a dialect-appropriate
    /// literal expression — e.g. SQLite renders booleans as `0`/`1` integers
    /// because that is what the column actually stores.
    fn coerce_filter_value(&self, value: &serde_json::Value) -> Expr {
        match value {
            serde_json::Value::String(s) => super::expr::lit_str(s),
            serde_json::Value::Bool(b) => super::expr::lit_bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    super::expr::lit_int(i)
                } else {
                    super::expr::lit_float(n.as_f64().unwrap_or(0.0))
                }
            }
            serde_json::Value::Null => super::expr::lit_null(),
            _ => super::expr::lit_null(),
        }
    }

    /// Render an ISO-8601 duration (e.g. `"P1D"`, `"PT30M"`) as a dialect
    /// interval expression.
    fn interval_from_iso(&self, duration: &str) -> Expr;

    /// `end - start`, in whole seconds.
    fn time_difference_seconds(&self, end: Expr, start: Expr) -> Expr;

    /// `ts + duration`, where `duration` is an ISO-8601 duration string.
    fn date_add_interval(&self, ts: Expr, duration: &str) -> Expr {
        Expr::BinaryOp {
            left: Box::new(ts),
            op: super::expr::BinaryOperator::Plus,
            right: Box::new(self.interval_from_iso(duration)),
        }
    }

    /// `agg_fn(expr) WHERE condition` — conditional aggregation. Dialects
    /// with native `FILTER (WHERE ...)` use it; others rewrite into
    /// `agg_fn(CASE WHEN condition THEN expr END)`.
    fn conditional_aggregation(&self, agg_fn: &str, expr: Expr, condition: Expr) -> Expr {
        if self.supports_aggregate_filter() {
            super::expr::agg_filter(
                Expr::Function {
                    name: agg_fn.into(),
                    args: vec![expr],
                    distinct: false,
                },
                condition,
            )
        } else {
            Expr::Function {
                name: agg_fn.into(),
                args: vec![Expr::Case {
                    operand: None,
                    when_clauses: vec![(condition, expr)],
                    else_clause: None,
                }],
                distinct: false,
            }
        }
    }

    /// `STDDEV`/population standard deviation. `None` means unsupported.
    fn stddev(&self, expr: Expr) -> Option<Expr> {
        let _ = expr;
        None
    }

    /// Population variance. `None` means unsupported.
    fn variance(&self, expr: Expr) -> Option<Expr> {
        let _ = expr;
        None
    }

    /// `p`-th percentile (`p` in `[0, 1]`). `None` means unsupported.
    fn percentile(&self, expr: Expr, p: f64) -> Option<Expr> {
        let _ = (expr, p);
        None
    }

    /// Wrap `function` in an `OVER (...)` window clause.
    fn window(
        &self,
        function: Expr,
        partition_by: Vec<Expr>,
        order_by: Vec<WindowOrderBy>,
        frame: Option<WindowFrame>,
    ) -> Expr {
        let frame = if self.capabilities().supports_frame_clause {
            frame
        } else {
            None
        };
        Expr::WindowFunction {
            function: Box::new(function),
            partition_by,
            order_by,
            frame,
        }
    }

    /// Rewrite a calculated-measure SQL template before substitution, for
    /// dialects that need textual preprocessing (none of the five target
    /// dialects currently do; the default is the identity transform).
    fn preprocess_calculated_template(&self, template: &str) -> String {
        template.to_string()
    }

    /// Whether timestamps are stored as integers (epoch units) rather than
    /// a native temporal type. True only for SQLite.
    fn timestamp_storage_is_integer(&self) -> bool {
        false
    }

    /// Feature-support flags consulted before emitting stddev/variance/
    /// percentile/window/lateral-join SQL.
    fn capabilities(&self) -> DialectCapabilities;
}

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum Dialect {
    #[default]
    Postgres,
    MySql,
    SingleStore,
    Sqlite,
    DuckDb,
}

impl Dialect {
    /// Get the dialect implementation.
    pub fn dialect(&self) -> &'static dyn SqlDialect {
        match self {
            Dialect::Postgres => &Postgres,
            Dialect::MySql => &MySql,
            Dialect::SingleStore => &SingleStore,
            Dialect::Sqlite => &Sqlite,
            Dialect::DuckDb => &DuckDb,
        }
    }
}

// Delegate the whole trait to the concrete dialect so `Dialect` itself can
// be passed anywhere a `&dyn SqlDialect` or a type parameter is expected.
impl SqlDialect for Dialect {
    fn name(&self) -> &'static str {
        self.dialect().name()
    }

    fn quote_identifier(&self, ident: &str) -> String {
        self.dialect().quote_identifier(ident)
    }

    fn quote_string(&self, s: &str) -> String {
        self.dialect().quote_string(s)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        self.dialect().format_bool(b)
    }

    fn emit_limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> TokenStream {
        self.dialect().emit_limit_offset(limit, offset)
    }

    fn concat_operator(&self) -> &'static str {
        self.dialect().concat_operator()
    }

    fn supports_concat_operator(&self) -> bool {
        self.dialect().supports_concat_operator()
    }

    fn emit_recursive_keyword(&self) -> bool {
        self.dialect().emit_recursive_keyword()
    }

    fn supports_full_outer_join(&self) -> bool {
        self.dialect().supports_full_outer_join()
    }

    fn supports_nulls_ordering(&self) -> bool {
        self.dialect().supports_nulls_ordering()
    }

    fn supports_distinct_on(&self) -> bool {
        self.dialect().supports_distinct_on()
    }

    fn supports_aggregate_filter(&self) -> bool {
        self.dialect().supports_aggregate_filter()
    }

    fn supports_named_windows(&self) -> bool {
        self.dialect().supports_named_windows()
    }

    fn remap_function(&self, name: &str) -> Option<&'static str> {
        self.dialect().remap_function(name)
    }

    fn truncate_time(&self, granularity: TimeGranularity, expr: Expr) -> Expr {
        self.dialect().truncate_time(granularity, expr)
    }

    fn string_match(&self, expr: Expr, op: StringMatchOp, value: Expr) -> Expr {
        self.dialect().string_match(expr, op, value)
    }

    fn ilike_match(&self, expr: Expr, value: Expr) -> Expr {
        self.dialect().ilike_match(expr, value)
    }

    fn regex_match(&self, expr: Expr, value: Expr, negate: bool) -> Option<Expr> {
        self.dialect().regex_match(expr, value, negate)
    }

    fn cast(&self, expr: Expr, sql_type: &str) -> Expr {
        self.dialect().cast(expr, sql_type)
    }

    fn avg(&self, expr: Expr) -> Expr {
        self.dialect().avg(expr)
    }

    fn case_when(&self, cases: Vec<(Expr, Expr)>, else_branch: Option<Expr>) -> Expr {
        self.dialect().case_when(cases, else_branch)
    }

    fn coerce_filter_value(&self, value: &serde_json::Value) -> Expr {
        self.dialect().coerce_filter_value(value)
    }

    fn interval_from_iso(&self, duration: &str) -> Expr {
        self.dialect().interval_from_iso(duration)
    }

    fn time_difference_seconds(&self, end: Expr, start: Expr) -> Expr {
        self.dialect().time_difference_seconds(end, start)
    }

    fn date_add_interval(&self, ts: Expr, duration: &str) -> Expr {
        self.dialect().date_add_interval(ts, duration)
    }

    fn conditional_aggregation(&self, agg_fn: &str, expr: Expr, condition: Expr) -> Expr {
        self.dialect().conditional_aggregation(agg_fn, expr, condition)
    }

    fn stddev(&self, expr: Expr) -> Option<Expr> {
        self.dialect().stddev(expr)
    }

    fn variance(&self, expr: Expr) -> Option<Expr> {
        self.dialect().variance(expr)
    }

    fn percentile(&self, expr: Expr, p: f64) -> Option<Expr> {
        self.dialect().percentile(expr, p)
    }

    fn window(
        &self,
        function: Expr,
        partition_by: Vec<Expr>,
        order_by: Vec<WindowOrderBy>,
        frame: Option<WindowFrame>,
    ) -> Expr {
        self.dialect().window(function, partition_by, order_by, frame)
    }

    fn preprocess_calculated_template(&self, template: &str) -> String {
        self.dialect().preprocess_calculated_template(template)
    }

    fn timestamp_storage_is_integer(&self) -> bool {
        self.dialect().timestamp_storage_is_integer()
    }

    fn capabilities(&self) -> DialectCapabilities {
        self.dialect().capabilities()
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.dialect().name())
    }
}

impl std::str::FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Dialect::Postgres),
            "mysql" => Ok(Dialect::MySql),
            "singlestore" | "memsql" => Ok(Dialect::SingleStore),
            "sqlite" | "sqlite3" => Ok(Dialect::Sqlite),
            "duckdb" => Ok(Dialect::DuckDb),
            other => Err(format!("unknown dialect: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_display() {
        assert_eq!(Dialect::Postgres.to_string(), "postgres");
        assert_eq!(Dialect::MySql.to_string(), "mysql");
        assert_eq!(Dialect::SingleStore.to_string(), "singlestore");
        assert_eq!(Dialect::Sqlite.to_string(), "sqlite");
        assert_eq!(Dialect::DuckDb.to_string(), "duckdb");
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(Dialect::Postgres.quote_identifier("users"), "\"users\"");
        assert_eq!(Dialect::DuckDb.quote_identifier("users"), "\"users\"");
        assert_eq!(Dialect::Sqlite.quote_identifier("users"), "\"users\"");
        assert_eq!(Dialect::MySql.quote_identifier("users"), "`users`");
        assert_eq!(Dialect::SingleStore.quote_identifier("users"), "`users`");
    }

    #[test]
    fn test_quote_identifier_escaping() {
        assert_eq!(
            Dialect::Postgres.quote_identifier("weird\"name"),
            "\"weird\"\"name\""
        );
        assert_eq!(
            Dialect::MySql.quote_identifier("weird`name"),
            "`weird``name`"
        );
    }

    #[test]
    fn test_format_bool() {
        assert_eq!(Dialect::Postgres.format_bool(true), "true");
        assert_eq!(Dialect::DuckDb.format_bool(false), "false");
        assert_eq!(Dialect::MySql.format_bool(true), "1");
        assert_eq!(Dialect::Sqlite.format_bool(false), "0");
    }

    #[test]
    fn test_concat_operator() {
        assert_eq!(Dialect::Postgres.concat_operator(), "||");
        assert!(!Dialect::MySql.supports_concat_operator());
        assert!(!Dialect::SingleStore.supports_concat_operator());
        assert!(Dialect::Sqlite.supports_concat_operator());
    }

    #[test]
    fn test_capabilities_vary_by_dialect() {
        assert!(Dialect::Postgres.capabilities().supports_percentile);
        assert!(!Dialect::MySql.capabilities().supports_percentile);
        assert!(!Dialect::Sqlite.capabilities().supports_stddev);
        assert!(Dialect::SingleStore.capabilities().supports_lateral_joins);
        assert!(!Dialect::MySql.capabilities().supports_lateral_joins);
    }

    #[test]
    fn test_remap_function_datetime() {
        assert_eq!(Dialect::DuckDb.remap_function("STRFTIME"), None);
        assert_eq!(Dialect::Postgres.remap_function("STRFTIME"), Some("TO_CHAR"));
        assert_eq!(Dialect::MySql.remap_function("STRFTIME"), Some("DATE_FORMAT"));
    }

    #[test]
    fn test_remap_function_null_handling() {
        assert_eq!(Dialect::Postgres.remap_function("NVL"), Some("COALESCE"));
        assert_eq!(Dialect::MySql.remap_function("NVL"), Some("IFNULL"));
    }

    #[test]
    fn test_remap_function_unknown() {
        assert_eq!(Dialect::Postgres.remap_function("CUSTOM_FUNC"), None);
        assert_eq!(Dialect::MySql.remap_function("CUSTOM_FUNC"), None);
    }

    #[test]
    fn test_from_str() {
        assert_eq!("postgresql".parse::<Dialect>().unwrap(), Dialect::Postgres);
        assert_eq!("memsql".parse::<Dialect>().unwrap(), Dialect::SingleStore);
        assert!("oracle".parse::<Dialect>().is_err());
    }

    #[test]
    fn test_timestamp_storage_is_integer() {
        assert!(Dialect::Sqlite.timestamp_storage_is_integer());
        assert!(!Dialect::Postgres.timestamp_storage_is_integer());
    }
}
