//! SQL generation module.
//!
//! This module provides a type-safe, dialect-agnostic SQL builder:
//!
//! - [`query`] - SELECT query builder (CTEs, joins, set operations)
//! - [`expr`] - Expression AST and builder DSL
//! - [`token`] - Token types for SQL generation
//! - [`dialect`] - SQL dialect implementations (Postgres, MySQL, SingleStore, SQLite, DuckDB)

pub mod dialect;
pub mod expr;
pub mod query;
pub mod token;

// Re-export commonly used types at the sql module level
pub use dialect::{
    Dialect, DialectCapabilities, SqlDialect, StringMatchOp, TimeGranularity,
};
pub use expr::{
    agg_filter, avg, cast, coalesce, col, count, count_distinct, count_star, cume_dist,
    dense_rank, first_value, func, interval, lag, lag_default, lag_offset, last_value, lead,
    lead_default, lead_offset, lit_bool, lit_float, lit_int, lit_null, lit_str, max, min, nth_value,
    ntile, ordered_set_agg, percent_rank, rank, raw_sql, row_number, star, sum, table_col,
    table_star, BinaryOperator, Expr, ExprExt, Literal, NullsOrder as ExprNullsOrder, SortDir as ExprSortDir,
    UnaryOperator, WindowBuilder, WindowExt, WindowFrame, WindowFrameBound, WindowFrameKind,
    WindowOrderBy,
};
pub use query::{
    Cte, Join, JoinType, LimitOffset, NullsOrder, OrderByExpr, Query, SelectExpr, SetOpType,
    SetOperation, SortDir, TableRef,
};
pub use token::{Token, TokenStream};
