#[cfg(test)]
mod tests {
    use semlayer::sql::{col, count_star, lit_int, Dialect, ExprExt, SqlDialect};

    #[test]
    fn test_quote_identifier_varies_by_dialect() {
        assert_eq!(Dialect::Postgres.quote_identifier("user"), "\"user\"");
        assert_eq!(Dialect::MySql.quote_identifier("user"), "`user`");
        assert_eq!(Dialect::Sqlite.quote_identifier("user"), "\"user\"");
    }

    #[test]
    fn test_capabilities_lateral_joins_per_dialect() {
        assert!(Dialect::Postgres.capabilities().supports_lateral_joins);
        assert!(!Dialect::MySql.capabilities().supports_lateral_joins);
        assert!(Dialect::SingleStore.capabilities().supports_lateral_joins);
        assert!(!Dialect::Sqlite.capabilities().supports_lateral_joins);
        assert!(Dialect::DuckDb.capabilities().supports_lateral_joins);
    }

    #[test]
    fn test_sqlite_lacks_stddev_variance_percentile() {
        let caps = Dialect::Sqlite.capabilities();
        assert!(!caps.supports_stddev);
        assert!(!caps.supports_variance);
        assert!(!caps.supports_percentile);
    }

    #[test]
    fn test_conditional_aggregation_uses_filter_clause_where_supported() {
        let expr = Dialect::Postgres.conditional_aggregation(
            "COUNT",
            lit_int(1),
            col("converted").eq(semlayer::sql::lit_bool(true)),
        );
        let sql = expr.to_tokens_for_dialect(Dialect::Postgres).serialize(Dialect::Postgres);
        assert!(sql.contains("FILTER"));
    }

    #[test]
    fn test_conditional_aggregation_falls_back_to_case_when_on_mysql() {
        let expr = Dialect::MySql.conditional_aggregation(
            "COUNT",
            lit_int(1),
            col("converted").eq(semlayer::sql::lit_bool(true)),
        );
        let sql = expr.to_tokens_for_dialect(Dialect::MySql).serialize(Dialect::MySql);
        assert!(sql.contains("CASE WHEN"));
        assert!(!sql.contains("FILTER"));
    }

    #[test]
    fn test_count_star_renders_identically_across_dialects() {
        let expr = count_star();
        for dialect in [Dialect::Postgres, Dialect::MySql, Dialect::Sqlite, Dialect::DuckDb] {
            let sql = expr.to_tokens_for_dialect(dialect).serialize(dialect);
            assert_eq!(sql, "COUNT(*)");
        }
    }
}
