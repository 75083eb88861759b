#[cfg(test)]
mod tests {
    use chrono::Utc;
    use semlayer::analyses::{RetentionCompiler, RetentionQuery, RetentionType};
    use semlayer::input::{DateRangeInput, FilterOperator, FilterTree};
    use semlayer::model::{BaseQuery, Cube, Dimension, FieldType, SecurityContext};
    use semlayer::query_context::QueryContext;
    use semlayer::registry::CubeRegistry;
    use semlayer::sql::{lit_bool, Dialect, TimeGranularity};
    use std::sync::Arc;

    fn registry() -> CubeRegistry {
        let mut reg = CubeRegistry::new();
        let events = Cube::new("Events", Arc::new(|_| BaseQuery::table("events", lit_bool(true))))
            .with_dimension(Dimension::new("id", FieldType::Number, "id").primary_key())
            .with_dimension(Dimension::new("occurredAt", FieldType::Time, "occurred_at"))
            .with_dimension(Dimension::new("plan", FieldType::String, "plan"))
            .with_dimension(Dimension::new("name", FieldType::String, "name"));
        reg.register(events).unwrap();
        reg
    }

    fn base_query() -> RetentionQuery {
        RetentionQuery {
            cube: "Events".into(),
            time_dimension: "Events.occurredAt".into(),
            date_range: DateRangeInput::Relative("last 30 days".into()),
            granularity: TimeGranularity::Week,
            periods: 8,
            retention_type: RetentionType::Classic,
            cohort_filters: vec![FilterTree::Leaf {
                member: "Events.name".into(),
                operator: FilterOperator::Equals,
                values: Some(vec![serde_json::json!("signup")]),
                date_range: None,
            }],
            activity_filters: vec![],
            breakdown_dimensions: vec![],
        }
    }

    #[test]
    fn test_cube_without_primary_key_errors() {
        let mut reg = CubeRegistry::new();
        let events = Cube::new("Events", Arc::new(|_| BaseQuery::table("events", lit_bool(true))))
            .with_dimension(Dimension::new("occurredAt", FieldType::Time, "occurred_at"))
            .with_dimension(Dimension::new("name", FieldType::String, "name"));
        reg.register(events).unwrap();
        let ctx = QueryContext::new(SecurityContext::new(), Dialect::Postgres);
        let compiler = RetentionCompiler::new(&reg, &ctx);
        assert!(compiler.compile(&base_query(), Utc::now()).is_err());
    }

    #[test]
    fn test_final_select_includes_retention_rate_and_granularity_tag() {
        let reg = registry();
        let ctx = QueryContext::new(SecurityContext::new(), Dialect::Postgres);
        let compiler = RetentionCompiler::new(&reg, &ctx);
        let query = compiler.compile(&base_query(), Utc::now()).unwrap();
        let sql = query.to_sql(Dialect::Postgres);
        assert!(sql.contains("retentionRate"));
        assert!(sql.contains("'week'") || sql.contains("granularity"));
    }

    #[test]
    fn test_breakdown_dimension_adds_a_join_column() {
        let reg = registry();
        let ctx = QueryContext::new(SecurityContext::new(), Dialect::Postgres);
        let compiler = RetentionCompiler::new(&reg, &ctx);
        let mut q = base_query();
        q.breakdown_dimensions = vec!["Events.plan".to_string()];
        let query = compiler.compile(&q, Utc::now()).unwrap();
        let sql = query.to_sql(Dialect::Postgres);
        assert!(sql.contains("Events.plan") || sql.contains("plan"));
    }

    #[test]
    fn test_rolling_retention_adds_a_periods_cte() {
        let reg = registry();
        let ctx = QueryContext::new(SecurityContext::new(), Dialect::Postgres);
        let compiler = RetentionCompiler::new(&reg, &ctx);
        let mut q = base_query();
        q.retention_type = RetentionType::Rolling;
        let query = compiler.compile(&q, Utc::now()).unwrap();
        assert_eq!(query.with.len(), 5);
        assert!(query.with.iter().any(|c| c.name == "rt_periods"));
    }
}
