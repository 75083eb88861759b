#[cfg(test)]
mod tests {
    use chrono::Utc;
    use semlayer::analyses::{FunnelCompiler, FunnelQuery, FunnelStep};
    use semlayer::input::{FilterOperator, FilterTree};
    use semlayer::model::{BaseQuery, Cube, Dimension, FieldType, SecurityContext};
    use semlayer::query_context::QueryContext;
    use semlayer::registry::CubeRegistry;
    use semlayer::sql::{lit_bool, Dialect};
    use std::sync::Arc;

    fn registry() -> CubeRegistry {
        let mut reg = CubeRegistry::new();
        let events = Cube::new("Events", Arc::new(|_| BaseQuery::table("events", lit_bool(true))))
            .with_dimension(Dimension::new("userId", FieldType::Number, "user_id"))
            .with_dimension(Dimension::new("occurredAt", FieldType::Time, "occurred_at"))
            .with_dimension(Dimension::new("name", FieldType::String, "name"));
        reg.register(events).unwrap();
        reg
    }

    fn step(name: &str, event: &str) -> FunnelStep {
        FunnelStep::new(name).with_filter(FilterTree::Leaf {
            member: "Events.name".into(),
            operator: FilterOperator::Equals,
            values: Some(vec![serde_json::json!(event)]),
            date_range: None,
        })
    }

    #[test]
    fn test_unknown_binding_key_errors() {
        let reg = registry();
        let ctx = QueryContext::new(SecurityContext::new(), Dialect::Postgres);
        let compiler = FunnelCompiler::new(&reg, &ctx);
        let query = FunnelQuery {
            steps: vec![step("Signed up", "signup"), step("Activated", "activate")],
            binding_key: "Events.missing".into(),
            time_dimension: "Events.occurredAt".into(),
            include_time_metrics: false,
        };
        assert!(compiler.compile(&query, Utc::now()).is_err());
    }

    #[test]
    fn test_conversion_rate_present_for_every_step_after_the_first() {
        let reg = registry();
        let ctx = QueryContext::new(SecurityContext::new(), Dialect::Postgres);
        let compiler = FunnelCompiler::new(&reg, &ctx);
        let query = FunnelQuery {
            steps: vec![
                step("Signed up", "signup"),
                step("Activated", "activate"),
                step("Purchased", "purchase"),
            ],
            binding_key: "Events.userId".into(),
            time_dimension: "Events.occurredAt".into(),
            include_time_metrics: false,
        };
        let plan = compiler.compile(&query, Utc::now()).unwrap();
        let sql = plan.to_sql(Dialect::Postgres);
        assert!(sql.contains("Activated.conversionRate"));
        assert!(sql.contains("Purchased.conversionRate"));
        assert!(!sql.contains("Signed up.conversionRate"));
    }

    #[test]
    fn test_time_to_convert_bounds_the_join_with_an_interval() {
        let reg = registry();
        let ctx = QueryContext::new(SecurityContext::new(), Dialect::Postgres);
        let compiler = FunnelCompiler::new(&reg, &ctx);
        let query = FunnelQuery {
            steps: vec![
                step("Signed up", "signup"),
                step("Activated", "activate").with_time_to_convert("P7D"),
            ],
            binding_key: "Events.userId".into(),
            time_dimension: "Events.occurredAt".into(),
            include_time_metrics: false,
        };
        let plan = compiler.compile(&query, Utc::now()).unwrap();
        let sql = plan.to_sql(Dialect::Postgres);
        assert!(sql.contains("INTERVAL") || sql.contains("P7D"));
    }

    #[test]
    fn test_avg_time_to_convert_omitted_when_not_requested() {
        let reg = registry();
        let ctx = QueryContext::new(SecurityContext::new(), Dialect::Postgres);
        let compiler = FunnelCompiler::new(&reg, &ctx);
        let query = FunnelQuery {
            steps: vec![step("Signed up", "signup"), step("Activated", "activate")],
            binding_key: "Events.userId".into(),
            time_dimension: "Events.occurredAt".into(),
            include_time_metrics: false,
        };
        let plan = compiler.compile(&query, Utc::now()).unwrap();
        assert_eq!(plan.select.len(), 3);
    }
}
