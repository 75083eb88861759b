#[cfg(test)]
mod tests {
    use chrono::Utc;
    use semlayer::analyses::{FlowCompiler, FlowPlan, FlowQuery, JoinStrategy};
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

    fn other_registry() -> CubeRegistry {
        let mut reg = CubeRegistry::new();
        let events = Cube::new("Events", Arc::new(|_| BaseQuery::table("events", lit_bool(true))))
            .with_dimension(Dimension::new("userId", FieldType::Number, "user_id"))
            .with_dimension(Dimension::new("occurredAt", FieldType::Time, "occurred_at"))
            .with_dimension(Dimension::new("name", FieldType::String, "name"));
        let sessions = Cube::new("Sessions", Arc::new(|_| BaseQuery::table("sessions", lit_bool(true))))
            .with_dimension(Dimension::new("userId", FieldType::Number, "user_id"));
        reg.register(events).unwrap();
        reg.register(sessions).unwrap();
        reg
    }

    fn base_query() -> FlowQuery {
        FlowQuery {
            binding_key: "Events.userId".into(),
            time_dimension: "Events.occurredAt".into(),
            event_dimension: "Events.name".into(),
            starting_step: FilterTree::Leaf {
                member: "Events.name".into(),
                operator: FilterOperator::Equals,
                values: Some(vec![serde_json::json!("signup")]),
                date_range: None,
            },
            steps_before: 0,
            steps_after: 3,
            join_strategy: JoinStrategy::Window,
        }
    }

    #[test]
    fn test_cross_cube_members_are_rejected() {
        let reg = other_registry();
        let ctx = QueryContext::new(SecurityContext::new(), Dialect::Postgres);
        let compiler = FlowCompiler::new(&reg, &ctx);
        let mut q = base_query();
        q.binding_key = "Sessions.userId".into();
        assert!(compiler.compile(&q, Utc::now()).is_err());
    }

    #[test]
    fn test_window_plan_uses_row_number_and_lag() {
        let reg = registry();
        let ctx = QueryContext::new(SecurityContext::new(), Dialect::Postgres);
        let compiler = FlowCompiler::new(&reg, &ctx);
        let plan = compiler.compile(&base_query(), Utc::now()).unwrap();
        match plan {
            FlowPlan::Window(query) => {
                let sql = query.to_sql(Dialect::Postgres);
                assert!(sql.contains("ROW_NUMBER"));
            }
            FlowPlan::Lateral(_) => panic!("expected window plan"),
        }
    }

    #[test]
    fn test_zero_steps_before_and_after_still_compiles() {
        let reg = registry();
        let ctx = QueryContext::new(SecurityContext::new(), Dialect::Postgres);
        let compiler = FlowCompiler::new(&reg, &ctx);
        let mut q = base_query();
        q.steps_before = 0;
        q.steps_after = 0;
        assert!(compiler.compile(&q, Utc::now()).is_ok());
    }
}
