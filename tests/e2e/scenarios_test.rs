#[cfg(test)]
mod tests {
    use chrono::Utc;
    use semlayer::annotate::ResultAnnotator;
    use semlayer::builder::SqlBuilder;
    use semlayer::executor::{Executor, MockExecutor, RowSet};
    use semlayer::filter::FilterCompiler;
    use semlayer::input::{FilterOperator, FilterTree, Query, SortDirection};
    use semlayer::sql::ExprExt;
    use semlayer::model::{BaseQuery, Cube, Dimension, FieldType, JoinSpec, Measure, Relationship, SecurityContext};
    use semlayer::planner::Planner;
    use semlayer::query_context::QueryContext;
    use semlayer::registry::CubeRegistry;
    use semlayer::sql::{lit_bool, Dialect};
    use serde_json::Value;
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    fn registry() -> CubeRegistry {
        let mut reg = CubeRegistry::new();
        let customers = Cube::new("Customers", Arc::new(|_| BaseQuery::table("customers", lit_bool(true))))
            .with_dimension(Dimension::new("id", FieldType::Number, "id").primary_key())
            .with_dimension(Dimension::new("plan", FieldType::String, "plan"))
            .with_join(JoinSpec::new("Orders", Relationship::HasMany, vec![("id", "customer_id")]));
        let orders = Cube::new("Orders", Arc::new(|_| BaseQuery::table("orders", lit_bool(true))))
            .with_dimension(Dimension::new("customerId", FieldType::Number, "customer_id"))
            .with_dimension(Dimension::new("status", FieldType::String, "status"))
            .with_measure(Measure::count("count"))
            .with_measure(Measure::sum("totalRevenue", "amount"));
        reg.register(customers).unwrap();
        reg.register(orders).unwrap();
        reg
    }

    async fn run_query(reg: &CubeRegistry, ctx: &QueryContext, query: &Query) -> semlayer::envelope::ResponseEnvelope {
        let planner = Planner::new(reg);
        let plan = planner.plan(query).unwrap();

        let filter_compiler = FilterCompiler::new(reg, ctx);
        let mut predicate = None;
        for filter in &query.filters {
            let compiled = filter_compiler.compile(filter, Utc::now()).unwrap();
            predicate = Some(match predicate {
                Some(existing) => ExprExt::and(existing, compiled.predicate),
                None => compiled.predicate,
            });
        }

        let builder = SqlBuilder::new(reg, ctx);
        let built = builder.build(&plan, predicate).unwrap();
        let sql = built.to_sql(ctx.dialect);

        let executor = MockExecutor::new(RowSet::new(
            vec!["Customers.plan".to_string(), "Orders.totalRevenue".to_string()],
            vec![
                vec![Value::String("pro".into()), Value::from(1000)],
                vec![Value::String("free".into()), Value::Null],
            ],
        ));
        let rows = executor.execute(&sql, &[], CancellationToken::new()).await.unwrap();

        let annotator = ResultAnnotator::new(reg, ctx);
        annotator.annotate(&plan, rows, None).unwrap()
    }

    #[tokio::test]
    async fn test_grouped_query_across_a_has_many_join_annotates_cleanly() {
        let reg = registry();
        let ctx = QueryContext::new(SecurityContext::new(), Dialect::Postgres);
        let query = Query {
            dimensions: vec!["Customers.plan".to_string()],
            measures: vec!["Orders.totalRevenue".to_string()],
            order: vec![("Customers.plan".to_string(), SortDirection::Asc)],
            ..Default::default()
        };
        let envelope = run_query(&reg, &ctx, &query).await;
        assert_eq!(envelope.data.len(), 2);
        assert_eq!(envelope.data[1]["Orders.totalRevenue"], Value::Null);
        assert!(envelope.annotation.dimensions.contains_key("Customers.plan"));
        assert!(envelope.annotation.measures.contains_key("Orders.totalRevenue"));
    }

    #[tokio::test]
    async fn test_filtered_query_threads_predicate_through_to_sql() {
        let reg = registry();
        let ctx = QueryContext::new(SecurityContext::new(), Dialect::Postgres);
        let query = Query {
            dimensions: vec!["Customers.plan".to_string()],
            measures: vec!["Orders.totalRevenue".to_string()],
            filters: vec![FilterTree::Leaf {
                member: "Orders.status".into(),
                operator: FilterOperator::Equals,
                values: Some(vec![serde_json::json!("paid")]),
                date_range: None,
            }],
            ..Default::default()
        };
        let planner = Planner::new(&reg);
        let plan = planner.plan(&query).unwrap();
        let filter_compiler = FilterCompiler::new(&reg, &ctx);
        let compiled = filter_compiler.compile(&query.filters[0], Utc::now()).unwrap();
        let builder = SqlBuilder::new(&reg, &ctx);
        let built = builder.build(&plan, Some(compiled.predicate)).unwrap();
        let sql = built.to_sql(Dialect::Postgres);
        assert!(sql.contains("WHERE"));
        assert!(sql.contains("'paid'"));
    }
}
