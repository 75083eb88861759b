#[cfg(test)]
mod tests {
    use semlayer::builder::SqlBuilder;
    use semlayer::filter::FilterCompiler;
    use semlayer::input::{FilterOperator, FilterTree, Query};
    use semlayer::model::{
        BaseQuery, Cube, Dimension, FieldType, JoinSpec, Measure, Relationship, SecurityContext,
    };
    use semlayer::planner::Planner;
    use semlayer::query_context::QueryContext;
    use semlayer::registry::CubeRegistry;
    use semlayer::sql::{col, lit_bool, lit_str, Dialect, ExprExt};
    use std::sync::Arc;

    fn registry() -> CubeRegistry {
        let mut reg = CubeRegistry::new();
        let orders = Cube::new("Orders", Arc::new(|_| BaseQuery::table("orders", lit_bool(true))))
            .with_dimension(Dimension::new("status", FieldType::String, "status"))
            .with_measure(Measure::count("count"))
            .with_measure(Measure::sum("totalRevenue", "amount"))
            .with_measure(
                Measure::sum("paidRevenue", "amount")
                    .filter(Arc::new(|_ctx| col("status").eq(lit_str("paid")))),
            )
            .with_measure(Measure::calculated(
                "averageOrderValue",
                "{Orders.totalRevenue} / {Orders.count}",
            ));
        reg.register(orders).unwrap();
        reg
    }

    #[test]
    fn test_calculated_measure_expands_into_division_of_siblings() {
        let reg = registry();
        let ctx = QueryContext::new(SecurityContext::new(), Dialect::Postgres);
        let planner = Planner::new(&reg);
        let plan = planner
            .plan(&Query {
                measures: vec!["Orders.averageOrderValue".to_string()],
                ..Default::default()
            })
            .unwrap();
        let builder = SqlBuilder::new(&reg, &ctx);
        let built = builder.build(&plan, None).unwrap();
        let sql = built.to_sql(Dialect::Postgres);
        assert!(sql.contains("SUM"));
        assert!(sql.contains("COUNT"));
        assert!(sql.contains('/'));
    }

    #[test]
    fn test_measure_row_filter_narrows_the_aggregated_column_not_the_where_clause() {
        let reg = registry();
        let ctx = QueryContext::new(SecurityContext::new(), Dialect::Postgres);
        let planner = Planner::new(&reg);
        let plan = planner
            .plan(&Query {
                measures: vec!["Orders.totalRevenue".to_string(), "Orders.paidRevenue".to_string()],
                ..Default::default()
            })
            .unwrap();
        let builder = SqlBuilder::new(&reg, &ctx);
        let built = builder.build(&plan, None).unwrap();
        let sql = built.to_sql(Dialect::Postgres);
        // the unfiltered measure sees the bare column...
        assert!(sql.contains("SUM(\"Orders\".\"amount\")"));
        // ...while the filtered one narrows via CASE WHEN rather than the
        // query's own WHERE clause, which stays absent here.
        assert!(sql.contains("CASE WHEN"));
        assert!(!sql.contains("WHERE"));
    }

    #[test]
    fn test_filter_predicate_lands_in_where_clause() {
        let reg = registry();
        let ctx = QueryContext::new(SecurityContext::new(), Dialect::Postgres);
        let planner = Planner::new(&reg);
        let plan = planner
            .plan(&Query {
                dimensions: vec!["Orders.status".to_string()],
                measures: vec!["Orders.count".to_string()],
                ..Default::default()
            })
            .unwrap();

        let filter_compiler = FilterCompiler::new(&reg, &ctx);
        let tree = FilterTree::Leaf {
            member: "Orders.status".into(),
            operator: FilterOperator::Equals,
            values: Some(vec![serde_json::json!("paid")]),
            date_range: None,
        };
        let compiled = filter_compiler.compile(&tree, chrono::Utc::now()).unwrap();

        let builder = SqlBuilder::new(&reg, &ctx);
        let built = builder.build(&plan, Some(compiled.predicate)).unwrap();
        let sql = built.to_sql(Dialect::Postgres);
        assert!(sql.contains("WHERE"));
        assert!(sql.contains("'paid'"));
    }

    #[test]
    fn test_same_plan_renders_differently_per_dialect() {
        let reg = registry();
        let planner = Planner::new(&reg);
        let plan = planner
            .plan(&Query {
                dimensions: vec!["Orders.status".to_string()],
                measures: vec!["Orders.count".to_string()],
                ..Default::default()
            })
            .unwrap();

        let pg_ctx = QueryContext::new(SecurityContext::new(), Dialect::Postgres);
        let pg_sql = SqlBuilder::new(&reg, &pg_ctx)
            .build(&plan, None)
            .unwrap()
            .to_sql(Dialect::Postgres);

        let mysql_ctx = QueryContext::new(SecurityContext::new(), Dialect::MySql);
        let mysql_sql = SqlBuilder::new(&reg, &mysql_ctx)
            .build(&plan, None)
            .unwrap()
            .to_sql(Dialect::MySql);

        assert!(pg_sql.contains('"'));
        assert!(mysql_sql.contains('`'));
        assert_ne!(pg_sql, mysql_sql);
    }

    fn has_many_registry() -> CubeRegistry {
        let mut reg = CubeRegistry::new();
        let departments = Cube::new("Departments", Arc::new(|_| BaseQuery::table("departments", lit_bool(true))))
            .with_dimension(Dimension::new("id", FieldType::Number, "id").primary_key())
            .with_dimension(Dimension::new("name", FieldType::String, "name"))
            .with_join(JoinSpec::new(
                "Employees",
                Relationship::HasMany,
                vec![("id", "department_id")],
            ));
        let employees = Cube::new("Employees", Arc::new(|_| BaseQuery::table("employees", lit_bool(true))))
            .with_dimension(Dimension::new("departmentId", FieldType::Number, "department_id"))
            .with_dimension(Dimension::new("title", FieldType::String, "title"))
            .with_measure(Measure::sum("totalSalary", "salary"));
        reg.register(departments).unwrap();
        reg.register(employees).unwrap();
        reg
    }

    #[test]
    fn test_dependent_side_dimension_is_read_from_the_preagg_cte_not_a_dangling_alias() {
        let reg = has_many_registry();
        let ctx = QueryContext::new(SecurityContext::new(), Dialect::Postgres);
        let planner = Planner::new(&reg);
        let plan = planner
            .plan(&Query {
                dimensions: vec!["Departments.name".to_string(), "Employees.title".to_string()],
                measures: vec!["Employees.totalSalary".to_string()],
                ..Default::default()
            })
            .unwrap();
        let builder = SqlBuilder::new(&reg, &ctx);
        let built = builder.build(&plan, None).unwrap();
        let sql = built.to_sql(Dialect::Postgres);

        // The Employees table itself is never joined once it's pre-aggregated;
        // the title dimension must come off the "employees_agg" CTE alias.
        assert!(sql.contains("employees_agg"));
        assert!(!sql.contains("\"Employees\""));
    }
}
