#[cfg(test)]
mod tests {
    use semlayer::input::{Query, TimeDimensionInput};
    use semlayer::model::{BaseQuery, Cube, Dimension, FieldType, JoinSpec, Measure, Relationship};
    use semlayer::planner::Planner;
    use semlayer::registry::CubeRegistry;
    use semlayer::sql::{lit_bool, TimeGranularity};
    use std::sync::Arc;

    fn registry() -> CubeRegistry {
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
            .with_dimension(Dimension::new("hiredAt", FieldType::Time, "hired_at"))
            .with_measure(Measure::count("count"))
            .with_measure(Measure::sum("totalSalary", "salary"));
        reg.register(departments).unwrap();
        reg.register(employees).unwrap();
        reg
    }

    #[test]
    fn test_has_many_join_with_measure_gets_preagg_cte() {
        let reg = registry();
        let planner = Planner::new(&reg);
        let query = Query {
            dimensions: vec!["Departments.name".to_string()],
            measures: vec!["Employees.totalSalary".to_string()],
            ..Default::default()
        };
        let plan = planner.plan(&query).unwrap();
        let preagg = plan.joins[0].pre_aggregated.as_ref().unwrap();
        assert_eq!(preagg.cube, "Employees");
        assert_eq!(preagg.cte_name, "employees_agg");
        assert_eq!(preagg.group_by_columns, vec!["department_id".to_string()]);
        assert_eq!(preagg.measures, vec!["Employees.totalSalary".to_string()]);
    }

    #[test]
    fn test_has_many_join_without_dependent_measures_skips_preagg() {
        let reg = registry();
        let planner = Planner::new(&reg);
        let query = Query {
            dimensions: vec!["Departments.name".to_string()],
            ..Default::default()
        };
        let plan = planner.plan(&query).unwrap();
        assert!(plan.joins.is_empty());
    }

    #[test]
    fn test_reversed_join_uses_source_column_for_group_by() {
        let reg = registry();
        let planner = Planner::new(&reg);
        let query = Query {
            dimensions: vec!["Employees.departmentId".to_string()],
            measures: vec!["Employees.totalSalary".to_string()],
            cubes: Some(vec!["Employees".to_string(), "Departments".to_string()]),
            ..Default::default()
        };
        let plan = planner.plan(&query).unwrap();
        assert_eq!(plan.primary_cube, "Employees");
        // Employees is the dependent side here, so no pre-aggregation is needed
        // to reach Departments (a belongsTo traversal, not hasMany).
        assert!(plan.joins.is_empty() || plan.joins[0].pre_aggregated.is_none());
    }

    #[test]
    fn test_preagg_cte_carries_co_requested_dimension_and_time_dimension() {
        let reg = registry();
        let planner = Planner::new(&reg);
        let query = Query {
            dimensions: vec!["Departments.name".to_string(), "Employees.title".to_string()],
            time_dimensions: vec![TimeDimensionInput {
                dimension: "Employees.hiredAt".to_string(),
                granularity: Some(TimeGranularity::Month),
                date_range: None,
            }],
            measures: vec!["Employees.totalSalary".to_string()],
            ..Default::default()
        };
        let plan = planner.plan(&query).unwrap();
        let preagg = plan.joins[0].pre_aggregated.as_ref().unwrap();
        assert_eq!(preagg.dimensions.len(), 2);
        assert!(preagg.dimensions.iter().any(|d| d.alias == "Employees.title" && d.member == "title"));
        let time_dim = preagg
            .dimensions
            .iter()
            .find(|d| d.alias == "Employees.hiredAt.month")
            .expect("time dimension carried into the preagg CTE");
        assert_eq!(time_dim.member, "hiredAt");
        assert_eq!(time_dim.granularity, Some(TimeGranularity::Month));
    }
}
