#[cfg(test)]
mod tests {
    use semlayer::input::{Query, SortDirection, TimeDimensionInput};
    use semlayer::model::{BaseQuery, Cube, Dimension, FieldType, JoinSpec, Measure, Relationship};
    use semlayer::planner::Planner;
    use semlayer::registry::CubeRegistry;
    use semlayer::sql::{lit_bool, TimeGranularity};
    use std::sync::Arc;

    fn registry() -> CubeRegistry {
        let mut reg = CubeRegistry::new();
        let customers = Cube::new("Customers", Arc::new(|_| BaseQuery::table("customers", lit_bool(true))))
            .with_dimension(Dimension::new("id", FieldType::Number, "id").primary_key())
            .with_dimension(Dimension::new("name", FieldType::String, "name"))
            .with_dimension(Dimension::new("signedUpAt", FieldType::Time, "signed_up_at"))
            .with_join(JoinSpec::new("Orders", Relationship::HasMany, vec![("id", "customer_id")]));
        let orders = Cube::new("Orders", Arc::new(|_| BaseQuery::table("orders", lit_bool(true))))
            .with_dimension(Dimension::new("customerId", FieldType::Number, "customer_id"))
            .with_dimension(Dimension::new("status", FieldType::String, "status"))
            .with_measure(Measure::count("count"));
        reg.register(customers).unwrap();
        reg.register(orders).unwrap();
        reg
    }

    #[test]
    fn test_select_includes_dimensions_time_dimensions_and_measures_in_order() {
        let reg = registry();
        let planner = Planner::new(&reg);
        let query = Query {
            dimensions: vec!["Customers.name".to_string()],
            time_dimensions: vec![TimeDimensionInput {
                dimension: "Customers.signedUpAt".to_string(),
                granularity: Some(TimeGranularity::Month),
                date_range: None,
            }],
            measures: vec!["Orders.count".to_string()],
            ..Default::default()
        };
        let plan = planner.plan(&query).unwrap();
        assert_eq!(plan.select.len(), 3);
        assert!(!plan.select[0].is_measure);
        assert_eq!(plan.select[1].alias, "Customers.signedUpAt.month");
        assert!(plan.select[2].is_measure);
    }

    #[test]
    fn test_order_by_carries_descending_flag() {
        let reg = registry();
        let planner = Planner::new(&reg);
        let query = Query {
            dimensions: vec!["Customers.name".to_string()],
            order: vec![("Customers.name".to_string(), SortDirection::Desc)],
            ..Default::default()
        };
        let plan = planner.plan(&query).unwrap();
        assert_eq!(plan.order_by.len(), 1);
        assert!(plan.order_by[0].descending);
    }

    #[test]
    fn test_measure_reference_to_a_dimension_errors() {
        let reg = registry();
        let planner = Planner::new(&reg);
        let query = Query {
            measures: vec!["Customers.name".to_string()],
            ..Default::default()
        };
        assert!(planner.plan(&query).is_err());
    }

    #[test]
    fn test_participating_cubes_includes_primary_and_joins() {
        let reg = registry();
        let planner = Planner::new(&reg);
        let query = Query {
            dimensions: vec!["Customers.name".to_string()],
            measures: vec!["Orders.count".to_string()],
            ..Default::default()
        };
        let plan = planner.plan(&query).unwrap();
        assert_eq!(plan.participating_cubes, vec!["Customers".to_string(), "Orders".to_string()]);
    }
}
