#[cfg(test)]
mod tests {
    use semlayer::annotate::ResultAnnotator;
    use semlayer::executor::RowSet;
    use semlayer::input::{SortDirection, TimeDimensionInput};
    use semlayer::model::{BaseQuery, Cube, Dimension, FieldType, Measure, SecurityContext};
    use semlayer::planner::Planner;
    use semlayer::query_context::QueryContext;
    use semlayer::registry::CubeRegistry;
    use semlayer::sql::{lit_bool, Dialect, TimeGranularity};
    use serde_json::Value;
    use std::sync::Arc;

    fn registry() -> CubeRegistry {
        let mut reg = CubeRegistry::new();
        let orders = Cube::new("Orders", Arc::new(|_| BaseQuery::table("orders", lit_bool(true))))
            .with_dimension(Dimension::new("status", FieldType::String, "status"))
            .with_dimension(Dimension::new("placedAt", FieldType::Time, "placed_at"))
            .with_measure(Measure::sum("totalRevenue", "amount"));
        reg.register(orders).unwrap();
        reg
    }

    #[test]
    fn test_time_dimension_column_is_annotated_with_granularity() {
        let reg = registry();
        let ctx = QueryContext::new(SecurityContext::new(), Dialect::Postgres);
        let planner = Planner::new(&reg);
        let plan = planner
            .plan(&semlayer::input::Query {
                time_dimensions: vec![TimeDimensionInput {
                    dimension: "Orders.placedAt".to_string(),
                    granularity: Some(TimeGranularity::Day),
                    date_range: None,
                }],
                measures: vec!["Orders.totalRevenue".to_string()],
                ..Default::default()
            })
            .unwrap();
        let annotator = ResultAnnotator::new(&reg, &ctx);
        let rows = RowSet::new(
            vec!["Orders.placedAt.day".to_string(), "Orders.totalRevenue".to_string()],
            vec![],
        );
        let envelope = annotator.annotate(&plan, rows, None).unwrap();
        let entry = envelope
            .annotation
            .time_dimensions
            .get("Orders.placedAt.day")
            .expect("time dimension entry present");
        assert_eq!(entry.granularity, Some(TimeGranularity::Day));
    }

    #[test]
    fn test_epoch_seconds_are_canonicalized_to_rfc3339() {
        let reg = registry();
        let ctx = QueryContext::new(SecurityContext::new(), Dialect::Sqlite);
        let planner = Planner::new(&reg);
        let plan = planner
            .plan(&semlayer::input::Query {
                time_dimensions: vec![TimeDimensionInput {
                    dimension: "Orders.placedAt".to_string(),
                    granularity: Some(TimeGranularity::Day),
                    date_range: None,
                }],
                ..Default::default()
            })
            .unwrap();
        let annotator = ResultAnnotator::new(&reg, &ctx);
        let rows = RowSet::new(
            vec!["Orders.placedAt.day".to_string()],
            vec![vec![Value::from(1_700_000_000_i64)]],
        );
        let envelope = annotator.annotate(&plan, rows, None).unwrap();
        let rendered = envelope.data[0]["Orders.placedAt.day"].as_str().unwrap().to_string();
        assert!(rendered.contains('T'));
        assert!(rendered.ends_with('Z') || rendered.contains('+'));
    }

    #[test]
    fn test_mismatched_row_width_errors() {
        let reg = registry();
        let ctx = QueryContext::new(SecurityContext::new(), Dialect::Postgres);
        let planner = Planner::new(&reg);
        let plan = planner
            .plan(&semlayer::input::Query {
                dimensions: vec!["Orders.status".to_string()],
                measures: vec!["Orders.totalRevenue".to_string()],
                order: vec![("Orders.status".to_string(), SortDirection::Asc)],
                ..Default::default()
            })
            .unwrap();
        let annotator = ResultAnnotator::new(&reg, &ctx);
        let rows = RowSet::new(
            vec!["Orders.status".to_string(), "Orders.totalRevenue".to_string()],
            vec![vec![Value::String("paid".into())]],
        );
        assert!(annotator.annotate(&plan, rows, None).is_err());
    }

    #[test]
    fn test_total_passes_through_unchanged() {
        let reg = registry();
        let ctx = QueryContext::new(SecurityContext::new(), Dialect::Postgres);
        let planner = Planner::new(&reg);
        let plan = planner
            .plan(&semlayer::input::Query {
                dimensions: vec!["Orders.status".to_string()],
                ..Default::default()
            })
            .unwrap();
        let annotator = ResultAnnotator::new(&reg, &ctx);
        let rows = RowSet::new(vec!["Orders.status".to_string()], vec![]);
        let envelope = annotator.annotate(&plan, rows, Some(42)).unwrap();
        assert_eq!(envelope.total, Some(42));
    }
}
