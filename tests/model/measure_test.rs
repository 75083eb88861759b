#[cfg(test)]
mod tests {
    use semlayer::model::{Measure, MeasureFormat, MeasureKind};

    #[test]
    fn test_count_measure_has_no_sql() {
        let measure = Measure::count("count");
        assert!(matches!(measure.kind, MeasureKind::Count));
        assert!(measure.sql.is_none());
        assert!(!measure.requires_sql());
    }

    #[test]
    fn test_sum_measure_carries_sql_and_requires_it() {
        let measure = Measure::sum("totalRevenue", "amount");
        assert!(matches!(measure.kind, MeasureKind::Sum));
        assert_eq!(measure.sql.as_deref(), Some("amount"));
        assert!(measure.requires_sql());
    }

    #[test]
    fn test_calculated_measure_carries_template_not_sql() {
        let measure = Measure::calculated("averageOrderValue", "{Orders.totalRevenue} / {Orders.count}");
        assert!(measure.is_calculated());
        assert!(measure.sql.is_none());
        assert!(!measure.requires_sql());
        match &measure.kind {
            MeasureKind::Calculated(template) => assert!(template.contains("{Orders.count}")),
            other => panic!("expected Calculated, got {other:?}"),
        }
    }

    #[test]
    fn test_builder_methods_set_title_and_format() {
        let measure = Measure::sum("totalRevenue", "amount")
            .title("Total Revenue")
            .short_title("Revenue")
            .format(MeasureFormat::Currency);
        assert_eq!(measure.title, "Total Revenue");
        assert_eq!(measure.short_title, "Revenue");
        assert_eq!(measure.format, Some(MeasureFormat::Currency));
    }
}
