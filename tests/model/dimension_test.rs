#[cfg(test)]
mod tests {
    use semlayer::model::{Dimension, FieldType};

    #[test]
    fn test_dimension_defaults_title_to_name() {
        let dim = Dimension::new("signedUpAt", FieldType::Time, "signed_up_at");
        assert_eq!(dim.title, "signedUpAt");
        assert_eq!(dim.short_title, "signedUpAt");
        assert!(!dim.primary_key);
        assert!(dim.is_time());
    }

    #[test]
    fn test_dimension_builder_overrides() {
        let dim = Dimension::new("id", FieldType::Number, "id")
            .primary_key()
            .title("Customer ID")
            .short_title("ID")
            .drill_members(vec!["name".to_string(), "email".to_string()]);

        assert!(dim.primary_key);
        assert_eq!(dim.title, "Customer ID");
        assert_eq!(dim.short_title, "ID");
        assert_eq!(dim.drill_members.len(), 2);
        assert!(!dim.is_time());
    }

    #[test]
    fn test_non_time_field_types_report_false_for_is_time() {
        for field_type in [FieldType::String, FieldType::Number, FieldType::Boolean] {
            let dim = Dimension::new("x", field_type, "x");
            assert!(!dim.is_time());
        }
    }
}
