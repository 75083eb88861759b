#[cfg(test)]
mod tests {
    use chrono::Utc;
    use semlayer::filter::FilterCompiler;
    use semlayer::input::{DateRangeInput, FilterOperator, FilterTree};
    use semlayer::model::{BaseQuery, Cube, Dimension, FieldType, SecurityContext};
    use semlayer::query_context::QueryContext;
    use semlayer::registry::CubeRegistry;
    use semlayer::sql::{lit_bool, Dialect};
    use std::sync::Arc;

    fn registry() -> CubeRegistry {
        let mut reg = CubeRegistry::new();
        let cube = Cube::new("Orders", Arc::new(|_| BaseQuery::table("orders", lit_bool(true))))
            .with_dimension(Dimension::new("status", FieldType::String, "status"))
            .with_dimension(Dimension::new("amount", FieldType::Number, "amount"))
            .with_dimension(Dimension::new("createdAt", FieldType::Time, "created_at"));
        reg.register(cube).unwrap();
        reg
    }

    fn ctx() -> QueryContext {
        QueryContext::new(SecurityContext::new(), Dialect::Postgres)
    }

    fn leaf(member: &str, operator: FilterOperator, value: serde_json::Value) -> FilterTree {
        FilterTree::Leaf {
            member: member.into(),
            operator,
            values: Some(vec![value]),
            date_range: None,
        }
    }

    #[test]
    fn test_and_combines_siblings_with_and() {
        let reg = registry();
        let ctx = ctx();
        let compiler = FilterCompiler::new(&reg, &ctx);
        let tree = FilterTree::And {
            and: vec![
                leaf("Orders.status", FilterOperator::Equals, serde_json::json!("paid")),
                leaf("Orders.amount", FilterOperator::Gt, serde_json::json!(100)),
            ],
        };
        let compiled = compiler.compile(&tree, Utc::now()).unwrap();
        let sql = compiled.predicate.to_tokens().serialize(Dialect::Postgres);
        assert!(sql.contains(" AND "));
    }

    #[test]
    fn test_or_combines_siblings_with_or() {
        let reg = registry();
        let ctx = ctx();
        let compiler = FilterCompiler::new(&reg, &ctx);
        let tree = FilterTree::Or {
            or: vec![
                leaf("Orders.status", FilterOperator::Equals, serde_json::json!("paid")),
                leaf("Orders.status", FilterOperator::Equals, serde_json::json!("refunded")),
            ],
        };
        let compiled = compiler.compile(&tree, Utc::now()).unwrap();
        let sql = compiled.predicate.to_tokens().serialize(Dialect::Postgres);
        assert!(sql.contains(" OR "));
    }

    #[test]
    fn test_equals_null_value_renders_is_null() {
        let reg = registry();
        let ctx = ctx();
        let compiler = FilterCompiler::new(&reg, &ctx);
        let tree = FilterTree::Leaf {
            member: "Orders.status".into(),
            operator: FilterOperator::Equals,
            values: Some(vec![serde_json::Value::Null]),
            date_range: None,
        };
        let compiled = compiler.compile(&tree, Utc::now()).unwrap();
        let sql = compiled.predicate.to_tokens().serialize(Dialect::Postgres);
        assert!(sql.contains("IS NULL"));
    }

    #[test]
    fn test_in_date_range_produces_half_open_bounds() {
        let reg = registry();
        let ctx = ctx();
        let compiler = FilterCompiler::new(&reg, &ctx);
        let tree = FilterTree::Leaf {
            member: "Orders.createdAt".into(),
            operator: FilterOperator::InDateRange,
            values: None,
            date_range: Some(DateRangeInput::Relative("today".into())),
        };
        let compiled = compiler.compile(&tree, Utc::now()).unwrap();
        let sql = compiled.predicate.to_tokens().serialize(Dialect::Postgres);
        assert!(sql.contains(">="));
        assert!(sql.contains('<') && !sql.contains("<="));
    }

    #[test]
    fn test_touched_members_records_every_leaf() {
        let reg = registry();
        let ctx = ctx();
        let compiler = FilterCompiler::new(&reg, &ctx);
        let tree = FilterTree::And {
            and: vec![
                leaf("Orders.status", FilterOperator::Equals, serde_json::json!("paid")),
                leaf("Orders.amount", FilterOperator::Gt, serde_json::json!(100)),
            ],
        };
        let compiled = compiler.compile(&tree, Utc::now()).unwrap();
        assert_eq!(compiled.touched_members, vec!["Orders.status", "Orders.amount"]);
    }

    #[test]
    fn test_unknown_member_errors() {
        let reg = registry();
        let ctx = ctx();
        let compiler = FilterCompiler::new(&reg, &ctx);
        let tree = leaf("Orders.nonexistent", FilterOperator::Equals, serde_json::json!("x"));
        assert!(compiler.compile(&tree, Utc::now()).is_err());
    }
}
