#[cfg(test)]
mod tests {
    use semlayer::model::{BaseQuery, Cube, Dimension, FieldType, JoinSpec, Measure, Relationship};
    use semlayer::registry::{CubeRegistry, MemberKind};
    use semlayer::sql::lit_bool;
    use std::sync::Arc;

    fn registry() -> CubeRegistry {
        let mut reg = CubeRegistry::new();
        let customers = Cube::new("Customers", Arc::new(|_| BaseQuery::table("customers", lit_bool(true))))
            .with_dimension(Dimension::new("id", FieldType::Number, "id").primary_key())
            .with_dimension(Dimension::new("name", FieldType::String, "name"))
            .with_join(JoinSpec::new("Orders", Relationship::HasMany, vec![("id", "customer_id")]));
        let orders = Cube::new("Orders", Arc::new(|_| BaseQuery::table("orders", lit_bool(true))))
            .with_dimension(Dimension::new("customerId", FieldType::Number, "customer_id"))
            .with_measure(Measure::count("count"));
        reg.register(customers).unwrap();
        reg.register(orders).unwrap();
        reg
    }

    #[test]
    fn test_lookup_unknown_cube_errors() {
        let reg = registry();
        assert!(reg.lookup("Nonexistent").is_err());
    }

    #[test]
    fn test_resolve_member_splits_cube_and_name() {
        let reg = registry();
        let resolved = reg.resolve_member("Customers.name").unwrap();
        assert_eq!(resolved.cube, "Customers");
        assert_eq!(resolved.member, "name");
        assert_eq!(resolved.kind, MemberKind::Dimension);
    }

    #[test]
    fn test_resolve_member_finds_measure() {
        let reg = registry();
        let resolved = reg.resolve_member("Orders.count").unwrap();
        assert_eq!(resolved.kind, MemberKind::Measure);
    }

    #[test]
    fn test_find_join_path_direct_hop() {
        let reg = registry();
        let hops = reg.find_join_path("Customers", "Orders").unwrap();
        assert_eq!(hops.len(), 1);
        assert_eq!(hops[0].from_cube, "Customers");
        assert_eq!(hops[0].to_cube, "Orders");
        assert!(!hops[0].reversed);
    }

    #[test]
    fn test_find_join_path_reverse_hop() {
        let reg = registry();
        let hops = reg.find_join_path("Orders", "Customers").unwrap();
        assert_eq!(hops.len(), 1);
        assert!(hops[0].reversed);
    }

    #[test]
    fn test_find_join_path_same_cube_is_empty() {
        let reg = registry();
        let hops = reg.find_join_path("Orders", "Orders").unwrap();
        assert!(hops.is_empty());
    }

    #[test]
    fn test_find_join_path_unreachable_cube_errors() {
        let mut reg = registry();
        let standalone = Cube::new("Islands", Arc::new(|_| BaseQuery::table("islands", lit_bool(true))));
        reg.register(standalone).unwrap();
        assert!(reg.find_join_path("Customers", "Islands").is_err());
    }
}
