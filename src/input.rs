//! Input query shapes: the JSON-facing types a caller submits. These are
//! plain data — parsing into `Expr`/SQL happens in `filter`, `planner`,
//! and `builder`.

use serde::{Deserialize, Serialize};

/// `second|minute|hour|day|week|month|quarter|year`, reused from the SQL
/// layer's own granularity vocabulary so the filter compiler and dialect
/// adapter speak the same enum.
pub use crate::sql::TimeGranularity;

/// A filter operator, per the contract in the filter compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterOperator {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    Like,
    NotLike,
    Ilike,
    Regex,
    NotRegex,
    Gt,
    Gte,
    Lt,
    Lte,
    Set,
    NotSet,
    InDateRange,
    NotInDateRange,
    BeforeDate,
    AfterDate,
}

/// Either an absolute `[start, end]` pair, a single ISO date, or a relative
/// phrase like `"last 30 days"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DateRangeInput {
    Absolute(String, String),
    Single(String),
    Relative(String),
}

/// A leaf or composite node of a filter tree. Composite nodes preserve
/// declared child order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterTree {
    Leaf {
        member: String,
        operator: FilterOperator,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        values: Option<Vec<serde_json::Value>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        date_range: Option<DateRangeInput>,
    },
    And {
        and: Vec<FilterTree>,
    },
    Or {
        or: Vec<FilterTree>,
    },
}

/// One entry of `query.timeDimensions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeDimensionInput {
    pub dimension: String,
    #[serde(default)]
    pub granularity: Option<TimeGranularity>,
    #[serde(default)]
    pub date_range: Option<DateRangeInput>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// The standard query shape: measures/dimensions/timeDimensions/filters
/// plus ordering and paging.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Query {
    pub measures: Vec<String>,
    pub dimensions: Vec<String>,
    pub time_dimensions: Vec<TimeDimensionInput>,
    pub filters: Vec<FilterTree>,
    /// Insertion order preserved: a `BTreeMap` would reorder, so this is a
    /// `Vec` of pairs even though the wire shape is an object.
    #[serde(with = "order_as_pairs")]
    pub order: Vec<(String, SortDirection)>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    /// Explicit cube list when the planner cannot infer completeness from
    /// members alone.
    pub cubes: Option<Vec<String>>,
}

mod order_as_pairs {
    use super::SortDirection;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<S: Serializer>(
        pairs: &[(String, SortDirection)],
        ser: S,
    ) -> Result<S::Ok, S::Error> {
        let map: BTreeMap<&str, SortDirection> =
            pairs.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        map.serialize(ser)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        de: D,
    ) -> Result<Vec<(String, SortDirection)>, D::Error> {
        let map: indexmap_like::OrderedMap = indexmap_like::OrderedMap::deserialize(de)?;
        Ok(map.0)
    }

    /// A minimal order-preserving map deserializer so `order` keeps the
    /// caller's declared field sequence without pulling in `indexmap`.
    mod indexmap_like {
        use super::SortDirection;
        use serde::de::{MapAccess, Visitor};
        use serde::{Deserialize, Deserializer};
        use std::fmt;

        pub struct OrderedMap(pub Vec<(String, SortDirection)>);

        impl<'de> Deserialize<'de> for OrderedMap {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                struct V;
                impl<'de> Visitor<'de> for V {
                    type Value = OrderedMap;
                    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                        f.write_str("a map of field to sort direction")
                    }
                    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                        let mut out = Vec::new();
                        while let Some((k, v)) = map.next_entry::<String, SortDirection>()? {
                            out.push((k, v));
                        }
                        Ok(OrderedMap(out))
                    }
                }
                deserializer.deserialize_map(V)
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunnelStep {
    pub name: String,
    #[serde(default)]
    pub filter: Option<FilterTree>,
    #[serde(default)]
    pub cube: Option<String>,
    #[serde(default)]
    pub time_to_convert: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunnelSpec {
    pub binding_key: String,
    pub time_dimension: String,
    pub steps: Vec<FunnelStep>,
    #[serde(default)]
    pub time_to_convert: Option<String>,
    #[serde(default)]
    pub include_time_metrics: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerFunnelQuery {
    pub funnel: FunnelSpec,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JoinStrategy {
    Auto,
    Lateral,
    Window,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowSpec {
    pub binding_key: String,
    pub time_dimension: String,
    pub event_dimension: String,
    pub starting_step: FilterTree,
    pub steps_before: u8,
    pub steps_after: u8,
    #[serde(default)]
    pub join_strategy: JoinStrategyOrDefault,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JoinStrategyOrDefault(pub JoinStrategy);

impl Default for JoinStrategyOrDefault {
    fn default() -> Self {
        JoinStrategyOrDefault(JoinStrategy::Auto)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerFlowQuery {
    pub flow: FlowSpec,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RetentionType {
    Classic,
    Rolling,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionSpec {
    pub time_dimension: String,
    pub binding_key: String,
    pub date_range: DateRangeInput,
    pub granularity: TimeGranularity,
    pub periods: u32,
    pub retention_type: RetentionType,
    #[serde(default)]
    pub cohort_filters: Option<FilterTree>,
    #[serde(default)]
    pub activity_filters: Option<FilterTree>,
    #[serde(default)]
    pub breakdown_dimensions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerRetentionQuery {
    pub retention: RetentionSpec,
}

impl Query {
    /// Every cube named by a field reference across measures, dimensions,
    /// time dimensions, and filters.
    pub fn referenced_cubes(&self) -> Vec<String> {
        let mut cubes: Vec<String> = Vec::new();
        let mut push = |m: &str| {
            if let Some((cube, _)) = m.split_once('.') {
                if !cubes.iter().any(|c| c == cube) {
                    cubes.push(cube.to_string());
                }
            }
        };
        for m in &self.measures {
            push(m);
        }
        for d in &self.dimensions {
            push(d);
        }
        for t in &self.time_dimensions {
            push(&t.dimension);
        }
        fn walk(tree: &FilterTree, push: &mut impl FnMut(&str)) {
            match tree {
                FilterTree::Leaf { member, .. } => push(member),
                FilterTree::And { and } => and.iter().for_each(|t| walk(t, push)),
                FilterTree::Or { or } => or.iter().for_each(|t| walk(t, push)),
            }
        }
        for f in &self.filters {
            walk(f, &mut push);
        }
        cubes
    }
}
