//! The planner's output shape: a dialect-agnostic description of how to
//! assemble one SQL statement, consumed by the SQL Builder.

use crate::model::JoinSpec;
use crate::sql::TimeGranularity;

/// One joined cube in the plan, in traversal order from the primary.
#[derive(Debug, Clone)]
pub struct PlannedJoin {
    pub from_cube: String,
    pub to_cube: String,
    pub spec: JoinSpec,
    pub reversed: bool,
    /// Set when the join's target is `hasMany` and needs pre-aggregation
    /// before the outer join to avoid fan-out.
    pub pre_aggregated: Option<PreAggCte>,
}

/// A CTE aggregating the dependent side of a `hasMany` join, grouped by
/// its foreign-key columns, so the outer join can't multiply primary rows.
#[derive(Debug, Clone)]
pub struct PreAggCte {
    pub cte_name: String,
    pub cube: String,
    pub group_by_columns: Vec<String>,
    pub measures: Vec<String>,
    /// Dimensions (and time dimensions) the outer query also asked for
    /// from this same dependent cube. Grouped inside the CTE alongside
    /// the foreign key, since the dependent cube's own table is never
    /// joined into the outer query once it's pre-aggregated — the outer
    /// `SELECT` must read these off the CTE alias instead.
    pub dimensions: Vec<PreAggDimension>,
}

/// One dimension carried through a [`PreAggCte`], grouped under the same
/// alias the outer plan's `SelectItem` expects.
#[derive(Debug, Clone)]
pub struct PreAggDimension {
    pub member: String,
    pub alias: String,
    pub granularity: Option<TimeGranularity>,
}

/// One column the outer `SELECT` emits, either a dimension (GROUP BY'd) or
/// a measure (aggregated).
#[derive(Debug, Clone)]
pub struct SelectItem {
    pub cube: String,
    pub member: String,
    pub alias: String,
    pub granularity: Option<TimeGranularity>,
    pub is_measure: bool,
}

#[derive(Debug, Clone)]
pub struct PlannedOrder {
    pub alias: String,
    pub descending: bool,
}

/// The fully-resolved plan for a single (non-specialized) query, ready for
/// `SqlBuilder::build`.
#[derive(Debug, Clone)]
pub struct Plan {
    pub primary_cube: String,
    pub joins: Vec<PlannedJoin>,
    pub select: Vec<SelectItem>,
    pub order_by: Vec<PlannedOrder>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    /// Every cube participating in the plan (primary plus every joined
    /// cube), used by the builder to emit one security predicate each.
    pub participating_cubes: Vec<String>,
}

impl Plan {
    pub fn group_by_items(&self) -> impl Iterator<Item = &SelectItem> {
        self.select.iter().filter(|item| !item.is_measure)
    }

    pub fn measure_items(&self) -> impl Iterator<Item = &SelectItem> {
        self.select.iter().filter(|item| item.is_measure)
    }
}
