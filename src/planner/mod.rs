//! Query Planner: turns a resolved [`InputQuery`](crate::input::Query) into
//! a [`Plan`] the SQL Builder can assemble into one statement.
//!
//! Primary cube selection, join path BFS (delegated to
//! [`CubeRegistry::find_join_path`]), and pre-aggregation CTE planning for
//! `hasMany` joins all happen here.

pub mod plan;
pub mod primary;

pub use plan::{Plan, PlannedJoin, PlannedOrder, PreAggCte, PreAggDimension, SelectItem};

use std::collections::HashSet;

use crate::error::SemLayerError;
use crate::input::{Query as InputQuery, SortDirection};
use crate::model::{MeasureKind, Relationship};
use crate::registry::{CubeRegistry, JoinHop, MemberKind};

pub struct Planner<'a> {
    registry: &'a CubeRegistry,
}

impl<'a> Planner<'a> {
    pub fn new(registry: &'a CubeRegistry) -> Self {
        Planner { registry }
    }

    pub fn plan(&self, query: &InputQuery) -> Result<Plan, SemLayerError> {
        let measure_cubes = cubes_of(query.measures.iter());
        let dimension_cubes = cubes_of(query.dimensions.iter());
        let time_dimension_cubes = cubes_of(query.time_dimensions.iter().map(|t| &t.dimension));

        let explicit = query.cubes.as_deref();
        let primary = primary::select_primary(
            self.registry,
            &measure_cubes,
            &dimension_cubes,
            &time_dimension_cubes,
            explicit,
        )?;

        let mut referenced: HashSet<String> = HashSet::new();
        referenced.extend(measure_cubes.iter().cloned());
        referenced.extend(dimension_cubes.iter().cloned());
        referenced.extend(time_dimension_cubes.iter().cloned());
        referenced.remove(&primary);

        let mut joins: Vec<PlannedJoin> = Vec::new();
        let mut seen_hops: HashSet<(String, String)> = HashSet::new();
        let mut sorted_targets: Vec<&String> = referenced.iter().collect();
        sorted_targets.sort();
        for target in sorted_targets {
            let hops = self.resolve_path(&primary, target)?;
            for hop in hops {
                let key = (hop.from_cube.clone(), hop.to_cube.clone());
                if seen_hops.insert(key) {
                    joins.push(self.plan_join(hop, query)?);
                }
            }
        }

        let mut participating: Vec<String> = vec![primary.clone()];
        for j in &joins {
            if !participating.contains(&j.to_cube) {
                participating.push(j.to_cube.clone());
            }
        }

        let mut select = Vec::new();
        for dimension in &query.dimensions {
            let resolved = self.registry.resolve_member(dimension)?;
            select.push(SelectItem {
                cube: resolved.cube.to_string(),
                member: resolved.member.to_string(),
                alias: dimension.clone(),
                granularity: None,
                is_measure: false,
            });
        }
        for time_dim in &query.time_dimensions {
            let resolved = self.registry.resolve_member(&time_dim.dimension)?;
            let alias = match time_dim.granularity {
                Some(g) => format!("{}.{}", time_dim.dimension, g.as_str()),
                None => time_dim.dimension.clone(),
            };
            select.push(SelectItem {
                cube: resolved.cube.to_string(),
                member: resolved.member.to_string(),
                alias,
                granularity: time_dim.granularity,
                is_measure: false,
            });
        }
        for measure in &query.measures {
            let resolved = self.registry.resolve_member(measure)?;
            if resolved.kind != MemberKind::Measure {
                return Err(SemLayerError::InvalidFilter(format!(
                    "{} is a dimension, not a measure",
                    measure
                )));
            }
            select.push(SelectItem {
                cube: resolved.cube.to_string(),
                member: resolved.member.to_string(),
                alias: measure.clone(),
                granularity: None,
                is_measure: true,
            });
        }

        let order_by = query
            .order
            .iter()
            .map(|(alias, dir)| PlannedOrder {
                alias: alias.clone(),
                descending: *dir == SortDirection::Desc,
            })
            .collect();

        Ok(Plan {
            primary_cube: primary,
            joins,
            select,
            order_by,
            limit: query.limit,
            offset: query.offset,
            participating_cubes: participating,
        })
    }

    /// Resolves the join path between primary and target. `CubeRegistry`
    /// already walks the join graph in both directions (forward `hasMany`
    /// edges and reverse `belongsTo` edges), returning `AmbiguousJoin` when
    /// more than one shortest path exists; there is no additional
    /// promotion step here. When the target ends up pre-aggregated (see
    /// `plan_join`), any dimension also requested from that cube is
    /// grouped into the pre-aggregation CTE rather than left dangling
    /// against a table the outer query never joins.
    fn resolve_path(&self, from: &str, to: &str) -> Result<Vec<JoinHop>, SemLayerError> {
        self.registry.find_join_path(from, to)
    }

    fn plan_join(&self, hop: JoinHop, query: &InputQuery) -> Result<PlannedJoin, SemLayerError> {
        let relationship = if hop.reversed {
            reverse_relationship(hop.spec.relationship)
        } else {
            hop.spec.relationship
        };

        let pre_aggregated = if relationship.is_to_many() {
            let dependent = self.registry.lookup(&hop.to_cube)?;
            let measures: Vec<String> = query
                .measures
                .iter()
                .filter(|m| m.starts_with(&format!("{}.", hop.to_cube)))
                .cloned()
                .collect();
            if measures.is_empty() {
                None
            } else {
                let group_by_columns: Vec<String> = hop
                    .spec
                    .on
                    .iter()
                    .map(|k| {
                        if hop.reversed {
                            k.source_column.clone()
                        } else {
                            k.target_column.clone()
                        }
                    })
                    .collect();
                let _ = dependent;

                let prefix = format!("{}.", hop.to_cube);
                let mut dimensions = Vec::new();
                for dimension in &query.dimensions {
                    if let Some(member) = dimension.strip_prefix(&prefix) {
                        dimensions.push(PreAggDimension {
                            member: member.to_string(),
                            alias: dimension.clone(),
                            granularity: None,
                        });
                    }
                }
                for time_dim in &query.time_dimensions {
                    if let Some(member) = time_dim.dimension.strip_prefix(&prefix) {
                        let alias = match time_dim.granularity {
                            Some(g) => format!("{}.{}", time_dim.dimension, g.as_str()),
                            None => time_dim.dimension.clone(),
                        };
                        dimensions.push(PreAggDimension {
                            member: member.to_string(),
                            alias,
                            granularity: time_dim.granularity,
                        });
                    }
                }

                Some(PreAggCte {
                    cte_name: format!("{}_agg", to_snake(&hop.to_cube)),
                    cube: hop.to_cube.clone(),
                    group_by_columns,
                    measures,
                    dimensions,
                })
            }
        } else {
            None
        };

        Ok(PlannedJoin {
            from_cube: hop.from_cube,
            to_cube: hop.to_cube,
            spec: hop.spec,
            reversed: hop.reversed,
            pre_aggregated,
        })
    }
}

fn reverse_relationship(relationship: Relationship) -> Relationship {
    match relationship {
        Relationship::HasMany | Relationship::HasOne => Relationship::BelongsTo,
        Relationship::BelongsTo => Relationship::HasMany,
        Relationship::BelongsToMany => Relationship::BelongsToMany,
    }
}

fn to_snake(cube_name: &str) -> String {
    let mut out = String::new();
    for (i, c) in cube_name.char_indices() {
        if c.is_uppercase() && i != 0 {
            out.push('_');
        }
        out.extend(c.to_lowercase());
    }
    out
}

fn cubes_of<'b, I: Iterator<Item = &'b String>>(refs: I) -> Vec<String> {
    let mut out = Vec::new();
    for reference in refs {
        if let Some((cube, _)) = reference.split_once('.') {
            if !out.iter().any(|c: &String| c == cube) {
                out.push(cube.to_string());
            }
        }
    }
    out
}

/// Checks whether a measure's `Calculated` template references an
/// aggregated measure that requires pre-aggregation (used by the builder
/// to decide expansion order). Exposed for the SQL Builder.
pub fn is_calculated_requiring_preagg(kind: &MeasureKind) -> bool {
    matches!(kind, MeasureKind::Calculated(_))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Query;
    use crate::model::{BaseQuery, Cube, Dimension, FieldType, JoinSpec, Measure};
    use crate::sql::lit_bool;
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
            .with_dimension(Dimension::new("department_id", FieldType::Number, "department_id"))
            .with_measure(Measure::count("count"))
            .with_measure(Measure::sum("totalSalary", "salary"));
        reg.register(departments).unwrap();
        reg.register(employees).unwrap();
        reg
    }

    #[test]
    fn test_plan_single_cube_query() {
        let reg = registry();
        let planner = Planner::new(&reg);
        let query = Query {
            dimensions: vec!["Departments.name".to_string()],
            ..Default::default()
        };
        let plan = planner.plan(&query).unwrap();
        assert_eq!(plan.primary_cube, "Departments");
        assert!(plan.joins.is_empty());
    }

    #[test]
    fn test_plan_has_many_join_preaggregates() {
        let reg = registry();
        let planner = Planner::new(&reg);
        let query = Query {
            dimensions: vec!["Departments.name".to_string()],
            measures: vec!["Employees.totalSalary".to_string()],
            ..Default::default()
        };
        let plan = planner.plan(&query).unwrap();
        assert_eq!(plan.primary_cube, "Departments");
        assert_eq!(plan.joins.len(), 1);
        assert!(plan.joins[0].pre_aggregated.is_some());
    }

    #[test]
    fn test_explicit_cubes_narrows_primary() {
        let reg = registry();
        let planner = Planner::new(&reg);
        let query = Query {
            measures: vec!["Employees.count".to_string()],
            dimensions: vec!["Departments.name".to_string()],
            cubes: Some(vec!["Departments".to_string(), "Employees".to_string()]),
            ..Default::default()
        };
        let plan = planner.plan(&query).unwrap();
        assert_eq!(plan.primary_cube, "Departments");
    }
}
