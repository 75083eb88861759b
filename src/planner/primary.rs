//! Primary cube selection: the first step of query planning.

use std::collections::HashMap;

use crate::error::SemLayerError;
use crate::registry::CubeRegistry;

#[derive(Debug, Default, Clone)]
struct CubeTally {
    dimensions: usize,
    owns_time_dimension: bool,
}

/// Picks the cube whose table the outer query groups by, per the
/// three-step algorithm: prefer a dimension-owning cube over a
/// measure-only one, then the cube with the most referenced regular
/// dimensions, tie-broken by time-dimension ownership and then cube name.
pub fn select_primary(
    registry: &CubeRegistry,
    measure_cubes: &[String],
    dimension_cubes: &[String],
    time_dimension_cubes: &[String],
    explicit_cubes: Option<&[String]>,
) -> Result<String, SemLayerError> {
    let mut tallies: HashMap<String, CubeTally> = HashMap::new();

    for cube in dimension_cubes {
        tallies.entry(cube.clone()).or_default().dimensions += 1;
    }
    for cube in time_dimension_cubes {
        tallies.entry(cube.clone()).or_default().owns_time_dimension = true;
    }
    for cube in measure_cubes {
        tallies.entry(cube.clone()).or_default();
    }

    if let Some(allowed) = explicit_cubes {
        tallies.retain(|name, _| allowed.contains(name));
        if tallies.is_empty() {
            return Err(SemLayerError::InvalidFilter(
                "explicit cubes list excludes every cube referenced by the query".to_string(),
            ));
        }
    }

    // Step 1: prefer a dimension-owning cube when at least one exists.
    let any_dimension_owner = tallies.values().any(|t| t.dimensions > 0);
    let candidates: Vec<&String> = if any_dimension_owner {
        tallies
            .iter()
            .filter(|(_, t)| t.dimensions > 0)
            .map(|(name, _)| name)
            .collect()
    } else {
        tallies.keys().collect()
    };

    if candidates.is_empty() {
        return Err(SemLayerError::InvalidFilter(
            "query references no cube".to_string(),
        ));
    }

    // Step 2: most referenced dimensions, then time-dimension ownership,
    // then lexicographic cube name, for determinism.
    let best = candidates
        .into_iter()
        .max_by(|a, b| {
            let ta = &tallies[*a];
            let tb = &tallies[*b];
            ta.dimensions
                .cmp(&tb.dimensions)
                .then(ta.owns_time_dimension.cmp(&tb.owns_time_dimension))
                .then(b.as_str().cmp(a.as_str()))
        })
        .expect("candidates is non-empty")
        .clone();

    registry.lookup(&best)?;
    Ok(best)
}
