//! Cube registry: stores cube definitions, resolves field references, and
//! enumerates joins. Internally cubes are addressed by interned integer
//! ids over a flat edge list (a `petgraph::DiGraph`), generalized from the
//! teacher's table/dimension `ModelGraph` to a cube/join graph; every
//! public API stays string-based (`"Cube.member"`).

use std::collections::{HashMap, HashSet, VecDeque};

use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;

use crate::error::SemLayerError;
use crate::model::{Cube, JoinSpec};

/// The kind of member a resolved field reference turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Dimension,
    Measure,
}

/// The result of resolving `"Cube.member"`.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedMember<'a> {
    pub cube: &'a str,
    pub member: &'a str,
    pub kind: MemberKind,
}

/// An outgoing join from a cube, with the target cube name resolved (but
/// not yet looked up — the caller re-enters `lookup` if it needs the full
/// cube definition).
#[derive(Debug, Clone)]
pub struct ResolvedJoin<'a> {
    pub from_cube: &'a str,
    pub spec: &'a JoinSpec,
}

/// One hop of a breadth-first join path between two cubes.
#[derive(Debug, Clone)]
pub struct JoinHop {
    pub from_cube: String,
    pub to_cube: String,
    pub spec: JoinSpec,
    /// True when the edge was declared `from_cube -> to_cube` in the
    /// registry but the path traverses it in the opposite direction (i.e.
    /// `to_cube` is the declaring side and `from_cube` is the target).
    pub reversed: bool,
}

/// Immutable, frozen-after-construction store of cube definitions and
/// their declared joins.
#[derive(Debug, Default)]
pub struct CubeRegistry {
    cubes: HashMap<String, Cube>,
    graph: DiGraph<String, JoinSpec>,
    node_indices: HashMap<String, NodeIndex>,
}

impl CubeRegistry {
    pub fn new() -> Self {
        CubeRegistry::default()
    }

    fn node_index(&mut self, cube: &str) -> NodeIndex {
        if let Some(idx) = self.node_indices.get(cube) {
            return *idx;
        }
        let idx = self.graph.add_node(cube.to_string());
        self.node_indices.insert(cube.to_string(), idx);
        idx
    }

    /// Validates that every member name is unique inside the cube, at most
    /// one primary key is declared, every calculated template references
    /// only known members of the same cube, and records the cube's
    /// declared joins as graph edges. Join targets are not required to
    /// already be registered (lazy references support declaration cycles);
    /// call [`CubeRegistry::finalize`] once every cube is registered to
    /// catch a dangling target up front instead of waiting for a join
    /// path to be requested through it.
    pub fn register(&mut self, cube: Cube) -> Result<(), SemLayerError> {
        let pk_count = cube.dimensions.values().filter(|d| d.primary_key).count();
        if pk_count > 1 {
            return Err(SemLayerError::InvalidFilter(format!(
                "cube {} declares {} primary keys, at most one is allowed",
                cube.name, pk_count
            )));
        }

        for measure in cube.measures.values() {
            if let crate::model::MeasureKind::Calculated(template) = &measure.kind {
                for reference in extract_template_refs(template) {
                    let (ref_cube, ref_member) = split_member(&reference).ok_or_else(|| {
                        SemLayerError::InvalidFilter(format!(
                            "calculated measure {}.{} references malformed member {}",
                            cube.name, measure.name, reference
                        ))
                    })?;
                    if ref_cube != cube.name {
                        return Err(SemLayerError::InvalidFilter(format!(
                            "calculated measure {}.{} references member from another cube: {}",
                            cube.name, measure.name, reference
                        )));
                    }
                    let known = cube.dimensions.contains_key(ref_member)
                        || cube.measures.contains_key(ref_member);
                    if !known {
                        return Err(SemLayerError::UnknownField(format!(
                            "{}.{}",
                            cube.name, ref_member
                        )));
                    }
                }
            }
        }

        let from_idx = self.node_index(&cube.name);
        for join in cube.joins.values() {
            let to_idx = self.node_index(&join.target_cube);
            self.graph.add_edge(from_idx, to_idx, join.clone());
        }

        self.cubes.insert(cube.name.clone(), cube);
        Ok(())
    }

    /// Validates that every declared join actually targets a cube that
    /// ended up registered. `register()` itself allows forward references
    /// (cube `A` can declare a join to cube `B` before `B` is registered,
    /// so two cubes can join each other regardless of which is registered
    /// first) and so cannot reject a dangling target on its own. Call this
    /// once every cube a deployment intends to register has been, to catch
    /// a typo'd or missing join target up front rather than waiting for a
    /// query that happens to plan a path through it.
    pub fn finalize(&self) -> Result<(), SemLayerError> {
        for cube in self.cubes.values() {
            for join in cube.joins.values() {
                if !self.cubes.contains_key(&join.target_cube) {
                    return Err(SemLayerError::UnknownCube(join.target_cube.clone()));
                }
            }
        }
        Ok(())
    }

    pub fn lookup(&self, cube_name: &str) -> Result<&Cube, SemLayerError> {
        self.cubes
            .get(cube_name)
            .ok_or_else(|| SemLayerError::UnknownCube(cube_name.to_string()))
    }

    pub fn cube_names(&self) -> impl Iterator<Item = &str> {
        self.cubes.keys().map(String::as_str)
    }

    pub fn resolve_member<'a>(&self, reference: &'a str) -> Result<ResolvedMember<'a>, SemLayerError> {
        let (cube_name, member_name) = split_member(reference)
            .ok_or_else(|| SemLayerError::UnknownField(reference.to_string()))?;
        let cube = self.lookup(cube_name)?;
        if cube.dimensions.contains_key(member_name) {
            return Ok(ResolvedMember {
                cube: cube_name,
                member: member_name,
                kind: MemberKind::Dimension,
            });
        }
        if cube.measures.contains_key(member_name) {
            return Ok(ResolvedMember {
                cube: cube_name,
                member: member_name,
                kind: MemberKind::Measure,
            });
        }
        Err(SemLayerError::UnknownField(reference.to_string()))
    }

    pub fn enumerate_joins<'a>(&'a self, from_cube: &'a str) -> Result<Vec<ResolvedJoin<'a>>, SemLayerError> {
        let cube = self.lookup(from_cube)?;
        Ok(cube
            .joins
            .values()
            .map(|spec| ResolvedJoin {
                from_cube,
                spec,
            })
            .collect())
    }

    /// Breadth-first search from `from` to `to` over the declared join
    /// graph, treated as undirected (a `hasMany` edge declared
    /// `primary -> dependent` is traversed as `dependent -> primary` in
    /// `belongsTo` orientation when the search needs to go that way).
    /// Fails with `AmbiguousJoin` if more than one shortest path exists.
    pub fn find_join_path(&self, from: &str, to: &str) -> Result<Vec<JoinHop>, SemLayerError> {
        if from == to {
            return Ok(Vec::new());
        }
        let from_idx = *self
            .node_indices
            .get(from)
            .ok_or_else(|| SemLayerError::UnknownCube(from.to_string()))?;
        let to_idx = *self
            .node_indices
            .get(to)
            .ok_or_else(|| SemLayerError::UnknownCube(to.to_string()))?;

        struct Parent {
            node: NodeIndex,
            edge: EdgeIndex,
            forward: bool,
        }

        let mut visited: HashSet<NodeIndex> = HashSet::new();
        let mut parents: HashMap<NodeIndex, Parent> = HashMap::new();
        let mut queue: VecDeque<NodeIndex> = VecDeque::new();
        let mut shortest: Option<usize> = None;
        let mut reached_via: Vec<NodeIndex> = Vec::new();

        visited.insert(from_idx);
        queue.push_back(from_idx);
        let mut depth: HashMap<NodeIndex, usize> = HashMap::new();
        depth.insert(from_idx, 0);

        while let Some(current) = queue.pop_front() {
            if let Some(limit) = shortest {
                if depth[&current] >= limit {
                    continue;
                }
            }
            let mut neighbors: Vec<(NodeIndex, EdgeIndex, bool)> = self
                .graph
                .edges(current)
                .map(|e| (e.target(), e.id(), true))
                .collect();
            neighbors.extend(
                self.graph
                    .edges_directed(current, petgraph::Direction::Incoming)
                    .map(|e| (e.source(), e.id(), false)),
            );

            for (neighbor, edge_idx, forward) in neighbors {
                if neighbor == current {
                    continue;
                }
                let next_depth = depth[&current] + 1;
                if neighbor == to_idx {
                    if let Some(limit) = shortest {
                        if next_depth < limit {
                            reached_via.clear();
                        } else if next_depth > limit {
                            continue;
                        }
                    }
                    shortest = Some(next_depth);
                    parents.insert(
                        neighbor,
                        Parent {
                            node: current,
                            edge: edge_idx,
                            forward,
                        },
                    );
                    reached_via.push(current);
                    continue;
                }
                if visited.contains(&neighbor) {
                    continue;
                }
                visited.insert(neighbor);
                depth.insert(neighbor, next_depth);
                parents.insert(
                    neighbor,
                    Parent {
                        node: current,
                        edge: edge_idx,
                        forward,
                    },
                );
                queue.push_back(neighbor);
            }
        }

        if reached_via.len() > 1 {
            return Err(SemLayerError::AmbiguousJoin {
                from: from.to_string(),
                to: to.to_string(),
                detail: format!("{} distinct shortest paths found", reached_via.len()),
            });
        }

        let mut hops = Vec::new();
        let mut current = to_idx;
        while current != from_idx {
            let parent = parents
                .get(&current)
                .ok_or_else(|| SemLayerError::AmbiguousJoin {
                    from: from.to_string(),
                    to: to.to_string(),
                    detail: "no path".to_string(),
                })?;
            let spec = self.graph.edge_weight(parent.edge).unwrap().clone();
            let from_name = self.graph[parent.node].clone();
            let to_name = self.graph[current].clone();
            hops.push(JoinHop {
                from_cube: from_name,
                to_cube: to_name,
                spec,
                reversed: !parent.forward,
            });
            current = parent.node;
        }
        hops.reverse();
        Ok(hops)
    }
}

fn split_member(reference: &str) -> Option<(&str, &str)> {
    reference.split_once('.')
}

/// Extracts every `{Cube.member}` placeholder from a calculated measure
/// template, in order of appearance.
fn extract_template_refs(template: &str) -> Vec<String> {
    let mut refs = Vec::new();
    let mut chars = template.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if c == '{' {
            if let Some(end) = template[i + 1..].find('}') {
                refs.push(template[i + 1..i + 1 + end].to_string());
            }
        }
    }
    refs
}
