/// The relationship a `JoinSpec` declares from the owning cube to its
/// target. `HasMany` is the only relationship that triggers pre-aggregation
/// CTEs in the planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relationship {
    BelongsTo,
    HasOne,
    HasMany,
    BelongsToMany,
}

impl Relationship {
    pub fn is_to_many(&self) -> bool {
        matches!(self, Relationship::HasMany | Relationship::BelongsToMany)
    }
}

/// One equality pair in a join's `ON` clause.
#[derive(Debug, Clone)]
pub struct JoinKey {
    pub source_column: String,
    pub target_column: String,
}

/// A declared join from one cube to another. Target cubes are referenced
/// lazily by name so reciprocal joins (`A.hasMany(B)` / `B.belongsTo(A)`)
/// can be declared without ordering constraints.
#[derive(Debug, Clone)]
pub struct JoinSpec {
    pub target_cube: String,
    pub relationship: Relationship,
    pub on: Vec<JoinKey>,
}

impl JoinSpec {
    pub fn new(
        target_cube: impl Into<String>,
        relationship: Relationship,
        on: Vec<(&str, &str)>,
    ) -> Self {
        JoinSpec {
            target_cube: target_cube.into(),
            relationship,
            on: on
                .into_iter()
                .map(|(s, t)| JoinKey {
                    source_column: s.to_string(),
                    target_column: t.to_string(),
                })
                .collect(),
        }
    }

    /// `belongsToMany` is desugared into a chain through a join table by
    /// the planner; the join table's name is not declared on the spec
    /// itself but derived by the caller when registering the cube.
    pub fn is_belongs_to_many(&self) -> bool {
        self.relationship == Relationship::BelongsToMany
    }
}
