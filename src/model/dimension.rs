use crate::model::types::FieldType;

/// A groupable column on a cube, optionally time-typed.
#[derive(Debug, Clone)]
pub struct Dimension {
    pub name: String,
    pub title: String,
    /// Defaults to `title` unless overridden; populates the envelope's
    /// `shortTitle` field.
    pub short_title: String,
    pub field_type: FieldType,
    /// Column reference or SQL expression, evaluated against the cube's
    /// `sqlSource` table/join output.
    pub sql: String,
    pub primary_key: bool,
    /// Companion dimensions surfaced at `/meta` for drill-down. Declared but
    /// never consulted by the planner or SQL builder.
    pub drill_members: Vec<String>,
}

impl Dimension {
    pub fn new(name: impl Into<String>, field_type: FieldType, sql: impl Into<String>) -> Self {
        let name = name.into();
        let title = name.clone();
        Dimension {
            short_title: title.clone(),
            name,
            title,
            field_type,
            sql: sql.into(),
            primary_key: false,
            drill_members: Vec::new(),
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn short_title(mut self, short_title: impl Into<String>) -> Self {
        self.short_title = short_title.into();
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn drill_members(mut self, members: Vec<String>) -> Self {
        self.drill_members = members;
        self
    }

    pub fn is_time(&self) -> bool {
        self.field_type == FieldType::Time
    }
}
