use serde_json::{Map, Value};

/// Opaque caller-supplied tenant/user scope threaded into every cube's
/// `sqlSource` invocation. The shape is implementation-defined; commonly
/// `{organisationId, userId, roles}`, but the core never inspects keys it
/// doesn't need.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SecurityContext(Map<String, Value>);

impl SecurityContext {
    pub fn new() -> Self {
        SecurityContext(Map::new())
    }

    pub fn from_map(map: Map<String, Value>) -> Self {
        SecurityContext(map)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }
}
