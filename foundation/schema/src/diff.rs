//! The plan-time view a CustomizeDiff hook operates on.

use serde_json::{Map, Value};

/// Returned by a CustomizeDiff hook to abort planning.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct PlanError(pub String);

impl PlanError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// The pending diff for one resource instance. A hook may inspect old and
/// new values, and may escalate an in-place update to destroy-and-create
/// via [`ResourceDiff::force_new`].
#[derive(Debug, Clone, Default)]
pub struct ResourceDiff {
    id: Option<String>,
    old: Map<String, Value>,
    new: Map<String, Value>,
    forced_new: Vec<String>,
}

impl ResourceDiff {
    pub fn new(id: Option<String>, old: Value, new: Value) -> Self {
        Self {
            id,
            old: into_map(old),
            new: into_map(new),
            forced_new: Vec::new(),
        }
    }

    /// The recorded identifier; `None` for a resource not yet created.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn old_value(&self, key: &str) -> Option<&Value> {
        self.old.get(key)
    }

    pub fn new_value(&self, key: &str) -> Option<&Value> {
        self.new.get(key)
    }

    pub fn old_string(&self, key: &str) -> Option<String> {
        self.old.get(key).and_then(Value::as_str).map(str::to_string)
    }

    pub fn new_string(&self, key: &str) -> Option<String> {
        self.new.get(key).and_then(Value::as_str).map(str::to_string)
    }

    pub fn has_change(&self, key: &str) -> bool {
        self.old.get(key) != self.new.get(key)
    }

    /// Marks an attribute as requiring replacement of the resource.
    pub fn force_new(&mut self, key: &str) {
        if !self.forced_new.iter().any(|k| k == key) {
            self.forced_new.push(key.to_string());
        }
    }

    pub fn forced_new(&self) -> &[String] {
        &self.forced_new
    }
}

fn into_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    #[test]
    fn change_and_force_new() {
        let mut diff = ResourceDiff::new(
            Some("fr-par-2/abc".to_string()),
            json!({"offer": "EM-A115X-SSD", "zone": "fr-par-2"}),
            json!({"offer": "EM-B112X-SSD", "zone": "fr-par-2"}),
        );
        assert!(diff.has_change("offer"));
        assert!(!diff.has_change("zone"));
        assert_eq!(diff.old_value("offer"), Some(&json!("EM-A115X-SSD")));
        assert_eq!(diff.new_value("offer"), Some(&json!("EM-B112X-SSD")));
        assert_eq!(diff.new_string("offer").as_deref(), Some("EM-B112X-SSD"));
        diff.force_new("offer");
        diff.force_new("offer");
        assert_eq!(diff.forced_new(), ["offer"]);
    }
}
