//! The adapter between a handler's typed view and the orchestrator's
//! untyped attribute tree.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

/// One resource instance as seen by a handler invocation: the prior
/// recorded state, the desired configuration, and the identifier.
///
/// Reads fall through from the desired configuration to the prior state, so
/// a handler sees the value it is supposed to converge on. Writes go to the
/// prior side, which becomes the new recorded state when the operation
/// returns.
#[derive(Debug, Clone, Default)]
pub struct ResourceData {
    id: Option<String>,
    prior: Map<String, Value>,
    desired: Map<String, Value>,
}

impl ResourceData {
    pub fn new(id: Option<String>, prior: Value, desired: Value) -> Self {
        Self {
            id,
            prior: into_map(prior),
            desired: into_map(desired),
        }
    }

    /// A fresh resource: configuration only, no recorded state.
    pub fn from_config(desired: Value) -> Self {
        Self::new(None, Value::Null, desired)
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Assigns the identifier. Handlers must do this before any
    /// long-running wait so an interrupted apply can be reconciled.
    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = Some(id.into());
    }

    /// Clears the identifier; the orchestrator reads this as "destroyed".
    pub fn clear_id(&mut self) {
        self.id = None;
    }

    /// The configured value at `path`, falling back to recorded state.
    /// Paths are dot-separated; numeric segments index into lists.
    pub fn get(&self, path: &str) -> Option<&Value> {
        lookup(&self.desired, path).or_else(|| lookup(&self.prior, path))
    }

    pub fn get_desired(&self, path: &str) -> Option<&Value> {
        lookup(&self.desired, path)
    }

    pub fn get_prior(&self, path: &str) -> Option<&Value> {
        lookup(&self.prior, path)
    }

    pub fn get_string(&self, path: &str) -> Option<String> {
        self.get(path).and_then(Value::as_str).map(str::to_string)
    }

    pub fn get_bool(&self, path: &str, default: bool) -> bool {
        self.get(path).and_then(Value::as_bool).unwrap_or(default)
    }

    pub fn get_i64(&self, path: &str) -> Option<i64> {
        self.get(path).and_then(Value::as_i64)
    }

    /// Deserializes the value at `path` into a typed view.
    pub fn typed<T: DeserializeOwned>(&self, path: &str) -> Option<T> {
        self.get(path)
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
    }

    /// Writes a top-level attribute into the new recorded state.
    pub fn set(&mut self, key: &str, value: impl Serialize) {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.prior.insert(key.to_string(), value);
    }

    pub fn remove(&mut self, key: &str) {
        self.prior.remove(key);
    }

    /// The orchestrator's has-changed predicate: a value is configured at
    /// `path` and differs from the recorded state.
    pub fn has_change(&self, path: &str) -> bool {
        match lookup(&self.desired, path) {
            None => false,
            Some(desired) => match lookup(&self.prior, path) {
                None => !desired.is_null(),
                Some(prior) => desired != prior,
            },
        }
    }

    /// Reports whether any of the paths changed.
    pub fn any_change(&self, paths: &[&str]) -> bool {
        paths.iter().any(|p| self.has_change(p))
    }

    /// The new recorded state.
    pub fn state(&self) -> Value {
        Value::Object(self.prior.clone())
    }
}

fn into_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn lookup<'a>(map: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = map.get(segments.next()?)?;
    for segment in segments {
        current = match current {
            Value::Object(obj) => obj.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    fn data() -> ResourceData {
        ResourceData::new(
            Some("fr-par-1/abc".to_string()),
            json!({
                "name": "old-name",
                "tags": ["a", "b"],
                "options": [{"id": "opt-1", "expires_at": null}],
            }),
            json!({
                "name": "new-name",
                "tags": ["a", "b"],
                "versioning": {"enabled": true},
            }),
        )
    }

    #[test]
    fn desired_wins_over_prior() {
        let d = data();
        assert_eq!(d.get_string("name").as_deref(), Some("new-name"));
        // present only in prior
        assert_eq!(
            d.get_string("options.0.id").as_deref(),
            Some("opt-1")
        );
        // nested path into config
        assert!(d.get_bool("versioning.enabled", false));
    }

    #[test]
    fn change_detection() {
        let d = data();
        assert!(d.has_change("name"));
        assert!(!d.has_change("tags"));
        assert!(d.has_change("versioning"));
        assert!(!d.has_change("missing"));
        assert!(d.any_change(&["tags", "name"]));
    }

    #[test]
    fn id_lifecycle() {
        let mut d = data();
        assert_eq!(d.id(), Some("fr-par-1/abc"));
        d.clear_id();
        assert_eq!(d.id(), None);
        d.set_id("fr-par-1/def");
        assert_eq!(d.id(), Some("fr-par-1/def"));
    }

    #[test]
    fn writes_land_in_new_state() {
        let mut d = data();
        d.set("status", "ready");
        d.remove("options");
        let state = d.state();
        assert_eq!(state["status"], json!("ready"));
        assert!(state.get("options").is_none());
    }

    #[test]
    fn typed_view() {
        #[derive(serde::Deserialize)]
        struct Versioning {
            enabled: bool,
        }
        let v: Versioning = data().typed("versioning").unwrap();
        assert!(v.enabled);
    }
}
