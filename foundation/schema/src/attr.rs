use std::time::Duration;

use serde_json::Value;

use crate::data::ResourceData;

/// A diff suppressor: reports whether two lexically different values at
/// `key` should be treated as equal by the planner.
pub type Suppressor = fn(key: &str, old: &Value, new: &Value, data: &ResourceData) -> bool;

/// A stable hash of one element of a set-valued attribute.
pub type SetHash = fn(element: &Value) -> u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrType {
    String,
    Int,
    Bool,
    List,
    Set,
    Map,
    Block,
}

#[derive(Clone)]
pub enum Validator {
    /// The value must be one of the listed strings.
    OneOf(&'static [&'static str]),
    /// String length bounds, inclusive.
    StringLen { min: usize, max: usize },
    /// Every key of a map value must be lower-case.
    LowercaseKeys,
    Custom(fn(&Value) -> Result<(), String>),
}

impl Validator {
    pub fn check(&self, path: &str, value: &Value) -> Result<(), String> {
        match self {
            Validator::OneOf(allowed) => match value.as_str() {
                Some(s) if allowed.contains(&s) => Ok(()),
                Some(s) => Err(format!(
                    "{path}: expected one of {allowed:?}, got {s:?}"
                )),
                None => Err(format!("{path}: expected a string")),
            },
            Validator::StringLen { min, max } => match value.as_str() {
                Some(s) if (*min..=*max).contains(&s.chars().count()) => Ok(()),
                Some(s) => Err(format!(
                    "{path}: length must be between {min} and {max}, got {}",
                    s.chars().count()
                )),
                None => Err(format!("{path}: expected a string")),
            },
            Validator::LowercaseKeys => match value.as_object() {
                Some(map) => {
                    for key in map.keys() {
                        if key.chars().any(|c| c.is_ascii_uppercase()) {
                            return Err(format!("{path}: key {key:?} must be lower-case"));
                        }
                    }
                    Ok(())
                }
                None => Err(format!("{path}: expected a map")),
            },
            Validator::Custom(f) => f(value).map_err(|e| format!("{path}: {e}")),
        }
    }
}

/// One attribute descriptor in a resource schema.
#[derive(Clone)]
pub struct Attribute {
    pub name: &'static str,
    pub attr_type: AttrType,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub force_new: bool,
    pub deprecated: Option<&'static str>,
    pub default: Option<Value>,
    pub validator: Option<Validator>,
    pub diff_suppressor: Option<Suppressor>,
    pub set_hash: Option<SetHash>,
    /// Element descriptors for blocks and block-valued lists/sets.
    pub elem: Vec<Attribute>,
}

impl Attribute {
    fn new(name: &'static str, attr_type: AttrType) -> Self {
        Self {
            name,
            attr_type,
            required: false,
            optional: false,
            computed: false,
            force_new: false,
            deprecated: None,
            default: None,
            validator: None,
            diff_suppressor: None,
            set_hash: None,
            elem: Vec::new(),
        }
    }

    pub fn string(name: &'static str) -> Self {
        Self::new(name, AttrType::String)
    }

    pub fn int(name: &'static str) -> Self {
        Self::new(name, AttrType::Int)
    }

    pub fn bool(name: &'static str) -> Self {
        Self::new(name, AttrType::Bool)
    }

    pub fn list(name: &'static str) -> Self {
        Self::new(name, AttrType::List)
    }

    pub fn set(name: &'static str) -> Self {
        Self::new(name, AttrType::Set)
    }

    pub fn map(name: &'static str) -> Self {
        Self::new(name, AttrType::Map)
    }

    pub fn block(name: &'static str, elem: Vec<Attribute>) -> Self {
        let mut a = Self::new(name, AttrType::Block);
        a.elem = elem;
        a
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn deprecated(mut self, message: &'static str) -> Self {
        self.deprecated = Some(message);
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn validator(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn suppress(mut self, suppressor: Suppressor) -> Self {
        self.diff_suppressor = Some(suppressor);
        self
    }

    pub fn hash_with(mut self, hash: SetHash) -> Self {
        self.set_hash = Some(hash);
        self
    }

    pub fn elem_of(mut self, elem: Vec<Attribute>) -> Self {
        self.elem = elem;
        self
    }
}

/// Per-operation timeouts carried by a schema.
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    pub create: Duration,
    pub read: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl Timeouts {
    pub fn uniform(timeout: Duration) -> Self {
        Self {
            create: timeout,
            read: timeout,
            update: timeout,
            delete: timeout,
        }
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self::uniform(Duration::from_secs(10 * 60))
    }
}

/// The static description of one resource type's attribute surface.
pub struct Schema {
    pub resource: &'static str,
    pub attributes: Vec<Attribute>,
    pub timeouts: Timeouts,
}

impl Schema {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Checks a configuration tree against required flags and validators.
    /// Blocks and block-valued collections are checked one level of nesting
    /// at a time, the way the orchestrator walks them.
    pub fn validate(&self, config: &Value) -> Result<(), Vec<String>> {
        let mut problems = Vec::new();
        validate_attributes(&self.attributes, config, "", &mut problems);
        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems)
        }
    }
}

fn validate_attributes(attrs: &[Attribute], config: &Value, prefix: &str, out: &mut Vec<String>) {
    let Some(map) = config.as_object() else {
        return;
    };
    for attr in attrs {
        let path = if prefix.is_empty() {
            attr.name.to_string()
        } else {
            format!("{prefix}.{}", attr.name)
        };
        let value = map.get(attr.name).filter(|v| !v.is_null());
        match value {
            None => {
                if attr.required {
                    out.push(format!("{path}: required attribute is missing"));
                }
            }
            Some(value) => {
                if let Some(validator) = &attr.validator {
                    if let Err(problem) = validator.check(&path, value) {
                        out.push(problem);
                    }
                }
                if !attr.elem.is_empty() {
                    match value {
                        Value::Array(items) => {
                            for (i, item) in items.iter().enumerate() {
                                validate_attributes(
                                    &attr.elem,
                                    item,
                                    &format!("{path}.{i}"),
                                    out,
                                );
                            }
                        }
                        Value::Object(_) => {
                            validate_attributes(&attr.elem, value, &path, out);
                        }
                        _ => out.push(format!("{path}: expected a block")),
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    fn schema() -> Schema {
        Schema {
            resource: "test_thing",
            attributes: vec![
                Attribute::string("name")
                    .required()
                    .validator(Validator::StringLen { min: 1, max: 63 }),
                Attribute::string("mode")
                    .optional()
                    .validator(Validator::OneOf(&["GOVERNANCE", "COMPLIANCE"])),
                Attribute::map("metadata")
                    .optional()
                    .validator(Validator::LowercaseKeys),
                Attribute::block(
                    "rule",
                    vec![Attribute::int("days").required()],
                ),
            ],
            timeouts: Timeouts::default(),
        }
    }

    #[test]
    fn required_attribute_missing() {
        let err = schema().validate(&json!({})).unwrap_err();
        assert_eq!(err, vec!["name: required attribute is missing"]);
    }

    #[test]
    fn enum_and_map_validators() {
        let err = schema()
            .validate(&json!({
                "name": "ok",
                "mode": "LOOSE",
                "metadata": {"Upper": "x"},
            }))
            .unwrap_err();
        assert_eq!(err.len(), 2);
        assert!(err[0].contains("expected one of"));
        assert!(err[1].contains("must be lower-case"));
    }

    #[test]
    fn nested_blocks_are_walked() {
        let err = schema()
            .validate(&json!({
                "name": "ok",
                "rule": [{"days": 3}, {}],
            }))
            .unwrap_err();
        assert_eq!(err, vec!["rule.1.days: required attribute is missing"]);
    }

    #[test]
    fn valid_config_passes() {
        schema()
            .validate(&json!({
                "name": "ok",
                "mode": "GOVERNANCE",
                "metadata": {"lower": "x"},
                "rule": [{"days": 3}],
            }))
            .unwrap();
    }
}
