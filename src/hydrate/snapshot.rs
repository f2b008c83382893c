//! Serialized state carried across the hydration boundary.
//!
//! The blob is a flat JSON object whose keys join a component id and a state
//! key with [`KEY_SEPARATOR`]; every value is a JSON primitive.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use serde_json::Value;

use super::HydrationError;

/// Joins `componentId` and `stateKey` in snapshot keys.
pub const KEY_SEPARATOR: &str = "::";

/// Snapshot shared between the renderer and state primitives.
pub type SharedSnapshot = Rc<RefCell<HydrationSnapshot>>;

/// Flat `(componentId, stateKey) → primitive` mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HydrationSnapshot {
    entries: BTreeMap<String, Value>,
}

fn join(component_id: &str, state_key: &str) -> String {
    format!("{component_id}{KEY_SEPARATOR}{state_key}")
}

fn is_primitive(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

impl HydrationSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a bootstrap blob.
    pub fn parse(blob: &str) -> Result<Self, HydrationError> {
        let value: Value = serde_json::from_str(blob)
            .map_err(|err| HydrationError::MalformedSnapshot(err.to_string()))?;
        let Value::Object(map) = value else {
            return Err(HydrationError::MalformedSnapshot(
                "top level is not an object".into(),
            ));
        };
        let mut entries = BTreeMap::new();
        for (key, value) in map {
            if !key.contains(KEY_SEPARATOR) {
                return Err(HydrationError::MalformedSnapshot(format!(
                    "key `{key}` has no `{KEY_SEPARATOR}` separator"
                )));
            }
            if !is_primitive(&value) {
                return Err(HydrationError::MalformedSnapshot(format!(
                    "value for `{key}` is not a primitive"
                )));
            }
            entries.insert(key, value);
        }
        Ok(Self { entries })
    }

    /// `readSnapshotValue`.
    pub fn read(&self, component_id: &str, state_key: &str) -> Option<Value> {
        self.entries.get(&join(component_id, state_key)).cloned()
    }

    /// `writeSnapshotValue`. Non-primitive values are rejected.
    pub fn write(
        &mut self,
        component_id: &str,
        state_key: &str,
        value: Value,
    ) -> Result<(), HydrationError> {
        if !is_primitive(&value) {
            return Err(HydrationError::NonPrimitive {
                key: join(component_id, state_key),
            });
        }
        self.entries.insert(join(component_id, state_key), value);
        Ok(())
    }

    /// `serializeForBootstrap`: keys in sorted order.
    pub fn serialize(&self) -> String {
        Value::Object(
            self.entries
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
        .to_string()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_and_read() {
        let snapshot =
            HydrationSnapshot::parse(r#"{"counter::count": 3, "form::name": "ada"}"#).unwrap();
        assert_eq!(snapshot.read("counter", "count"), Some(json!(3)));
        assert_eq!(snapshot.read("form", "name"), Some(json!("ada")));
        assert_eq!(snapshot.read("form", "email"), None);
        assert_eq!(snapshot.len(), 2);
    }

    #[test]
    fn parse_rejects_non_object() {
        assert!(matches!(
            HydrationSnapshot::parse("[1, 2]"),
            Err(HydrationError::MalformedSnapshot(_))
        ));
        assert!(matches!(
            HydrationSnapshot::parse("{not json"),
            Err(HydrationError::MalformedSnapshot(_))
        ));
    }

    #[test]
    fn parse_rejects_nested_values_and_bad_keys() {
        assert!(HydrationSnapshot::parse(r#"{"a::b": {"c": 1}}"#).is_err());
        assert!(HydrationSnapshot::parse(r#"{"ab": 1}"#).is_err());
    }

    #[test]
    fn write_then_serialize_sorted() {
        let mut snapshot = HydrationSnapshot::new();
        snapshot.write("z", "flag", json!(true)).unwrap();
        snapshot.write("a", "count", json!(1)).unwrap();
        snapshot.write("a", "count", json!(2)).unwrap();
        insta::assert_snapshot!(snapshot.serialize(), @r#"{"a::count":2,"z::flag":true}"#);
    }

    #[test]
    fn write_rejects_non_primitive() {
        let mut snapshot = HydrationSnapshot::new();
        let err = snapshot.write("list", "items", json!([1, 2])).unwrap_err();
        assert_eq!(
            err,
            HydrationError::NonPrimitive {
                key: "list::items".into()
            }
        );
        assert!(snapshot.is_empty());
    }

    #[test]
    fn serialize_parses_back() {
        let mut snapshot = HydrationSnapshot::new();
        snapshot.write("c", "n", json!(null)).unwrap();
        snapshot.write("c", "s", json!("x")).unwrap();
        assert_eq!(HydrationSnapshot::parse(&snapshot.serialize()).unwrap(), snapshot);
    }
}
