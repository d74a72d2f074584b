//! Payload helpers shared by the dispatcher and the custom-method pathway

use serde_json::{Map, Value};

use crate::api::error::BitrixError;
use crate::api::params::Params;
use crate::api::tree::{ParameterEntry, TreeBuilder};

/// Read a raw-JSON parameter as an object
///
/// The value may be JSON text (from a text field) or an already-structured
/// object (from a job file). Anything that is not an object is rejected.
pub fn json_object(params: &Params<'_>, name: &str, label: &str) -> Result<Map<String, Value>, BitrixError> {
    let value = params.raw(name).unwrap_or(Value::String(String::new()));
    let parsed = match value {
        Value::String(text) => serde_json::from_str::<Value>(&text)
            .map_err(|e| BitrixError::invalid_json(format!("Invalid JSON in {}", label), &e))?,
        other => other,
    };
    match parsed {
        Value::Object(map) => Ok(map),
        other => Err(BitrixError::InvalidInput {
            message: format!("{} must be a JSON object", label),
            details: Some(format!("got {}", json_kind(&other))),
        }),
    }
}

/// Read a structured parameter and nest it with the tree builder
///
/// Three shapes are accepted:
/// - a list of `{name, value}` entries
/// - the host's collection wrapper, a one-key object holding such a list
///   (`{"field": [...]}` / `{"parameter": [...]}`)
/// - a plain `{name: value}` mapping, values kept as given
///
/// Names in every shape go through the tree builder, so `filter.ID` and
/// `select[]` nest the same way.
pub fn structured_tree(
    tree: &TreeBuilder,
    params: &Params<'_>,
    name: &str,
) -> Result<Map<String, Value>, BitrixError> {
    let map = match params.raw(name) {
        None => return Ok(Map::new()),
        Some(Value::Object(map)) => map,
        Some(other) => return Ok(tree.build(&parse_entries(other, name)?)),
    };

    if map.len() == 1 {
        if let Some((_, list)) = map.iter().next().filter(|(_, v)| is_entry_list(v)) {
            return Ok(tree.build(&parse_entries(list.clone(), name)?));
        }
    }

    let mut root = Value::Object(Map::new());
    for (key, value) in map {
        tree.insert(&mut root, &key, value);
    }
    Ok(match root {
        Value::Object(map) => map,
        _ => Map::new(),
    })
}

/// Every element carries a `name`; an empty list qualifies
fn is_entry_list(value: &Value) -> bool {
    matches!(value, Value::Array(items) if items.iter().all(|item| item.get("name").is_some()))
}

fn parse_entries(value: Value, name: &str) -> Result<Vec<ParameterEntry>, BitrixError> {
    serde_json::from_value(value)
        .map_err(|e| BitrixError::invalid_json(format!("Invalid value for '{}'", name), &e))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn source(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_json_object_from_text_and_object() {
        let s = source(json!({ "a": "{\"TITLE\": \"x\"}", "b": { "TITLE": "y" } }));
        let p = Params::new(&s, 0);
        assert_eq!(json_object(&p, "a", "data").unwrap()["TITLE"], json!("x"));
        assert_eq!(json_object(&p, "b", "data").unwrap()["TITLE"], json!("y"));
    }

    #[test]
    fn test_json_object_rejects_bad_json() {
        let s = source(json!({ "a": "{bad" }));
        let err = json_object(&Params::new(&s, 0), "a", "fields").unwrap_err();
        match err {
            BitrixError::InvalidInput { message, details } => {
                assert_eq!(message, "Invalid JSON in fields");
                assert!(details.is_some());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_json_object_rejects_non_objects() {
        let s = source(json!({ "a": "[1, 2]", "b": "42" }));
        let p = Params::new(&s, 0);
        assert!(matches!(json_object(&p, "a", "data"), Err(BitrixError::InvalidInput { .. })));
        assert!(matches!(json_object(&p, "b", "data"), Err(BitrixError::InvalidInput { .. })));
        assert!(matches!(json_object(&p, "missing", "data"), Err(BitrixError::InvalidInput { .. })));
    }

    #[test]
    fn test_structured_tree_shapes() {
        let s = source(json!({
            "plain": [{ "name": "TITLE", "value": "x" }],
            "wrapped": { "field": [{ "name": "TITLE", "value": "y" }] },
            "mapping": { "TITLE": "z", "OPPORTUNITY": 5 },
            "single": { "TITLE": "w" },
            "nested": { "filter.STAGE_ID": "NEW", "select[]": "ID" },
            "multi": { "PHONE": [{ "VALUE": "+1", "VALUE_TYPE": "WORK" }] },
            "empty": {},
            "bad": [{ "name": "TITLE", "value": "x" }, 3]
        }));
        let p = Params::new(&s, 0);
        let tree = TreeBuilder::default();
        let build = |name: &str| structured_tree(&tree, &p, name).map(Value::Object);

        assert_eq!(build("plain").unwrap(), json!({ "TITLE": "x" }));
        assert_eq!(build("wrapped").unwrap(), json!({ "TITLE": "y" }));
        assert_eq!(build("mapping").unwrap(), json!({ "TITLE": "z", "OPPORTUNITY": 5 }));
        assert_eq!(build("single").unwrap(), json!({ "TITLE": "w" }));
        assert_eq!(
            build("nested").unwrap(),
            json!({ "filter": { "STAGE_ID": "NEW" }, "select": ["ID"] })
        );
        assert_eq!(
            build("multi").unwrap(),
            json!({ "PHONE": [{ "VALUE": "+1", "VALUE_TYPE": "WORK" }] })
        );
        assert_eq!(build("empty").unwrap(), json!({}));
        assert_eq!(build("missing").unwrap(), json!({}));
        assert!(matches!(build("bad"), Err(BitrixError::InvalidInput { .. })));
    }
}
