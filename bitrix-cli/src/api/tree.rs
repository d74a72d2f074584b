//! Parameter tree builder
//!
//! Turns flat `(name, value)` pairs into nested JSON objects and arrays.
//! Names use dot-notation for nesting (`fields.TITLE`) and brackets for
//! keys and arrays:
//!
//! - `key[n]` assigns at index `n`, padding gaps with null
//! - `key[]` appends to the array under `key`
//! - `key[NAME]` is a nested key, same as `key.NAME`
//!
//! Which array forms are recognised is set by [`ArrayNotation`]. A form
//! that is switched off stays part of the key text verbatim.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Indices above this are treated as plain keys instead of padding an array
pub const MAX_ARRAY_INDEX: usize = 10_000;

/// A single user-entered parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_raw_string")]
    pub value: String,
}

impl ParameterEntry {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Accept numbers and booleans from JSON/TOML inputs, keeping them as text
fn deserialize_raw_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}

/// Recognised bracket-array forms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArrayNotation {
    /// Both `key[n]` and `key[]`
    #[default]
    Both,
    /// Only `key[n]`; `key[]` is a literal key
    Indexed,
    /// Only `key[]`; `key[n]` is a nested object key `"n"`
    Append,
}

impl ArrayNotation {
    fn allows_index(&self) -> bool {
        matches!(self, Self::Both | Self::Indexed)
    }

    fn allows_append(&self) -> bool {
        matches!(self, Self::Both | Self::Append)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Key(String),
    Index(usize),
    Append,
}

/// Builds nested parameter trees
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeBuilder {
    notation: ArrayNotation,
}

impl TreeBuilder {
    pub fn new(notation: ArrayNotation) -> Self {
        Self { notation }
    }

    pub fn notation(&self) -> ArrayNotation {
        self.notation
    }

    /// Build a tree from entries, applied in order; later writes win
    pub fn build<'e>(&self, entries: impl IntoIterator<Item = &'e ParameterEntry>) -> Map<String, Value> {
        let mut root = Value::Object(Map::new());
        for entry in entries {
            self.insert(&mut root, &entry.name, Value::String(entry.value.clone()));
        }
        match root {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    /// Insert one value at the path encoded by `name`
    ///
    /// Empty names (or names with no usable segment) are ignored.
    pub fn insert(&self, root: &mut Value, name: &str, value: Value) {
        let segments = self.parse_name(name);
        if segments.is_empty() {
            return;
        }
        assign(root, &segments, value);
    }

    fn parse_name(&self, name: &str) -> Vec<Segment> {
        let mut segments = Vec::new();
        let mut current = String::new();
        let mut chars = name.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '.' => {
                    if !current.is_empty() {
                        segments.push(Segment::Key(std::mem::take(&mut current)));
                    }
                }
                '[' => {
                    let mut inner = String::new();
                    let mut closed = false;
                    for c in chars.by_ref() {
                        if c == ']' {
                            closed = true;
                            break;
                        }
                        inner.push(c);
                    }
                    if !closed {
                        // Unbalanced bracket: keep the text as part of the key
                        current.push('[');
                        current.push_str(&inner);
                        continue;
                    }
                    if !current.is_empty() {
                        segments.push(Segment::Key(std::mem::take(&mut current)));
                    }
                    self.push_bracket(&mut segments, inner);
                }
                _ => current.push(c),
            }
        }
        if !current.is_empty() {
            segments.push(Segment::Key(current));
        }

        // The root is always an object
        if let Some(first) = segments.first_mut() {
            if !matches!(first, Segment::Key(_)) {
                *first = Segment::Key(literal(first));
            }
        }
        segments
    }

    fn push_bracket(&self, segments: &mut Vec<Segment>, inner: String) {
        let segment = if inner.is_empty() {
            if self.notation.allows_append() {
                Segment::Append
            } else {
                return append_literal(segments, "[]");
            }
        } else if inner.bytes().all(|b| b.is_ascii_digit()) {
            match inner.parse::<usize>() {
                Ok(index) if self.notation.allows_index() && index <= MAX_ARRAY_INDEX => {
                    Segment::Index(index)
                }
                _ => Segment::Key(inner),
            }
        } else {
            Segment::Key(inner)
        };
        segments.push(segment);
    }
}

fn literal(segment: &Segment) -> String {
    match segment {
        Segment::Key(k) => k.clone(),
        Segment::Index(i) => format!("[{}]", i),
        Segment::Append => "[]".to_string(),
    }
}

fn append_literal(segments: &mut Vec<Segment>, text: &str) {
    match segments.last_mut() {
        Some(Segment::Key(key)) => key.push_str(text),
        _ => segments.push(Segment::Key(text.to_string())),
    }
}

fn assign(slot: &mut Value, segments: &[Segment], value: Value) {
    let Some((head, rest)) = segments.split_first() else {
        *slot = value;
        return;
    };

    match head {
        Segment::Key(key) => {
            // Intermediate scalars are replaced by an object
            let map = object_slot(slot);
            let child = map.entry(key.clone()).or_insert(Value::Null);
            assign(child, rest, value);
        }
        Segment::Index(index) => {
            let items = array_slot(slot);
            if items.len() <= *index {
                items.resize(index + 1, Value::Null);
            }
            assign(&mut items[*index], rest, value);
        }
        Segment::Append => {
            let items = array_slot(slot);
            items.push(Value::Null);
            let last = items.len() - 1;
            assign(&mut items[last], rest, value);
        }
    }
}

fn object_slot(slot: &mut Value) -> &mut Map<String, Value> {
    if !slot.is_object() {
        *slot = Value::Object(Map::new());
    }
    match slot {
        Value::Object(map) => map,
        _ => unreachable!("slot was just set to an object"),
    }
}

fn array_slot(slot: &mut Value) -> &mut Vec<Value> {
    if !slot.is_array() {
        *slot = Value::Array(Vec::new());
    }
    match slot {
        Value::Array(items) => items,
        _ => unreachable!("slot was just set to an array"),
    }
}

/// Build with the default notation (indexed and append forms both enabled)
pub fn build_tree<'e>(entries: impl IntoIterator<Item = &'e ParameterEntry>) -> Map<String, Value> {
    TreeBuilder::default().build(entries)
}

/// How flattened paths are spelled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStyle {
    /// `fields.TITLE`, `select[0]`
    Dotted,
    /// `fields[TITLE]`, `select[0]` (PHP-style query strings)
    Bracketed,
}

/// Flatten a tree back into `(path, value)` pairs
///
/// Null leaves (array gaps) and empty containers produce no pairs.
pub fn flatten(tree: &Map<String, Value>, style: PathStyle) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (key, value) in tree {
        flatten_value(key.clone(), value, style, &mut pairs);
    }
    pairs
}

fn flatten_value(path: String, value: &Value, style: PathStyle, pairs: &mut Vec<(String, String)>) {
    match value {
        Value::Null => {}
        Value::String(s) => pairs.push((path, s.clone())),
        Value::Bool(_) | Value::Number(_) => pairs.push((path, value.to_string())),
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                flatten_value(format!("{}[{}]", path, i), item, style, pairs);
            }
        }
        Value::Object(map) => {
            for (key, item) in map {
                let child = match style {
                    PathStyle::Dotted => format!("{}.{}", path, key),
                    PathStyle::Bracketed => format!("{}[{}]", path, key),
                };
                flatten_value(child, item, style, pairs);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entries(pairs: &[(&str, &str)]) -> Vec<ParameterEntry> {
        pairs
            .iter()
            .map(|(n, v)| ParameterEntry::new(*n, *v))
            .collect()
    }

    #[test]
    fn test_flat_names() {
        let tree = build_tree(&entries(&[("TITLE", "Deal"), ("OPPORTUNITY", "100")]));
        assert_eq!(
            Value::Object(tree),
            json!({ "TITLE": "Deal", "OPPORTUNITY": "100" })
        );
    }

    #[test]
    fn test_dot_notation_nests() {
        let tree = build_tree(&entries(&[
            ("fields.TITLE", "x"),
            ("fields.CONTACT.NAME", "Ann"),
            ("params.REGISTER_SONET_EVENT", "Y"),
        ]));
        assert_eq!(
            Value::Object(tree),
            json!({
                "fields": { "TITLE": "x", "CONTACT": { "NAME": "Ann" } },
                "params": { "REGISTER_SONET_EVENT": "Y" }
            })
        );
    }

    #[test]
    fn test_indexed_array_with_gaps() {
        let tree = build_tree(&entries(&[("PHONE[2]", "555"), ("PHONE[0]", "111")]));
        assert_eq!(Value::Object(tree), json!({ "PHONE": ["111", null, "555"] }));
    }

    #[test]
    fn test_append_array() {
        let tree = build_tree(&entries(&[("select[]", "ID"), ("select[]", "TITLE")]));
        assert_eq!(Value::Object(tree), json!({ "select": ["ID", "TITLE"] }));
    }

    #[test]
    fn test_bracket_keys_nest_like_dots() {
        let tree = build_tree(&entries(&[
            ("filter[STAGE_ID]", "C1:NEW"),
            ("filter[>OPPORTUNITY]", "500"),
            ("order.ID", "DESC"),
        ]));
        assert_eq!(
            Value::Object(tree),
            json!({
                "filter": { "STAGE_ID": "C1:NEW", ">OPPORTUNITY": "500" },
                "order": { "ID": "DESC" }
            })
        );
    }

    #[test]
    fn test_mixed_nesting_and_arrays() {
        let tree = build_tree(&entries(&[
            ("fields.PHONE[0].VALUE", "555"),
            ("fields.PHONE[0].VALUE_TYPE", "WORK"),
            ("fields.PHONE[1].VALUE", "777"),
        ]));
        assert_eq!(
            Value::Object(tree),
            json!({
                "fields": {
                    "PHONE": [
                        { "VALUE": "555", "VALUE_TYPE": "WORK" },
                        { "VALUE": "777" }
                    ]
                }
            })
        );
    }

    #[test]
    fn test_empty_names_are_discarded() {
        let tree = build_tree(&entries(&[("", "x"), ("..", "y"), ("A", "1")]));
        assert_eq!(Value::Object(tree), json!({ "A": "1" }));
    }

    #[test]
    fn test_last_write_wins() {
        let tree = build_tree(&entries(&[("A.B", "1"), ("A.B", "2")]));
        assert_eq!(Value::Object(tree), json!({ "A": { "B": "2" } }));
    }

    #[test]
    fn test_intermediate_scalar_is_overwritten() {
        let tree = build_tree(&entries(&[("A", "scalar"), ("A.B", "nested")]));
        assert_eq!(Value::Object(tree), json!({ "A": { "B": "nested" } }));
    }

    #[test]
    fn test_indexed_only_notation_keeps_append_literal() {
        let builder = TreeBuilder::new(ArrayNotation::Indexed);
        let tree = builder.build(&entries(&[("tags[]", "a"), ("ids[1]", "7")]));
        assert_eq!(
            Value::Object(tree),
            json!({ "tags[]": "a", "ids": [null, "7"] })
        );
    }

    #[test]
    fn test_append_only_notation_treats_indices_as_keys() {
        let builder = TreeBuilder::new(ArrayNotation::Append);
        let tree = builder.build(&entries(&[("tags[]", "a"), ("ids[1]", "7")]));
        assert_eq!(
            Value::Object(tree),
            json!({ "tags": ["a"], "ids": { "1": "7" } })
        );
    }

    #[test]
    fn test_oversized_index_becomes_key() {
        let tree = build_tree(&entries(&[("A[99999999]", "x")]));
        assert_eq!(Value::Object(tree), json!({ "A": { "99999999": "x" } }));
    }

    #[test]
    fn test_unbalanced_bracket_is_literal() {
        let tree = build_tree(&entries(&[("A[B", "x")]));
        assert_eq!(Value::Object(tree), json!({ "A[B": "x" }));
    }

    #[test]
    fn test_dotted_round_trip() {
        let input = entries(&[
            ("fields.TITLE", "Deal"),
            ("fields.CONTACT.NAME", "Ann"),
            ("fields.TAGS[0]", "a"),
            ("fields.TAGS[2]", "c"),
            ("start", "50"),
        ]);
        let tree = build_tree(&input);

        let mut flat = flatten(&tree, PathStyle::Dotted);
        flat.sort();
        let mut expected: Vec<(String, String)> = input
            .iter()
            .map(|e| (e.name.clone(), e.value.clone()))
            .collect();
        expected.sort();
        assert_eq!(flat, expected);

        // Depth equals the longest path minus one
        assert!(tree["fields"]["CONTACT"]["NAME"].is_string());
    }

    #[test]
    fn test_bracketed_flatten() {
        let tree = json!({ "filter": { ">ID": 5 }, "select": ["ID", "TITLE"] });
        let mut flat = flatten(tree.as_object().unwrap(), PathStyle::Bracketed);
        flat.sort();
        assert_eq!(
            flat,
            vec![
                ("filter[>ID]".to_string(), "5".to_string()),
                ("select[0]".to_string(), "ID".to_string()),
                ("select[1]".to_string(), "TITLE".to_string()),
            ]
        );
    }

    #[test]
    fn test_entry_deserializes_non_string_values() {
        let entry: ParameterEntry = serde_json::from_value(json!({ "name": "ID", "value": 5 })).unwrap();
        assert_eq!(entry.value, "5");
        let entry: ParameterEntry = serde_json::from_value(json!({ "name": "X" })).unwrap();
        assert_eq!(entry.value, "");
    }
}
