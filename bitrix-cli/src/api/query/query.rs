//! Compiled list query

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::filters::FilterCondition;
use crate::api::error::BitrixError;
use super::orderby::OrderCondition;

/// Structured list inputs as collected from the host
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListFilters {
    #[serde(default)]
    pub select: Vec<String>,
    #[serde(default)]
    pub filter: Vec<FilterCondition>,
    #[serde(default)]
    pub order: Vec<OrderCondition>,
    #[serde(default, deserialize_with = "deserialize_offset")]
    pub start: Option<u64>,
}

/// Accept offsets as numbers or numeric strings; empty strings mean "absent"
fn deserialize_offset<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom("start must be a non-negative integer")),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid start offset '{}'", s))),
        Some(other) => Err(serde::de::Error::custom(format!(
            "invalid start offset {}",
            other
        ))),
    }
}

/// Query fragment for `*.list` calls
///
/// Empty collections are omitted entirely so they never reach the query string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub select: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<u64>,
}

impl ListQuery {
    /// Compile structured inputs; later duplicate keys overwrite earlier ones
    ///
    /// A list operator left with no values is rejected: an empty list drops
    /// out of the query string and would turn "in ()" into "no filter".
    pub fn compile(
        select: &[String],
        filters: &[FilterCondition],
        order: &[OrderCondition],
        start: Option<u64>,
    ) -> Result<Self, BitrixError> {
        let select: Vec<String> = select
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        let mut filter = Map::new();
        for condition in filters.iter().filter(|c| !c.field.trim().is_empty()) {
            let value = condition.compiled_value();
            if matches!(&value, Value::Array(items) if items.is_empty()) {
                return Err(BitrixError::InvalidInput {
                    message: format!(
                        "Filter '{}' needs at least one value",
                        condition.key()
                    ),
                    details: Some(format!("got '{}'", condition.value)),
                });
            }
            filter.insert(condition.key(), value);
        }

        let mut order_map = Map::new();
        for condition in order.iter().filter(|c| !c.field.trim().is_empty()) {
            order_map.insert(
                condition.field.trim().to_string(),
                Value::String(condition.direction.as_str().to_string()),
            );
        }

        Ok(Self {
            select: (!select.is_empty()).then_some(select),
            filter: (!filter.is_empty()).then_some(filter),
            order: (!order_map.is_empty()).then_some(order_map),
            start,
        })
    }

    pub fn from_filters(filters: &ListFilters) -> Result<Self, BitrixError> {
        Self::compile(&filters.select, &filters.filter, &filters.order, filters.start)
    }

    pub fn is_empty(&self) -> bool {
        self.select.is_none() && self.filter.is_none() && self.order.is_none() && self.start.is_none()
    }

    /// Query-string mapping with absent parts left out
    pub fn into_map(self) -> Map<String, Value> {
        let mut map = Map::new();
        if let Some(select) = self.select {
            map.insert(
                "select".to_string(),
                Value::Array(select.into_iter().map(Value::String).collect()),
            );
        }
        if let Some(filter) = self.filter {
            map.insert("filter".to_string(), Value::Object(filter));
        }
        if let Some(order) = self.order {
            map.insert("order".to_string(), Value::Object(order));
        }
        if let Some(start) = self.start {
            map.insert("start".to_string(), Value::from(start));
        }
        map
    }
}
