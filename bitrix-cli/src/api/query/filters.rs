//! Filter conditions for list operations

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::error::BitrixError;

/// Comparison operators understood by Bitrix24 list filters
///
/// The compiled filter key is the operator symbol followed by the field
/// name, e.g. `!=STAGE_ID`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterOperator {
    #[default]
    Equal,
    NotEqual,
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
    /// `%` substring match
    Like,
    /// `!%` negated substring match
    NotLike,
    /// `=%` starts-with pattern
    StartsLike,
    /// `%=` ends-with pattern
    EndsLike,
    /// `@` value in list
    In,
    /// `!@` value not in list
    NotIn,
}

impl FilterOperator {
    pub const ALL: [FilterOperator; 12] = [
        Self::Equal,
        Self::NotEqual,
        Self::Greater,
        Self::GreaterOrEqual,
        Self::Less,
        Self::LessOrEqual,
        Self::Like,
        Self::NotLike,
        Self::StartsLike,
        Self::EndsLike,
        Self::In,
        Self::NotIn,
    ];

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Equal => "=",
            Self::NotEqual => "!=",
            Self::Greater => ">",
            Self::GreaterOrEqual => ">=",
            Self::Less => "<",
            Self::LessOrEqual => "<=",
            Self::Like => "%",
            Self::NotLike => "!%",
            Self::StartsLike => "=%",
            Self::EndsLike => "%=",
            Self::In => "@",
            Self::NotIn => "!@",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        let symbol = symbol.trim();
        Self::ALL.into_iter().find(|op| op.symbol() == symbol)
    }

    /// List operators take a comma-separated value
    pub fn is_list(&self) -> bool {
        matches!(self, Self::In | Self::NotIn)
    }
}

impl std::fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

impl Serialize for FilterOperator {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.symbol())
    }
}

impl<'de> Deserialize<'de> for FilterOperator {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let symbol = String::deserialize(deserializer)?;
        Self::from_symbol(&symbol)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown filter operator '{}'", symbol)))
    }
}

/// A single `field <op> value` condition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCondition {
    pub field: String,
    #[serde(default)]
    pub operator: FilterOperator,
    #[serde(default)]
    pub value: String,
}

impl FilterCondition {
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }

    /// Build from an operator symbol, e.g. `("STAGE_ID", "!=", "NEW")`
    pub fn parse(field: &str, symbol: &str, value: &str) -> Result<Self, BitrixError> {
        let operator = FilterOperator::from_symbol(symbol)
            .ok_or_else(|| BitrixError::invalid(format!("unknown filter operator '{}'", symbol)))?;
        Ok(Self::new(field, operator, value))
    }

    /// Compiled filter key, e.g. `!=STAGE_ID`
    pub fn key(&self) -> String {
        format!("{}{}", self.operator.symbol(), self.field.trim())
    }

    /// Compiled filter value: a list for `@`/`!@`, the raw string otherwise
    ///
    /// List values are split on commas and trimmed; pieces that are empty
    /// after trimming are dropped.
    pub fn compiled_value(&self) -> Value {
        if self.operator.is_list() {
            Value::Array(
                self.value
                    .split(',')
                    .map(str::trim)
                    .filter(|piece| !piece.is_empty())
                    .map(|piece| Value::String(piece.to_string()))
                    .collect(),
            )
        } else {
            Value::String(self.value.clone())
        }
    }
}
