//! Core Operation types for Bitrix24 CRM entity methods

use serde::{Deserialize, Serialize};

use crate::api::error::BitrixError;
use crate::api::models::{HttpMethod, Resource};

/// A verb applied to a CRM resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Create a new record (`*.add`)
    Add,
    /// Modify an existing record by ID (`*.update`)
    Update,
    /// Retrieve a record by ID (`*.get`)
    Get,
    /// Delete a record by ID (`*.delete`)
    Delete,
    /// Retrieve a filtered page of records (`*.list`)
    List,
    /// Retrieve field metadata (`*.fields`)
    Fields,
}

impl Operation {
    pub const ALL: [Operation; 6] = [
        Self::Add,
        Self::Update,
        Self::Get,
        Self::Delete,
        Self::List,
        Self::Fields,
    ];

    /// Parse an operation name, failing with UnsupportedOperation
    pub fn parse(value: &str) -> Result<Self, BitrixError> {
        match value.trim() {
            "add" => Ok(Self::Add),
            "update" => Ok(Self::Update),
            "get" => Ok(Self::Get),
            "delete" => Ok(Self::Delete),
            "list" => Ok(Self::List),
            "fields" => Ok(Self::Fields),
            other => Err(BitrixError::UnsupportedOperation {
                operation: other.to_string(),
            }),
        }
    }

    /// Method name suffix (e.g., "get")
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Update => "update",
            Self::Get => "get",
            Self::Delete => "delete",
            Self::List => "list",
            Self::Fields => "fields",
        }
    }

    /// Default HTTP method for this operation
    ///
    /// `List` switches to POST when the query is supplied as raw JSON.
    pub fn http_method(&self) -> HttpMethod {
        match self {
            Self::Get | Self::Delete | Self::List => HttpMethod::Get,
            Self::Add | Self::Update | Self::Fields => HttpMethod::Post,
        }
    }

    /// Whether the record ID parameter is required
    pub fn requires_id(&self) -> bool {
        matches!(self, Self::Get | Self::Update | Self::Delete)
    }

    /// REST method name for a resource (e.g., "crm.deal.get")
    pub fn endpoint(&self, resource: Resource) -> String {
        format!("{}.{}", resource.method_prefix(), self.as_str())
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the payload of add/update/list/custom calls is supplied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputType {
    /// Structured name/value pairs, filters or list inputs
    #[default]
    Structured,
    /// Raw JSON text or object
    Json,
}

impl InputType {
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("json") => Self::Json,
            _ => Self::Structured,
        }
    }
}
