//! Bitrix24 metadata models

use serde::{Deserialize, Serialize};

/// Field descriptor as reported by `*.fields`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFieldDescriptor {
    #[serde(rename = "type", default)]
    pub field_type: Option<String>,
    #[serde(default)]
    pub is_required: bool,
    #[serde(default)]
    pub is_read_only: bool,
    #[serde(default)]
    pub is_immutable: bool,
    #[serde(default)]
    pub is_multiple: bool,
    #[serde(default)]
    pub is_dynamic: bool,
    #[serde(default)]
    pub title: Option<String>,
}

/// Normalized field metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Field code, e.g. "TITLE" or "UF_CRM_1700000000"
    pub name: String,
    /// Bitrix24 type name; "string" when unreported
    #[serde(rename = "type")]
    pub field_type: String,
    pub required: bool,
    pub read_only: bool,
    pub immutable: bool,
    pub multiple: bool,
    /// User fields (UF_*) are dynamic
    pub dynamic: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl FieldDescriptor {
    pub fn from_raw(name: impl Into<String>, raw: RawFieldDescriptor) -> Self {
        Self {
            name: name.into(),
            field_type: raw
                .field_type
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "string".to_string()),
            required: raw.is_required,
            read_only: raw.is_read_only,
            immutable: raw.is_immutable,
            multiple: raw.is_multiple,
            dynamic: raw.is_dynamic,
            title: raw.title.filter(|t| !t.is_empty()),
        }
    }

    /// "Title (NAME)" when the title differs from the code, else the code
    pub fn display_name(&self) -> String {
        match &self.title {
            Some(title) if title != &self.name => format!("{} ({})", title, self.name),
            _ => self.name.clone(),
        }
    }

    /// "Type: t | Required | Read-only | Dynamic | Multiple"
    pub fn description(&self) -> String {
        let mut parts = vec![format!("Type: {}", self.field_type)];
        if self.required {
            parts.push("Required".to_string());
        }
        if self.read_only {
            parts.push("Read-only".to_string());
        }
        if self.dynamic {
            parts.push("Dynamic".to_string());
        }
        if self.multiple {
            parts.push("Multiple".to_string());
        }
        parts.join(" | ")
    }
}

/// A CRM entity type usable with `crm.item.*`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityType {
    pub name: String,
    pub entity_type_id: u32,
    /// Built-in (lead, deal, ...) vs. user-defined smart process
    pub system: bool,
}
