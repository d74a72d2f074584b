//! Field-metadata and entity-type discovery
//!
//! Field discovery reports failures; entity-type discovery degrades to the
//! built-in types when the portal cannot list user-defined ones.

pub mod models;

pub use models::{EntityType, FieldDescriptor, RawFieldDescriptor};

use log::warn;
use serde_json::{Map, Value};

use super::client::BitrixClient;
use super::constants::{SYSTEM_ENTITY_TYPES, TYPE_LIST_METHOD};
use super::error::BitrixError;
use super::models::{RequestSpec, Resource};
use super::operations::Dispatcher;
use super::params::Params;

/// List the fields of a resource via `{resource}.fields`
pub async fn list_entity_fields(
    client: &BitrixClient,
    resource: Resource,
    entity_type_id: Option<u32>,
    use_original_uf_names: bool,
) -> Result<Vec<FieldDescriptor>, BitrixError> {
    let mut params = Map::new();
    if let Some(id) = entity_type_id {
        params.insert("entityTypeId".to_string(), Value::from(id));
    }
    params.insert("useOriginalUfNames".to_string(), Value::Bool(use_original_uf_names));

    let spec = Dispatcher::default().dispatch(resource, "fields", &Params::new(&params, 0))?;
    let envelope = client.call(&spec).await?;
    parse_fields(resource, envelope)
}

/// Normalize a `*.fields` envelope into descriptors
pub fn parse_fields(resource: Resource, envelope: Value) -> Result<Vec<FieldDescriptor>, BitrixError> {
    let result = match envelope {
        Value::Object(mut map) => map.remove("result"),
        _ => None,
    };
    let Some(Value::Object(mut result)) = result else {
        return Err(BitrixError::invalid("No valid fields data returned"));
    };

    // crm.item nests the descriptors under "fields"
    let fields = if resource.is_item() {
        match result.remove("fields") {
            Some(Value::Object(fields)) => fields,
            _ => Map::new(),
        }
    } else {
        result
    };

    if fields.is_empty() {
        return Err(BitrixError::invalid("No fields available for selected entity"));
    }

    fields
        .into_iter()
        .map(|(name, raw)| {
            let raw: RawFieldDescriptor = serde_json::from_value(raw).map_err(|e| {
                BitrixError::invalid_json(format!("Invalid descriptor for field '{}'", name), &e)
            })?;
            Ok(FieldDescriptor::from_raw(name, raw))
        })
        .collect()
}

/// Built-in entity types
pub fn system_entity_types() -> Vec<EntityType> {
    SYSTEM_ENTITY_TYPES
        .iter()
        .map(|(name, id)| EntityType {
            name: name.to_string(),
            entity_type_id: *id,
            system: true,
        })
        .collect()
}

/// Built-in types followed by the portal's user-defined types
pub async fn list_entity_types(client: &BitrixClient) -> Vec<EntityType> {
    let mut types = system_entity_types();
    types.extend(list_custom_entity_types(client).await);
    types
}

/// User-defined types from `crm.type.list`; empty on any error
pub async fn list_custom_entity_types(client: &BitrixClient) -> Vec<EntityType> {
    match client.call(&RequestSpec::get(TYPE_LIST_METHOD)).await {
        Ok(envelope) => parse_custom_types(&envelope),
        Err(e) => {
            warn!("Custom entity type discovery failed, using built-in types only: {}", e);
            Vec::new()
        }
    }
}

/// Accepts `result: [...]` and `result: { types: [...] }`, with either
/// `title`/`entityTypeId` or `NAME`/`ENTITY_TYPE_ID` keys
fn parse_custom_types(envelope: &Value) -> Vec<EntityType> {
    let result = envelope.get("result");
    let items = result
        .and_then(|r| r.get("types"))
        .or(result)
        .and_then(Value::as_array);

    let Some(items) = items else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| {
            let name = item
                .get("title")
                .or_else(|| item.get("NAME"))
                .and_then(Value::as_str)?;
            let id = item.get("entityTypeId").or_else(|| item.get("ENTITY_TYPE_ID"))?;
            let id = match id {
                Value::Number(n) => n.as_u64(),
                Value::String(s) => s.trim().parse().ok(),
                _ => None,
            }?;
            Some(EntityType {
                name: name.to_string(),
                entity_type_id: u32::try_from(id).ok()?,
                system: false,
            })
        })
        .collect()
}
