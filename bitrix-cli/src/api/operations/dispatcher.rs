//! Operation dispatcher
//!
//! Maps a resource + operation pair and the record's parameters to a
//! [`RequestSpec`]. Every operation is terminal: one call, one request.

use log::debug;
use serde_json::{Map, Value};

use super::custom::dispatch_custom;
use super::operation::{InputType, Operation};
use super::payload::{json_object, structured_tree};
use crate::api::error::BitrixError;
use crate::api::models::{RequestSpec, Resource};
use crate::api::params::Params;
use crate::api::query::{ListFilters, ListQuery};
use crate::api::tree::TreeBuilder;

/// Resource name that routes to the custom-method pathway
pub const CUSTOM_RESOURCE: &str = "custom";

/// Translates entity operations into requests
#[derive(Debug, Clone, Copy, Default)]
pub struct Dispatcher {
    tree: TreeBuilder,
}

impl Dispatcher {
    pub fn new(tree: TreeBuilder) -> Self {
        Self { tree }
    }

    pub fn tree(&self) -> &TreeBuilder {
        &self.tree
    }

    /// Route a record to the entity dispatcher or the custom-method pathway
    pub fn resolve(&self, params: &Params<'_>) -> Result<RequestSpec, BitrixError> {
        let resource = params
            .string("resource")
            .ok_or_else(|| BitrixError::missing("resource"))?;
        let operation = params.string("operation").unwrap_or_default();
        if operation.trim().is_empty() {
            return Err(BitrixError::missing("operation"));
        }

        if resource.trim() == CUSTOM_RESOURCE {
            return dispatch_custom(&self.tree, &operation, params);
        }

        let parsed = Resource::parse(&resource)
            .ok_or_else(|| BitrixError::invalid(format!("unknown resource '{}'", resource)))?;
        self.dispatch(parsed, &operation, params)
    }

    /// Build the request for `resource.operation`
    pub fn dispatch(
        &self,
        resource: Resource,
        operation: &str,
        params: &Params<'_>,
    ) -> Result<RequestSpec, BitrixError> {
        let operation = Operation::parse(operation)?;
        let endpoint = operation.endpoint(resource);

        let mut spec = match operation {
            Operation::Get | Operation::Delete => {
                let mut query = Map::new();
                query.insert("id".to_string(), params.required("id")?);
                RequestSpec::new(operation.http_method(), endpoint).with_query(query)
            }
            Operation::List => self.list(endpoint, params)?,
            Operation::Add | Operation::Update => {
                let fields = self.fields(params)?;
                let mut body = Map::new();
                body.insert("fields".to_string(), Value::Object(fields));
                let mut spec = RequestSpec::post(endpoint).with_body(body);
                if operation == Operation::Update {
                    spec.query.insert("id".to_string(), params.required("id")?);
                }
                spec
            }
            Operation::Fields => RequestSpec::post(endpoint),
        };

        if resource.is_item() {
            spec.query
                .insert("entityTypeId".to_string(), params.required("entityTypeId")?);
            if operation != Operation::Delete {
                let original = params.bool_or("useOriginalUfNames", false);
                spec.query.insert(
                    "useOriginalUfNames".to_string(),
                    Value::String(if original { "Y" } else { "N" }.to_string()),
                );
            }
        }

        debug!(
            "Record {}: dispatched {} {}",
            params.item_index(),
            spec.method,
            spec.endpoint
        );
        Ok(spec)
    }

    /// `*.list`: structured inputs go to the query string (GET); raw JSON
    /// goes to the body (POST) so large filters are not bound by URL length
    fn list(&self, endpoint: String, params: &Params<'_>) -> Result<RequestSpec, BitrixError> {
        match InputType::parse(params.string("inputType").as_deref()) {
            InputType::Json => {
                let body = json_object(params, "jsonQuery", "JSON query")?;
                Ok(RequestSpec::post(endpoint).with_body(body))
            }
            InputType::Structured => {
                let filters: ListFilters = params.typed("filters")?.unwrap_or_default();
                let query = ListQuery::from_filters(&filters)?.into_map();
                Ok(RequestSpec::get(endpoint).with_query(query))
            }
        }
    }

    /// Resolved `fields` object for add/update; never empty
    fn fields(&self, params: &Params<'_>) -> Result<Map<String, Value>, BitrixError> {
        let fields = match InputType::parse(params.string("inputType").as_deref()) {
            InputType::Json => json_object(params, "jsonData", "fields")?,
            InputType::Structured => structured_tree(&self.tree, params, "fields")?,
        };
        if fields.is_empty() {
            return Err(BitrixError::EmptyFields);
        }
        Ok(fields)
    }
}
