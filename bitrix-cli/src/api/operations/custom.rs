//! Arbitrary REST method calls
//!
//! The method name is passed through untouched; Bitrix24 rejects malformed
//! names itself. The body always goes out as a POST.

use log::debug;

use super::operation::InputType;
use super::payload::{json_object, structured_tree};
use crate::api::error::BitrixError;
use crate::api::models::RequestSpec;
use crate::api::params::Params;
use crate::api::tree::TreeBuilder;

/// Build the request for a user-specified API method
pub fn dispatch_custom(
    tree: &TreeBuilder,
    api_method: &str,
    params: &Params<'_>,
) -> Result<RequestSpec, BitrixError> {
    if api_method.trim().is_empty() {
        return Err(BitrixError::missing("operation"));
    }

    let body = match InputType::parse(params.string("inputType").as_deref()) {
        InputType::Json => json_object(params, "jsonData", "input data")?,
        InputType::Structured => structured_tree(tree, params, "parameters")?,
    };

    debug!(
        "Record {}: dispatched custom method {}",
        params.item_index(),
        api_method
    );
    Ok(RequestSpec::post(api_method).with_body(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::HttpMethod;
    use serde_json::{Map, Value, json};

    fn custom(method: &str, params: Value) -> Result<RequestSpec, BitrixError> {
        let source: Map<String, Value> = params.as_object().cloned().unwrap_or_default();
        dispatch_custom(&TreeBuilder::default(), method, &Params::new(&source, 0))
    }

    #[test]
    fn test_structured_parameters_become_body() {
        let spec = custom(
            "crm.deal.list",
            json!({
                "inputType": "fields",
                "parameters": [
                    { "name": "filter[STAGE_ID]", "value": "C1:NEW" },
                    { "name": "select[]", "value": "ID" },
                    { "name": "select[]", "value": "TITLE" },
                    { "name": "start", "value": "50" }
                ]
            }),
        )
        .unwrap();
        assert_eq!(spec.method, HttpMethod::Post);
        assert_eq!(spec.endpoint, "crm.deal.list");
        assert!(spec.query.is_empty());
        assert_eq!(
            Value::Object(spec.body),
            json!({
                "filter": { "STAGE_ID": "C1:NEW" },
                "select": ["ID", "TITLE"],
                "start": "50"
            })
        );
    }

    #[test]
    fn test_method_name_is_literal() {
        let spec = custom("user.current", json!({})).unwrap();
        assert_eq!(spec.endpoint, "user.current");
        assert!(spec.body.is_empty());
    }

    #[test]
    fn test_json_body() {
        let spec = custom(
            "tasks.task.add",
            json!({ "inputType": "json", "jsonData": "{\"fields\": {\"TITLE\": \"t\"}}" }),
        )
        .unwrap();
        assert_eq!(Value::Object(spec.body), json!({ "fields": { "TITLE": "t" } }));
    }

    #[test]
    fn test_json_body_must_be_object() {
        for bad in ["[1, 2]", "\"text\"", "3", "{bad"] {
            let result = custom("x.y", json!({ "inputType": "json", "jsonData": bad }));
            assert!(
                matches!(result, Err(BitrixError::InvalidInput { .. })),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_empty_method_is_missing() {
        assert_eq!(custom("  ", json!({})), Err(BitrixError::missing("operation")));
    }
}
