//! Per-record run loop
//!
//! Records are processed strictly in order: record `i` is translated and its
//! HTTP call awaited before record `i + 1` starts. The auth mode is read from
//! record 0 and credentials are looked up once for the whole run.

pub mod job;

pub use job::Job;

use std::sync::Arc;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::api::client::{BitrixClient, HttpTransport};
use crate::api::error::{BitrixError, RunError};
use crate::api::models::{AuthMode, CredentialSource, RequestSpec};
use crate::api::operations::Dispatcher;
use crate::api::params::{ParamSource, Params};

/// Parameter naming the credential type; only record 0 is consulted
pub const AUTH_PARAMETER: &str = "authentication";

/// One output item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordOutput {
    /// Index of the input record this item came from
    pub item_index: usize,
    pub json: Value,
    /// Set on continue-on-failure placeholders
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RecordOutput {
    fn success(item_index: usize, value: Value) -> Self {
        let json = match value {
            Value::Object(_) => value,
            other => {
                let mut map = Map::new();
                map.insert("result".to_string(), other);
                Value::Object(map)
            }
        };
        Self {
            item_index,
            json,
            error: None,
        }
    }

    fn failure(item_index: usize, error: &BitrixError) -> Self {
        let message = error.to_string();
        let mut map = Map::new();
        map.insert("error".to_string(), Value::String(message.clone()));
        Self {
            item_index,
            json: Value::Object(map),
            error: Some(message),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// A translated request, for dry runs
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedRequest {
    pub item_index: usize,
    pub result: Result<(RequestSpec, Option<String>), BitrixError>,
}

/// Drives records through dispatch and execution
#[derive(Debug, Clone, Default)]
pub struct Runner {
    dispatcher: Dispatcher,
    default_auth_mode: AuthMode,
    continue_on_fail: bool,
}

impl Runner {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            ..Default::default()
        }
    }

    /// Auth mode used when record 0 does not name one
    pub fn default_auth_mode(mut self, mode: AuthMode) -> Self {
        self.default_auth_mode = mode;
        self
    }

    /// Record failures as placeholders instead of aborting
    pub fn continue_on_fail(mut self, enabled: bool) -> Self {
        self.continue_on_fail = enabled;
        self
    }

    /// Auth mode shared by every record of the run
    pub fn auth_mode(&self, params: &dyn ParamSource) -> Result<AuthMode, BitrixError> {
        match Params::new(params, 0).string(AUTH_PARAMETER) {
            None => Ok(self.default_auth_mode),
            Some(name) => AuthMode::parse(&name)
                .ok_or_else(|| BitrixError::auth(format!("unknown authentication method '{}'", name))),
        }
    }

    fn connect(
        &self,
        params: &dyn ParamSource,
        credentials: &dyn CredentialSource,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<BitrixClient, BitrixError> {
        let mode = self.auth_mode(params)?;
        let credentials = credentials.credentials(mode)?;
        Ok(BitrixClient::new(transport, mode, credentials))
    }

    /// Process `item_count` records
    pub async fn run(
        &self,
        params: &dyn ParamSource,
        item_count: usize,
        credentials: &dyn CredentialSource,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Vec<RecordOutput>, RunError> {
        let run_id = Uuid::new_v4();
        info!("Run {}: processing {} records", run_id, item_count);

        // Looked up once; a failure here fails each record in turn
        let client = self.connect(params, credentials, transport);

        let mut outputs = Vec::with_capacity(item_count);
        let mut failed = 0usize;

        for item_index in 0..item_count {
            match self.process(&client, params, item_index).await {
                Ok(values) => {
                    outputs.extend(
                        values
                            .into_iter()
                            .map(|value| RecordOutput::success(item_index, value)),
                    );
                }
                Err(error) if self.continue_on_fail => {
                    warn!("Run {}: record {} failed, continuing: {}", run_id, item_index, error);
                    failed += 1;
                    outputs.push(RecordOutput::failure(item_index, &error));
                }
                Err(error) => {
                    warn!("Run {}: record {} failed, aborting: {}", run_id, item_index, error);
                    return Err(RunError {
                        item_index,
                        source: error,
                    });
                }
            }
        }

        info!(
            "Run {}: finished, {} output items, {} failed records",
            run_id,
            outputs.len(),
            failed
        );
        Ok(outputs)
    }

    async fn process(
        &self,
        client: &Result<BitrixClient, BitrixError>,
        params: &dyn ParamSource,
        item_index: usize,
    ) -> Result<Vec<Value>, BitrixError> {
        let spec = self.dispatcher.resolve(&Params::new(params, item_index))?;
        let client = client.as_ref().map_err(Clone::clone)?;
        client.execute(&spec).await
    }

    /// Translate every record without executing; URLs are included when
    /// credentials resolve
    pub fn plan(
        &self,
        params: &dyn ParamSource,
        item_count: usize,
        credentials: &dyn CredentialSource,
        transport: Arc<dyn HttpTransport>,
    ) -> Vec<PlannedRequest> {
        let client = self.connect(params, credentials, transport).ok();
        (0..item_count)
            .map(|item_index| {
                let result = self
                    .dispatcher
                    .resolve(&Params::new(params, item_index))
                    .map(|spec| {
                        let url = client
                            .as_ref()
                            .and_then(|c| c.prepare(&spec).ok())
                            .map(|prepared| prepared.url);
                        (spec, url)
                    });
                PlannedRequest { item_index, result }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::client::{HttpResponse, PreparedRequest};
    use crate::api::models::Credentials;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    struct ScriptedTransport {
        responses: Mutex<Vec<anyhow::Result<HttpResponse>>>,
        urls: Mutex<Vec<String>>,
    }

    impl ScriptedTransport {
        fn new(bodies: Vec<Value>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(
                    bodies
                        .into_iter()
                        .map(|b| {
                            Ok(HttpResponse {
                                status: 200,
                                body: b.to_string(),
                            })
                        })
                        .collect(),
                ),
                urls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl HttpTransport for ScriptedTransport {
        async fn send(&self, request: PreparedRequest) -> anyhow::Result<HttpResponse> {
            self.urls.lock().unwrap().push(request.url);
            self.responses.lock().unwrap().remove(0)
        }
    }

    fn webhook() -> Credentials {
        Credentials {
            webhook_url: Some("https://portal.bitrix24.com/rest/1/secret/".to_string()),
            ..Default::default()
        }
    }

    fn records(values: Vec<Value>) -> Vec<Map<String, Value>> {
        values
            .into_iter()
            .map(|v| v.as_object().cloned().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_run_preserves_order_and_cardinality() {
        let params = records(vec![
            json!({ "resource": "crm.deal", "operation": "get", "id": 1 }),
            json!({ "resource": "crm.deal", "operation": "list" }),
            json!({ "resource": "crm.deal", "operation": "delete", "id": 3 }),
        ]);
        let transport = ScriptedTransport::new(vec![
            json!({ "result": { "ID": "1" } }),
            json!({ "result": [{ "ID": "1" }, { "ID": "2" }] }),
            json!({ "result": true }),
        ]);

        let outputs = Runner::default()
            .run(&params, 3, &webhook(), transport.clone())
            .await
            .unwrap();

        assert_eq!(
            outputs.iter().map(|o| o.item_index).collect::<Vec<_>>(),
            vec![0, 1, 1, 2]
        );
        assert_eq!(outputs[0].json, json!({ "ID": "1" }));
        assert_eq!(outputs[3].json, json!({ "result": true }));

        let urls = transport.urls.lock().unwrap();
        assert_eq!(urls[0], "https://portal.bitrix24.com/rest/1/secret/crm.deal.get.json?id=1");
        assert_eq!(urls[1], "https://portal.bitrix24.com/rest/1/secret/crm.deal.list.json");
    }

    #[tokio::test]
    async fn test_failure_aborts_with_index() {
        let params = records(vec![
            json!({ "resource": "crm.deal", "operation": "get", "id": 1 }),
            json!({ "resource": "crm.deal", "operation": "get" }),
            json!({ "resource": "crm.deal", "operation": "get", "id": 3 }),
        ]);
        let transport = ScriptedTransport::new(vec![json!({ "result": {} })]);

        let err = Runner::default()
            .run(&params, 3, &webhook(), transport.clone())
            .await
            .unwrap_err();
        assert_eq!(err.item_index, 1);
        assert_eq!(err.source, BitrixError::missing("id"));
        assert_eq!(transport.urls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_continue_on_fail_records_placeholder() {
        let params = records(vec![
            json!({ "resource": "crm.deal", "operation": "merge" }),
            json!({ "resource": "crm.deal", "operation": "get", "id": 2 }),
        ]);
        let transport = ScriptedTransport::new(vec![json!({ "result": { "ID": "2" } })]);

        let outputs = Runner::default()
            .continue_on_fail(true)
            .run(&params, 2, &webhook(), transport)
            .await
            .unwrap();

        assert_eq!(outputs.len(), 2);
        assert!(outputs[0].is_error());
        assert_eq!(outputs[0].item_index, 0);
        assert_eq!(outputs[0].json, json!({ "error": "unsupported operation: merge" }));
        assert_eq!(outputs[1].json, json!({ "ID": "2" }));
    }

    #[tokio::test]
    async fn test_missing_credentials_fail_each_record() {
        let params = records(vec![
            json!({ "resource": "crm.deal", "operation": "get", "id": 1 }),
            json!({ "resource": "crm.deal", "operation": "get", "id": 2 }),
        ]);
        let transport = ScriptedTransport::new(vec![]);

        let outputs = Runner::default()
            .continue_on_fail(true)
            .run(&params, 2, &Credentials::default(), transport)
            .await
            .unwrap();
        assert_eq!(outputs.len(), 2);
        assert!(outputs.iter().all(|o| o.is_error()));
    }

    #[test]
    fn test_auth_mode_from_first_record() {
        let params = records(vec![
            json!({ "authentication": "bitrixOAuth2Api" }),
            json!({ "authentication": "bitrixWebhookApi" }),
        ]);
        assert_eq!(Runner::default().auth_mode(&params), Ok(AuthMode::OAuth2));

        let params = records(vec![json!({})]);
        let runner = Runner::default().default_auth_mode(AuthMode::OAuth2);
        assert_eq!(runner.auth_mode(&params), Ok(AuthMode::OAuth2));

        let params = records(vec![json!({ "authentication": "basic" })]);
        assert!(matches!(
            Runner::default().auth_mode(&params),
            Err(BitrixError::Auth { .. })
        ));
    }

    #[test]
    fn test_plan_includes_urls() {
        let params = records(vec![
            json!({ "resource": "crm.lead", "operation": "get", "id": 5 }),
            json!({ "resource": "crm.lead", "operation": "get" }),
        ]);
        let plan = Runner::default().plan(&params, 2, &webhook(), ScriptedTransport::new(vec![]));
        let (spec, url) = plan[0].result.clone().unwrap();
        assert_eq!(spec.endpoint, "crm.lead.get");
        assert_eq!(
            url.as_deref(),
            Some("https://portal.bitrix24.com/rest/1/secret/crm.lead.get.json?id=5")
        );
        assert_eq!(plan[1].result, Err(BitrixError::missing("id")));
    }
}
