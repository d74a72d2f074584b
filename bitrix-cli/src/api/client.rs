//! Bitrix24 REST client
//!
//! Resolves the request URL for the configured auth mode, hands the call to
//! an [`HttpTransport`], and unwraps the `{ "result": ... }` envelope.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use super::constants;
use super::error::BitrixError;
use super::models::{AuthMode, Credentials, HttpMethod, RequestSpec};
use super::tree::{PathStyle, flatten};

/// A request ready to go on the wire
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    pub method: HttpMethod,
    /// Full URL including the encoded query string, if any
    pub url: String,
    pub headers: Vec<(&'static str, &'static str)>,
    /// JSON body; None when the spec body is empty
    pub body: Option<Map<String, Value>>,
    /// Bearer token for OAuth2 requests
    pub bearer_token: Option<String>,
}

/// Raw HTTP response
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The host's HTTP primitive
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Perform the call; transport failures (DNS, timeout, abort) are errors
    async fn send(&self, request: PreparedRequest) -> anyhow::Result<HttpResponse>;
}

/// reqwest-backed transport
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(constants::USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: PreparedRequest) -> anyhow::Result<HttpResponse> {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
        };

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(*name, *value);
        }
        if let Some(token) = &request.bearer_token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.body(serde_json::to_vec(body).context("Failed to serialize request body")?);
        }

        let response = builder.send().await.context("HTTP request failed")?;
        let status = response.status().as_u16();
        let body = response.text().await.context("Failed to read response body")?;
        Ok(HttpResponse { status, body })
    }
}

/// Executes request specs against one portal with one auth context
#[derive(Clone)]
pub struct BitrixClient {
    transport: Arc<dyn HttpTransport>,
    auth_mode: AuthMode,
    credentials: Credentials,
}

impl std::fmt::Debug for BitrixClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BitrixClient")
            .field("auth_mode", &self.auth_mode)
            .finish_non_exhaustive()
    }
}

impl BitrixClient {
    pub fn new(transport: Arc<dyn HttpTransport>, auth_mode: AuthMode, credentials: Credentials) -> Self {
        Self {
            transport,
            auth_mode,
            credentials,
        }
    }

    pub fn auth_mode(&self) -> AuthMode {
        self.auth_mode
    }

    /// Resolve URL, headers and payload for a spec
    pub fn prepare(&self, spec: &RequestSpec) -> Result<PreparedRequest, BitrixError> {
        let base = self.credentials.base_url(self.auth_mode)?;
        let mut url = format!("{}/{}{}", base, spec.endpoint, constants::METHOD_SUFFIX);
        if !spec.query.is_empty() {
            url.push('?');
            url.push_str(&encode_query(&spec.query));
        }

        let bearer_token = match self.auth_mode {
            AuthMode::OAuth2 => Some(
                self.credentials
                    .access_token
                    .clone()
                    .filter(|t| !t.trim().is_empty())
                    .ok_or_else(|| BitrixError::auth("OAuth2 access token is not configured"))?,
            ),
            AuthMode::Webhook => None,
        };

        Ok(PreparedRequest {
            method: spec.method,
            url,
            headers: vec![
                ("Accept", constants::ACCEPT),
                ("Content-Type", constants::CONTENT_TYPE),
            ],
            body: (!spec.body.is_empty()).then(|| spec.body.clone()),
            bearer_token,
        })
    }

    /// Perform the call and return the raw response envelope
    pub async fn call(&self, spec: &RequestSpec) -> Result<Value, BitrixError> {
        let request = self.prepare(spec)?;
        debug!("{} {}", request.method, spec.endpoint);

        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| BitrixError::Api {
                context: spec.endpoint.clone(),
                status: None,
                message: redact_secrets(&format!("{:#}", e)),
            })?;

        parse_envelope(&spec.endpoint, response)
    }

    /// Perform the call and normalize the result to a sequence
    pub async fn execute(&self, spec: &RequestSpec) -> Result<Vec<Value>, BitrixError> {
        let envelope = self.call(spec).await?;
        Ok(normalize_envelope(envelope))
    }
}

fn parse_envelope(endpoint: &str, response: HttpResponse) -> Result<Value, BitrixError> {
    let parsed: Option<Value> = serde_json::from_str(&response.body).ok();

    if !response.is_success() {
        let message = parsed
            .as_ref()
            .and_then(error_message)
            .unwrap_or_else(|| fallback_message(&response));
        return Err(BitrixError::Api {
            context: endpoint.to_string(),
            status: Some(response.status),
            message,
        });
    }

    let envelope = parsed.ok_or_else(|| BitrixError::Api {
        context: endpoint.to_string(),
        status: Some(response.status),
        message: "response is not valid JSON".to_string(),
    })?;

    // Some methods report failures inside a 200 response
    if envelope.get("result").is_none() {
        if let Some(message) = error_message(&envelope) {
            return Err(BitrixError::Api {
                context: endpoint.to_string(),
                status: Some(response.status),
                message,
            });
        }
    }
    Ok(envelope)
}

/// Extract `error_description` / `error` from a Bitrix24 error body
fn error_message(body: &Value) -> Option<String> {
    let error = body.get("error").and_then(Value::as_str);
    let description = body
        .get("error_description")
        .and_then(Value::as_str)
        .filter(|d| !d.is_empty());
    match (error, description) {
        (Some(code), Some(desc)) => Some(format!("{}: {}", code, desc)),
        (None, Some(desc)) => Some(desc.to_string()),
        (Some(code), None) => Some(code.to_string()),
        (None, None) => None,
    }
}

fn fallback_message(response: &HttpResponse) -> String {
    let text = response.body.trim();
    if text.is_empty() {
        format!("HTTP {}", response.status)
    } else {
        text.chars().take(500).collect()
    }
}

/// Webhook URLs carry the secret as the path segment after the user id
static WEBHOOK_SECRET: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"(/rest/\d+/)[^/?#\s)]+").ok());

/// Mask webhook secrets in text that may embed a request URL
pub fn redact_secrets(text: &str) -> String {
    match WEBHOOK_SECRET.as_ref() {
        Some(re) => re.replace_all(text, "${1}***").into_owned(),
        None => text.to_string(),
    }
}

/// Always yield at least one element per dispatched record
pub fn normalize_envelope(envelope: Value) -> Vec<Value> {
    match envelope {
        Value::Object(mut map) => match map.remove("result") {
            Some(Value::Array(items)) => items,
            None | Some(Value::Null) => vec![Value::Object(Map::new())],
            Some(other) => vec![other],
        },
        _ => vec![Value::Object(Map::new())],
    }
}

/// Encode a nested query mapping in PHP bracket notation
/// (`filter[>ID]=5&select[0]=ID`)
pub fn encode_query(query: &Map<String, Value>) -> String {
    flatten(query, PathStyle::Bracketed)
        .into_iter()
        .map(|(key, value)| format!("{}={}", urlencoding::encode(&key), urlencoding::encode(&value)))
        .collect::<Vec<_>>()
        .join("&")
}
