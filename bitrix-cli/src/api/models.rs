//! Core request and resource models

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::BitrixError;

/// CRM entity categories with a fixed operation vocabulary
///
/// The free-form "custom" escape hatch is not a variant: it is routed
/// to the custom-method pathway before resources are parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    Company,
    Contact,
    Deal,
    Lead,
    Item,
}

impl Resource {
    pub const ALL: [Resource; 5] = [
        Resource::Company,
        Resource::Contact,
        Resource::Deal,
        Resource::Lead,
        Resource::Item,
    ];

    /// REST method prefix (e.g., "crm.deal")
    pub fn method_prefix(&self) -> &'static str {
        match self {
            Self::Company => "crm.company",
            Self::Contact => "crm.contact",
            Self::Deal => "crm.deal",
            Self::Lead => "crm.lead",
            Self::Item => "crm.item",
        }
    }

    /// Parse either a method prefix ("crm.deal") or a short name ("deal")
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        let short = value.strip_prefix("crm.").unwrap_or(value);
        match short.to_ascii_lowercase().as_str() {
            "company" => Some(Self::Company),
            "contact" => Some(Self::Contact),
            "deal" => Some(Self::Deal),
            "lead" => Some(Self::Lead),
            "item" => Some(Self::Item),
            _ => None,
        }
    }

    /// Whether this resource needs an entityTypeId discriminator
    pub fn is_item(&self) -> bool {
        matches!(self, Self::Item)
    }
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.method_prefix())
    }
}

/// How requests are authenticated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// Token-based; base URL derived from the portal domain
    #[serde(alias = "bitrixOAuth2Api")]
    OAuth2,
    /// Incoming webhook; the URL already embeds the secret
    #[default]
    #[serde(alias = "bitrixWebhookApi")]
    Webhook,
}

impl AuthMode {
    /// Parse host-facing names as well as the short forms
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "bitrixOAuth2Api" | "oauth2" | "oauth" => Some(Self::OAuth2),
            "bitrixWebhookApi" | "webhook" => Some(Self::Webhook),
            _ => None,
        }
    }
}

/// Credentials for the selected auth mode
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Portal domain, e.g. "b24-portal.bitrix24.com" (OAuth2)
    pub domain: Option<String>,
    /// Incoming webhook URL (webhook)
    pub webhook_url: Option<String>,
    /// Bearer token attached to OAuth2 requests
    pub access_token: Option<String>,
}

impl Credentials {
    /// Resolve the REST base URL for the given auth mode
    pub fn base_url(&self, mode: AuthMode) -> Result<String, BitrixError> {
        match mode {
            AuthMode::OAuth2 => {
                let domain = non_empty(self.domain.as_deref())
                    .ok_or_else(|| BitrixError::auth("portal domain is not configured"))?;
                Ok(format!("https://{}/rest", domain))
            }
            AuthMode::Webhook => {
                let url = non_empty(self.webhook_url.as_deref())
                    .ok_or_else(|| BitrixError::auth("webhook URL is not configured"))?;
                Ok(url.strip_suffix('/').unwrap_or(url).to_string())
            }
        }
    }
}

/// Host capability for credential lookup
pub trait CredentialSource {
    fn credentials(&self, mode: AuthMode) -> Result<Credentials, BitrixError>;
}

/// Fixed credentials, regardless of the requested mode
impl CredentialSource for Credentials {
    fn credentials(&self, _mode: AuthMode) -> Result<Credentials, BitrixError> {
        Ok(self.clone())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// HTTP methods used by the connector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fully resolved, transport-ready request description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestSpec {
    pub method: HttpMethod,
    /// REST method name, without the ".json" suffix
    pub endpoint: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub body: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub query: Map<String, Value>,
}

impl RequestSpec {
    pub fn new(method: HttpMethod, endpoint: impl Into<String>) -> Self {
        Self {
            method,
            endpoint: endpoint.into(),
            body: Map::new(),
            query: Map::new(),
        }
    }

    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, endpoint)
    }

    pub fn post(endpoint: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, endpoint)
    }

    pub fn with_body(mut self, body: Map<String, Value>) -> Self {
        self.body = body;
        self
    }

    pub fn with_query(mut self, query: Map<String, Value>) -> Self {
        self.query = query;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_parse_accepts_both_forms() {
        assert_eq!(Resource::parse("crm.deal"), Some(Resource::Deal));
        assert_eq!(Resource::parse("deal"), Some(Resource::Deal));
        assert_eq!(Resource::parse("crm.item"), Some(Resource::Item));
        assert_eq!(Resource::parse("Company"), Some(Resource::Company));
        assert_eq!(Resource::parse("crm.invoice"), None);
        assert_eq!(Resource::parse("custom"), None);
    }

    #[test]
    fn test_oauth_base_url() {
        let creds = Credentials {
            domain: Some("portal.bitrix24.com".to_string()),
            ..Default::default()
        };
        assert_eq!(
            creds.base_url(AuthMode::OAuth2).unwrap(),
            "https://portal.bitrix24.com/rest"
        );
    }

    #[test]
    fn test_webhook_base_url_strips_trailing_slash() {
        let creds = Credentials {
            webhook_url: Some("https://portal.bitrix24.com/rest/1/abc/".to_string()),
            ..Default::default()
        };
        assert_eq!(
            creds.base_url(AuthMode::Webhook).unwrap(),
            "https://portal.bitrix24.com/rest/1/abc"
        );
    }

    #[test]
    fn test_missing_credentials_is_auth_error() {
        let creds = Credentials::default();
        assert!(matches!(
            creds.base_url(AuthMode::Webhook),
            Err(BitrixError::Auth { .. })
        ));
        assert!(matches!(
            creds.base_url(AuthMode::OAuth2),
            Err(BitrixError::Auth { .. })
        ));
    }

    #[test]
    fn test_auth_mode_parse() {
        assert_eq!(AuthMode::parse("bitrixOAuth2Api"), Some(AuthMode::OAuth2));
        assert_eq!(AuthMode::parse("webhook"), Some(AuthMode::Webhook));
        assert_eq!(AuthMode::parse("basic"), None);
    }
}
