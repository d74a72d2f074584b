//! Bitrix24 REST API constants

/// Sent with every request
pub const ACCEPT: &str = "application/json";
pub const CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Suffix appended to every REST method name in the URL
pub const METHOD_SUFFIX: &str = ".json";

/// Default HTTP timeout when none is configured
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const USER_AGENT: &str = concat!("bitrix-cli/", env!("CARGO_PKG_VERSION"));

/// Method listing user-defined smart-process types
pub const TYPE_LIST_METHOD: &str = "crm.type.list";

/// Built-in CRM entity types (name, entityTypeId)
pub const SYSTEM_ENTITY_TYPES: &[(&str, u32)] = &[
    ("Lead", 1),
    ("Deal", 2),
    ("Contact", 3),
    ("Company", 4),
    ("Invoice", 31),
    ("Quote", 32),
];
