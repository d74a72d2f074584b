//! Bitrix24 REST API module
//!
//! Request translation (tree builder, list-query compiler, dispatcher) and
//! execution against a portal.

pub mod client;
pub mod constants;
pub mod error;
pub mod metadata;
pub mod models;
pub mod operations;
pub mod params;
pub mod query;
pub mod tree;

pub use client::{BitrixClient, HttpResponse, HttpTransport, PreparedRequest, ReqwestTransport};
pub use error::{BitrixError, RunError};
pub use metadata::{EntityType, FieldDescriptor, list_entity_fields, list_entity_types};
pub use models::{AuthMode, CredentialSource, Credentials, HttpMethod, RequestSpec, Resource};
pub use operations::{CUSTOM_RESOURCE, Dispatcher, InputType, Operation, dispatch_custom};
pub use params::{ParamSource, Params};
pub use query::{FilterCondition, FilterOperator, ListFilters, ListQuery, OrderCondition};
pub use tree::{ArrayNotation, ParameterEntry, PathStyle, TreeBuilder, build_tree, flatten};
