//! Bitrix24 Operations Module
//!
//! Translates resource/operation parameters into transport-ready requests,
//! either through the fixed entity vocabulary or the custom-method pathway.

pub mod custom;
pub mod dispatcher;
pub mod operation;
pub mod payload;

pub use custom::dispatch_custom;
pub use dispatcher::{CUSTOM_RESOURCE, Dispatcher};
pub use operation::{InputType, Operation};
