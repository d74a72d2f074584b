//! List query compiler
//!
//! Turns structured select/filter/order/start inputs into the query
//! fragment Bitrix24 `*.list` methods expect.

pub mod filters;
pub mod orderby;
pub mod query;

pub use filters::{FilterCondition, FilterOperator};
pub use orderby::{Direction, OrderCondition};
pub use query::{ListFilters, ListQuery};
