//! HTTP protocol layer module
//!
//! Range planning, content-type classification and response builders,
//! decoupled from request routing and from the store.

pub mod mime;
pub mod range;
pub mod response;

// Re-export commonly used types
pub use range::{plan, plan_full, RangePlan};
pub use response::{
    build_404_response, build_405_response, build_416_response, build_502_response,
    build_health_response, build_options_response, build_partial_response, ResponseBody,
};
