//! Request handler module
//!
//! Responsible for request routing dispatch and object streaming.

pub mod object;
pub mod router;

// Re-export main entry point
pub use router::handle_request;
