//! Request handler module
//!
//! Request pre-checks, route dispatch to the customer controller, and access
//! logging.

pub mod router;

// Re-export main entry point
pub use router::handle_request;
