//! HTTP protocol layer module
//!
//! Response builders, decoupled from the customer resource logic.

pub mod response;

pub use response::{
    error_response, head_response, json_response, method_not_allowed, no_content, options_response,
};
