//! Customer resource: model, logging collaborator and controller

pub mod controller;
pub mod logging;
pub mod model;

pub use controller::CustomerController;
pub use logging::{ErrorLogService, LoggingService};
pub use model::{Customer, ErrorPayload};
