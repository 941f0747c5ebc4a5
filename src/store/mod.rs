//! Customer storage
//!
//! The controller only sees the `CustomerStore` trait. An absent record is a
//! normal outcome (`Ok(None)`), distinct from a failed lookup (`Err`).

pub mod memory;
pub mod seed;

pub use memory::MemoryCustomerStore;

use crate::customer::Customer;
use thiserror::Error;

/// Storage failure
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("customer store lock poisoned")]
    Poisoned,
    #[error("customer with id {0} does not exist")]
    Missing(i32),
    #[error("{0}")]
    Backend(String),
}

/// Persistence collaborator owning the customer lifecycle
pub trait CustomerStore: Send + Sync {
    /// All customers, in the store's enumeration order
    fn list(&self) -> Result<Vec<Customer>, StoreError>;

    fn get(&self, id: i32) -> Result<Option<Customer>, StoreError>;

    /// Insert a customer; the returned record carries the assigned id
    fn create(&self, customer: Customer) -> Result<Customer, StoreError>;

    fn update(&self, id: i32, customer: Customer) -> Result<(), StoreError>;

    fn delete(&self, id: i32) -> Result<(), StoreError>;
}
