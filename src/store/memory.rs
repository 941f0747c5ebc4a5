//! In-memory customer store
//!
//! Records live in a `BTreeMap` so enumeration is always ascending by id.

use std::collections::BTreeMap;
use std::sync::RwLock;

use super::{CustomerStore, StoreError};
use crate::customer::Customer;

struct Inner {
    customers: BTreeMap<i32, Customer>,
    next_id: i32,
}

/// Thread-safe in-memory store
pub struct MemoryCustomerStore {
    inner: RwLock<Inner>,
}

impl MemoryCustomerStore {
    pub fn new() -> Self {
        Self::with_customers(Vec::new())
    }

    /// Build a store pre-filled with `customers`, keyed by their ids.
    /// New ids continue after the largest seeded id.
    pub fn with_customers(customers: Vec<Customer>) -> Self {
        let customers: BTreeMap<i32, Customer> = customers
            .into_iter()
            .map(|c| (c.customer_id, c))
            .collect();
        let next_id = customers
            .keys()
            .next_back()
            .map_or(1, |max| max.saturating_add(1).max(1));

        Self {
            inner: RwLock::new(Inner { customers, next_id }),
        }
    }
}

impl Default for MemoryCustomerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CustomerStore for MemoryCustomerStore {
    fn list(&self) -> Result<Vec<Customer>, StoreError> {
        let inner = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(inner.customers.values().cloned().collect())
    }

    fn get(&self, id: i32) -> Result<Option<Customer>, StoreError> {
        let inner = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(inner.customers.get(&id).cloned())
    }

    fn create(&self, mut customer: Customer) -> Result<Customer, StoreError> {
        let mut inner = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        let id = inner.next_id;
        inner.next_id = id
            .checked_add(1)
            .ok_or_else(|| StoreError::Backend("customer id space exhausted".to_string()))?;

        customer.customer_id = id;
        inner.customers.insert(id, customer.clone());
        Ok(customer)
    }

    fn update(&self, id: i32, mut customer: Customer) -> Result<(), StoreError> {
        let mut inner = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        let slot = inner
            .customers
            .get_mut(&id)
            .ok_or(StoreError::Missing(id))?;

        customer.customer_id = id;
        *slot = customer;
        Ok(())
    }

    fn delete(&self, id: i32) -> Result<(), StoreError> {
        let mut inner = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        inner.customers.remove(&id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> MemoryCustomerStore {
        MemoryCustomerStore::with_customers(vec![
            Customer::new(3).with_field("firstName", "Carol"),
            Customer::new(1).with_field("firstName", "Alice"),
            Customer::new(2).with_field("firstName", "Bob"),
        ])
    }

    #[test]
    fn test_list_is_ordered_by_id() {
        let store = seeded();
        let ids: Vec<i32> = store.list().unwrap().iter().map(|c| c.customer_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_get_absent_is_not_an_error() {
        let store = seeded();
        assert!(store.get(99).unwrap().is_none());
        assert_eq!(store.get(2).unwrap().unwrap().fields["firstName"], "Bob");
    }

    #[test]
    fn test_create_assigns_next_id() {
        let store = seeded();
        let created = store
            .create(Customer::new(1).with_field("firstName", "Dave"))
            .unwrap();
        assert_eq!(created.customer_id, 4);
        // caller-supplied id 1 must not clobber the existing record
        assert_eq!(store.get(1).unwrap().unwrap().fields["firstName"], "Alice");
        assert_eq!(store.list().unwrap().len(), 4);

        let empty = MemoryCustomerStore::new();
        assert_eq!(empty.create(Customer::default()).unwrap().customer_id, 1);
    }

    #[test]
    fn test_update_forces_path_id() {
        let store = seeded();
        store
            .update(2, Customer::new(42).with_field("firstName", "Robert"))
            .unwrap();
        let updated = store.get(2).unwrap().unwrap();
        assert_eq!(updated.customer_id, 2);
        assert_eq!(updated.fields["firstName"], "Robert");
        assert!(store.get(42).unwrap().is_none());
    }

    #[test]
    fn test_update_missing_record() {
        let store = seeded();
        let err = store.update(99, Customer::default()).unwrap_err();
        assert!(matches!(err, StoreError::Missing(99)));
    }

    #[test]
    fn test_delete_is_idempotent() {
        let store = seeded();
        store.delete(2).unwrap();
        store.delete(2).unwrap();
        store.delete(99).unwrap();
        let ids: Vec<i32> = store.list().unwrap().iter().map(|c| c.customer_id).collect();
        assert_eq!(ids, vec![1, 3]);
    }
}
