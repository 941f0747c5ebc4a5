//! Seed file loading
//!
//! A seed file is TOML with a `[[customers]]` array. Each entry needs a
//! positive integer `customerId`; every other key is carried as opaque
//! customer data.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::customer::Customer;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to read seed file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid seed TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("seed entry #{index}: {reason}")]
    Entry { index: usize, reason: String },
    #[error("duplicate customerId {0} in seed file")]
    DuplicateId(i32),
}

#[derive(Debug, Deserialize)]
struct SeedFile {
    #[serde(default)]
    customers: Vec<toml::Table>,
}

/// Read and parse a seed file from disk
pub fn load_seed_file(path: impl AsRef<Path>) -> Result<Vec<Customer>, SeedError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| SeedError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_seed(&content)
}

/// Parse seed TOML into customers, preserving file order
pub fn parse_seed(content: &str) -> Result<Vec<Customer>, SeedError> {
    let file: SeedFile = toml::from_str(content)?;
    let mut seen = HashSet::new();
    let mut customers = Vec::with_capacity(file.customers.len());

    for (index, table) in file.customers.into_iter().enumerate() {
        let customer = table_to_customer(table).map_err(|reason| SeedError::Entry { index, reason })?;
        if !seen.insert(customer.customer_id) {
            return Err(SeedError::DuplicateId(customer.customer_id));
        }
        customers.push(customer);
    }

    Ok(customers)
}

fn table_to_customer(mut table: toml::Table) -> Result<Customer, String> {
    let id = match table.remove("customerId") {
        Some(toml::Value::Integer(id)) => {
            i32::try_from(id).map_err(|_| format!("customerId {id} is out of range"))?
        }
        Some(other) => return Err(format!("customerId must be an integer, got {}", other.type_str())),
        None => return Err("missing customerId".to_string()),
    };
    if id <= 0 {
        return Err(format!("customerId must be positive, got {id}"));
    }

    let fields: Map<String, Value> = table
        .into_iter()
        .map(|(key, value)| (key, toml_to_json(value)))
        .collect();

    Ok(Customer {
        customer_id: id,
        fields,
    })
}

fn toml_to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::from(i),
        toml::Value::Float(f) => serde_json::Number::from_f64(f).map_or(Value::Null, Value::Number),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(items.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(key, value)| (key, toml_to_json(value)))
                .collect(),
        ),
    }
}
