//! Customer resource controller
//!
//! Maps the five CRUD operations onto the store and shapes the HTTP outcome.
//! Only `list` and `get` report failures to the logging service; `create`,
//! `update` and `delete` never log.

use std::sync::Arc;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};

use super::logging::LoggingService;
use super::model::{Customer, ErrorPayload};
use crate::http;
use crate::store::CustomerStore;

#[derive(Clone)]
pub struct CustomerController {
    store: Arc<dyn CustomerStore>,
    logger: Arc<dyn LoggingService>,
}

impl CustomerController {
    pub fn new(store: Arc<dyn CustomerStore>, logger: Arc<dyn LoggingService>) -> Self {
        Self { store, logger }
    }

    /// `GET /customers`
    pub fn list(&self) -> Response<Full<Bytes>> {
        match self.store.list() {
            Ok(customers) => http::json_response(StatusCode::OK, &customers),
            Err(e) => {
                self.logger.log_message(&e.to_string());
                http::error_response(&ErrorPayload::internal())
            }
        }
    }

    /// `GET /customers/{id}`
    pub fn get(&self, id: i32) -> Response<Full<Bytes>> {
        match self.store.get(id) {
            Ok(Some(customer)) => http::json_response(StatusCode::OK, &customer),
            Ok(None) => {
                self.logger
                    .log_message(&format!("Customer with id {id} not found."));
                http::error_response(&ErrorPayload::new(
                    StatusCode::NOT_FOUND,
                    format!("Customer with id {id} can't be found."),
                ))
            }
            Err(e) => {
                self.logger.log_message(&e.to_string());
                http::error_response(&ErrorPayload::internal())
            }
        }
    }

    /// `POST /customers`
    ///
    /// A store failure maps to the generic 500 without logging.
    pub fn create(&self, customer: Customer) -> Response<Full<Bytes>> {
        match self.store.create(customer) {
            Ok(created) => http::json_response(StatusCode::CREATED, &created),
            Err(_) => http::error_response(&ErrorPayload::internal()),
        }
    }

    /// `PUT /customers/{id}`
    pub fn update(&self, id: i32, customer: Customer) -> Response<Full<Bytes>> {
        match self.store.get(id) {
            Ok(Some(_)) => {}
            Ok(None) => {
                return http::error_response(&ErrorPayload::new(
                    StatusCode::NOT_FOUND,
                    format!("Customer with id {id} is invalid"),
                ));
            }
            Err(_) => return http::error_response(&ErrorPayload::internal()),
        }

        match self.store.update(id, customer) {
            Ok(()) => http::no_content(),
            Err(_) => http::error_response(&ErrorPayload::internal()),
        }
    }

    /// `DELETE /customers/{id}`
    ///
    /// No existence check: deleting an unknown id is still 204.
    pub fn delete(&self, id: i32) -> Response<Full<Bytes>> {
        match self.store.delete(id) {
            Ok(()) => http::no_content(),
            Err(_) => http::error_response(&ErrorPayload::internal()),
        }
    }
}
