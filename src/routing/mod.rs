//! Routing module
//!
//! The route table is built once from configuration at startup and maps
//! (method, path pattern) pairs to resource actions.

pub mod matcher;

pub use matcher::{match_route, PathParams, PathPattern, Route, RouteMatch};

use hyper::Method;

use crate::config::HealthConfig;

/// What a matched route does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ListCustomers,
    GetCustomer,
    CreateCustomer,
    UpdateCustomer,
    DeleteCustomer,
    Health,
}

/// Ordered route table
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<Route<Action>>,
}

impl RouteTable {
    pub fn new(health: &HealthConfig) -> Self {
        let mut table = Self { routes: Vec::new() };

        // trailing slash is accepted for listing only
        table.add(Method::GET, "/customers", Action::ListCustomers);
        table.add(Method::GET, "/customers/", Action::ListCustomers);
        table.add(Method::POST, "/customers", Action::CreateCustomer);
        table.add(Method::GET, "/customers/{id}", Action::GetCustomer);
        table.add(Method::PUT, "/customers/{id}", Action::UpdateCustomer);
        table.add(Method::DELETE, "/customers/{id}", Action::DeleteCustomer);

        if health.enabled {
            table.add(Method::GET, &health.liveness_path, Action::Health);
            table.add(Method::GET, &health.readiness_path, Action::Health);
        }

        table
    }

    fn add(&mut self, method: Method, pattern: &str, action: Action) {
        self.routes.push(Route {
            method,
            pattern: PathPattern::parse(pattern),
            action,
        });
    }

    pub fn lookup(&self, method: &Method, path: &str) -> RouteMatch<'_, Action> {
        match_route(&self.routes, method, path)
    }

    /// Methods accepted on `path`, empty when the path is unknown
    pub fn allowed_methods(&self, path: &str) -> Vec<Method> {
        let mut methods: Vec<Method> = Vec::new();
        for route in &self.routes {
            if route.pattern.matches(path).is_some() && !methods.contains(&route.method) {
                methods.push(route.method.clone());
            }
        }
        methods
    }
}
