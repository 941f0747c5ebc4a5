//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: preflight, body size check,
//! route lookup, parameter/body parsing and dispatch to the controller.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderValue, ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_LENGTH, SERVER, USER_AGENT};
use hyper::{Method, Request, Response, StatusCode};

use crate::config::AppState;
use crate::customer::{Customer, ErrorPayload};
use crate::http;
use crate::logger::{self, AccessLogEntry};
use crate::routing::{Action, PathParams, RouteMatch};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    remote_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    let started = Instant::now();
    let is_head = *req.method() == Method::HEAD;
    let entry = state
        .config
        .logging
        .access_log
        .then(|| access_entry(&req, remote_addr));

    let mut response = route_request(req, &state).await;
    if is_head {
        response = http::head_response(response);
    }
    decorate(&mut response, &state);

    if let Some(mut entry) = entry {
        complete_entry(&mut entry, &response, started);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

/// Request side of the access log line
fn access_entry<B>(req: &Request<B>, remote_addr: SocketAddr) -> AccessLogEntry {
    let mut entry = AccessLogEntry::new(
        remote_addr.ip().to_string(),
        req.method().to_string(),
        req.uri().to_string(),
    );
    entry.http_version = version_label(req.version()).to_string();
    entry.user_agent = req
        .headers()
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string);
    entry
}

/// Response side: status, body size and elapsed time
fn complete_entry(entry: &mut AccessLogEntry, response: &Response<Full<Bytes>>, started: Instant) {
    entry.status = response.status().as_u16();
    entry.body_bytes = response
        .body()
        .size_hint()
        .exact()
        .and_then(|n| usize::try_from(n).ok())
        .unwrap_or(0);
    entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
}

async fn route_request<B>(req: Request<B>, state: &AppState) -> Response<Full<Bytes>>
where
    B: Body<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    let path = req.uri().path().to_string();

    // 1. Preflight
    if *req.method() == Method::OPTIONS {
        let allowed = state.routes.allowed_methods(&path);
        if allowed.is_empty() {
            return no_route(&path);
        }
        return http::options_response(state.config.http.enable_cors, &allowed);
    }

    // 2. Declared body size
    if let Some(resp) = check_body_size(&req, state.config.http.max_body_size) {
        return resp;
    }

    // 3. Route lookup, HEAD resolves like GET
    let method = if *req.method() == Method::HEAD {
        Method::GET
    } else {
        req.method().clone()
    };
    let (action, params) = match state.routes.lookup(&method, &path) {
        RouteMatch::Found { action, params } => (*action, params),
        RouteMatch::MethodNotAllowed(allowed) => {
            logger::log_warning(&format!("Method {} not allowed on {path}", req.method()));
            return http::method_not_allowed(req.method(), &allowed);
        }
        RouteMatch::NotFound => return no_route(&path),
    };

    // 4. Dispatch
    let customers = &state.customers;
    match action {
        Action::ListCustomers => customers.list(),
        Action::GetCustomer => match parse_id(&params) {
            Ok(id) => customers.get(id),
            Err(resp) => resp,
        },
        Action::CreateCustomer => match read_customer(req, state.config.http.max_body_size).await {
            Ok(customer) => customers.create(customer),
            Err(resp) => resp,
        },
        Action::UpdateCustomer => {
            let id = match parse_id(&params) {
                Ok(id) => id,
                Err(resp) => return resp,
            };
            match read_customer(req, state.config.http.max_body_size).await {
                Ok(customer) => customers.update(id, customer),
                Err(resp) => resp,
            }
        }
        Action::DeleteCustomer => match parse_id(&params) {
            Ok(id) => customers.delete(id),
            Err(resp) => resp,
        },
        Action::Health => http::json_response(StatusCode::OK, &serde_json::json!({ "status": "ok" })),
    }
}

/// Validate Content-Length header and return 413 if exceeded
fn check_body_size<B>(req: &Request<B>, max_body_size: u64) -> Option<Response<Full<Bytes>>> {
    let content_length = req.headers().get(CONTENT_LENGTH)?;
    match content_length.to_str().ok().map(str::parse::<u64>) {
        Some(Ok(size)) if size > max_body_size => {
            logger::log_warning(&format!(
                "Request body too large: {size} bytes (max: {max_body_size})"
            ));
            Some(payload_too_large(max_body_size))
        }
        Some(Ok(_)) => None,
        _ => {
            logger::log_warning("Invalid Content-Length header, skipping size check");
            None
        }
    }
}

fn parse_id(params: &PathParams) -> Result<i32, Response<Full<Bytes>>> {
    let raw = params.get("id").unwrap_or_default();
    raw.parse::<i32>().map_err(|_| {
        logger::log_warning(&format!("Invalid customer id '{raw}'"));
        bad_request(format!("Invalid customer id '{raw}'"))
    })
}

/// Read the body (bounded by `max_body_size`) and decode it as a customer
async fn read_customer<B>(req: Request<B>, max_body_size: u64) -> Result<Customer, Response<Full<Bytes>>>
where
    B: Body<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    let limit = usize::try_from(max_body_size).unwrap_or(usize::MAX);
    let bytes = match Limited::new(req.into_body(), limit).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            logger::log_warning(&format!("Request body exceeded {max_body_size} bytes"));
            return Err(payload_too_large(max_body_size));
        }
        Err(e) => {
            logger::log_warning(&format!("Failed to read request body: {e}"));
            return Err(bad_request("Failed to read request body".to_string()));
        }
    };

    serde_json::from_slice(&bytes).map_err(|e| {
        logger::log_warning(&format!("Invalid customer payload: {e}"));
        bad_request(format!("Invalid request body: {e}"))
    })
}

fn no_route(path: &str) -> Response<Full<Bytes>> {
    http::error_response(&ErrorPayload::new(
        StatusCode::NOT_FOUND,
        format!("No route for {path}"),
    ))
}

fn bad_request(message: String) -> Response<Full<Bytes>> {
    http::error_response(&ErrorPayload::new(StatusCode::BAD_REQUEST, message))
}

fn payload_too_large(max_body_size: u64) -> Response<Full<Bytes>> {
    http::error_response(&ErrorPayload::new(
        StatusCode::PAYLOAD_TOO_LARGE,
        format!("Request body exceeds {max_body_size} bytes"),
    ))
}

/// Headers added to every response
fn decorate(response: &mut Response<Full<Bytes>>, state: &AppState) {
    let headers = response.headers_mut();
    if let Ok(name) = HeaderValue::from_str(&state.config.http.server_name) {
        headers.insert(SERVER, name);
    }
    if state.config.http.enable_cors {
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    }
}

fn version_label(version: hyper::Version) -> &'static str {
    match version {
        hyper::Version::HTTP_09 => "0.9",
        hyper::Version::HTTP_10 => "1.0",
        hyper::Version::HTTP_2 => "2",
        hyper::Version::HTTP_3 => "3",
        _ => "1.1",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::customer::ErrorLogService;
    use crate::store::MemoryCustomerStore;
    use serde_json::Value;

    fn test_state() -> Arc<AppState> {
        let mut config = Config::defaults().unwrap();
        config.logging.access_log = false;
        config.http.max_body_size = 256;
        let store = MemoryCustomerStore::with_customers(vec![
            Customer::new(1).with_field("firstName", "Alice"),
            Customer::new(2).with_field("firstName", "Bob"),
            Customer::new(3).with_field("firstName", "Carol"),
        ]);
        Arc::new(AppState::new(
            config,
            Arc::new(store),
            Arc::new(ErrorLogService::new()),
        ))
    }

    fn peer() -> SocketAddr {
        "127.0.0.1:50000".parse().unwrap()
    }

    async fn send(
        state: &Arc<AppState>,
        method: Method,
        uri: &str,
        body: Option<&str>,
    ) -> Response<Full<Bytes>> {
        let mut builder = Request::builder().method(method).uri(uri);
        if body.is_some() {
            builder = builder.header("Content-Type", "application/json");
        }
        let req = builder
            .body(Full::new(Bytes::from(body.unwrap_or_default().to_string())))
            .unwrap();
        handle_request(req, Arc::clone(state), peer()).await.unwrap()
    }

    async fn json(resp: Response<Full<Bytes>>) -> Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_crud_round() {
        let state = test_state();

        let resp = send(&state, Method::GET, "/customers", None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json(resp).await.as_array().unwrap().len(), 3);

        let resp = send(&state, Method::GET, "/customers/", None).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = send(
            &state,
            Method::POST,
            "/customers",
            Some(r#"{"firstName":"Dave","email":"dave@example.com"}"#),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created = json(resp).await;
        assert_eq!(created["customerId"], 4);
        assert_eq!(created["email"], "dave@example.com");

        let resp = send(&state, Method::PUT, "/customers/4", Some(r#"{"firstName":"David"}"#)).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let resp = send(&state, Method::GET, "/customers/4", None).await;
        let fetched = json(resp).await;
        assert_eq!(fetched["firstName"], "David");
        assert!(fetched.get("email").is_none());

        let resp = send(&state, Method::DELETE, "/customers/4", None).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let resp = send(&state, Method::GET, "/customers/4", None).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(json(resp).await["message"], "Customer with id 4 can't be found.");
    }

    #[tokio::test]
    async fn test_update_unknown_id() {
        let state = test_state();
        let resp = send(&state, Method::PUT, "/customers/99", Some("{}")).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(json(resp).await["message"], "Customer with id 99 is invalid");
    }

    #[tokio::test]
    async fn test_invalid_id_is_bad_request() {
        let state = test_state();
        let resp = send(&state, Method::GET, "/customers/abc", None).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = json(resp).await;
        assert_eq!(body["status"], "BAD_REQUEST");
        assert_eq!(body["message"], "Invalid customer id 'abc'");
    }

    #[tokio::test]
    async fn test_invalid_body_is_bad_request() {
        let state = test_state();
        for body in ["not json", "[1,2,3]", r#"{"customerId":"x"}"#] {
            let resp = send(&state, Method::POST, "/customers", Some(body)).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "body: {body}");
        }
    }

    #[tokio::test]
    async fn test_unknown_route_and_method() {
        let state = test_state();
        let resp = send(&state, Method::GET, "/orders", None).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(json(resp).await["message"], "No route for /orders");

        let resp = send(&state, Method::PATCH, "/customers/1", None).await;
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(resp.headers()["Allow"], "GET, PUT, DELETE, OPTIONS");
    }

    #[tokio::test]
    async fn test_options_preflight() {
        let state = test_state();
        let resp = send(&state, Method::OPTIONS, "/customers", None).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert_eq!(resp.headers()["Allow"], "GET, POST, OPTIONS");
        assert_eq!(resp.headers()["Access-Control-Allow-Origin"], "*");

        let resp = send(&state, Method::OPTIONS, "/nowhere", None).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_body_too_large() {
        let state = test_state();
        let big = format!(r#"{{"note":"{}"}}"#, "x".repeat(300));

        let req = Request::builder()
            .method(Method::POST)
            .uri("/customers")
            .header("Content-Length", big.len())
            .body(Full::new(Bytes::from(big.clone())))
            .unwrap();
        let resp = handle_request(req, Arc::clone(&state), peer()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);

        // without a Content-Length header the limit applies while reading
        let resp = send(&state, Method::POST, "/customers", Some(&big)).await;
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(json(resp).await["status"], "PAYLOAD_TOO_LARGE");
    }

    #[tokio::test]
    async fn test_health_and_server_header() {
        let state = test_state();
        let resp = send(&state, Method::GET, "/healthz", None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()["Server"], "customer-api/0.1");
        assert_eq!(json(resp).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_create_with_null_id() {
        let state = test_state();
        let resp = send(
            &state,
            Method::POST,
            "/customers",
            Some(r#"{"customerId":null,"firstName":"Dave"}"#),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created = json(resp).await;
        assert_eq!(created["customerId"], 4);
        assert_eq!(created["firstName"], "Dave");
    }

    #[tokio::test]
    async fn test_post_on_trailing_slash_not_allowed() {
        let state = test_state();
        let resp = send(&state, Method::POST, "/customers/", Some("{}")).await;
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(resp.headers()["Allow"], "GET, OPTIONS");
    }

    #[tokio::test]
    async fn test_head_is_get_without_body() {
        let state = test_state();
        let get = send(&state, Method::GET, "/customers/2", None).await;
        let get_len = get.body().size_hint().exact().unwrap();

        let resp = send(&state, Method::HEAD, "/customers/2", None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()["Content-Length"], get_len.to_string().as_str());
        assert_eq!(resp.headers()["Server"], "customer-api/0.1");
        assert!(resp.into_body().collect().await.unwrap().to_bytes().is_empty());

        let resp = send(&state, Method::HEAD, "/customers/99", None).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = send(&state, Method::HEAD, "/orders", None).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_access_log_enabled() {
        let mut config = Config::defaults().unwrap();
        config.logging.access_log_format = "json".to_string();
        let state = Arc::new(AppState::new(
            config,
            Arc::new(MemoryCustomerStore::with_customers(vec![
                Customer::new(1).with_field("firstName", "Alice"),
            ])),
            Arc::new(ErrorLogService::new()),
        ));

        let resp = send(&state, Method::GET, "/customers/1", None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json(resp).await["firstName"], "Alice");

        let resp = send(&state, Method::GET, "/customers/7", None).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_access_entry_fields() {
        let state = test_state();
        let req = Request::builder()
            .method(Method::GET)
            .uri("/customers/1?verbose=1")
            .header("User-Agent", "curl/8.0")
            .body(Full::new(Bytes::new()))
            .unwrap();
        let mut entry = access_entry(&req, peer());
        assert_eq!(entry.remote_addr, "127.0.0.1");
        assert_eq!(entry.method, "GET");
        assert_eq!(entry.uri, "/customers/1?verbose=1");
        assert_eq!(entry.http_version, "1.1");
        assert_eq!(entry.user_agent.as_deref(), Some("curl/8.0"));

        let started = Instant::now();
        let resp = handle_request(req, Arc::clone(&state), peer()).await.unwrap();
        complete_entry(&mut entry, &resp, started);
        assert_eq!(entry.status, 200);
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(entry.body_bytes, body.len());
        assert!(entry.body_bytes > 0);

        let resp = send(&state, Method::DELETE, "/customers/3", None).await;
        complete_entry(&mut entry, &resp, started);
        assert_eq!(entry.status, 204);
        assert_eq!(entry.body_bytes, 0);
    }
}
