//! HTTP response building module
//!
//! JSON, empty and error responses shared by the router and the controller.

use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::header::CONTENT_LENGTH;
use hyper::{Method, Response, StatusCode};
use serde::Serialize;

use crate::customer::ErrorPayload;

const JSON: &str = "application/json";

/// Serialize `body` as the JSON payload of a `status` response
pub fn json_response<T: Serialize + ?Sized>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let json = match serde_json::to_vec(body) {
        Ok(j) => j,
        Err(e) => {
            crate::logger::log_error(&format!("Failed to serialize response: {e}"));
            return fallback(
                StatusCode::INTERNAL_SERVER_ERROR,
                r#"{"statusCode":500,"status":"INTERNAL_SERVER_ERROR","message":"Oops, something went wrong!"}"#,
            );
        }
    };

    Response::builder()
        .status(status)
        .header("Content-Type", JSON)
        .body(Full::new(Bytes::from(json)))
        .unwrap_or_else(|e| {
            log_build_error(status, &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Error response whose status matches the payload's `statusCode`
pub fn error_response(payload: &ErrorPayload) -> Response<Full<Bytes>> {
    let status =
        StatusCode::from_u16(payload.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    json_response(status, payload)
}

/// Build 204 No Content response
pub fn no_content() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|e| {
            log_build_error(StatusCode::NO_CONTENT, &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build 405 Method Not Allowed response listing the allowed methods
pub fn method_not_allowed(method: &Method, allowed: &[Method]) -> Response<Full<Bytes>> {
    let payload = ErrorPayload::new(
        StatusCode::METHOD_NOT_ALLOWED,
        format!("Method {method} is not supported for this resource"),
    );
    let mut resp = error_response(&payload);
    if let Ok(value) = allow_header(allowed).parse() {
        resp.headers_mut().insert("Allow", value);
    }
    resp
}

/// Build OPTIONS response (preflight request)
pub fn options_response(enable_cors: bool, allowed: &[Method]) -> Response<Full<Bytes>> {
    let allow = allow_header(allowed);
    let mut builder = Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Allow", &allow);

    if enable_cors {
        builder = builder
            .header("Access-Control-Allow-Methods", &allow)
            .header("Access-Control-Allow-Headers", "Content-Type")
            .header("Access-Control-Max-Age", "86400");
    }

    builder.body(Full::new(Bytes::new())).unwrap_or_else(|e| {
        log_build_error(StatusCode::NO_CONTENT, &e);
        Response::new(Full::new(Bytes::new()))
    })
}

/// Drop the body of a GET response for a HEAD request, keeping its length
pub fn head_response(resp: Response<Full<Bytes>>) -> Response<Full<Bytes>> {
    let (mut parts, body) = resp.into_parts();
    if let Some(len) = body.size_hint().exact().filter(|&n| n > 0) {
        parts.headers.insert(CONTENT_LENGTH, len.into());
    }
    Response::from_parts(parts, Full::new(Bytes::new()))
}

fn allow_header(allowed: &[Method]) -> String {
    let mut names: Vec<&str> = allowed.iter().map(Method::as_str).collect();
    if !names.contains(&"OPTIONS") {
        names.push("OPTIONS");
    }
    names.join(", ")
}

fn fallback(status: StatusCode, body: &'static str) -> Response<Full<Bytes>> {
    let mut resp = Response::new(Full::new(Bytes::from_static(body.as_bytes())));
    *resp.status_mut() = status;
    resp
}

fn log_build_error(status: StatusCode, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_uses_payload_status() {
        let resp = error_response(&ErrorPayload::new(StatusCode::NOT_FOUND, "gone"));
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(resp.headers()["Content-Type"], "application/json");
    }

    #[test]
    fn test_method_not_allowed_sets_allow() {
        let resp = method_not_allowed(&Method::PATCH, &[Method::GET, Method::PUT]);
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(resp.headers()["Allow"], "GET, PUT, OPTIONS");
    }

    #[test]
    fn test_options_response_cors() {
        let resp = options_response(true, &[Method::GET, Method::POST]);
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert_eq!(resp.headers()["Allow"], "GET, POST, OPTIONS");
        assert!(resp.headers().contains_key("Access-Control-Allow-Methods"));

        let resp = options_response(false, &[Method::GET]);
        assert!(!resp.headers().contains_key("Access-Control-Allow-Methods"));
    }

    #[test]
    fn test_no_content_is_empty() {
        let resp = no_content();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert!(!resp.headers().contains_key("Content-Type"));
    }

    #[test]
    fn test_head_response_keeps_length() {
        let resp = head_response(json_response(StatusCode::OK, &[1, 2, 3]));
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()["Content-Length"], "7");
        assert_eq!(resp.headers()["Content-Type"], "application/json");
        assert_eq!(resp.body().size_hint().exact(), Some(0));

        let resp = head_response(no_content());
        assert!(!resp.headers().contains_key("Content-Length"));
    }
}
