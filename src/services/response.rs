//! HTTP response building helpers
//!
//! Every response carries `Access-Control-Allow-Origin: *`, since the
//! browser extension calls the service from arbitrary page origins.

use bytes::Bytes;
use http_body_util::Full;
use hyper::{header, Response, StatusCode};
use serde::Serialize;
use tracing::{debug, error};

use crate::error::CrediError;

/// Response type produced by every handler
pub type HttpResponse = Response<Full<Bytes>>;

fn builder(status: StatusCode) -> hyper::http::response::Builder {
    Response::builder()
        .status(status)
        .header(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")
}

/// Build a JSON response with the given status code
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> HttpResponse {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());
    builder(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(json)))
        .unwrap()
}

/// Build a JSON response with 200 OK status
pub fn ok<T: Serialize>(body: &T) -> HttpResponse {
    json_response(StatusCode::OK, body)
}

/// Build a JSON response with 201 Created status
pub fn created<T: Serialize>(body: &T) -> HttpResponse {
    json_response(StatusCode::CREATED, body)
}

/// Build an empty response with the given status
pub fn empty(status: StatusCode) -> HttpResponse {
    builder(status).body(Full::new(Bytes::new())).unwrap()
}

/// Build an empty response with 204 No Content status
pub fn no_content() -> HttpResponse {
    empty(StatusCode::NO_CONTENT)
}

/// 200 when a mutation changed state, 204 when it was a no-op
pub fn changed(changed: bool) -> HttpResponse {
    if changed {
        empty(StatusCode::OK)
    } else {
        no_content()
    }
}

/// CORS preflight response
pub fn preflight() -> HttpResponse {
    builder(StatusCode::NO_CONTENT)
        .header(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            "GET, PUT, DELETE, OPTIONS",
        )
        .header(header::ACCESS_CONTROL_ALLOW_HEADERS, "*")
        .header(header::ACCESS_CONTROL_MAX_AGE, "86400")
        .body(Full::new(Bytes::new()))
        .unwrap()
}

/// Build a 404 Not Found response with message
pub fn not_found(message: &str) -> HttpResponse {
    json_response(
        StatusCode::NOT_FOUND,
        &serde_json::json!({ "error": message }),
    )
}

/// HTTP status for an error
pub fn status_for(error: &CrediError) -> StatusCode {
    match error {
        CrediError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        CrediError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        CrediError::Conflict(_) => StatusCode::CONFLICT,
        CrediError::NotFound(_) => StatusCode::NOT_FOUND,
        CrediError::Pool(_) => StatusCode::SERVICE_UNAVAILABLE,
        CrediError::Inconsistent(_)
        | CrediError::Database(_)
        | CrediError::Io(_)
        | CrediError::Json(_)
        | CrediError::Config(_)
        | CrediError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Convert a CrediError to an appropriate HTTP response
pub fn error_response(error: CrediError) -> HttpResponse {
    let status = status_for(&error);
    let message = match &error {
        CrediError::InvalidInput(msg)
        | CrediError::Unauthorized(msg)
        | CrediError::Conflict(msg)
        | CrediError::NotFound(msg) => msg.clone(),
        _ => error.to_string(),
    };

    if status.is_server_error() {
        error!(status = %status, error = %error, "Request failed");
    } else {
        debug!(status = %status, error = %message, "Request rejected");
    }

    json_response(status, &serde_json::json!({ "error": message }))
}

/// Wrap a create result into an HTTP response with 201 Created
pub fn from_create_result<T: Serialize>(result: Result<T, CrediError>) -> HttpResponse {
    match result {
        Ok(value) => created(&value),
        Err(e) => error_response(e),
    }
}

/// Wrap a mutation result: 200 if changed, 204 if not
pub fn from_changed_result(result: Result<bool, CrediError>) -> HttpResponse {
    match result {
        Ok(c) => changed(c),
        Err(e) => error_response(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_response_has_cors() {
        let resp = ok(&serde_json::json!({"test": true}));
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "*"
        );
    }

    #[test]
    fn test_error_statuses() {
        let cases = [
            (CrediError::InvalidInput("bad".into()), StatusCode::BAD_REQUEST),
            (CrediError::Unauthorized("who".into()), StatusCode::UNAUTHORIZED),
            (CrediError::Conflict("dup".into()), StatusCode::CONFLICT),
            (CrediError::NotFound("gone".into()), StatusCode::NOT_FOUND),
            (CrediError::Pool("busy".into()), StatusCode::SERVICE_UNAVAILABLE),
            (
                CrediError::Inconsistent("pair".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                CrediError::Database(diesel::result::Error::NotFound),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(error_response(err).status(), status);
        }
    }

    #[test]
    fn test_changed_statuses() {
        assert_eq!(changed(true).status(), StatusCode::OK);
        assert_eq!(changed(false).status(), StatusCode::NO_CONTENT);
    }

    #[test]
    fn test_preflight() {
        let resp = preflight();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert!(resp
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_METHODS));
    }
}
