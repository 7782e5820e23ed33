//! Per-request correlation ids.
//!
//! Storefront and admin calls carry an `x-request-id` through the access log,
//! Sentry events and the response. A proxy-supplied id is reused when it is
//! short printable ASCII; anything else is replaced with a fresh UUID.

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use tracing::Span;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest upstream id kept as is.
const MAX_UPSTREAM_ID_LEN: usize = 128;

pub async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = upstream_id(request.headers().get(REQUEST_ID_HEADER))
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    Span::current().record("request_id", request_id.as_str());
    sentry::configure_scope(|scope| scope.set_tag("request_id", &request_id));

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

fn upstream_id(header: Option<&HeaderValue>) -> Option<String> {
    let id = header?.to_str().ok()?.trim();
    let usable = !id.is_empty()
        && id.len() <= MAX_UPSTREAM_ID_LEN
        && id.bytes().all(|b| b.is_ascii_graphic());
    usable.then(|| id.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_id_rules() {
        let keep = HeaderValue::from_static("edge-7f3a:42");
        assert_eq!(upstream_id(Some(&keep)).as_deref(), Some("edge-7f3a:42"));

        let padded = HeaderValue::from_static("  abc  ");
        assert_eq!(upstream_id(Some(&padded)).as_deref(), Some("abc"));

        let spaced = HeaderValue::from_static("two words");
        assert_eq!(upstream_id(Some(&spaced)), None);

        let long = HeaderValue::from_str(&"x".repeat(MAX_UPSTREAM_ID_LEN + 1)).ok();
        assert_eq!(upstream_id(long.as_ref()), None);

        assert_eq!(upstream_id(Some(&HeaderValue::from_static(""))), None);
        assert_eq!(upstream_id(None), None);
    }
}
