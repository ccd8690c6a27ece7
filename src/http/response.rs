//! Response assembly.
//!
//! # Responsibilities
//! - Copy upstream status and headers onto the client response
//! - Attach the (possibly rewritten) buffered body
//!
//! # Design Decisions
//! - Header values are copied verbatim, duplicates included
//! - Framing (`content-length`, `transfer-encoding`) and hop-by-hop headers,
//!   including any named in `Connection`, are dropped; the server recomputes
//!   framing for the new body

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::Response;

use crate::upstream::forwarder::end_to_end_headers;

/// Build the client response from upstream status/headers and a final body.
pub fn build_response(status: StatusCode, upstream_headers: &HeaderMap, body: Bytes) -> Response {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;

    let headers = response.headers_mut();
    for (name, value) in end_to_end_headers(upstream_headers) {
        if name == header::CONTENT_LENGTH {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn copies_headers_except_framing() {
        let mut upstream = HeaderMap::new();
        upstream.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/fhir+json;charset=utf-8"),
        );
        upstream.insert(header::CONTENT_LENGTH, HeaderValue::from_static("9999"));
        upstream.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        upstream.append(header::SET_COOKIE, HeaderValue::from_static("a=1"));
        upstream.append(header::SET_COOKIE, HeaderValue::from_static("b=2"));
        upstream.insert("x-powered-by", HeaderValue::from_static("HAPI FHIR"));

        let response = build_response(StatusCode::OK, &upstream, Bytes::from_static(b"{}"));
        let headers = response.headers();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            headers.get(header::CONTENT_TYPE).unwrap(),
            "application/fhir+json;charset=utf-8"
        );
        assert_eq!(headers.get("x-powered-by").unwrap(), "HAPI FHIR");
        assert_eq!(headers.get_all(header::SET_COOKIE).iter().count(), 2);
        assert!(headers.get(header::CONTENT_LENGTH).is_none());
        assert!(headers.get(header::TRANSFER_ENCODING).is_none());
    }

    #[test]
    fn drops_headers_named_by_connection() {
        let mut upstream = HeaderMap::new();
        upstream.insert(header::CONNECTION, HeaderValue::from_static("x-backend-node"));
        upstream.insert("x-backend-node", HeaderValue::from_static("hapi-3"));
        upstream.insert(header::ETAG, HeaderValue::from_static("W/\"2\""));

        let response = build_response(StatusCode::OK, &upstream, Bytes::new());
        let headers = response.headers();
        assert!(headers.get(header::CONNECTION).is_none());
        assert!(headers.get("x-backend-node").is_none());
        assert_eq!(headers.get(header::ETAG).unwrap(), "W/\"2\"");
    }

    #[test]
    fn keeps_upstream_status() {
        let response = build_response(StatusCode::NOT_FOUND, &HeaderMap::new(), Bytes::new());
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
