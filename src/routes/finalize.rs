//! Single-token finalize endpoint
//!
//! `GET /finalize?id={tokenId}` or `POST /finalize` with body `{"id": n}`.
//!
//! Success: `{ok: true, id, fid, look, persona, prompt, image, pinned}`, or
//! the short-circuit form `{ok: true, id, already: true, image, pinned: true}`.
//! Only invalid ids and identity failures produce `{ok: false, error}`.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;

use crate::finalize::Finalizer;
use crate::server::http::{error_response, json_response};
use crate::server::AppState;
use crate::types::KilnError;

#[derive(Deserialize)]
struct FinalizeBody {
    id: serde_json::Value,
}

/// Handle GET/POST /finalize
pub async fn handle_finalize(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<Full<Bytes>> {
    let id = match extract_id(req).await {
        Some(id) => id,
        None => return error_response(StatusCode::BAD_REQUEST, "invalid-id"),
    };

    match state.orchestrator.finalize(id).await {
        Ok(result) => {
            let mut body = match serde_json::to_value(&result) {
                Ok(serde_json::Value::Object(map)) => map,
                _ => serde_json::Map::new(),
            };
            body.insert("ok".to_string(), serde_json::Value::Bool(true));
            json_response(StatusCode::OK, &body)
        }
        Err(e) => {
            warn!(id, error = %e, "finalize failed");
            let status = match e {
                KilnError::InvalidId => StatusCode::BAD_REQUEST,
                KilnError::NoIdentityOnToken => StatusCode::NOT_FOUND,
                _ => StatusCode::BAD_GATEWAY,
            };
            error_response(status, &e.code())
        }
    }
}

/// Pull the token id from the query string (GET) or JSON body (POST).
/// Anything non-positive or non-numeric is rejected before any I/O.
async fn extract_id(req: Request<Incoming>) -> Option<u64> {
    if req.method() == Method::GET {
        let query = req.uri().query().unwrap_or("");
        return parse_id_str(query_param(query, "id")?);
    }

    let body = req.collect().await.ok()?.to_bytes();
    let parsed: FinalizeBody = serde_json::from_slice(&body).ok()?;
    match parsed.id {
        serde_json::Value::Number(n) => {
            // Reject floats and negatives, not just non-numbers
            let id = n.as_u64()?;
            (id > 0).then_some(id)
        }
        serde_json::Value::String(s) => parse_id_str(&s),
        _ => None,
    }
}

fn parse_id_str(raw: &str) -> Option<u64> {
    let id: u64 = raw.trim().parse().ok()?;
    (id > 0).then_some(id)
}

/// Minimal query-string lookup; the surface is one parameter deep
fn query_param<'a>(query: &'a str, key: &str) -> Option<&'a str> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_param_finds_id() {
        assert_eq!(query_param("id=42", "id"), Some("42"));
        assert_eq!(query_param("a=1&id=7&b=2", "id"), Some("7"));
        assert_eq!(query_param("a=1", "id"), None);
        assert_eq!(query_param("", "id"), None);
    }

    #[test]
    fn id_parsing_rejects_garbage() {
        assert_eq!(parse_id_str("42"), Some(42));
        assert_eq!(parse_id_str(" 42 "), Some(42));
        assert_eq!(parse_id_str("0"), None);
        assert_eq!(parse_id_str("-3"), None);
        assert_eq!(parse_id_str("4.5"), None);
        assert_eq!(parse_id_str("abc"), None);
        assert_eq!(parse_id_str(""), None);
    }

    #[test]
    fn body_id_accepts_number_and_numeric_string() {
        let n: FinalizeBody = serde_json::from_str(r#"{"id": 42}"#).unwrap();
        assert!(matches!(n.id, serde_json::Value::Number(_)));

        let s: FinalizeBody = serde_json::from_str(r#"{"id": "42"}"#).unwrap();
        assert!(matches!(s.id, serde_json::Value::String(_)));
    }
}
