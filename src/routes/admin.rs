//! Admin backfill endpoint
//!
//! `POST /admin/backfill` with `{from, to, delayMs}`, guarded by the
//! `x-admin-token` shared secret. An absent server-side secret leaves the
//! endpoint open; that is a deployment misconfiguration, warned about at
//! startup, not a feature.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::finalize::batch;
use crate::server::http::{error_response, json_response};
use crate::server::AppState;

/// Header carrying the admin shared secret
const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BackfillBody {
    from: i64,
    to: i64,
    #[serde(default)]
    delay_ms: i64,
}

/// Handle POST /admin/backfill
pub async fn handle_backfill(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<Full<Bytes>> {
    if !is_authorized(&req, state.args.admin_token.as_deref()) {
        return error_response(StatusCode::UNAUTHORIZED, "unauthorized");
    }

    let body = match req.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(_) => return error_response(StatusCode::BAD_REQUEST, "failed to read request body"),
    };

    let request: BackfillBody = match serde_json::from_slice(&body) {
        Ok(parsed) => parsed,
        Err(e) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                &format!("invalid backfill body: {}", e),
            )
        }
    };

    info!(
        from = request.from,
        to = request.to,
        delay_ms = request.delay_ms,
        "backfill requested"
    );

    let outcome = batch::run_range(
        state.orchestrator.as_ref(),
        request.from,
        request.to,
        request.delay_ms,
    )
    .await;

    json_response(
        StatusCode::OK,
        &serde_json::json!({
            "ok": true,
            "range": { "from": outcome.from, "to": outcome.to },
            "done": outcome.done,
            "failed": outcome.failed,
        }),
    )
}

/// Compare the shared-secret header against the configured value.
/// No configured value means the check is disabled.
fn is_authorized<B>(req: &Request<B>, expected: Option<&str>) -> bool {
    let Some(expected) = expected else {
        return true;
    };

    req.headers()
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(|provided| provided == expected)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_with_token(token: Option<&str>) -> Request<()> {
        let mut builder = Request::builder().method("POST").uri("/admin/backfill");
        if let Some(t) = token {
            builder = builder.header(ADMIN_TOKEN_HEADER, t);
        }
        builder.body(()).unwrap()
    }

    #[test]
    fn open_when_no_secret_configured() {
        assert!(is_authorized(&request_with_token(None), None));
        assert!(is_authorized(&request_with_token(Some("anything")), None));
    }

    #[test]
    fn secret_must_match_exactly() {
        let expected = Some("s3cret");
        assert!(is_authorized(&request_with_token(Some("s3cret")), expected));
        assert!(!is_authorized(&request_with_token(Some("S3CRET")), expected));
        assert!(!is_authorized(&request_with_token(Some("")), expected));
        assert!(!is_authorized(&request_with_token(None), expected));
    }

    #[test]
    fn backfill_body_parses_camel_case() {
        let body: BackfillBody =
            serde_json::from_str(r#"{"from": 1, "to": 50, "delayMs": 250}"#).unwrap();
        assert_eq!((body.from, body.to, body.delay_ms), (1, 50, 250));
    }

    #[test]
    fn delay_defaults_to_zero() {
        let body: BackfillBody = serde_json::from_str(r#"{"from": 2, "to": 3}"#).unwrap();
        assert_eq!(body.delay_ms, 0);
    }
}
