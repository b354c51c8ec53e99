//! Public document verification. No authentication; rate limited per source
//! address and only ever discloses what is printed on the document itself.

use crate::db;
use crate::middleware::RateLimiter;
use crate::state::SharedState;
use crate::web::error::ApiError;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::routing::get;
use axum::{Json, Router};
use once_cell::sync::Lazy;
use serde_json::json;

static VERIFY_LIMITER: Lazy<RateLimiter> = Lazy::new(|| RateLimiter::new(30, 60));

pub fn router() -> Router<SharedState> {
    Router::new().route("/verify/:reference", get(verify_reference))
}

fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

async fn verify_reference(
    State(state): State<SharedState>,
    Path(reference): Path<String>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let ip = client_ip(&headers);
    if !VERIFY_LIMITER.check(&ip).await {
        tracing::warn!(ip, "verification rate limit hit");
        return Err(ApiError::RateLimited);
    }

    let record = db::find_document_by_reference(&state.pool, &reference)
        .await?
        .ok_or_else(|| ApiError::NotFound("unknown verification reference".to_string()))?;

    Ok(Json(json!({
        "valid": true,
        "reference": record.reference,
        "workspace": record.workspace_name,
        "recipient": record.recipient,
        "reportType": record.report_type,
        "issuedAt": record.issued_at,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_ip_takes_the_first_forwarded_hop() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.7, 10.0.0.1".parse().unwrap());
        assert_eq!(client_ip(&headers), "203.0.113.7");
        assert_eq!(client_ip(&HeaderMap::new()), "unknown");
    }
}
