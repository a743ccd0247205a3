//! HTTP read API over the live snapshot.
//!
//! - `GET /api/v1` returns the whole snapshot as one object
//! - `GET /api/v1/:key` returns the value of one key, or 404

use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use exbridge_core::errors::{ExError, ExErrorKind};
use exbridge_core::QueryInterface;
use exbridge_core_types::RequestId;
use serde_json::{json, Value};

pub const API_PREFIX: &str = "/api/v1";

const REQUEST_ID_HEADER: &str = "x-request-id";

pub fn router(query: QueryInterface) -> Router {
    Router::new()
        .route(API_PREFIX, get(get_snapshot))
        .route(&format!("{}/:key", API_PREFIX), get(get_entry))
        .with_state(query)
}

async fn get_snapshot(State(query): State<QueryInterface>, headers: HeaderMap) -> Response {
    let request_id = request_id(&headers);
    let snapshot = query.snapshot_all();
    tracing::debug!(
        request_id = %request_id,
        snapshot_version = snapshot.version(),
        "snapshot requested"
    );
    with_request_id(Json(snapshot.to_json()).into_response(), &request_id)
}

async fn get_entry(
    State(query): State<QueryInterface>,
    Path(key): Path<String>,
    headers: HeaderMap,
) -> Response {
    let request_id = request_id(&headers);
    let response = match query.get_current_entry(&key) {
        Ok(value) => Json(value).into_response(),
        Err(err) => {
            let ex_err = ExError::from(err).with_request_id(request_id.clone());
            tracing::debug!(
                request_id = %request_id,
                key = %key,
                err.code = ex_err.code(),
                "entry lookup failed"
            );
            ApiError(ex_err).into_response()
        }
    };
    with_request_id(response, &request_id)
}

/// Error body: `{"code": "ERR_...", "key": ...}`
struct ApiError(ExError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0.kind() {
            ExErrorKind::NotFound => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body: Value = json!({
            "code": self.0.code(),
            "key": self.0.key(),
        });
        (status, Json(body)).into_response()
    }
}

fn request_id(headers: &HeaderMap) -> RequestId {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(|v| RequestId::from_string(v.to_string()))
        .unwrap_or_default()
}

fn with_request_id(mut response: Response, request_id: &RequestId) -> Response {
    if let Ok(value) = HeaderValue::from_str(request_id.as_str()) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }
    response
}
