//! HTTP surface for reading and updating beacon settings.
//!
//! Mounted only when an admin token is configured. Both routes require
//! `Authorization: Bearer <admin_token>`.
//!
//! * `GET  {mount}` → current [`SettingsView`]
//! * `POST {mount}` → apply a form-encoded or JSON submission, returns the new view
use std::sync::Arc;

use axum::{
    Form, Json, Router,
    extract::{FromRequest, Request, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use subtle::ConstantTimeEq;

use crate::{
    core::settings::{SETTINGS_SAVED, SettingsForm, SettingsView, apply_settings},
    ports::config_store::{ConfigStore, StoreError},
};

#[derive(Clone)]
struct SettingsApiState {
    store: Arc<dyn ConfigStore>,
    admin_token: Arc<str>,
}

/// JSON submissions carry a real boolean instead of checkbox presence.
#[derive(Debug, Deserialize)]
struct JsonSettings {
    #[serde(default)]
    access_token: Option<String>,
    enabled: bool,
}

impl From<JsonSettings> for SettingsForm {
    fn from(value: JsonSettings) -> Self {
        Self {
            access_token: value.access_token,
            enabled: value.enabled.then(|| "1".to_string()),
        }
    }
}

enum ApiError {
    Unauthorized,
    BadRequest(String),
    Store(StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Store(e) => {
                tracing::error!("Failed to save settings: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to save settings".to_string(),
                )
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

/// Build the settings router mounted at `mount`.
pub fn settings_router(store: Arc<dyn ConfigStore>, admin_token: &str, mount: &str) -> Router {
    let state = SettingsApiState {
        store,
        admin_token: Arc::from(admin_token),
    };
    Router::new()
        .route(mount, get(show_settings).post(update_settings))
        .with_state(state)
}

fn authorize(headers: &HeaderMap, admin_token: &str) -> Result<(), ApiError> {
    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    match presented {
        Some(token) if !admin_token.is_empty() && tokens_match(token, admin_token) => Ok(()),
        _ => Err(ApiError::Unauthorized),
    }
}

/// Constant-time comparison; only the length of the expected token leaks.
fn tokens_match(presented: &str, expected: &str) -> bool {
    presented.as_bytes().ct_eq(expected.as_bytes()).into()
}

async fn show_settings(
    State(state): State<SettingsApiState>,
    headers: HeaderMap,
) -> Result<Json<SettingsView>, ApiError> {
    authorize(&headers, &state.admin_token)?;
    Ok(Json(SettingsView::from_store(state.store.as_ref())))
}

async fn update_settings(
    State(state): State<SettingsApiState>,
    req: Request,
) -> Result<Json<SettingsView>, ApiError> {
    authorize(req.headers(), &state.admin_token)?;

    let is_json = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"));

    let form: SettingsForm = if is_json {
        let Json(body) = Json::<JsonSettings>::from_request(req, &())
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        body.into()
    } else {
        let Form(body) = Form::<SettingsForm>::from_request(req, &())
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        body
    };

    apply_settings(state.store.as_ref(), &form).map_err(ApiError::Store)?;
    Ok(Json(
        SettingsView::from_store(state.store.as_ref()).with_message(SETTINGS_SAVED),
    ))
}
