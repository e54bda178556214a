//! Dashboard routes.
//!
//! | Method | Path           | Purpose                                       |
//! |--------|----------------|-----------------------------------------------|
//! | GET    | `/`            | dashboard page                                |
//! | GET    | `/last-user`   | latest arrival as JSON, `{}` before the first |
//! | GET    | `/arrival`     | long poll: the next arrival as JSON           |
//! | POST   | `/update-user` | form submit of a member edit, 303 back to `/` |

use crate::error::WebResult;
use axum::extract::{Form, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tagin_core::constants::{CARD_ID_LENGTH, FIELD_CARD_ID, PAGE_CACHE_SECONDS};
use tagin_core::{CardId, MemberUpdate};
use tagin_station::Station;
use tagin_storage::UpsertOutcome;
use tracing::{debug, error, info, warn};

/// Shared state for all dashboard handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub station: Station,
    pub page_path: Arc<PathBuf>,
}

impl AppState {
    pub fn new(station: Station, page_path: impl Into<PathBuf>) -> Self {
        Self {
            station,
            page_path: Arc::new(page_path.into()),
        }
    }
}

/// Build the dashboard router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard_page))
        .route("/last-user", get(last_user))
        .route("/arrival", get(next_arrival))
        .route("/update-user", post(update_user))
}

async fn dashboard_page(State(state): State<AppState>) -> WebResult<Response> {
    match tokio::fs::read(state.page_path.as_path()).await {
        Ok(page) => Ok((
            [
                (header::CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8")),
                (header::CACHE_CONTROL, cache_control(false)),
            ],
            page,
        )
            .into_response()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %state.page_path.display(), "Dashboard page missing");
            Ok((
                StatusCode::NOT_FOUND,
                [(header::CACHE_CONTROL, cache_control(true))],
                "page not found",
            )
                .into_response())
        }
        Err(e) => Err(e.into()),
    }
}

fn cache_control(must_revalidate: bool) -> HeaderValue {
    let value = if must_revalidate {
        format!("max-age={PAGE_CACHE_SECONDS},must-revalidate")
    } else {
        format!("max-age={PAGE_CACHE_SECONDS}")
    };
    // Only digits and ASCII punctuation.
    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("no-cache"))
}

async fn last_user(State(state): State<AppState>) -> Response {
    match state.station.notifier().current() {
        Some(event) => Json(&*event).into_response(),
        None => Json(serde_json::json!({})).into_response(),
    }
}

async fn next_arrival(State(state): State<AppState>) -> Response {
    let event = state.station.notifier().await_next().await;
    Json(&*event).into_response()
}

async fn update_user(
    State(state): State<AppState>,
    Form(form): Form<HashMap<String, String>>,
) -> Redirect {
    let redirect = Redirect::to("/");

    let Some(raw_id) = form.get(FIELD_CARD_ID) else {
        warn!("Update without {FIELD_CARD_ID}, ignored");
        return redirect;
    };
    if raw_id.chars().count() != CARD_ID_LENGTH {
        warn!(value = %raw_id, "Update with malformed {FIELD_CARD_ID}, ignored");
        return redirect;
    }
    let card_id = match CardId::new(raw_id) {
        Ok(card_id) => card_id,
        Err(e) => {
            warn!("Update ignored: {}", e);
            return redirect;
        }
    };

    let update = MemberUpdate::from_form(&form);
    match state.station.update_member(&card_id, update).await {
        Ok(UpsertOutcome::Rejected(reason)) => debug!(card_id = %card_id, %reason, "Update rejected"),
        Ok(_) => info!(card_id = %card_id, "Member updated from dashboard"),
        Err(e) => error!(card_id = %card_id, "Failed to store member update: {}", e),
    }
    redirect
}
