//! HTTP route handlers for the desk-agent API.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use regex::Regex;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::error;

use crate::appointments::record::{Appointment, AppointmentId, AppointmentPatch};
use crate::appointments::store::StoreError;
use crate::chat::history::DEFAULT_SESSION;
use crate::slots::business_hour_slots;

use super::state::AppState;

/// Create the API router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/chat", post(chat_turn))
        .route("/slots", get(list_slots))
        .route("/appointments", get(list_appointments))
        .route(
            "/appointments/{id}",
            get(get_appointment)
                .put(update_appointment)
                .delete(delete_appointment),
        )
        .with_state(state)
}

/// Error payload: a status code and a coarse, actionable message.
type ApiError = (StatusCode, Json<Value>);

fn internal_error(message: &str) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "message": message })),
    )
}

fn not_found() -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "message": "Appointment not found" })),
    )
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "OK" }))
}

/// Selectable booking time slots for the kiosk form.
async fn list_slots() -> impl IntoResponse {
    Json(business_hour_slots())
}

/// Chat turn request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /// The user's utterance.
    pub user_prompt: String,
    /// Optional conversation session key; omitted means the shared kiosk
    /// session.
    pub session_id: Option<String>,
}

/// Handle one conversational turn.
async fn chat_turn(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<Value>, ApiError> {
    let session_id = request.session_id.as_deref().unwrap_or(DEFAULT_SESSION);
    let decision = state
        .turns
        .process(session_id, &request.user_prompt)
        .await
        .map_err(|err| {
            error!("error processing chat: {err}");
            internal_error("Error processing chat request.")
        })?;

    Ok(Json(json!({
        "obj": { "reply": decision.reply, "query": decision.query }
    })))
}

/// All appointments, newest first.
async fn list_appointments(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Appointment>>, ApiError> {
    let appointments = state.store.list().await.map_err(|err| {
        error!("error fetching appointments: {err}");
        internal_error("Error fetching appointments")
    })?;

    Ok(Json(appointments))
}

/// One appointment by id.
async fn get_appointment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Appointment>, ApiError> {
    let id = parse_id(&id)?;
    match state.store.get(id).await {
        Ok(appointment) => Ok(Json(appointment)),
        Err(StoreError::NotFound) => Err(not_found()),
        Err(err) => {
            error!("error fetching appointment: {err}");
            Err(internal_error("Error fetching appointment"))
        }
    }
}

/// Update mutable fields of an appointment.
async fn update_appointment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(patch): Json<AppointmentPatch>,
) -> Result<Json<Appointment>, ApiError> {
    if let Some(contact) = &patch.contact {
        if !is_valid_phone(contact) {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(json!({ "message": "Invalid phone number. Must be 10 digits." })),
            ));
        }
    }

    let id = parse_id(&id)?;
    match state.store.update(id, patch).await {
        Ok(appointment) => Ok(Json(appointment)),
        Err(StoreError::NotFound) => Err(not_found()),
        Err(err) => {
            error!("error updating appointment: {err}");
            Err(internal_error("Error updating appointment"))
        }
    }
}

/// Delete an appointment.
async fn delete_appointment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_id(&id)?;
    match state.store.delete(id).await {
        Ok(()) => Ok(Json(json!({ "message": "Appointment deleted successfully" }))),
        Err(StoreError::NotFound) => Err(not_found()),
        Err(err) => {
            error!("error deleting appointment: {err}");
            Err(internal_error("Error deleting appointment"))
        }
    }
}

/// A malformed id can never match a record, so it behaves as not found.
fn parse_id(id: &str) -> Result<AppointmentId, ApiError> {
    id.parse().map_err(|_| not_found())
}

/// Contact numbers must be exactly 10 digits once whitespace is stripped.
fn is_valid_phone(contact: &str) -> bool {
    let digits: String = contact.chars().filter(|c| !c.is_whitespace()).collect();
    Regex::new(r"^\d{10}$").is_ok_and(|re| re.is_match(&digits))
}
