use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};

use relay_thermostat_common::ControllerStatus;

use crate::remote::{CommandError, RemoteCommand};

/// A setter call handed to the control loop, answered once it has been
/// applied and persisted.
#[derive(Debug)]
pub struct RemoteRequest {
    pub command: RemoteCommand,
    pub reply: oneshot::Sender<Result<ControllerStatus, String>>,
}

#[derive(Clone)]
pub struct HttpState {
    pub commands: mpsc::Sender<RemoteRequest>,
    pub status: watch::Receiver<ControllerStatus>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

pub fn router(state: HttpState) -> Router {
    Router::new()
        .route("/api/status", get(handle_get_status))
        .route("/api/setpoint", post(handle_set_setpoint))
        .route("/api/hysteresis", post(handle_set_hysteresis))
        .route("/api/mode", post(handle_set_mode))
        .route("/api/protection-time", post(handle_set_protection_time))
        .with_state(state)
}

async fn handle_get_status(State(state): State<HttpState>) -> impl IntoResponse {
    let status = state.status.borrow().clone();
    Json(status)
}

async fn handle_set_setpoint(
    State(state): State<HttpState>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    submit(&state, &params, RemoteCommand::setpoint).await
}

async fn handle_set_hysteresis(
    State(state): State<HttpState>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    submit(&state, &params, RemoteCommand::hysteresis).await
}

async fn handle_set_mode(
    State(state): State<HttpState>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    submit(&state, &params, RemoteCommand::mode).await
}

async fn handle_set_protection_time(
    State(state): State<HttpState>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    submit(&state, &params, RemoteCommand::protection_time).await
}

async fn submit(
    state: &HttpState,
    params: &HashMap<String, String>,
    parse: fn(&str) -> Result<RemoteCommand, CommandError>,
) -> axum::response::Response {
    let Some(value) = params.get("value") else {
        return error_response(StatusCode::BAD_REQUEST, "Missing 'value' parameter");
    };
    let command = match parse(value) {
        Ok(command) => command,
        Err(err) => return error_response(StatusCode::BAD_REQUEST, &err.to_string()),
    };

    let (reply, response) = oneshot::channel();
    if state
        .commands
        .send(RemoteRequest { command, reply })
        .await
        .is_err()
    {
        return error_response(StatusCode::SERVICE_UNAVAILABLE, "Control loop is not running");
    }

    match response.await {
        Ok(Ok(status)) => Json(status).into_response(),
        Ok(Err(message)) => error_response(StatusCode::INTERNAL_SERVER_ERROR, &message),
        Err(_) => error_response(StatusCode::SERVICE_UNAVAILABLE, "Control loop is not running"),
    }
}

fn error_response(status: StatusCode, message: &str) -> axum::response::Response {
    (
        status,
        Json(ErrorBody {
            error: message.to_string(),
        }),
    )
        .into_response()
}
