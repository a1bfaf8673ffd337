use axum::Json;
use axum::extract::State;

use crate::api::ApiError;
use crate::api::models::*;
use crate::service::SharedState;
use crate::storage::CsvRecorder;

/// POST /session/start - Create the session directory and record into it
pub async fn start_session(
    State(state): State<SharedState>,
    State(recorder): State<CsvRecorder>,
    Json(request): Json<SessionStartRequest>,
) -> Result<Json<SessionStatusResponse>, ApiError> {
    recorder.make_session_dir(&request.name).await?;
    recorder.save_active_session(&request.name).await?;

    let previous = {
        let mut state = state.write().await;
        state.active_session.replace(request.name.clone())
    };

    match previous {
        Some(previous) if previous != request.name => {
            tracing::info!("Recording session switched from {} to {}", previous, request.name);
        }
        _ => tracing::info!("Recording session {} started", request.name),
    }

    Ok(Json(SessionStatusResponse::new(Some(request.name))))
}

/// POST /session/stop - Stop recording and forget the saved session
pub async fn stop_session(
    State(state): State<SharedState>,
    State(recorder): State<CsvRecorder>,
) -> Result<Json<SessionStatusResponse>, ApiError> {
    recorder.delete_autoconfig().await?;

    let stopped = state.write().await.active_session.take();
    if let Some(session) = &stopped {
        tracing::info!("Recording session {} stopped", session);
    }

    Ok(Json(SessionStatusResponse::new(None)))
}

/// GET /session/status - Active recording session, if any
pub async fn get_session_status(State(state): State<SharedState>) -> Json<SessionStatusResponse> {
    let state = state.read().await;

    Json(SessionStatusResponse::new(state.active_session.clone()))
}
