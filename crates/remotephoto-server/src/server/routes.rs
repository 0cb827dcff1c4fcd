use crate::server::static_files;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Path, Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Form, Json,
};
use remotephoto_core::{Command, Error};
use serde::Deserialize;
use serde_json::json;
use tower_http::services::ServeFile;
use tracing::{debug, info, warn};

// ============================================================================
// Pages
// ============================================================================

pub async fn viewer_page() -> Response {
    static_files::serve_page(static_files::VIEWER_PAGE)
}

pub async fn master_page() -> Response {
    static_files::serve_page(static_files::MASTER_PAGE)
}

// ============================================================================
// Master commands
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct CommandForm {
    pub cmd: Option<String>,
    pub id: Option<String>,
}

/// A body that is not a urlencoded form carries no fields, so it fails
/// as a missing `cmd` like any other empty command.
pub async fn master_command(
    State(state): State<AppState>,
    form: Option<Form<CommandForm>>,
) -> Result<impl IntoResponse, AppError> {
    let form = form.map(|Form(form)| form).unwrap_or_default();
    let command = Command::parse(form.cmd.as_deref(), form.id.as_deref())?;
    let id = state.show.execute(command).await?;
    info!("Master command {} applied, showing photo {}", command, id);

    Ok(Json(json!({ "status": "ok", "id": id })))
}

// ============================================================================
// Listing
// ============================================================================

pub async fn photos_json(State(state): State<AppState>) -> Result<Response, AppError> {
    let listing = state.show.listing()?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/json"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        listing.to_json(),
    )
        .into_response())
}

/// One photo file straight from the photo directory. Only single,
/// plain file names resolve; subdirectories are not part of the show.
pub async fn photo_file(
    State(state): State<AppState>,
    Path(name): Path<String>,
    request: Request,
) -> Response {
    if !is_photo_name(&name) {
        debug!("Rejected photo name {:?}", name);
        return fallback().await.into_response();
    }

    let path = state.config.photo_dir.join(&name);
    let is_file = tokio::fs::metadata(&path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false);
    if !is_file {
        return fallback().await.into_response();
    }

    match ServeFile::new(&path).try_call(request).await {
        Ok(response) => response.map(Body::new),
        Err(e) => {
            warn!("Failed to serve photo {}: {}", path.display(), e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error\n").into_response()
        }
    }
}

fn is_photo_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

// ============================================================================
// Operations
// ============================================================================

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let clients = state.broker.client_count().await;
    Json(json!({ "status": "ok", "clients": clients }))
}

pub async fn metrics(State(state): State<AppState>) -> String {
    state.metrics_handle.render()
}

pub async fn fallback() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Not found\n")
}

// ============================================================================
// Error handling
// ============================================================================

/// Show and broker errors as HTTP responses
#[derive(Debug)]
pub struct AppError(Error);

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        AppError(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind) = match &self.0 {
            err if err.is_client_error() => (StatusCode::BAD_REQUEST, "invalid_request_error"),
            Error::MalformedCommand(_) => (StatusCode::INTERNAL_SERVER_ERROR, "invalid_command"),
            Error::StreamingUnsupported(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "streaming_unsupported")
            }
            Error::DirectoryUnreadable { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "photo_directory_error")
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        if status.is_server_error() {
            warn!("Request failed: {}", self.0);
        }

        let body = json!({
            "error": {
                "message": self.0.to_string(),
                "type": kind,
            }
        });

        (status, Json(body)).into_response()
    }
}
