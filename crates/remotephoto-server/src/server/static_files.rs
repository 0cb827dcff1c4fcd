use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use rust_embed::Embed;

/// Page every viewer opens
pub const VIEWER_PAGE: &str = "remotephoto.html";

/// Controller page behind Basic auth
pub const MASTER_PAGE: &str = "remotemaster.html";

#[derive(Embed)]
#[folder = "web"]
struct WebAssets;

/// Serve one embedded page by file name
pub fn serve_page(name: &str) -> Response {
    match <WebAssets as Embed>::get(name) {
        Some(content) => {
            let mime = mime_guess::from_path(name).first_or_octet_stream();
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, mime.as_ref())],
                content.data.into_owned(),
            )
                .into_response()
        }
        None => (StatusCode::NOT_FOUND, "Not found\n").into_response(),
    }
}
