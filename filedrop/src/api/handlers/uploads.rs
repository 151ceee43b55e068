//! Serves previously uploaded files from `{uploads.path_prefix}/{*path}`.
//!
//! Only a single plain file name is accepted after the prefix, and the file must canonicalize to
//! a path inside the upload directory. Anything else, including files that are simply missing,
//! is answered with an empty 404.

use axum::{
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use tracing::{instrument, warn};

use crate::AppState;
use crate::errors::Error;

/// Generated names are never reused for different content, short of a token collision
const CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

#[instrument(skip_all, fields(path = %path))]
pub async fn serve_upload(State(state): State<AppState>, Path(path): Path<String>) -> Response {
    // `path` arrives percent-decoded; re-encode it so it compares with stored public paths
    let public_uri = state.uploads.namespace().public_uri_of(&path);

    match state.uploads.read(&public_uri).await {
        Ok(bytes) => {
            let mime = mime_guess::from_path(&path).first_or_octet_stream();
            (
                [
                    (header::CONTENT_TYPE, mime.as_ref().to_string()),
                    (header::CACHE_CONTROL, CACHE_CONTROL.to_string()),
                ],
                bytes,
            )
                .into_response()
        }
        Err(e) => {
            if matches!(e, Error::Forbidden { .. }) {
                warn!(public_uri = %public_uri, error = %e, "Refused to serve path outside the upload directory");
            } else if !e.is_not_found() {
                warn!(public_uri = %public_uri, error = %e, "Failed to read upload");
            }
            StatusCode::NOT_FOUND.into_response()
        }
    }
}
