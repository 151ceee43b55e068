use axum::{extract::State, response::Html};

use crate::{AppState, errors::Result};

/// Client page listing every upload so far
pub async fn index(State(state): State<AppState>) -> Result<Html<String>> {
    let uploads = state.uploads.list().await;
    Ok(Html(state.ui.render_index(&uploads)?))
}
