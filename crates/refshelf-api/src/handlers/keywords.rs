use axum::extract::State;
use axum::Json;

use refshelf_core::Keyword;

use crate::{ApiError, AppState};

/// List every keyword, ordered by text.
///
/// # Returns
/// - 200 OK with the keyword array
/// - 500 Internal Server Error if the query fails
pub async fn list_keywords(State(state): State<AppState>) -> Result<Json<Vec<Keyword>>, ApiError> {
    let keywords = state.assembler.list_keywords().await?;
    Ok(Json(keywords))
}
