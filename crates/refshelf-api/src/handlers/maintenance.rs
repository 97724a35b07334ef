//! Maintenance endpoints.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use refshelf_core::SweepReport;

use crate::{ApiError, AppState};

/// Largest batch one sweep request may ask for.
const MAX_SWEEP_LIMIT: i64 = 10_000;

#[derive(Debug, Default, Deserialize)]
pub struct SweepQuery {
    /// Entries to process; defaults to the configured batch size.
    pub limit: Option<i64>,
}

/// Delete blobs recorded in the orphan log.
///
/// # Returns
/// - 200 OK with `{ swept, failed }`
/// - 400 Bad Request for a non-positive or oversized `limit`
pub async fn sweep_orphans(
    State(state): State<AppState>,
    query: Result<Query<SweepQuery>, QueryRejection>,
) -> Result<Json<SweepReport>, ApiError> {
    let Query(query) = query?;
    let limit = query.limit.unwrap_or(state.sweep_batch);
    if !(1..=MAX_SWEEP_LIMIT).contains(&limit) {
        return Err(ApiError::bad_request(format!(
            "limit must be between 1 and {}",
            MAX_SWEEP_LIMIT
        )));
    }

    let report = state.assembler.sweep_orphans(limit).await?;
    Ok(Json(report))
}
