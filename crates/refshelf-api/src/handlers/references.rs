//! Reference HTTP handlers.
//!
//! Create and update bodies share [`ReferenceRequest`]: `collectionName`,
//! `title`, `memo`, a whitespace-separated `keywords` string and a `files`
//! list of attachment descriptors.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use refshelf_core::{ReferenceDetail, ReferenceRequest};

use crate::{ApiError, AppState};

/// Envelope for create and update responses.
#[derive(Debug, Serialize)]
pub struct ReferenceResponse {
    pub reference: ReferenceDetail,
}

/// Ingest a new reference.
///
/// # Returns
/// - 201 Created with `{ reference }`
/// - 400 Bad Request when a required field is missing or an attachment is rejected
/// - 404 Not Found when the collection does not exist
/// - 500 Internal Server Error when storage fails
pub async fn create_reference(
    State(state): State<AppState>,
    body: Result<Json<ReferenceRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ReferenceResponse>), ApiError> {
    let Json(req) = body?;
    let reference = state.assembler.create(req).await?;
    Ok((StatusCode::CREATED, Json(ReferenceResponse { reference })))
}

/// Partially update a reference. Blank fields are left unchanged.
pub async fn update_reference(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<ReferenceRequest>, JsonRejection>,
) -> Result<Json<ReferenceResponse>, ApiError> {
    let Path(id) = id?;
    let Json(req) = body?;
    let reference = state.assembler.update(id, req).await?;
    Ok(Json(ReferenceResponse { reference }))
}

/// Fetch a reference with its collection name and keyword texts.
pub async fn get_reference(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<ReferenceDetail>, ApiError> {
    let Path(id) = id?;
    Ok(Json(state.assembler.get(id).await?))
}

/// Delete a reference and its blobs.
///
/// # Returns
/// - 204 No Content
/// - 404 Not Found when the reference does not exist
pub async fn delete_reference(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    state.assembler.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
