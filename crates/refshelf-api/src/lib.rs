//! # refshelf-api
//!
//! HTTP surface of the reference ingestion pipeline.
//!
//! | Route                            | Handler                          |
//! |----------------------------------|----------------------------------|
//! | `POST /references`               | [`handlers::references::create_reference`] |
//! | `GET /references/:id`            | [`handlers::references::get_reference`]    |
//! | `PATCH /references/:id`          | [`handlers::references::update_reference`] |
//! | `DELETE /references/:id`         | [`handlers::references::delete_reference`] |
//! | `GET /keywords`                  | [`handlers::keywords::list_keywords`]      |
//! | `POST /maintenance/orphans/sweep`| [`handlers::maintenance::sweep_orphans`]   |
//! | `GET /health`                    | [`handlers::health::health_check`]         |

pub mod config;
pub mod error;
pub mod handlers;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::{
    catch_panic::CatchPanicLayer,
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use uuid::Uuid;

use refshelf_core::defaults::REQUEST_BODY_LIMIT;
use refshelf_ingest::{ReferenceAssembler, DEFAULT_SWEEP_BATCH};

pub use config::{AppConfig, ConfigError};
pub use error::ApiError;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub assembler: ReferenceAssembler,
    /// Orphan entries handled by a sweep request without a `limit`.
    pub sweep_batch: i64,
}

impl AppState {
    pub fn new(assembler: ReferenceAssembler) -> Self {
        Self {
            assembler,
            sweep_batch: DEFAULT_SWEEP_BATCH,
        }
    }
}

/// Generates time-ordered UUIDv7 request correlation IDs.
#[derive(Clone, Default)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

/// Build the application router with its middleware stack.
pub fn router(state: AppState) -> Router {
    use handlers::{health, keywords, maintenance, references};

    Router::new()
        .route("/health", get(health::health_check))
        .route("/references", post(references::create_reference))
        .route(
            "/references/:id",
            get(references::get_reference)
                .patch(references::update_reference)
                .delete(references::delete_reference),
        )
        .route("/keywords", get(keywords::list_keywords))
        .route(
            "/maintenance/orphans/sweep",
            post(maintenance::sweep_orphans),
        )
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer(CatchPanicLayer::new())
        .layer(DefaultBodyLimit::max(REQUEST_BODY_LIMIT))
        .layer(RequestBodyLimitLayer::new(REQUEST_BODY_LIMIT))
        .with_state(state)
}
