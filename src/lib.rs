pub mod api;
pub mod config;
pub mod models;
pub mod services;
pub mod utils;

use crate::config::{ConfigResolver, IntakeConfig};
use crate::services::intake::Intake;
use axum::{
    Router,
    middleware::from_fn,
    routing::{get, post},
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::health::health_check,
        api::handlers::upload::upload_files,
    ),
    components(
        schemas(
            api::handlers::health::HealthResponse,
            api::handlers::upload::UploadForm,
            models::UploadOutcome,
            models::ErrorKind,
        )
    ),
    tags(
        (name = "system", description = "Service status"),
        (name = "uploads", description = "File intake endpoints")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub config: IntakeConfig,
    pub intake: Arc<Intake>,
    pub resolver: Arc<dyn ConfigResolver>,
}

impl AppState {
    pub fn new(config: IntakeConfig, resolver: Arc<dyn ConfigResolver>) -> Self {
        Self {
            intake: Arc::new(Intake::new(&config)),
            config,
            resolver,
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(api::handlers::health::health_check))
        .route("/upload/:profile", post(api::handlers::upload::upload_files))
        .layer(from_fn(api::middleware::request_id::request_id_middleware))
        .layer(axum::extract::DefaultBodyLimit::max(
            state.config.max_request_size,
        ))
        .with_state(state)
}
