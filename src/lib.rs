pub mod api;
pub mod config;
pub mod services;
pub mod utils;

use crate::config::AppConfig;
use crate::services::scratch::ScratchStorage;
use axum::{
    Router,
    middleware::from_fn,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(api::handlers::unlock::upload_pdf, api::handlers::health::health_check,),
    components(
        schemas(
            api::error::ErrorBody,
            api::handlers::health::HealthResponse,
        )
    ),
    tags(
        (name = "unlock", description = "PDF password removal"),
        (name = "system", description = "Service health")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<ScratchStorage>,
    pub config: AppConfig,
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(api::handlers::health::health_check))
        .route(
            "/upload",
            post(api::handlers::unlock::upload_pdf).layer(axum::extract::DefaultBodyLimit::max(
                state.config.max_file_size + 10 * 1024 * 1024, // Add 10MB buffer for multipart overhead
            )),
        )
        .layer(from_fn(api::middleware::request_id::request_id_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
                .expose_headers(Any),
        )
        .with_state(state)
}
