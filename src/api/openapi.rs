//! OpenAPI documentation and schema generation
//!
//! This module defines the OpenAPI specification for the media-dl HTTP API
//! using utoipa for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the media-dl HTTP API
///
/// Served as JSON at `/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "media-dl HTTP API",
        version = "0.1.0",
        description = "Start background media downloads and retrieve each stored file exactly once",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server")
    ),
    paths(
        crate::api::routes::start_download,
        crate::api::routes::get_video,
        crate::api::routes::head_video,
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
    ),
    components(
        schemas(
            crate::types::StartDownloadResponse,
            crate::types::StoredItem,
            crate::types::ItemId,
            crate::error::ApiError,
            crate::error::ErrorDetail,
        )
    ),
    tags(
        (name = "videos", description = "Download and retrieval of media items"),
        (name = "system", description = "Health and API documentation")
    )
)]
pub struct ApiDoc;
