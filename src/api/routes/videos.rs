//! Video handlers: start a download, serve a stored item.

use crate::api::{AppState, serve};
use crate::error::Result;
use crate::progress::LogProgress;
use crate::types::{DownloadRequest, ItemId, StartDownloadResponse};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::HeaderMap,
    response::Response,
};
use serde::Deserialize;
use utoipa::IntoParams;

/// Query parameters of `GET /video/download`
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DownloadQuery {
    /// Resource URL to download
    pub url: Option<String>,
    /// Who should be notified when the item is ready
    pub requester: Option<String>,
}

/// GET /video/download - Start a download in the background
#[utoipa::path(
    get,
    path = "/video/download",
    tag = "videos",
    params(DownloadQuery),
    responses(
        (status = 200, description = "Download dispatched", body = StartDownloadResponse),
        (status = 400, description = "A required parameter is missing", body = crate::error::ApiError)
    )
)]
pub async fn start_download(
    State(state): State<AppState>,
    Query(query): Query<DownloadQuery>,
) -> Result<Json<StartDownloadResponse>> {
    let request = DownloadRequest {
        url: query.url.unwrap_or_default(),
        requester: query.requester,
    };
    request.validate(true)?;

    let downloader = state.downloader.clone();
    let cancel = state.shutdown.child_token();

    tokio::spawn(async move {
        let progress = LogProgress::new(request.url.clone());
        match downloader.download(&request, &progress, &cancel).await {
            Ok(completed) => {
                tracing::info!(
                    id = %completed.id,
                    url = %request.url,
                    bytes = completed.bytes_written,
                    "download finished"
                );
            }
            Err(e) => {
                tracing::error!(url = %request.url, error = %e, "download failed");
            }
        }
    });

    Ok(Json(StartDownloadResponse::started()))
}

/// GET /video/:id - Serve a stored item, then delete it
#[utoipa::path(
    get,
    path = "/video/{id}",
    tag = "videos",
    params(
        ("id" = String, Path, description = "Item identifier")
    ),
    responses(
        (status = 200, description = "The stored file, sent as an attachment"),
        (status = 206, description = "Requested byte range"),
        (status = 403, description = "Stored path escapes the video directory", body = crate::error::ApiError),
        (status = 404, description = "Unknown item or missing file", body = crate::error::ApiError),
        (status = 416, description = "Range not satisfiable")
    )
)]
pub async fn get_video(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response> {
    serve::serve_item(
        state.store(),
        state.config.video_dir(),
        state.config.server.cache_max_age,
        &ItemId::from(id),
        &headers,
    )
    .await
}

/// HEAD /video/:id - Describe a stored item without consuming it
#[utoipa::path(
    head,
    path = "/video/{id}",
    tag = "videos",
    params(
        ("id" = String, Path, description = "Item identifier")
    ),
    responses(
        (status = 200, description = "Headers of the stored file; nothing is deleted"),
        (status = 403, description = "Stored path escapes the video directory", body = crate::error::ApiError),
        (status = 404, description = "Unknown item or missing file", body = crate::error::ApiError)
    )
)]
pub async fn head_video(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response> {
    serve::describe_item(
        state.store(),
        state.config.video_dir(),
        state.config.server.cache_max_age,
        &ItemId::from(id),
    )
    .await
}
