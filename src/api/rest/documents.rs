use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use uuid::Uuid;

use crate::documents;
use crate::error::AppError;
use crate::models::document::{DocumentAvailability, DocumentKind, DocumentRef};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/documents", post(upload_document))
        .route("/applications/:id/documents", get(list_documents))
        .route("/applications/:id/documents/:kind", get(download_document))
}

async fn upload_document(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<DocumentRef>, AppError> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.split(';').next().unwrap_or(value).trim().to_string())
        .ok_or_else(|| AppError::Validation("content-type header is required".to_string()))?;

    documents::upload(&state, &content_type, body).map(Json)
}

async fn list_documents(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<DocumentAvailability>>, AppError> {
    documents::availability(&state, &id).map(Json)
}

async fn download_document(
    State(state): State<Arc<AppState>>,
    Path((id, kind)): Path<(Uuid, String)>,
) -> Result<Response, AppError> {
    let kind = DocumentKind::parse(&kind)
        .ok_or_else(|| AppError::Validation(format!("unknown document kind '{kind}'")))?;

    let document = documents::download(&state, &id, kind)?;
    Ok((
        StatusCode::OK,
        [(CONTENT_TYPE, document.content_type)],
        document.bytes,
    )
        .into_response())
}
