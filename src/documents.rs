use axum::body::Bytes;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::error::AppError;
use crate::models::document::{DocumentAvailability, DocumentKind, DocumentRef, DocumentSet};
use crate::state::AppState;
use crate::storage::StoredDocument;

/// Drops blank references and checks content types against the allow-list.
pub fn normalize_documents(config: &Config, mut documents: DocumentSet) -> Result<DocumentSet, AppError> {
    for kind in DocumentKind::ALL {
        let slot = documents.slot_mut(kind);
        let blank = slot
            .as_ref()
            .is_some_and(|doc| doc.storage_key.trim().is_empty());
        if blank {
            *slot = None;
        }

        if let Some(doc) = slot.as_mut() {
            doc.storage_key = doc.storage_key.trim().to_string();
            if !config.is_allowed_document_type(&doc.content_type) {
                return Err(AppError::Validation(format!(
                    "{} has unsupported content type '{}'",
                    kind.as_str(),
                    doc.content_type
                )));
            }
        }
    }

    Ok(documents)
}

pub fn upload(state: &AppState, content_type: &str, bytes: Bytes) -> Result<DocumentRef, AppError> {
    let content_type = content_type.trim().to_ascii_lowercase();
    if !state.config.is_allowed_document_type(&content_type) {
        return Err(AppError::Validation(format!(
            "unsupported document content type '{content_type}'"
        )));
    }
    if bytes.is_empty() {
        return Err(AppError::Validation("document body is empty".to_string()));
    }

    let size = bytes.len();
    let reference = state.documents.put(&content_type, bytes)?;
    info!(storage_key = %reference.storage_key, content_type = %content_type, size, "document stored");
    Ok(reference)
}

pub fn availability(state: &AppState, application_id: &Uuid) -> Result<Vec<DocumentAvailability>, AppError> {
    let application = state
        .applications
        .get(application_id)?
        .ok_or_else(|| AppError::NotFound(format!("application {application_id} not found")))?;

    Ok(DocumentKind::ALL
        .into_iter()
        .map(|kind| {
            let reference = application.documents.get(kind);
            DocumentAvailability {
                kind,
                present: reference.is_some(),
                content_type: reference.map(|doc| doc.content_type.clone()),
            }
        })
        .collect())
}

/// Resolves an application's document to its bytes.
///
/// Unknown application: `NotFound`. Never uploaded, or the blob is gone:
/// `DocumentNotAvailable`. Store unreachable: `TransientStorage`.
pub fn download(
    state: &AppState,
    application_id: &Uuid,
    kind: DocumentKind,
) -> Result<StoredDocument, AppError> {
    let application = state
        .applications
        .get(application_id)?
        .ok_or_else(|| AppError::NotFound(format!("application {application_id} not found")))?;

    let reference = application.documents.get(kind).ok_or_else(|| {
        AppError::DocumentNotAvailable(format!(
            "application {application_id} has no {} document",
            kind.as_str()
        ))
    })?;

    match state.documents.get(&reference.storage_key)? {
        Some(document) => Ok(document),
        None => {
            warn!(
                application_id = %application_id,
                storage_key = %reference.storage_key,
                kind = kind.as_str(),
                "document reference points at a missing blob"
            );
            Err(AppError::DocumentNotAvailable(format!(
                "{} for application {application_id} is no longer stored",
                kind.as_str()
            )))
        }
    }
}
