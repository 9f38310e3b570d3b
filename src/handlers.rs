pub mod attendants;
pub mod auth;
pub mod clients;
pub mod dashboard;
pub mod integrations;
pub mod loyalty;
pub mod rbac;
pub mod surveys;
pub mod tenancy;
pub mod treatments;

use axum::extract::Multipart;
use axum::http::StatusCode;

use crate::common::error::AppError;

/// Lê o campo `file` de um formulário multipart.
pub(crate) async fn read_file_field(mut multipart: Multipart) -> Result<Vec<u8>, AppError> {
    let too_large_or_invalid = |e: axum::extract::multipart::MultipartError| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::UploadTooLarge
        } else {
            AppError::InvalidUpload(e.body_text())
        }
    };

    while let Some(field) = multipart.next_field().await.map_err(too_large_or_invalid)? {
        if field.name() == Some("file") {
            let bytes = field.bytes().await.map_err(too_large_or_invalid)?;
            return Ok(bytes.to_vec());
        }
    }
    Err(AppError::InvalidUpload("missing_file".into()))
}
