use crate::AppState;
use crate::api::error::{AppError, ErrorBody};
use crate::api::middleware::request_id::RequestId;
use crate::services::unlock::{UnlockOutcome, unlock_pdf};
use crate::utils::validation::{is_pdf_filename, sanitize_filename};
use axum::{
    Extension,
    body::Body,
    extract::{Multipart, State},
    http::{StatusCode, header},
    response::Response,
};
use futures::TryStreamExt;
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use std::path::PathBuf;
use tokio_util::io::StreamReader;

#[utoipa::path(
    post,
    path = "/upload",
    request_body(
        content = String,
        content_type = "multipart/form-data",
        description = "A `file` part carrying the encrypted PDF and a `password` text part"
    ),
    responses(
        (status = 200, description = "Unlocked PDF bytes", body = Vec<u8>, content_type = "application/pdf"),
        (status = 400, description = "Validation or decryption failure", body = ErrorBody),
        (status = 413, description = "Upload exceeds the configured size limit", body = ErrorBody),
        (status = 500, description = "Unexpected processing fault", body = ErrorBody)
    ),
    tag = "unlock"
)]
pub async fn upload_pdf(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let mut input_path: Option<PathBuf> = None;
    let mut output_path: Option<PathBuf> = None;

    // Capture the result so the multipart stream can be drained and the
    // scratch files removed whatever the exit path.
    let result: Result<Response, AppError> = async {
        let mut filename: Option<String> = None;
        let mut password: Option<String> = None;

        while let Some(field) = multipart.next_field().await.map_err(|e| {
            let err_msg = e.to_string();
            if err_msg.contains("length limit exceeded") {
                AppError::PayloadTooLarge(
                    "Request body exceeds the maximum allowed limit".to_string(),
                )
            } else {
                AppError::BadRequest(err_msg)
            }
        })? {
            let name = field.name().unwrap_or_default().to_string();

            if name == "file" {
                let original_filename = field.file_name().unwrap_or("unnamed").to_string();
                if !is_pdf_filename(&original_filename) {
                    return Err(AppError::BadRequest("File must be a PDF".to_string()));
                }

                let sanitized = sanitize_filename(&original_filename)
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;

                let dest = state.storage.upload_path(&request_id.0, &sanitized);
                let body_with_io_error = field.map_err(std::io::Error::other);
                let mut reader = StreamReader::new(body_with_io_error);
                let staged_bytes = state.storage.stage_upload(&dest, &mut reader).await?;
                tracing::info!("Saved uploaded file: {} ({} bytes)", sanitized, staged_bytes);

                input_path = Some(dest);
                filename = Some(sanitized);
            } else if name == "password" {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                password = Some(text);
            }
        }

        let (input, filename) = match (input_path.clone(), filename) {
            (Some(input), Some(filename)) => (input, filename),
            _ => return Err(AppError::BadRequest("No file provided".to_string())),
        };
        let password =
            password.ok_or_else(|| AppError::BadRequest("Password field is required".to_string()))?;

        let output = state.storage.output_path(&request_id.0, &filename);
        output_path = Some(output.clone());

        tracing::info!("Processing PDF: {}", filename);
        match unlock_pdf(&input, &output, &password) {
            UnlockOutcome::Success { output } => {
                let bytes = tokio::fs::read(&output).await.map_err(|e| {
                    AppError::Internal(format!("failed to read unlocked output: {}", e))
                })?;
                tracing::info!("Successfully unlocked PDF: {}", filename);

                let download_name = format!("unlocked_{}", filename);
                Response::builder()
                    .status(StatusCode::OK)
                    .header(header::CONTENT_TYPE, mime::APPLICATION_PDF.as_ref())
                    .header(
                        header::CONTENT_DISPOSITION,
                        content_disposition(&download_name),
                    )
                    .body(Body::from(bytes))
                    .map_err(|e| AppError::Internal(e.to_string()))
            }
            UnlockOutcome::Failure { message } => {
                tracing::error!("Failed to unlock PDF: {}", message);
                Err(AppError::BadRequest(message))
            }
        }
    }
    .await;

    if let Err(e) = &result {
        // Consume the remaining multipart stream to avoid a TCP reset
        // ("Network error" in browsers) on early rejections.
        tracing::warn!("Upload failed early: {}. Consuming remaining stream...", e);
        while let Ok(Some(mut field)) = multipart.next_field().await {
            while let Ok(Some(_)) = field.chunk().await {}
        }
    }

    // The response body is buffered, so neither scratch file outlives the
    // request. Removal failures are logged inside remove() and never mask
    // the response.
    if let Some(path) = input_path.as_deref() {
        state.storage.remove(path).await;
    }
    if let Some(path) = output_path.as_deref() {
        state.storage.remove(path).await;
    }

    result
}

/// Attachment disposition with an ASCII fallback and an RFC 5987 encoded name.
fn content_disposition(filename: &str) -> String {
    let ascii_filename = filename
        .chars()
        .filter(|c| c.is_ascii() && !c.is_control() && *c != '"' && *c != '\\' && *c != ';')
        .take(64)
        .collect::<String>();
    let fallback_filename = if ascii_filename.is_empty() {
        "file.pdf"
    } else {
        &ascii_filename
    };

    let encoded_filename = utf8_percent_encode(filename, NON_ALPHANUMERIC).to_string();

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback_filename, encoded_filename
    )
}
