use super::error::ApiError;
use super::state::AppState;
use crate::error::PdfCacheError;
use crate::fingerprint::ContentAddress;
use crate::model::{PageImage, TaskStatus};
use crate::queue::SubmitOutcome;
use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error, info};

const PDF_MEDIA_TYPE: &str = "application/pdf";

#[derive(Debug, Serialize, Deserialize)]
pub struct ConvertResponse {
    pub message: String,
    pub status: String,
    pub hash_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TaskStatusResponse {
    pub message: String,
    pub status: TaskStatus,
    pub hash_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blob_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub prompt: String,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Strip parameters: `application/pdf; name=x` → `application/pdf`.
fn normalize_mime_type(content_type: &str) -> &str {
    content_type
        .split(';')
        .next()
        .map(str::trim)
        .unwrap_or(content_type)
}

/// Body-limit overruns keep their 413; anything else is a malformed form.
fn multipart_error(e: MultipartError, what: &str, limit: usize) -> PdfCacheError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        PdfCacheError::UploadTooLarge { limit }
    } else {
        PdfCacheError::InvalidInput(format!("Failed to read {}: {}", what, e))
    }
}

/// Pull the `file` field out of the form and check its media type.
async fn read_pdf_field(mut multipart: Multipart, limit: usize) -> Result<Bytes, PdfCacheError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, "multipart", limit))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let content_type = field.content_type().unwrap_or_default().to_string();
        if !normalize_mime_type(&content_type).eq_ignore_ascii_case(PDF_MEDIA_TYPE) {
            return Err(PdfCacheError::UnsupportedMediaType { content_type });
        }
        let filename = field.file_name().unwrap_or("unknown").to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| multipart_error(e, "file data", limit))?;
        debug!("Received '{}' ({} bytes)", filename, data.len());
        return Ok(data);
    }
    Err(PdfCacheError::InvalidInput("No file provided".into()))
}

pub async fn convert_pdf(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<ConvertResponse>, ApiError> {
    let document = read_pdf_field(multipart, state.max_upload_bytes).await?;
    let outcome = state.queue.submit(document).await?;

    let response = match outcome {
        SubmitOutcome::AlreadyExists { address, .. } => ConvertResponse {
            message: "File already exists in cache".into(),
            status: "already_exists".into(),
            hash_id: address.to_string(),
        },
        SubmitOutcome::Processing { address } => ConvertResponse {
            message: "PDF conversion started in background".into(),
            status: "processing".into(),
            hash_id: address.to_string(),
        },
    };
    Ok(Json(response))
}

pub async fn task_status(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
) -> Result<Response, ApiError> {
    // An id that is not a digest can never have been produced by an upload.
    let Ok(address) = ContentAddress::parse(&task_id) else {
        let body = TaskStatusResponse {
            message: "Task not found".into(),
            status: TaskStatus::NotFound,
            hash_id: task_id,
            blob_url: None,
        };
        return Ok((StatusCode::ACCEPTED, Json(body)).into_response());
    };

    let report = state.status.status(&address).await?;
    let code = match report.status {
        TaskStatus::Completed | TaskStatus::Failed => StatusCode::OK,
        TaskStatus::Pending | TaskStatus::NotFound => StatusCode::ACCEPTED,
    };
    let body = TaskStatusResponse {
        message: report.message,
        status: report.status,
        hash_id: report.address.to_string(),
        blob_url: report.location,
    };
    Ok((code, Json(body)).into_response())
}

pub async fn task_pages(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
) -> Result<Json<Vec<PageImage>>, ApiError> {
    let address = ContentAddress::parse(&task_id)?;
    match state.coordinator().fetch_pages(&address).await? {
        Some(pages) => Ok(Json(pages)),
        None => Err(ApiError::new(StatusCode::NOT_FOUND, "Task not completed")),
    }
}

pub async fn chat_with_llm(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    debug!("Chat with LLM endpoint called");
    match state.chat.chat(&request.prompt, request.model.as_deref()).await {
        Ok(response) => {
            info!("Chat reply sent ({} chars)", response.len());
            Ok(Json(ChatResponse { response }))
        }
        Err(e) if e.is_client_error() => Err(ApiError::from(e)),
        Err(e) => {
            error!("Error in chat endpoint: {}", e);
            Err(ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "An error occurred while processing your request",
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_parameters_are_ignored() {
        assert_eq!(normalize_mime_type("application/pdf"), "application/pdf");
        assert_eq!(
            normalize_mime_type("application/pdf; name=\"a.pdf\""),
            "application/pdf"
        );
        assert_eq!(normalize_mime_type(""), "");
    }
}
