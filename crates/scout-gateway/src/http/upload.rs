//! PDF upload endpoint — POST /chat/upload-pdf
//!
//! Multipart fields: `file` (the PDF) and `sessionId`. The response is
//! always 200 with `{"success": bool, "error"?: string}` — the frontend
//! treats upload failure as a chat-level condition, not a transport error.

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use scout_sessions::DEFAULT_SESSION;

use crate::app::AppState;

#[derive(Serialize)]
pub struct UploadResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UploadResponse {
    fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
        }
    }
}

pub async fn upload_pdf_handler(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Json<UploadResponse> {
    let mut session_id = DEFAULT_SESSION.to_string();
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut content_type: Option<String> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(f)) => f,
            Ok(None) => break,
            Err(e) => {
                return Json(UploadResponse::failure(format!(
                    "invalid multipart request: {e}"
                )))
            }
        };

        match field.name() {
            Some("sessionId") => match field.text().await {
                Ok(text) if !text.trim().is_empty() => session_id = text,
                Ok(_) => {}
                Err(e) => return Json(UploadResponse::failure(format!("bad sessionId field: {e}"))),
            },
            Some("file") => {
                let name = field.file_name().unwrap_or_default().to_string();
                content_type = field.content_type().map(str::to_string);
                match field.bytes().await {
                    Ok(bytes) => file = Some((name, bytes.to_vec())),
                    Err(e) => {
                        return Json(UploadResponse::failure(format!("failed to read file: {e}")))
                    }
                }
            }
            _ => {}
        }
    }

    let Some((name, bytes)) = file else {
        return Json(UploadResponse::failure("No file provided"));
    };

    let looks_like_pdf = name.to_lowercase().ends_with(".pdf")
        || content_type.as_deref() == Some("application/pdf");
    if !looks_like_pdf {
        return Json(UploadResponse::failure("Please upload a PDF file"));
    }

    info!(session = %session_id, file = %name, size = bytes.len(), "pdf upload");

    match state.docs.process_file(&session_id, bytes).await {
        Ok(chunks) => {
            info!(session = %session_id, chunks, "pdf processed");
            Json(UploadResponse::ok())
        }
        Err(e) => {
            warn!(session = %session_id, error = %e, "pdf processing failed");
            Json(UploadResponse::failure(format!(
                "Failed to process PDF: {e}"
            )))
        }
    }
}
