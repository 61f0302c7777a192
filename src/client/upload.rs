use reqwest::StatusCode;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use crate::client::session::SessionContext;
use crate::client::ClientError;
use crate::core::error::UploadErrorBody;
use crate::features::invoices::dtos::{UploadRequestDto, UploadResponseDto};
use crate::shared::encoding::encode_file_content;

/// Sends invoice files to the upload endpoint
pub struct UploadClient {
    http: reqwest::Client,
    endpoint: String,
}

impl UploadClient {
    pub fn new(api_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoint: format!("{}/upload", api_url.trim_end_matches('/')),
        })
    }

    /// Read `path` and upload it under its file name
    pub async fn upload_file(
        &self,
        session: &SessionContext,
        path: &Path,
    ) -> Result<UploadResponseDto, ClientError> {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| ClientError::File {
                path: path.display().to_string(),
                reason: "not a file name".to_string(),
            })?
            .to_string();

        let bytes = tokio::fs::read(path).await.map_err(|e| ClientError::File {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        self.upload_bytes(session, &file_name, &bytes).await
    }

    /// Upload `bytes` as an invoice of the signed-in user
    pub async fn upload_bytes(
        &self,
        session: &SessionContext,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<UploadResponseDto, ClientError> {
        let user_id = session.user_id()?;

        let request = UploadRequestDto {
            user_id: Some(user_id),
            file_name: Some(file_name.to_string()),
            file_content: Some(encode_file_content(bytes)),
        };
        debug!("Uploading {} ({} bytes)", file_name, bytes.len());

        let response = self.http.post(&self.endpoint).json(&request).send().await?;
        let status = response.status();

        if status == StatusCode::OK {
            let body: UploadResponseDto = response
                .json()
                .await
                .map_err(|e| ClientError::InvalidResponse(e.to_string()))?;
            info!("Uploaded {} as invoice {}", file_name, body.invoice_id);
            return Ok(body);
        }

        let text = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<UploadErrorBody>(&text) {
            Ok(UploadErrorBody {
                message,
                error: Some(error),
            }) => format!("{}: {}", message, error),
            Ok(UploadErrorBody { message, .. }) => message,
            Err(_) => text,
        };

        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }
}
