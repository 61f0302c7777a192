use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::core::error::UploadError;
use crate::shared::constants::{UPLOAD_MISSING_FIELDS_MESSAGE, UPLOAD_SUCCESS_MESSAGE};
use crate::shared::encoding::decode_file_content;

/// Upload request body.
///
/// Gateways deliver it either as the JSON object itself, as a JSON string
/// holding the object, or wrapped in an envelope whose `body` field is one of
/// those two.
#[derive(Debug, Default, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequestDto {
    /// Owner of the uploaded invoice
    #[schema(example = "3f1c2a4e-0000-4000-8000-000000000000")]
    pub user_id: Option<String>,
    /// Original file name
    #[schema(example = "receipt.pdf")]
    pub file_name: Option<String>,
    /// Base64 file content; a `data:` URI prefix is accepted
    pub file_content: Option<String>,
}

/// Upload request that passed validation, with decoded content
#[derive(Debug, Clone)]
pub struct ValidatedUpload {
    pub user_id: String,
    pub file_name: String,
    pub content: Vec<u8>,
}

/// Successful upload
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponseDto {
    pub message: String,
    pub invoice_id: Uuid,
}

impl UploadResponseDto {
    pub fn uploaded(invoice_id: Uuid) -> Self {
        Self {
            message: UPLOAD_SUCCESS_MESSAGE.to_string(),
            invoice_id,
        }
    }
}

impl UploadRequestDto {
    /// Parse a raw request body in any of the accepted shapes
    pub fn from_body(body: &[u8]) -> Result<Self, UploadError> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| UploadError::Validation(format!("Invalid JSON body: {}", e)))?;

        let value = unwrap_string(value)?;
        let value = match value {
            Value::Object(mut map) => match map.remove("body") {
                Some(inner) if !inner.is_null() => unwrap_string(inner)?,
                _ => Value::Object(map),
            },
            other => other,
        };

        match value {
            Value::Object(map) => Ok(Self {
                user_id: string_field(&map, "userId"),
                file_name: string_field(&map, "fileName"),
                file_content: string_field(&map, "fileContent"),
            }),
            _ => Err(UploadError::Validation(
                "Request body must be a JSON object".to_string(),
            )),
        }
    }

    /// Check the required fields and decode the content.
    ///
    /// Runs before any side effect; an empty string counts as missing.
    pub fn into_upload(self) -> Result<ValidatedUpload, UploadError> {
        let (user_id, file_name, file_content) =
            match (self.user_id, self.file_name, self.file_content) {
                (Some(user_id), Some(file_name), Some(file_content))
                    if !user_id.is_empty() && !file_name.is_empty() && !file_content.is_empty() =>
                {
                    (user_id, file_name, file_content)
                }
                _ => {
                    return Err(UploadError::Validation(
                        UPLOAD_MISSING_FIELDS_MESSAGE.to_string(),
                    ))
                }
            };

        let content = decode_file_content(&file_content)
            .map_err(|e| UploadError::Validation(format!("Error: Invalid fileContent: {}", e)))?;

        Ok(ValidatedUpload {
            user_id,
            file_name,
            content,
        })
    }
}

// A JSON string holding JSON is parsed once more
fn unwrap_string(value: Value) -> Result<Value, UploadError> {
    match value {
        Value::String(raw) => serde_json::from_str(&raw)
            .map_err(|e| UploadError::Validation(format!("Invalid JSON body: {}", e))),
        other => Ok(other),
    }
}

fn string_field(map: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    map.get(key).and_then(Value::as_str).map(str::to_string)
}

/// MIME type of a stored invoice, by file extension
pub fn content_type_for(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "pdf" => "application/pdf",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        _ => "application/octet-stream",
    }
}
