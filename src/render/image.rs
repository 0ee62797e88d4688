//! Displayable result image

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::error::{AppError, Result};
use crate::protocol::GenerationMeta;

const PNG_DATA_PREFIX: &str = "data:image/png;base64,";

/// Finished image as received from the backend
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedImage {
    data_url: String,
    meta: Option<GenerationMeta>,
}

impl RenderedImage {
    /// Wrap a `final` payload. Bare base64 is treated as PNG; a payload that
    /// is already a data URL is kept as is.
    pub fn from_payload(payload: String, meta: Option<GenerationMeta>) -> Self {
        let data_url = if payload.starts_with("data:") {
            payload
        } else {
            format!("{}{}", PNG_DATA_PREFIX, payload)
        };
        Self { data_url, meta }
    }

    pub fn data_url(&self) -> &str {
        &self.data_url
    }

    pub fn meta(&self) -> Option<&GenerationMeta> {
        self.meta.as_ref()
    }

    /// Base64 section of the data URL
    pub fn base64(&self) -> &str {
        self.data_url
            .split_once(',')
            .map(|(_, body)| body)
            .unwrap_or(&self.data_url)
    }

    /// File extension matching the data URL's media type
    pub fn extension(&self) -> &'static str {
        if self.data_url.starts_with("data:image/jpeg") {
            "jpg"
        } else {
            "png"
        }
    }

    /// Decode the image bytes
    pub fn decode(&self) -> Result<Vec<u8>> {
        STANDARD
            .decode(self.base64().trim())
            .map_err(|e| AppError::Backend(format!("Final image is not valid base64: {}", e)))
    }
}
