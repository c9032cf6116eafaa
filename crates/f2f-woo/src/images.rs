//! Re-upload of WooCommerce images into the shop's own asset storage.
//!
//! The image is downloaded from its WooCommerce URL and posted as the raw
//! request body to `{upload_url}?folder={folder}&filename={filename}`. The
//! endpoint answers with `{"url": "..."}`.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

use crate::error::WooError;

const FALLBACK_FILENAME: &str = "image.jpg";

/// Target folder in the asset storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFolder {
    Category,
    Product,
    Assets,
}

impl ImageFolder {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Category => "category",
            Self::Product => "product",
            Self::Assets => "assets",
        }
    }
}

/// Last path segment of an image URL, or `image.jpg` when there is none.
#[must_use]
pub fn extract_filename_from_url(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_owned))
        })
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| FALLBACK_FILENAME.to_owned())
}

/// Storage filename for an image re-uploaded from WooCommerce entity `woo_id`.
#[must_use]
pub fn upload_filename(woo_id: i64, source_url: &str) -> String {
    format!("woo-{woo_id}-{}", extract_filename_from_url(source_url))
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    url: String,
}

pub struct ImageUploader {
    client: Client,
    upload_url: String,
}

impl ImageUploader {
    /// # Errors
    ///
    /// Returns [`WooError::Http`] if the HTTP client cannot be constructed.
    pub fn new(upload_url: &str, timeout_secs: u64, user_agent: &str) -> Result<Self, WooError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            upload_url: upload_url.to_owned(),
        })
    }

    /// Downloads `source_url` and uploads it; returns the stored image URL.
    ///
    /// # Errors
    ///
    /// Returns [`WooError::ImageUpload`] if the download or upload answers
    /// with a non-2xx status or the upload response has no `url`, and
    /// [`WooError::Http`] on network failure.
    pub async fn upload_from_url(
        &self,
        source_url: &str,
        folder: ImageFolder,
        filename: &str,
    ) -> Result<String, WooError> {
        let download = self.client.get(source_url).send().await?;
        if !download.status().is_success() {
            return Err(WooError::ImageUpload {
                source_url: source_url.to_owned(),
                reason: format!("download answered {}", download.status()),
            });
        }
        let content_type = download
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_owned();
        let bytes = download.bytes().await?;

        let response = self
            .client
            .post(&self.upload_url)
            .query(&[("folder", folder.as_str()), ("filename", filename)])
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(WooError::ImageUpload {
                source_url: source_url.to_owned(),
                reason: format!("upload answered {}", response.status()),
            });
        }

        let body = response.text().await?;
        let parsed =
            serde_json::from_str::<UploadResponse>(&body).map_err(|e| WooError::ImageUpload {
                source_url: source_url.to_owned(),
                reason: format!("unexpected upload response: {e}"),
            })?;

        tracing::debug!(source_url, stored_url = %parsed.url, folder = folder.as_str(), "image re-uploaded");
        Ok(parsed.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_is_last_path_segment() {
        assert_eq!(
            extract_filename_from_url("https://shop.example/wp-content/uploads/2024/05/repa.jpg?v=2"),
            "repa.jpg"
        );
    }

    #[test]
    fn filename_falls_back_for_bad_urls() {
        assert_eq!(extract_filename_from_url("not a url"), "image.jpg");
        assert_eq!(extract_filename_from_url("https://shop.example/"), "image.jpg");
    }

    #[test]
    fn upload_filename_is_prefixed_with_woo_id() {
        assert_eq!(
            upload_filename(15, "https://shop.example/uploads/zoldseg.png"),
            "woo-15-zoldseg.png"
        );
    }
}
