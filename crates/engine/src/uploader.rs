//! Image uploads for wallet icons and transaction receipts.
//!
//! The engine only needs `upload(file, folder) -> URL`; the binary store
//! behind it is an external service. [`HttpUploader`] talks to a
//! Cloudinary-compatible endpoint, [`DisabledUploader`] is used when no store
//! is configured.

use std::{
    fmt,
    future::Future,
    path::{Path, PathBuf},
    pin::Pin,
    time::Duration,
};

use serde::Deserialize;

use crate::{EngineError, ResultEngine};

/// Folder used for transaction receipts.
pub const TRANSACTIONS_FOLDER: &str = "transactions";
/// Folder used for wallet icons.
pub const WALLETS_FOLDER: &str = "wallets";

pub type UploadFuture<'a> = Pin<Box<dyn Future<Output = ResultEngine<String>> + Send + 'a>>;

/// Where an image comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImageSource {
    /// Already stored remotely, kept as is.
    Url(String),
    /// A local file that has to be uploaded first.
    Local(PathBuf),
}

/// Stores a file and returns its durable URL.
pub trait AssetUploader: fmt::Debug + Send + Sync {
    fn upload<'a>(&'a self, file: &'a Path, folder: &'a str) -> UploadFuture<'a>;
}

/// Rejects every upload.
#[derive(Clone, Copy, Debug, Default)]
pub struct DisabledUploader;

impl AssetUploader for DisabledUploader {
    fn upload<'a>(&'a self, _file: &'a Path, _folder: &'a str) -> UploadFuture<'a> {
        Box::pin(async {
            Err(EngineError::UploadFailed(
                "asset uploads are not configured".to_string(),
            ))
        })
    }
}

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorMessage,
}

#[derive(Deserialize)]
struct ErrorMessage {
    message: String,
}

/// Uploads files as `multipart/form-data` (`file`, `upload_preset`,
/// `folder`) and reads `secure_url` from the JSON answer.
#[derive(Clone, Debug)]
pub struct HttpUploader {
    client: reqwest::Client,
    endpoint: String,
    upload_preset: String,
}

impl HttpUploader {
    pub fn new(
        endpoint: impl Into<String>,
        upload_preset: impl Into<String>,
        timeout: Duration,
    ) -> ResultEngine<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| EngineError::UploadFailed(err.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            upload_preset: upload_preset.into(),
        })
    }

    /// Uploader for a Cloudinary account.
    pub fn cloudinary(
        cloud_name: &str,
        upload_preset: impl Into<String>,
        timeout: Duration,
    ) -> ResultEngine<Self> {
        Self::new(
            format!("https://api.cloudinary.com/v1_1/{cloud_name}/image/upload"),
            upload_preset,
            timeout,
        )
    }

    async fn send(&self, file: &Path, folder: &str) -> ResultEngine<String> {
        let bytes = tokio::fs::read(file).await.map_err(|err| {
            EngineError::UploadFailed(format!("cannot read {}: {err}", file.display()))
        })?;
        let file_name = file
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("file.jpg")
            .to_string();

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("image/jpeg")
            .map_err(|err| EngineError::UploadFailed(err.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("upload_preset", self.upload_preset.clone())
            .text("folder", folder.to_string());

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|err| EngineError::UploadFailed(err.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| EngineError::UploadFailed(err.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|body| body.error.message)
                .unwrap_or_else(|_| format!("asset store answered {status}"));
            return Err(EngineError::UploadFailed(message));
        }

        let uploaded: UploadResponse = serde_json::from_str(&body)
            .map_err(|err| EngineError::UploadFailed(format!("unexpected answer: {err}")))?;
        tracing::debug!(folder, url = %uploaded.secure_url, "image uploaded");
        Ok(uploaded.secure_url)
    }
}

impl AssetUploader for HttpUploader {
    fn upload<'a>(&'a self, file: &'a Path, folder: &'a str) -> UploadFuture<'a> {
        Box::pin(self.send(file, folder))
    }
}
