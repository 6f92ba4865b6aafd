//! Background removal collaborator.
//!
//! The remote service takes a data URL and answers with a processed data
//! URL. The composition only ever sees the outcome through
//! [`CompositionSession::complete_removal`](crate::CompositionSession::complete_removal).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::assets::{self, ImageFetcher, ImageLocation};
use crate::error::{MockupError, Result};

/// Which image a removal request processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RemovalSlot {
    Logo,
    ProductPhoto,
}

impl std::fmt::Display for RemovalSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemovalSlot::Logo => write!(f, "logo"),
            RemovalSlot::ProductPhoto => write!(f, "product photo"),
        }
    }
}

/// An accepted removal request for one slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovalRequest {
    pub slot: RemovalSlot,
    /// The source the request was issued for.
    pub source_url: String,
}

/// Removes the background of an image.
#[async_trait]
pub trait BackgroundRemover: Send + Sync {
    /// Takes an image as a data URL and returns the processed image URL.
    async fn remove_background(&self, image_data_url: &str) -> Result<String>;
}

#[cfg(feature = "native")]
#[derive(Debug, Serialize)]
struct RemovalPayload<'a> {
    image: &'a str,
}

#[cfg(feature = "native")]
#[derive(Debug, Deserialize)]
struct RemovalResponse {
    success: bool,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[cfg(feature = "native")]
impl RemovalResponse {
    fn into_result(self) -> Result<String> {
        match (self.success, self.image) {
            (true, Some(image)) if !image.is_empty() => Ok(image),
            (true, _) => Err(MockupError::BackgroundRemoval(
                "service reported success without an image".into(),
            )),
            (false, _) => Err(MockupError::BackgroundRemoval(
                self.error.unwrap_or_else(|| "unknown error".into()),
            )),
        }
    }
}

/// [`BackgroundRemover`] that POSTs `{"image": <data URL>}` to an HTTP endpoint.
#[cfg(feature = "native")]
#[derive(Debug, Clone)]
pub struct HttpBackgroundRemover {
    client: reqwest::Client,
    endpoint: String,
}

#[cfg(feature = "native")]
impl HttpBackgroundRemover {
    pub fn new(endpoint: impl Into<String>, settings: &crate::config::NetworkSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.as_str())
            .timeout(std::time::Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    /// Builds a remover from the configured endpoint, if any.
    pub fn from_settings(settings: &crate::config::NetworkSettings) -> Result<Option<Self>> {
        settings
            .background_removal_url
            .as_deref()
            .map(|url| Self::new(url, settings))
            .transpose()
    }
}

#[cfg(feature = "native")]
#[async_trait]
impl BackgroundRemover for HttpBackgroundRemover {
    async fn remove_background(&self, image_data_url: &str) -> Result<String> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&RemovalPayload {
                image: image_data_url,
            })
            .send()
            .await?;

        let status = response.status();
        let body: RemovalResponse = response.json().await.map_err(|e| {
            MockupError::BackgroundRemoval(format!("unreadable response (HTTP {status}): {e}"))
        })?;
        body.into_result()
    }
}

/// Runs a removal request against the collaborator.
///
/// Non-data sources are loaded and inlined first, since the service only
/// accepts data URLs.
pub async fn process(
    request: &RemovalRequest,
    remover: &dyn BackgroundRemover,
    fetcher: &dyn ImageFetcher,
) -> Result<String> {
    let data_url = match ImageLocation::classify(&request.source_url) {
        ImageLocation::Data(url) => url.to_string(),
        _ => assets::to_data_url(&assets::load_bytes(&request.source_url, fetcher).await?),
    };
    remover.remove_background(&data_url).await
}

// ============================================================================
// Tests
// ============================================================================
