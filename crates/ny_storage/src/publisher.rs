use std::sync::Arc;

use ny_core::{Error, ObjectStorage, PublishedImage, Result};
use tracing::info;
use url::Url;

/// Uploads finished images to a publicly readable container.
pub struct Publisher {
    storage: Arc<dyn ObjectStorage>,
    container: String,
}

impl Publisher {
    pub fn new(storage: Arc<dyn ObjectStorage>, container: impl Into<String>) -> Self {
        Self {
            storage,
            container: container.into(),
        }
    }

    /// Make the container public, upload the image and return its address.
    /// Every storage error surfaces as `PublishFailed`.
    pub async fn publish(&self, image: PublishedImage) -> Result<Url> {
        let PublishedImage {
            bytes,
            content_type,
            destination_key,
        } = image;

        self.storage
            .set_public_read_policy(&self.container)
            .await
            .map_err(Error::publish_failed)?;

        let size = bytes.len();
        self.storage
            .upload(&self.container, &destination_key, bytes, &content_type)
            .await
            .map_err(Error::publish_failed)?;

        let url = self
            .storage
            .public_url(&self.container, &destination_key)
            .map_err(Error::publish_failed)?;

        info!("📤 Published {} ({} bytes, {}) to {}", destination_key, size, content_type, url);
        Ok(url)
    }
}
