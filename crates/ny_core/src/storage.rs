use async_trait::async_trait;
use url::Url;

use crate::Result;

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    fn name(&self) -> &str;

    /// Make blobs in `container` publicly readable. Must be safe to call repeatedly.
    async fn set_public_read_policy(&self, container: &str) -> Result<()>;

    /// Store a whole object, replacing any previous one under `key`.
    async fn upload(&self, container: &str, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()>;

    /// Public address of an uploaded object.
    fn public_url(&self, container: &str, key: &str) -> Result<Url>;
}
