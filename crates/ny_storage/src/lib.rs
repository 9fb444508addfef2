use std::sync::Arc;

use ny_core::{Error, ObjectStorage, Result};
use tracing::info;

pub mod backends;
pub mod publisher;

pub use backends::*;
pub use publisher::Publisher;

pub const AVAILABLE_BACKENDS: &[&str] = &["azure", "memory"];

#[derive(Debug, Clone, Default)]
pub struct StorageConfig {
    pub connection_string: Option<String>,
}

pub fn create_storage(name: &str, config: &StorageConfig) -> Result<Arc<dyn ObjectStorage>> {
    let storage: Arc<dyn ObjectStorage> = match name {
        "azure" => {
            let connection_string = config.connection_string.as_deref().ok_or_else(|| {
                Error::Config("AZURE_STORAGE_CONNECTION_STRING is required for azure storage".to_string())
            })?;
            Arc::new(AzureBlobStorage::from_connection_string(connection_string)?)
        }
        "memory" => Arc::new(MemoryStorage::new()),
        other => {
            return Err(Error::Config(format!(
                "Unknown storage backend '{}'. Available backends: {}",
                other,
                AVAILABLE_BACKENDS.join(", ")
            )))
        }
    };
    info!("💾 Using {} storage", storage.name());
    Ok(storage)
}

pub mod prelude {
    pub use super::backends::*;
    pub use super::{create_storage, Publisher, StorageConfig};
}
