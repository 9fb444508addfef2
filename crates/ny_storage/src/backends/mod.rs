pub mod azure;
pub mod memory;

pub use azure::{AzureBlobStorage, AzureConfig};
pub use memory::MemoryStorage;
