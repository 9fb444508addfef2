use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use ny_core::{Error, ObjectStorage, Result};
use tokio::sync::RwLock;
use url::Url;

#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[derive(Default)]
struct MemoryStore {
    objects: HashMap<(String, String), StoredObject>,
    public_containers: HashSet<String>,
    policy_calls: usize,
    uploads: usize,
}

/// Keeps objects in process memory. Used for dry runs and tests.
#[derive(Default)]
pub struct MemoryStorage {
    store: RwLock<MemoryStore>,
    fail_uploads: bool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage whose uploads always fail, for exercising error paths.
    pub fn failing() -> Self {
        Self {
            fail_uploads: true,
            ..Self::default()
        }
    }

    pub async fn get(&self, container: &str, key: &str) -> Option<StoredObject> {
        let store = self.store.read().await;
        store
            .objects
            .get(&(container.to_string(), key.to_string()))
            .cloned()
    }

    pub async fn keys(&self, container: &str) -> Vec<String> {
        let store = self.store.read().await;
        let mut keys: Vec<String> = store
            .objects
            .keys()
            .filter(|(c, _)| c == container)
            .map(|(_, k)| k.clone())
            .collect();
        keys.sort();
        keys
    }

    pub async fn is_public(&self, container: &str) -> bool {
        self.store.read().await.public_containers.contains(container)
    }

    pub async fn policy_calls(&self) -> usize {
        self.store.read().await.policy_calls
    }

    pub async fn upload_count(&self) -> usize {
        self.store.read().await.uploads
    }
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    fn name(&self) -> &str {
        "memory"
    }

    async fn set_public_read_policy(&self, container: &str) -> Result<()> {
        let mut store = self.store.write().await;
        store.policy_calls += 1;
        store.public_containers.insert(container.to_string());
        Ok(())
    }

    async fn upload(&self, container: &str, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        if self.fail_uploads {
            return Err(Error::Transport("memory storage is configured to fail".to_string()));
        }
        let mut store = self.store.write().await;
        store.uploads += 1;
        store.objects.insert(
            (container.to_string(), key.to_string()),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    fn public_url(&self, container: &str, key: &str) -> Result<Url> {
        let mut url = Url::parse("memory://objects/").map_err(|e| Error::Config(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| Error::Config("memory url cannot have path segments".to_string()))?
            .pop_if_empty()
            .push(container)
            .push(key);
        Ok(url)
    }
}
