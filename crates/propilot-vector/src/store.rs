//! Vector store capability and the process-wide handle.
//!
//! The handle is built once at startup by [`connect`], shared by `Arc`,
//! and never mutated afterwards. Its backend cannot change for the life
//! of the process.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

use propilot_types::{Settings, VectorBackend};

use crate::chroma::{ChromaProvider, ChromaStore};
use crate::error::VectorError;
use crate::pinecone::{PineconeIndex, PineconeProvider};

/// Capability shared by all backends: create-if-absent, then open.
///
/// Implementations must be thread-safe for concurrent read access.
#[async_trait]
pub trait VectorStoreProvider: Send + Sync {
    /// Backend this provider opens
    fn backend(&self) -> VectorBackend;

    /// Make sure the underlying index or store exists, creating it if absent.
    async fn ensure_store(&self) -> Result<(), VectorError>;

    /// Open the long-lived handle.
    async fn open_handle(&self) -> Result<VectorStoreHandle, VectorError>;
}

/// Live connection to the selected vector store.
#[derive(Debug)]
pub enum VectorStoreHandle {
    Pinecone(PineconeIndex),
    Chroma(ChromaStore),
}

impl VectorStoreHandle {
    pub fn backend(&self) -> VectorBackend {
        match self {
            VectorStoreHandle::Pinecone(_) => VectorBackend::Pinecone,
            VectorStoreHandle::Chroma(_) => VectorBackend::Chroma,
        }
    }

    /// Summary for health reporting. Never includes credentials and never
    /// touches storage or the network.
    pub fn describe(&self) -> Value {
        match self {
            VectorStoreHandle::Pinecone(index) => json!({
                "index": index.name,
                "host": index.host,
                "dimension": index.dimension,
                "metric": index.metric,
            }),
            VectorStoreHandle::Chroma(store) => json!({
                "path": store.path().display().to_string(),
            }),
        }
    }

    /// Release the handle at process shutdown.
    ///
    /// Flushes the local store; the remote index needs no teardown.
    pub async fn shutdown(&self) -> Result<(), VectorError> {
        match self {
            VectorStoreHandle::Pinecone(index) => {
                info!(index = %index.name, "Closing Pinecone handle");
                Ok(())
            }
            VectorStoreHandle::Chroma(store) => store.flush(),
        }
    }
}

/// Build the provider for the configured backend.
pub fn provider_for(settings: &Settings) -> Result<Box<dyn VectorStoreProvider>, VectorError> {
    Ok(match settings.vector_db {
        VectorBackend::Pinecone => Box::new(PineconeProvider::new(&settings.pinecone)?),
        VectorBackend::Chroma => Box::new(ChromaProvider::new(settings.expanded_chroma_path())),
    })
}

/// Resolve the configured backend into a ready handle.
pub async fn connect(settings: &Settings) -> Result<VectorStoreHandle, VectorError> {
    let provider = provider_for(settings)?;
    info!(backend = %provider.backend(), "Connecting vector store");

    provider.ensure_store().await?;
    let handle = provider.open_handle().await?;

    info!(backend = %handle.backend(), "Vector store ready");
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn chroma_settings(dir: &TempDir) -> Settings {
        let mut settings = Settings::default();
        settings.chroma.path = dir.path().join("chroma_db").to_string_lossy().to_string();
        settings
    }

    #[tokio::test]
    async fn test_connect_chroma_creates_store() {
        let temp_dir = TempDir::new().unwrap();
        let settings = chroma_settings(&temp_dir);

        let handle = connect(&settings).await.unwrap();
        assert_eq!(handle.backend(), VectorBackend::Chroma);
        assert!(temp_dir.path().join("chroma_db").exists());

        let desc = handle.describe();
        let expected = temp_dir.path().join("chroma_db").display().to_string();
        assert_eq!(desc, json!({ "path": expected }));
        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_connect_chroma_twice_reuses_store() {
        let temp_dir = TempDir::new().unwrap();
        let settings = chroma_settings(&temp_dir);

        {
            let handle = connect(&settings).await.unwrap();
            if let VectorStoreHandle::Chroma(store) = &handle {
                store.get_or_create_collection("proposals").unwrap();
            }
            handle.shutdown().await.unwrap();
        }

        let handle = connect(&settings).await.unwrap();
        match &handle {
            VectorStoreHandle::Chroma(store) => {
                assert_eq!(store.list_collections().unwrap().len(), 1);
            }
            other => panic!("expected a local store, got {other:?}"),
        }
    }

    #[test]
    fn test_provider_for_matches_backend() {
        let mut settings = Settings::default();
        assert_eq!(
            provider_for(&settings).unwrap().backend(),
            VectorBackend::Chroma
        );

        settings.vector_db = VectorBackend::Pinecone;
        assert_eq!(
            provider_for(&settings).unwrap().backend(),
            VectorBackend::Pinecone
        );
    }
}
