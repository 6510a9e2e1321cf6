//! Local persistent vector store backed by RocksDB.
//!
//! The store lives in a single directory (default `./chroma_db`). Opening
//! is idempotent: an existing directory is reused as-is, a missing one is
//! created along with its column families.

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use rocksdb::{ColumnFamilyDescriptor, IteratorMode, Options, DB};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use propilot_types::VectorBackend;

use crate::error::VectorError;
use crate::store::{VectorStoreHandle, VectorStoreProvider};

/// Column family holding collection records keyed by name
pub const CF_COLLECTIONS: &str = "collections";

/// Column family reserved for embedding rows
pub const CF_EMBEDDINGS: &str = "embeddings";

/// All column family names
pub const ALL_CF_NAMES: &[&str] = &[CF_COLLECTIONS, CF_EMBEDDINGS];

/// Written once, on first open
const META_CREATED_AT: &[u8] = b"meta:created_at";

fn embeddings_options() -> Options {
    let mut opts = Options::default();
    opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
    opts
}

fn build_cf_descriptors() -> Vec<ColumnFamilyDescriptor> {
    vec![
        ColumnFamilyDescriptor::new(CF_COLLECTIONS, Options::default()),
        ColumnFamilyDescriptor::new(CF_EMBEDDINGS, embeddings_options()),
    ]
}

/// A named collection inside the local store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub name: String,
    pub created_at: String,
}

/// Handle to an opened local store.
pub struct ChromaStore {
    db: DB,
    path: PathBuf,
}

impl fmt::Debug for ChromaStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChromaStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl ChromaStore {
    /// Open the store at `path`, creating the directory and column
    /// families if necessary.
    pub fn open(path: &Path) -> Result<Self, VectorError> {
        info!(path = ?path, "Opening local vector store");
        std::fs::create_dir_all(path)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        let db = DB::open_cf_descriptors(&db_opts, path, build_cf_descriptors())?;

        if db.get(META_CREATED_AT)?.is_none() {
            let now = Utc::now().to_rfc3339();
            db.put(META_CREATED_AT, now.as_bytes())?;
            info!(path = ?path, "Initialized new local vector store");
        } else {
            debug!(path = ?path, "Reusing existing local vector store");
        }

        Ok(Self {
            db,
            path: path.to_path_buf(),
        })
    }

    /// Directory the store lives in.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// When the store was first created (RFC 3339).
    pub fn created_at(&self) -> Result<Option<String>, VectorError> {
        Ok(self
            .db
            .get(META_CREATED_AT)?
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }

    /// Return the named collection, creating it if absent.
    pub fn get_or_create_collection(&self, name: &str) -> Result<Collection, VectorError> {
        let cf = self
            .db
            .cf_handle(CF_COLLECTIONS)
            .ok_or_else(|| VectorError::ColumnFamilyNotFound(CF_COLLECTIONS.to_string()))?;

        if let Some(bytes) = self.db.get_cf(&cf, name.as_bytes())? {
            return Ok(serde_json::from_slice(&bytes)?);
        }

        let collection = Collection {
            name: name.to_string(),
            created_at: Utc::now().to_rfc3339(),
        };
        self.db
            .put_cf(&cf, name.as_bytes(), serde_json::to_vec(&collection)?)?;
        debug!(collection = name, "Created collection");
        Ok(collection)
    }

    /// All collections, ordered by name.
    pub fn list_collections(&self) -> Result<Vec<Collection>, VectorError> {
        let cf = self
            .db
            .cf_handle(CF_COLLECTIONS)
            .ok_or_else(|| VectorError::ColumnFamilyNotFound(CF_COLLECTIONS.to_string()))?;

        let mut collections = Vec::new();
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (_, value) = item?;
            collections.push(serde_json::from_slice(&value)?);
        }
        Ok(collections)
    }

    /// Flush memtables of every column family to disk.
    pub fn flush(&self) -> Result<(), VectorError> {
        self.db.flush()?;
        for name in ALL_CF_NAMES {
            if let Some(cf) = self.db.cf_handle(name) {
                self.db.flush_cf(&cf)?;
            }
        }
        info!(path = ?self.path, "Flushed local vector store");
        Ok(())
    }
}

/// Opens the local store. Never touches the network.
#[derive(Debug, Clone)]
pub struct ChromaProvider {
    path: PathBuf,
}

impl ChromaProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl VectorStoreProvider for ChromaProvider {
    fn backend(&self) -> VectorBackend {
        VectorBackend::Chroma
    }

    async fn ensure_store(&self) -> Result<(), VectorError> {
        tokio::fs::create_dir_all(&self.path).await?;
        Ok(())
    }

    async fn open_handle(&self) -> Result<VectorStoreHandle, VectorError> {
        let path = self.path.clone();
        let store = tokio::task::spawn_blocking(move || ChromaStore::open(&path))
            .await
            .map_err(|e| VectorError::Io(std::io::Error::other(e)))??;
        Ok(VectorStoreHandle::Chroma(store))
    }
}
