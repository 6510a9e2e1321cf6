//! # propilot-vector
//!
//! Vector store backends for the ProPilot gateway.
//!
//! Exactly one backend is opened per process:
//! - `pinecone`: managed remote index, created on first start if absent
//! - `chroma`: embedded RocksDB store in a local directory
//!
//! Both sit behind [`VectorStoreProvider`] and produce a
//! [`VectorStoreHandle`] via [`connect`].

pub mod chroma;
pub mod error;
pub mod pinecone;
pub mod retry;
pub mod store;

pub use chroma::{ChromaProvider, ChromaStore, Collection};
pub use error::VectorError;
pub use pinecone::{IndexDescription, PineconeIndex, PineconeProvider};
pub use retry::{with_retry, RetryPolicy};
pub use store::{connect, provider_for, VectorStoreHandle, VectorStoreProvider};
