//! Backend selection.
//!
//! The gateway talks to exactly one vector database per process. The set of
//! backends is closed; anything else in `VECTOR_DB` is a startup failure.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Supported vector database backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum VectorBackend {
    /// Managed remote index (Pinecone control plane + data plane host)
    Pinecone,
    /// Embedded persistent store on local disk
    #[default]
    Chroma,
}

impl VectorBackend {
    /// Configuration name of the backend.
    pub fn as_str(&self) -> &'static str {
        match self {
            VectorBackend::Pinecone => "pinecone",
            VectorBackend::Chroma => "chroma",
        }
    }
}

impl fmt::Display for VectorBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VectorBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pinecone" => Ok(VectorBackend::Pinecone),
            "chroma" => Ok(VectorBackend::Chroma),
            other => Err(ConfigError::InvalidBackend(other.to_string())),
        }
    }
}

impl TryFrom<String> for VectorBackend {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<VectorBackend> for String {
    fn from(backend: VectorBackend) -> Self {
        backend.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_backends() {
        assert_eq!(
            "pinecone".parse::<VectorBackend>().unwrap(),
            VectorBackend::Pinecone
        );
        assert_eq!(
            "chroma".parse::<VectorBackend>().unwrap(),
            VectorBackend::Chroma
        );
    }

    #[test]
    fn test_parse_rejects_unknown_values() {
        for value in ["", "Chroma", "PINECONE", "qdrant", " chroma", "chroma "] {
            match value.parse::<VectorBackend>() {
                Err(ConfigError::InvalidBackend(got)) => assert_eq!(got, value),
                other => panic!("expected InvalidBackend for {value:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_default_is_chroma() {
        assert_eq!(VectorBackend::default(), VectorBackend::Chroma);
    }

    #[test]
    fn test_serde_uses_config_names() {
        let json = serde_json::to_string(&VectorBackend::Pinecone).unwrap();
        assert_eq!(json, "\"pinecone\"");

        let err = serde_json::from_str::<VectorBackend>("\"milvus\"").unwrap_err();
        assert!(err.to_string().contains("Must be 'pinecone' or 'chroma'"));
    }
}
