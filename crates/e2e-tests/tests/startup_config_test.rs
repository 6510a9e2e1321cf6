//! Startup: backend selection and store initialization.

use std::collections::HashMap;

use pretty_assertions::assert_eq;

use e2e_tests::chroma_settings;
use propilot_types::{AuthMode, ConfigError, Settings, VectorBackend};
use propilot_vector::{connect, VectorStoreHandle};

fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_unknown_backend_is_fatal() {
    for value in ["redis", "Chroma", ""] {
        let result = Settings::load_from(None, &env(&[("VECTOR_DB", value)]));
        match result {
            Err(ConfigError::InvalidBackend(got)) => assert_eq!(got, value),
            other => panic!("expected InvalidBackend for {value:?}, got {other:?}"),
        }
    }
}

#[test]
fn test_environment_selects_backend() {
    let settings = Settings::load_from(None, &env(&[("VECTOR_DB", "pinecone")])).unwrap();
    assert_eq!(settings.vector_db, VectorBackend::Pinecone);

    let settings = Settings::load_from(None, &env(&[])).unwrap();
    assert_eq!(settings.vector_db, VectorBackend::Chroma);
    assert_eq!(settings.auth.mode, AuthMode::Auth0);
}

#[tokio::test]
async fn test_chroma_startup_is_idempotent() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let settings = chroma_settings(&temp_dir);
    let store_dir = temp_dir.path().join("chroma_db");
    assert!(!store_dir.exists());

    let first = connect(&settings).await.unwrap();
    let created_at = match &first {
        VectorStoreHandle::Chroma(store) => {
            store.get_or_create_collection("proposals").unwrap();
            store.created_at().unwrap()
        }
        other => panic!("expected a local store, got {other:?}"),
    };
    first.shutdown().await.unwrap();
    drop(first);
    assert!(store_dir.is_dir());

    let second = connect(&settings).await.unwrap();
    match &second {
        VectorStoreHandle::Chroma(store) => {
            assert_eq!(store.created_at().unwrap(), created_at);
            let names: Vec<String> = store
                .list_collections()
                .unwrap()
                .into_iter()
                .map(|c| c.name)
                .collect();
            assert_eq!(names, vec!["proposals".to_string()]);
        }
        other => panic!("expected a local store, got {other:?}"),
    }
}
