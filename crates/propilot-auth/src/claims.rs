//! Identity payload derived from a bearer token.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Claim name to claim value. Serialized as a plain JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Claims(pub Map<String, Value>);

impl Claims {
    /// Claims carrying only a subject.
    pub fn with_subject(sub: impl Into<String>) -> Self {
        let mut map = Map::new();
        map.insert("sub".to_string(), Value::String(sub.into()));
        Self(map)
    }

    /// The `sub` claim, if present and a string.
    pub fn subject(&self) -> Option<&str> {
        self.0.get("sub").and_then(Value::as_str)
    }
}
