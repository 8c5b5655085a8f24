//! Opaque keys handed out by `Cache::store`.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A cache key: a random 128-bit UUID in hyphenated text form.
///
/// Every call to [`CacheKey::generate`] yields a fresh key. Uniqueness is
/// probabilistic; nothing checks the store for collisions.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Generate a new random key.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().hyphenated().to_string())
    }

    /// Parse a key previously produced by [`CacheKey::generate`].
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        let uuid = Uuid::parse_str(s)?;
        Ok(Self(uuid.hyphenated().to_string()))
    }

    /// The key as text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the key, returning its text.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Debug for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CacheKey({})", self.0)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_key_format() {
        let key = CacheKey::generate();
        assert_eq!(key.as_str().len(), 36);
        assert_eq!(key.as_str().matches('-').count(), 4);
        assert_eq!(CacheKey::parse(key.as_str()).unwrap(), key);
    }

    #[test]
    fn test_keys_are_fresh() {
        let keys: HashSet<CacheKey> = (0..1000).map(|_| CacheKey::generate()).collect();
        assert_eq!(keys.len(), 1000);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(CacheKey::parse("not-a-key").is_err());
    }
}
