use serde::{Deserialize, Serialize};
use std::fmt;

/// Deterministic dataset hash (content hash of the aligned, filled tables)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetHash(pub String);

impl DatasetHash {
    pub fn from_hash(hash: &str) -> Self {
        Self(hash.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DatasetHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dataset_hash_displays_raw_hex() {
        let hash = DatasetHash::from_hash("abc123");
        assert_eq!(hash.to_string(), "abc123");
        assert_eq!(hash.as_str(), "abc123");
    }
}
