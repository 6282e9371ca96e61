//! Read identity types
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque read identifier, positionally aligned with one embedding row
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReadId(pub String);

impl ReadId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Identifiers used when no identifier table is available: "0".."n-1"
    pub fn positional(n: usize) -> Vec<ReadId> {
        (0..n).map(|i| ReadId(i.to_string())).collect()
    }
}

impl fmt::Display for ReadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ReadId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for ReadId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positional_ids() {
        let ids = ReadId::positional(3);
        assert_eq!(ids, vec![ReadId::from("0"), ReadId::from("1"), ReadId::from("2")]);
        assert!(ReadId::positional(0).is_empty());
    }

    #[test]
    fn test_display_and_serde() {
        let id = ReadId::new("read_17");
        assert_eq!(id.to_string(), "read_17");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"read_17\"");
    }
}
