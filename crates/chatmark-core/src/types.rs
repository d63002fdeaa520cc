//! Core type definitions for chatmark

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Role of a message author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
    Tool,
    #[serde(other)]
    Unknown,
}

impl Role {
    /// Lowercase name as it appears in conversation data
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
            Role::Tool => "tool",
            Role::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Author of a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Author {
    pub fn new(role: Role) -> Self {
        Self { role, name: None }
    }

    pub fn named(role: Role, name: impl Into<String>) -> Self {
        Self {
            role,
            name: Some(name.into()),
        }
    }

    /// Heading label used by the document renderers
    pub fn display_label(&self) -> String {
        match self.role {
            Role::User => "You".to_string(),
            Role::Assistant => "ChatGPT".to_string(),
            Role::System => "System".to_string(),
            Role::Tool => match &self.name {
                Some(name) => format!("Plugin ({})", name),
                None => "Tool".to_string(),
            },
            Role::Unknown => "Unknown".to_string(),
        }
    }
}

/// Stable identifier for one image occurrence
///
/// Derived from conversation id, message id, per-message index and the
/// message timestamp, so the same occurrence always hashes to the same id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageId(pub String);

impl ImageId {
    pub fn derive(
        conversation_id: &str,
        message_id: &str,
        image_index: usize,
        timestamp: Option<f64>,
    ) -> Self {
        let stamp = timestamp.map(|t| t.to_string()).unwrap_or_default();
        let hash = blake3::hash(
            format!("{}:{}:{}:{}", conversation_id, message_id, image_index, stamp).as_bytes(),
        );
        ImageId(format!("img_{}", &hash.to_hex()[..16]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Manifest format version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatVersion {
    pub major: u32,
    pub minor: u32,
}

impl FormatVersion {
    pub const V1_0: Self = Self { major: 1, minor: 0 };
}

impl fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl Default for FormatVersion {
    fn default() -> Self {
        Self::V1_0
    }
}

/// Unrecognized metadata keys, kept so JSON export round-trips them
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Extensions {
    #[serde(flatten)]
    pub data: HashMap<String, serde_json::Value>,
}

impl Extensions {
    /// Create empty extensions
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if extensions is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get a value by key
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }

    /// Get a typed value by key
    pub fn get_as<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.data
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Set a value by key
    pub fn set<T: Serialize>(&mut self, key: impl Into<String>, value: T) {
        if let Ok(v) = serde_json::to_value(value) {
            self.data.insert(key.into(), v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_id_is_stable() {
        let a = ImageId::derive("conv", "msg", 0, Some(1700000000.5));
        let b = ImageId::derive("conv", "msg", 0, Some(1700000000.5));
        assert_eq!(a, b);
        assert!(a.as_str().starts_with("img_"));
        assert_eq!(a.as_str().len(), 20);
    }

    #[test]
    fn test_image_id_depends_on_index() {
        let a = ImageId::derive("conv", "msg", 0, None);
        let b = ImageId::derive("conv", "msg", 1, None);
        assert_ne!(a, b);
    }

    #[test]
    fn test_role_deserialize_unknown() {
        let role: Role = serde_json::from_str("\"critic\"").unwrap();
        assert_eq!(role, Role::Unknown);
        let role: Role = serde_json::from_str("\"tool\"").unwrap();
        assert_eq!(role, Role::Tool);
    }

    #[test]
    fn test_author_labels() {
        assert_eq!(Author::new(Role::User).display_label(), "You");
        assert_eq!(Author::new(Role::Assistant).display_label(), "ChatGPT");
        assert_eq!(
            Author::named(Role::Tool, "python").display_label(),
            "Plugin (python)"
        );
        assert_eq!(Author::new(Role::Tool).display_label(), "Tool");
    }

    #[test]
    fn test_format_version_display() {
        assert_eq!(FormatVersion::V1_0.to_string(), "1.0");
    }

    #[test]
    fn test_extensions_roundtrip() {
        let mut ext = Extensions::new();
        assert!(ext.is_empty());
        ext.set("finish_details", serde_json::json!({"type": "stop"}));

        let json = serde_json::to_string(&ext).unwrap();
        let ext2: Extensions = serde_json::from_str(&json).unwrap();
        assert_eq!(ext, ext2);
        assert!(ext2.get("finish_details").is_some());
    }
}
