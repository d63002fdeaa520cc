//! Conversation data models

use super::content::Content;
use crate::types::{Author, Extensions, Role};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Recipient of messages addressed to the human-facing audience
pub const PRIMARY_RECIPIENT: &str = "all";

/// A linearized conversation ready for export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    /// Conversation identifier
    pub id: String,
    /// Conversation title
    #[serde(default)]
    pub title: String,
    /// Model slug of the last assistant turn
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_slug: Option<String>,
    /// Creation time (unix seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<f64>,
    /// Last update time (unix seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<f64>,
    /// Nodes in display order
    #[serde(default)]
    pub nodes: Vec<Node>,
}

impl Conversation {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            model_slug: None,
            create_time: None,
            update_time: None,
            nodes: Vec::new(),
        }
    }

    /// Messages in node order, skipping empty nodes
    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.nodes.iter().filter_map(|node| node.message.as_ref())
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.create_time.and_then(unix_to_datetime)
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.update_time.and_then(unix_to_datetime)
    }

    /// Link back to the conversation on the web
    pub fn source_url(&self) -> String {
        format!("https://chatgpt.com/c/{}", self.id)
    }
}

/// One entry of the conversation sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<String>,
}

impl Node {
    pub fn new(id: impl Into<String>, message: Option<Message>) -> Self {
        Self {
            id: id.into(),
            message,
            parent: None,
            children: Vec::new(),
        }
    }
}

fn default_recipient() -> String {
    PRIMARY_RECIPIENT.to_string()
}

/// A single message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub author: Author,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Content>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<f64>,
    #[serde(default = "default_recipient")]
    pub recipient: String,
    #[serde(default)]
    pub metadata: MessageMetadata,
}

impl Message {
    pub fn new(id: impl Into<String>, author: Author, content: Content) -> Self {
        Self {
            id: id.into(),
            author,
            content: Some(content),
            create_time: None,
            recipient: default_recipient(),
            metadata: MessageMetadata::default(),
        }
    }

    pub fn role(&self) -> Role {
        self.author.role
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.create_time.and_then(unix_to_datetime)
    }

    pub fn is_for_primary_recipient(&self) -> bool {
        self.recipient == PRIMARY_RECIPIENT
    }
}

/// Per-message metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageMetadata {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub citations: Vec<Citation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregate_result: Option<AggregateResult>,
    #[serde(
        rename = "_cite_metadata",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub cite_metadata: Option<CiteMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_slug: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_visually_hidden_from_conversation: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_user_system_message: bool,
    #[serde(flatten)]
    pub extensions: Extensions,
}

impl MessageMetadata {
    /// Aggregated execution results tagged as images
    pub fn image_results(&self) -> impl Iterator<Item = &AggregateMessage> {
        self.aggregate_result
            .iter()
            .flat_map(|result| result.messages.iter())
            .filter(|message| message.is_image())
    }

    /// Citation whose `cited_message_idx` equals `index`
    pub fn citation_for(&self, index: u32) -> Option<&Citation> {
        self.citations
            .iter()
            .find(|citation| citation.cited_index() == Some(index))
    }
}

/// Inline citation attached to an assistant message
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_ix: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_ix: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<CitationMetadata>,
}

impl Citation {
    pub fn new(index: u32, title: impl Into<String>) -> Self {
        Self {
            start_ix: None,
            end_ix: None,
            metadata: Some(CitationMetadata {
                title: Some(title.into()),
                extra: Some(CitationExtra {
                    cited_message_idx: Some(index),
                    evidence_text: None,
                }),
                ..CitationMetadata::default()
            }),
        }
    }

    pub fn cited_index(&self) -> Option<u32> {
        self.metadata
            .as_ref()?
            .extra
            .as_ref()?
            .cited_message_idx
    }

    pub fn title(&self) -> Option<&str> {
        let metadata = self.metadata.as_ref()?;
        metadata
            .title
            .as_deref()
            .filter(|t| !t.is_empty())
            .or(metadata.url.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CitationMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<CitationExtra>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CitationExtra {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cited_message_idx: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence_text: Option<String>,
}

/// Aggregated results of a code execution
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    #[serde(default)]
    pub messages: Vec<AggregateMessage>,
    #[serde(flatten)]
    pub extensions: Extensions,
}

/// One output of a code execution
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateMessage {
    #[serde(default)]
    pub message_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(flatten)]
    pub extensions: Extensions,
}

impl AggregateMessage {
    pub fn image(url: impl Into<String>) -> Self {
        Self {
            message_type: "image".to_string(),
            image_url: Some(url.into()),
            ..Self::default()
        }
    }

    pub fn is_image(&self) -> bool {
        self.message_type == "image"
    }
}

/// Browsing citation list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CiteMetadata {
    #[serde(default)]
    pub metadata_list: Vec<CiteEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CiteEntry {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
}

pub(crate) fn unix_to_datetime(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    let secs = seconds.trunc() as i64;
    let nanos = ((seconds.fract()) * 1_000_000_000.0).round().clamp(0.0, 999_999_999.0) as u32;
    Utc.timestamp_opt(secs, nanos).single()
}
