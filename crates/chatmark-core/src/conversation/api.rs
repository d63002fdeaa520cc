//! Linearizing the backend's tree-shaped conversation format

use super::model::{Conversation, Message, Node};
use crate::error::{ChatmarkError, Result};
use crate::types::Role;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Conversation as returned by the backend: nodes keyed by id
#[derive(Debug, Clone, Deserialize)]
pub struct RawConversation {
    #[serde(default, alias = "conversation_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub create_time: Option<f64>,
    #[serde(default)]
    pub update_time: Option<f64>,
    #[serde(default)]
    pub mapping: HashMap<String, RawNode>,
    #[serde(default)]
    pub current_node: Option<String>,
    #[serde(default)]
    pub default_model_slug: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawNode {
    pub id: String,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub children: Vec<String>,
}

impl RawConversation {
    /// Walk from the current node up to the root and return the branch in order
    pub fn into_conversation(mut self) -> Result<Conversation> {
        if self.mapping.is_empty() {
            return Err(ChatmarkError::InvalidConversation(
                "conversation has no nodes".to_string(),
            ));
        }

        let start = match self.current_node.take() {
            Some(id) if self.mapping.contains_key(&id) => id,
            Some(id) => {
                warn!("current_node {} not found in mapping, using latest leaf", id);
                self.latest_leaf()?
            }
            None => self.latest_leaf()?,
        };

        let mut branch = Vec::new();
        let mut seen = HashSet::new();
        let mut cursor = Some(start);
        while let Some(id) = cursor {
            if !seen.insert(id.clone()) {
                warn!("cycle detected at node {}", id);
                break;
            }
            let Some(node) = self.mapping.remove(&id) else {
                warn!("dangling parent reference {}", id);
                break;
            };
            cursor = node.parent.clone();
            branch.push(node);
        }
        branch.reverse();

        let model_slug = branch
            .iter()
            .rev()
            .filter_map(|node| node.message.as_ref())
            .filter(|message| message.role() == Role::Assistant)
            .find_map(|message| message.metadata.model_slug.clone())
            .or(self.default_model_slug);

        let id = self.id.unwrap_or_default();
        debug!("Linearized conversation {} into {} nodes", id, branch.len());

        Ok(Conversation {
            id,
            title: self.title.unwrap_or_default(),
            model_slug,
            create_time: self.create_time,
            update_time: self.update_time,
            nodes: branch
                .into_iter()
                .map(|raw| Node {
                    id: raw.id,
                    message: raw.message,
                    parent: raw.parent,
                    children: raw.children,
                })
                .collect(),
        })
    }

    fn latest_leaf(&self) -> Result<String> {
        self.mapping
            .values()
            .filter(|node| node.children.is_empty())
            .max_by(|a, b| {
                let ta = a.message.as_ref().and_then(|m| m.create_time).unwrap_or(0.0);
                let tb = b.message.as_ref().and_then(|m| m.create_time).unwrap_or(0.0);
                ta.total_cmp(&tb).then_with(|| b.id.cmp(&a.id))
            })
            .map(|node| node.id.clone())
            .ok_or_else(|| ChatmarkError::InvalidConversation("conversation has no leaf node".to_string()))
    }
}

/// Parse either the backend format or an already-linearized conversation
pub fn parse_conversation(json: &str) -> Result<Conversation> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    conversation_from_value(value)
}

/// Same as [`parse_conversation`] for an already parsed JSON value
pub fn conversation_from_value(value: serde_json::Value) -> Result<Conversation> {
    if value.get("mapping").is_some() {
        let raw: RawConversation = serde_json::from_value(value)?;
        raw.into_conversation()
    } else if value.get("nodes").is_some() {
        Ok(serde_json::from_value(value)?)
    } else {
        Err(ChatmarkError::InvalidConversation(
            "expected a `mapping` or `nodes` field".to_string(),
        ))
    }
}

/// A dump entry that could not be turned into a conversation
#[derive(Debug)]
pub struct ParseFailure {
    /// Conversation id when the entry carries one, else `#<index>`
    pub label: String,
    /// Title when the entry carries one
    pub title: String,
    pub error: ChatmarkError,
}

impl ParseFailure {
    pub fn new(label: impl Into<String>, title: impl Into<String>, error: ChatmarkError) -> Self {
        Self {
            label: label.into(),
            title: title.into(),
            error,
        }
    }
}

fn entry_names(index: usize, value: &serde_json::Value) -> (String, String) {
    let field = |name: &str| value.get(name).and_then(|v| v.as_str()).map(str::to_string);
    let label = field("id")
        .or_else(|| field("conversation_id"))
        .unwrap_or_else(|| format!("#{}", index));
    (label, field("title").unwrap_or_default())
}

/// Result of parsing one entry of a dump
pub type ParsedConversation = std::result::Result<Conversation, ParseFailure>;

/// Parse a file holding one conversation or an array of them
///
/// Only unreadable JSON fails the whole call. Each entry of an array is
/// parsed on its own and a bad entry becomes a [`ParseFailure`] in place.
pub fn parse_conversations(json: &str) -> Result<Vec<ParsedConversation>> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    let items = match value {
        serde_json::Value::Array(items) => items,
        other => vec![other],
    };

    Ok(items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let (label, title) = entry_names(index, &item);
            conversation_from_value(item).map_err(|error| ParseFailure::new(label, title, error))
        })
        .collect())
}
