//! Which messages appear in an exported document

use super::content::Content;
use super::model::Message;
use crate::types::Role;

/// Whether a message is rendered at all
///
/// Messages without content, messages routed somewhere other than the
/// primary recipient, hidden messages and intermediate tool output are
/// dropped. Tool messages survive only when they carry images: multimodal
/// content, or execution output with at least one image result.
pub fn is_message_visible(message: &Message) -> bool {
    let Some(content) = &message.content else {
        return false;
    };
    if !message.is_for_primary_recipient() {
        return false;
    }
    if message.metadata.is_visually_hidden_from_conversation {
        return false;
    }
    match message.role() {
        Role::Tool => is_image_bearing(message, content),
        Role::System => message.metadata.is_user_system_message,
        _ => true,
    }
}

fn is_image_bearing(message: &Message, content: &Content) -> bool {
    match content {
        Content::MultimodalText(_) => true,
        Content::ExecutionOutput(_) => message.metadata.image_results().next().is_some(),
        _ => false,
    }
}
