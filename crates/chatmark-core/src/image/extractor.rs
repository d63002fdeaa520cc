//! Image discovery in conversation order
//!
//! Extraction and rendering must agree on one counting rule, so both go
//! through [`message_image_locators`]: for `execution_output` every image
//! entry of the aggregated results in list order, for `multimodal_text` every
//! `image_asset_pointer` part in part order, nothing for other content.

use super::context::{ContentOrigin, ExtractedImage, ImageContext};
use super::naming::infer_mime;
use crate::conversation::{Content, Conversation, Message};

/// Locators of the images carried by one message, in discovery order
pub fn message_image_locators(message: &Message) -> Vec<(&str, ContentOrigin)> {
    match &message.content {
        Some(Content::ExecutionOutput(_)) => message
            .metadata
            .image_results()
            .map(|result| {
                (
                    result.image_url.as_deref().unwrap_or_default(),
                    ContentOrigin::ImageUrl,
                )
            })
            .collect(),
        Some(Content::MultimodalText(content)) => content
            .parts
            .iter()
            .filter_map(|part| part.as_image())
            .map(|pointer| {
                let origin = if is_direct_url(&pointer.asset_pointer) {
                    ContentOrigin::MultimodalText
                } else {
                    ContentOrigin::ImageAssetPointer
                };
                (pointer.asset_pointer.as_str(), origin)
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Number of images a message contributes to the global order
pub fn message_image_count(message: &Message) -> usize {
    message_image_locators(message).len()
}

/// Global index of the first image of every message, in node order
///
/// Every message is counted, including ones the document later hides, so
/// renderer slices line up with the extraction order.
pub fn image_offsets(conversation: &Conversation) -> Vec<(&Message, usize)> {
    let mut offset = 0;
    conversation
        .messages()
        .map(|message| {
            let start = offset;
            offset += message_image_count(message);
            (message, start)
        })
        .collect()
}

/// Walk the conversation once and list every image occurrence
pub fn extract_images(conversation: &Conversation) -> Vec<ExtractedImage> {
    let mut images = Vec::new();

    for message in conversation.messages() {
        if message.content.is_none() {
            continue;
        }
        for (image_index, (locator, origin)) in
            message_image_locators(message).into_iter().enumerate()
        {
            let context = ImageContext {
                conversation_id: conversation.id.clone(),
                message_id: message.id.clone(),
                image_index,
                global_index: images.len(),
                mime_type: infer_mime(locator),
                locator: locator.to_string(),
                origin,
                author: Some(message.author.clone()),
                timestamp: message.create_time,
            };
            images.push(ExtractedImage {
                locator: locator.to_string(),
                context,
            });
        }
    }

    images
}

fn is_direct_url(locator: &str) -> bool {
    locator.starts_with("http://") || locator.starts_with("https://") || locator.starts_with("data:")
}
