//! Builders and fakes shared by unit tests

use crate::conversation::{
    AggregateMessage, AggregateResult, CodeContent, Content, Conversation, ExecutionOutput,
    Message, MultimodalContent, Node, Part,
};
use crate::error::FetchError;
use crate::image::{infer_mime, ContentOrigin, FetchedImage, ImageContext, ImageFetcher};
use crate::types::{Author, Role};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Builds linear conversations one message at a time
pub struct ConversationBuilder {
    conversation: Conversation,
}

impl ConversationBuilder {
    pub fn new(id: &str) -> Self {
        let mut conversation = Conversation::new(id, "Test Conversation");
        conversation.create_time = Some(1_700_000_000.0);
        conversation.update_time = Some(1_700_000_600.0);
        Self { conversation }
    }

    pub fn title(mut self, title: &str) -> Self {
        self.conversation.title = title.to_string();
        self
    }

    pub fn model(mut self, slug: &str) -> Self {
        self.conversation.model_slug = Some(slug.to_string());
        self
    }

    pub fn message(mut self, mut message: Message) -> Self {
        let n = self.conversation.nodes.len();
        if message.id.is_empty() {
            message.id = format!("msg-{}", n);
        }
        if message.create_time.is_none() {
            message.create_time = Some(1_700_000_000.0 + n as f64);
        }
        self.conversation
            .nodes
            .push(Node::new(format!("node-{}", n), Some(message)));
        self
    }

    pub fn empty_node(mut self) -> Self {
        let n = self.conversation.nodes.len();
        self.conversation
            .nodes
            .push(Node::new(format!("node-{}", n), None));
        self
    }

    pub fn user_text(self, text: &str) -> Self {
        self.message(Message::new("", Author::new(Role::User), Content::text(text)))
    }

    pub fn assistant_text(self, text: &str) -> Self {
        self.message(Message::new(
            "",
            Author::new(Role::Assistant),
            Content::text(text),
        ))
    }

    pub fn assistant_code(self, language: &str, code: &str) -> Self {
        self.message(Message::new(
            "",
            Author::new(Role::Assistant),
            Content::Code(CodeContent {
                language: Some(language.to_string()),
                text: code.to_string(),
            }),
        ))
    }

    pub fn tool_code(self, name: &str, code: &str) -> Self {
        self.message(Message::new(
            "",
            Author::named(Role::Tool, name),
            Content::Code(CodeContent {
                language: None,
                text: code.to_string(),
            }),
        ))
    }

    pub fn tool_execution(self, name: &str, output: &str, image_urls: &[&str]) -> Self {
        let mut message = Message::new(
            "",
            Author::named(Role::Tool, name),
            Content::ExecutionOutput(ExecutionOutput {
                text: output.to_string(),
            }),
        );
        if !image_urls.is_empty() {
            message.metadata.aggregate_result = Some(AggregateResult {
                messages: image_urls
                    .iter()
                    .map(|url| AggregateMessage::image(*url))
                    .collect(),
                ..AggregateResult::default()
            });
        }
        self.message(message)
    }

    pub fn user_images(self, pointers: &[&str]) -> Self {
        self.message(Message::new(
            "",
            Author::new(Role::User),
            multimodal(pointers),
        ))
    }

    pub fn tool_images(self, name: &str, pointers: &[&str]) -> Self {
        self.message(Message::new(
            "",
            Author::named(Role::Tool, name),
            multimodal(pointers),
        ))
    }

    pub fn build(self) -> Conversation {
        self.conversation
    }
}

fn multimodal(pointers: &[&str]) -> Content {
    Content::MultimodalText(MultimodalContent {
        parts: pointers.iter().map(|p| Part::image(*p)).collect(),
    })
}

/// Context for a single image owned by a message of `role`
pub fn image_context(role: Role, global_index: usize, locator: &str) -> ImageContext {
    ImageContext {
        conversation_id: "conv".to_string(),
        message_id: format!("msg-{}", global_index),
        image_index: 0,
        global_index,
        mime_type: infer_mime(locator),
        locator: locator.to_string(),
        origin: ContentOrigin::ImageUrl,
        author: Some(Author::new(role)),
        timestamp: Some(1_700_000_000.0),
    }
}

/// In-memory fetcher; unknown locators fail with `Unresolvable`
#[derive(Default)]
pub struct MapFetcher {
    images: HashMap<String, FetchedImage>,
    delays: HashMap<String, u64>,
    calls: AtomicUsize,
}

impl MapFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, locator: &str, bytes: &[u8], mime: Option<&str>) -> Self {
        self.images.insert(
            locator.to_string(),
            FetchedImage {
                bytes: bytes.to_vec(),
                mime_type: mime.map(str::to_string),
            },
        );
        self
    }

    /// Delay the answer for each locator by the given milliseconds
    pub fn with_delays(mut self, delays: &[(&str, u64)]) -> Self {
        for (locator, millis) in delays {
            self.delays.insert(locator.to_string(), *millis);
        }
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageFetcher for MapFetcher {
    async fn fetch(&self, locator: &str) -> Result<FetchedImage, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(millis) = self.delays.get(locator) {
            tokio::time::sleep(Duration::from_millis(*millis)).await;
        }
        self.images
            .get(locator)
            .cloned()
            .ok_or_else(|| FetchError::Unresolvable(locator.to_string()))
    }
}
