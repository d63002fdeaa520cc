//! Conversation model
//!
//! Normalized representation of an exported conversation: an ordered node
//! sequence where each node may hold one message. The backend's tree format
//! is linearized by [`RawConversation::into_conversation`].

mod api;
mod content;
mod filter;
mod model;

pub use api::{
    conversation_from_value, parse_conversation, parse_conversations, ParseFailure,
    ParsedConversation, RawConversation, RawNode,
};
pub use content::{
    AudioTranscription, BrowsingDisplay, CodeContent, Content, ExecutionOutput, ImagePointer,
    MediaPart, MultimodalContent, Part, TetherQuote, TextContent,
};
pub use filter::is_message_visible;
pub use model::{
    AggregateMessage, AggregateResult, Citation, CitationExtra, CitationMetadata, CiteEntry,
    CiteMetadata, Conversation, Message, MessageMetadata, Node, PRIMARY_RECIPIENT,
};
