//! Message content variants

use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

/// Plain text content
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextContent {
    #[serde(default)]
    pub parts: Vec<String>,
}

/// Source code written by the assistant
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CodeContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default)]
    pub text: String,
}

/// Textual output of a tool execution
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionOutput {
    #[serde(default)]
    pub text: String,
}

/// Quoted page excerpt from browsing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TetherQuote {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub text: String,
}

/// Browsing result display; links come from message metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BrowsingDisplay {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

/// Mixed text and media parts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MultimodalContent {
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// Reference to an uploaded or generated image
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImagePointer {
    pub asset_pointer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

/// Transcript of a voice message
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioTranscription {
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
}

/// Tagged media part of a multimodal message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "content_type", rename_all = "snake_case")]
pub enum MediaPart {
    ImageAssetPointer(ImagePointer),
    AudioTranscription(AudioTranscription),
    AudioAssetPointer(Map<String, Value>),
    RealTimeUserAudioVideoAssetPointer(Map<String, Value>),
}

/// One part of a multimodal message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    Text(String),
    Media(MediaPart),
    Other(Value),
}

impl Part {
    pub fn image(asset_pointer: impl Into<String>) -> Self {
        Part::Media(MediaPart::ImageAssetPointer(ImagePointer {
            asset_pointer: asset_pointer.into(),
            ..ImagePointer::default()
        }))
    }

    pub fn as_image(&self) -> Option<&ImagePointer> {
        match self {
            Part::Media(MediaPart::ImageAssetPointer(pointer)) => Some(pointer),
            _ => None,
        }
    }
}

/// Content of a message, tagged by `content_type`
///
/// Unknown content types are kept verbatim in [`Content::Unsupported`].
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Text(TextContent),
    Code(CodeContent),
    ExecutionOutput(ExecutionOutput),
    TetherQuote(TetherQuote),
    TetherBrowsingDisplay(BrowsingDisplay),
    MultimodalText(MultimodalContent),
    Unsupported { content_type: String, raw: Value },
}

impl Content {
    pub fn text(text: impl Into<String>) -> Self {
        Content::Text(TextContent {
            parts: vec![text.into()],
        })
    }

    pub fn content_type(&self) -> &str {
        match self {
            Content::Text(_) => "text",
            Content::Code(_) => "code",
            Content::ExecutionOutput(_) => "execution_output",
            Content::TetherQuote(_) => "tether_quote",
            Content::TetherBrowsingDisplay(_) => "tether_browsing_display",
            Content::MultimodalText(_) => "multimodal_text",
            Content::Unsupported { content_type, .. } => content_type,
        }
    }
}

#[derive(Deserialize)]
#[serde(tag = "content_type", rename_all = "snake_case")]
enum Tagged {
    Text(TextContent),
    Code(CodeContent),
    ExecutionOutput(ExecutionOutput),
    TetherQuote(TetherQuote),
    TetherBrowsingDisplay(BrowsingDisplay),
    MultimodalText(MultimodalContent),
}

#[derive(Serialize)]
#[serde(tag = "content_type", rename_all = "snake_case")]
enum TaggedRef<'a> {
    Text(&'a TextContent),
    Code(&'a CodeContent),
    ExecutionOutput(&'a ExecutionOutput),
    TetherQuote(&'a TetherQuote),
    TetherBrowsingDisplay(&'a BrowsingDisplay),
    MultimodalText(&'a MultimodalContent),
}

const KNOWN_TYPES: &[&str] = &[
    "text",
    "code",
    "execution_output",
    "tether_quote",
    "tether_browsing_display",
    "multimodal_text",
];

impl<'de> Deserialize<'de> for Content {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let content_type = value
            .get("content_type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        if !KNOWN_TYPES.contains(&content_type.as_str()) {
            return Ok(Content::Unsupported {
                content_type,
                raw: value,
            });
        }

        let tagged = match Tagged::deserialize(value.clone()) {
            Ok(tagged) => tagged,
            Err(err) => {
                warn!("Malformed {} content kept as unsupported: {}", content_type, err);
                return Ok(Content::Unsupported {
                    content_type,
                    raw: value,
                });
            }
        };
        Ok(match tagged {
            Tagged::Text(c) => Content::Text(c),
            Tagged::Code(c) => Content::Code(c),
            Tagged::ExecutionOutput(c) => Content::ExecutionOutput(c),
            Tagged::TetherQuote(c) => Content::TetherQuote(c),
            Tagged::TetherBrowsingDisplay(c) => Content::TetherBrowsingDisplay(c),
            Tagged::MultimodalText(c) => Content::MultimodalText(c),
        })
    }
}

impl Serialize for Content {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let tagged = match self {
            Content::Text(c) => TaggedRef::Text(c),
            Content::Code(c) => TaggedRef::Code(c),
            Content::ExecutionOutput(c) => TaggedRef::ExecutionOutput(c),
            Content::TetherQuote(c) => TaggedRef::TetherQuote(c),
            Content::TetherBrowsingDisplay(c) => TaggedRef::TetherBrowsingDisplay(c),
            Content::MultimodalText(c) => TaggedRef::MultimodalText(c),
            Content::Unsupported { raw, .. } => return raw.serialize(serializer),
        };
        tagged.serialize(serializer)
    }
}
