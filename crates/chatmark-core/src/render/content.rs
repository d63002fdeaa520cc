//! Per-content-type rendering shared by Markdown and HTML

use super::reformat::{Footnote, TextPipeline};
use super::syntax::FragmentSyntax;
use crate::conversation::{Content, MediaPart, MessageMetadata, Part};
use crate::error::Result;
use crate::image::ProcessedImage;

/// Rendered body of one message
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fragment {
    pub body: String,
    /// Definitions referenced from `body`, in first-use order
    pub footnotes: Vec<Footnote>,
}

impl Fragment {
    fn absorb(&mut self, footnotes: Vec<Footnote>) {
        for footnote in footnotes {
            if !self.footnotes.iter().any(|f| f.index == footnote.index) {
                self.footnotes.push(footnote);
            }
        }
    }
}

/// Renders message content in one output syntax
pub struct ContentRenderer<S: FragmentSyntax> {
    syntax: S,
}

impl<S: FragmentSyntax> ContentRenderer<S> {
    pub fn new(syntax: S) -> Self {
        Self { syntax }
    }

    /// Render `content`, taking images from `images[start..]`
    ///
    /// `start` is the global index of the message's first image.
    pub fn render(
        &self,
        content: &Content,
        metadata: &MessageMetadata,
        pipeline: &TextPipeline,
        images: &[ProcessedImage],
        start: usize,
    ) -> Result<Fragment> {
        let mut fragment = Fragment::default();

        let body = match content {
            Content::Text(text) => {
                let processed = pipeline.process(&text.parts.join("\n"), metadata)?;
                fragment.absorb(processed.footnotes);
                processed.text
            }
            Content::Code(code) => self
                .syntax
                .code_block(code.language.as_deref().filter(|l| !l.is_empty()), &code.text),
            Content::ExecutionOutput(output) => {
                let mut blocks = Vec::new();
                if !output.text.trim().is_empty() {
                    blocks.push(self.syntax.join(&[
                        self.syntax.literal("Result:"),
                        self.syntax.code_block(None, &output.text),
                    ]));
                }
                for (local, _) in metadata.image_results().enumerate() {
                    blocks.push(self.image_at(images, start + local));
                }
                self.syntax.join(&blocks)
            }
            Content::TetherQuote(quote) => {
                let text = quote
                    .title
                    .as_deref()
                    .filter(|t| !t.is_empty())
                    .unwrap_or(&quote.text);
                self.syntax.quote(text)
            }
            Content::TetherBrowsingDisplay(_) => {
                let links: Vec<(&str, &str)> = metadata
                    .cite_metadata
                    .iter()
                    .flat_map(|cite| cite.metadata_list.iter())
                    .map(|entry| (entry.title.as_str(), entry.url.as_str()))
                    .collect();
                if links.is_empty() {
                    String::new()
                } else {
                    self.syntax.link_list(&links)
                }
            }
            Content::MultimodalText(multimodal) => {
                let mut blocks = Vec::new();
                let mut local = 0;
                for part in &multimodal.parts {
                    let block = match part {
                        Part::Text(text) => {
                            let processed = pipeline.process(text, metadata)?;
                            fragment.absorb(processed.footnotes);
                            processed.text
                        }
                        Part::Media(MediaPart::ImageAssetPointer(_)) => {
                            let block = self.image_at(images, start + local);
                            local += 1;
                            block
                        }
                        Part::Media(MediaPart::AudioTranscription(audio)) => {
                            self.syntax.literal(&format!("[audio] \"{}\"", audio.text))
                        }
                        Part::Media(MediaPart::AudioAssetPointer(_))
                        | Part::Media(MediaPart::RealTimeUserAudioVideoAssetPointer(_)) => {
                            continue
                        }
                        Part::Other(_) => self.syntax.literal("[Unsupported multimodal content]"),
                    };
                    if !block.is_empty() {
                        blocks.push(block);
                    }
                }
                self.syntax.join(&blocks)
            }
            Content::Unsupported { content_type, .. } => self
                .syntax
                .literal(&format!("[Unsupported Content: {}]", content_type)),
        };

        fragment.body = body;
        Ok(fragment)
    }

    fn image_at(&self, images: &[ProcessedImage], index: usize) -> String {
        match images.get(index) {
            Some(image) if !image.content.is_empty() => {
                if image.kind.is_reference() {
                    self.syntax.image(&image.content)
                } else {
                    self.syntax.literal(&image.content)
                }
            }
            _ => self.syntax.literal(&format!("[IMAGE_{}]", index)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{
        AggregateMessage, AggregateResult, AudioTranscription, CiteEntry, CiteMetadata,
        CodeContent, ExecutionOutput, MultimodalContent, TetherQuote,
    };
    use crate::export::DocumentFormat;
    use crate::image::{ImageMetadata, ProcessedKind, FAILURE_MARKER};
    use crate::render::{HtmlSyntax, MarkdownSyntax};
    use crate::types::{ImageId, Role};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn processed(content: &str, kind: ProcessedKind) -> ProcessedImage {
        ProcessedImage {
            id: ImageId(format!("img_{}", content.len())),
            content: content.to_string(),
            kind,
            original_data: None,
            metadata: ImageMetadata::default(),
            file_name: None,
        }
    }

    fn markdown() -> ContentRenderer<MarkdownSyntax> {
        ContentRenderer::new(MarkdownSyntax)
    }

    fn plain() -> TextPipeline {
        TextPipeline::identity()
    }

    fn images_metadata(count: usize) -> MessageMetadata {
        MessageMetadata {
            aggregate_result: Some(AggregateResult {
                messages: (0..count)
                    .map(|i| AggregateMessage::image(format!("https://x.test/{}.png", i)))
                    .collect(),
                ..AggregateResult::default()
            }),
            ..MessageMetadata::default()
        }
    }

    #[test]
    fn test_text_joins_parts() {
        let content = Content::Text(crate::conversation::TextContent {
            parts: vec!["a".to_string(), "b".to_string()],
        });
        let fragment = markdown()
            .render(&content, &MessageMetadata::default(), &plain(), &[], 0)
            .unwrap();
        assert_eq!(fragment.body, "a\nb");
    }

    #[test]
    fn test_code_is_never_post_processed() {
        let content = Content::Code(CodeContent {
            language: Some("python".to_string()),
            text: "x = \\(1\\)".to_string(),
        });
        let pipeline = TextPipeline::for_author(Role::Assistant, DocumentFormat::Markdown);
        let fragment = markdown()
            .render(&content, &MessageMetadata::default(), &pipeline, &[], 0)
            .unwrap();
        assert_eq!(fragment.body, "```python\nx = \\(1\\)\n```");
    }

    #[test]
    fn test_execution_output_uses_global_offset() {
        let images = vec![
            processed("data:image/png;base64,AAA", ProcessedKind::DataUri),
            processed("data:image/png;base64,BBB", ProcessedKind::DataUri),
            processed(FAILURE_MARKER, ProcessedKind::Failed),
            processed("images/tool-python-004.png", ProcessedKind::File),
        ];
        let content = Content::ExecutionOutput(ExecutionOutput {
            text: "done".to_string(),
        });
        let fragment = markdown()
            .render(&content, &images_metadata(3), &plain(), &images, 1)
            .unwrap();
        assert_eq!(
            fragment.body,
            "Result:\n```\ndone\n```\n\
             ![image](data:image/png;base64,BBB)\n\
             [Image Failed to Load]\n\
             ![image](images/tool-python-004.png)"
        );
    }

    #[test]
    fn test_missing_image_placeholder() {
        let content = Content::ExecutionOutput(ExecutionOutput::default());
        let images = vec![processed("", ProcessedKind::Marker)];
        let fragment = markdown()
            .render(&content, &images_metadata(2), &plain(), &images, 0)
            .unwrap();
        assert_eq!(fragment.body, "[IMAGE_0]\n[IMAGE_1]");
    }

    #[test]
    fn test_multimodal_parts() {
        let content = Content::MultimodalText(MultimodalContent {
            parts: vec![
                Part::Text("look".to_string()),
                Part::image("file-service://a"),
                Part::Media(MediaPart::AudioAssetPointer(Default::default())),
                Part::Media(MediaPart::AudioTranscription(AudioTranscription {
                    text: "hello there".to_string(),
                    direction: None,
                })),
                Part::image("file-service://b"),
                Part::Other(json!({"content_type": "mystery"})),
            ],
        });
        let images = vec![
            processed("skip", ProcessedKind::Marker),
            processed("[Image Omitted]", ProcessedKind::Marker),
            processed("images/user-upload-003.png", ProcessedKind::File),
        ];
        let fragment = markdown()
            .render(&content, &MessageMetadata::default(), &plain(), &images, 1)
            .unwrap();
        assert_eq!(
            fragment.body,
            "look\n[Image Omitted]\n[audio] \"hello there\"\n\
             ![image](images/user-upload-003.png)\n[Unsupported multimodal content]"
        );
    }

    #[test]
    fn test_quotes_and_browsing() {
        let quote = Content::TetherQuote(TetherQuote {
            title: Some("Rust Book".to_string()),
            text: "ignored".to_string(),
            ..TetherQuote::default()
        });
        let fragment = markdown()
            .render(&quote, &MessageMetadata::default(), &plain(), &[], 0)
            .unwrap();
        assert_eq!(fragment.body, "> Rust Book");

        let display = Content::TetherBrowsingDisplay(Default::default());
        let empty = markdown()
            .render(&display, &MessageMetadata::default(), &plain(), &[], 0)
            .unwrap();
        assert_eq!(empty.body, "");

        let metadata = MessageMetadata {
            cite_metadata: Some(CiteMetadata {
                metadata_list: vec![CiteEntry {
                    title: "Docs".to_string(),
                    url: "https://d.test".to_string(),
                }],
            }),
            ..MessageMetadata::default()
        };
        let links = markdown()
            .render(&display, &metadata, &plain(), &[], 0)
            .unwrap();
        assert_eq!(links.body, "> [Docs](https://d.test)");
    }

    #[test]
    fn test_unsupported_content_marker() {
        let content = Content::Unsupported {
            content_type: "system_error".to_string(),
            raw: json!({}),
        };
        let fragment = markdown()
            .render(&content, &MessageMetadata::default(), &plain(), &[], 0)
            .unwrap();
        assert_eq!(fragment.body, "[Unsupported Content: system_error]");
    }

    #[test]
    fn test_html_images_and_markers() {
        let renderer = ContentRenderer::new(HtmlSyntax);
        let images = vec![
            processed("images/a.png", ProcessedKind::File),
            processed("[Image <Omitted>]", ProcessedKind::Marker),
        ];
        let content = Content::MultimodalText(MultimodalContent {
            parts: vec![Part::image("a"), Part::image("b"), Part::image("c")],
        });
        let fragment = renderer
            .render(&content, &MessageMetadata::default(), &plain(), &images, 0)
            .unwrap();
        assert_eq!(
            fragment.body,
            "<img src=\"images/a.png\" alt=\"image\" />\n[Image &lt;Omitted&gt;]\n[IMAGE_2]"
        );
    }
}
