//! Markdown document exporter

use super::exporter::{DocumentExporter, DocumentFormat, ExportContext};
use super::template::TemplateValues;
use crate::conversation::{is_message_visible, Message};
use crate::error::Result;
use crate::image::image_offsets;
use crate::render::{ContentRenderer, MarkdownSyntax, TextPipeline};

/// Markdown exporter
pub struct MarkdownExporter {
    renderer: ContentRenderer<MarkdownSyntax>,
}

impl MarkdownExporter {
    pub fn new() -> Self {
        Self {
            renderer: ContentRenderer::new(MarkdownSyntax),
        }
    }

    /// Render the `---` front matter block
    fn render_front_matter(&self, ctx: &ExportContext<'_>) -> Option<String> {
        let metadata = &ctx.settings.metadata;
        if !metadata.enabled || metadata.fields.is_empty() {
            return None;
        }

        let values = TemplateValues::for_conversation(
            ctx.conversation,
            &ctx.settings.timestamp,
            ctx.exported_at,
        );
        let mut block = String::from("---\n");
        for field in &metadata.fields {
            block.push_str(&format!("{}: {}\n", field.name, values.apply(&field.value)));
        }
        block.push_str("---");
        Some(block)
    }

    /// Render one visible message with its heading and footnotes
    fn render_message(
        &self,
        ctx: &ExportContext<'_>,
        message: &Message,
        image_start: usize,
    ) -> Result<Option<String>> {
        let Some(content) = &message.content else {
            return Ok(None);
        };

        let pipeline = TextPipeline::for_author(message.role(), DocumentFormat::Markdown);
        let fragment = self.renderer.render(
            content,
            &message.metadata,
            &pipeline,
            ctx.images,
            image_start,
        )?;

        let mut block = format!("#### {}:", message.author.display_label());
        let timestamps = &ctx.settings.timestamp;
        if timestamps.enabled && timestamps.markdown {
            if let Some(time) = message.created_at() {
                let shown = time.format(timestamps.pattern()).to_string();
                block.push_str(&format!(
                    "\n<time datetime=\"{}\" title=\"{}\">{}</time>",
                    time.to_rfc3339(),
                    shown,
                    shown
                ));
            }
        }
        block.push_str("\n\n");
        block.push_str(&fragment.body);

        if !fragment.footnotes.is_empty() {
            block.push_str("\n\n");
            let definitions: Vec<String> =
                fragment.footnotes.iter().map(|f| f.to_markdown()).collect();
            block.push_str(&definitions.join("\n"));
        }

        Ok(Some(block))
    }
}

impl Default for MarkdownExporter {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentExporter for MarkdownExporter {
    fn render(&self, ctx: &ExportContext<'_>) -> Result<String> {
        let mut sections = Vec::new();

        if let Some(front_matter) = self.render_front_matter(ctx) {
            sections.push(front_matter);
        }
        sections.push(format!("# {}", ctx.conversation.title));

        for (message, start) in image_offsets(ctx.conversation) {
            if !is_message_visible(message) {
                continue;
            }
            if let Some(block) = self.render_message(ctx, message, start)? {
                sections.push(block);
            }
        }

        let mut output = sections.join("\n\n");
        output.push('\n');
        Ok(output)
    }

    fn format_name(&self) -> &str {
        "markdown"
    }

    fn file_extension(&self) -> &str {
        "md"
    }

    fn document_format(&self) -> DocumentFormat {
        DocumentFormat::Markdown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MetadataField, Settings};
    use crate::conversation::{Citation, Content, Conversation};
    use crate::image::{ImageMetadata, ProcessedImage, ProcessedKind};
    use crate::test_support::ConversationBuilder;
    use crate::types::{Author, ImageId, Role};
    use chrono::{DateTime, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()
    }

    fn render(conversation: &Conversation, images: &[ProcessedImage], settings: &Settings) -> String {
        let ctx = ExportContext {
            conversation,
            images,
            settings,
            exported_at: at(),
        };
        MarkdownExporter::new().render(&ctx).unwrap()
    }

    fn marker(text: &str) -> ProcessedImage {
        ProcessedImage {
            id: ImageId("img_0".to_string()),
            content: text.to_string(),
            kind: ProcessedKind::Marker,
            original_data: None,
            metadata: ImageMetadata::default(),
            file_name: None,
        }
    }

    #[test]
    fn test_basic_document() {
        let conversation = ConversationBuilder::new("c")
            .title("Greetings")
            .user_text("Hello")
            .assistant_text("Hi **there**")
            .build();
        let output = render(&conversation, &[], &Settings::default());
        assert_eq!(
            output,
            "# Greetings\n\n#### You:\n\nHello\n\n#### ChatGPT:\n\nHi **there**\n"
        );
    }

    #[test]
    fn test_front_matter() {
        let conversation = ConversationBuilder::new("abc")
            .title("Notes")
            .model("gpt-4")
            .user_text("x")
            .build();
        let mut settings = Settings::default();
        settings.metadata.enabled = true;
        settings
            .metadata
            .fields
            .push(MetadataField::new("model", "{model_name}"));

        let output = render(&conversation, &[], &settings);
        assert!(output.starts_with(
            "---\ntitle: Notes\ndate: 2024-01-02\nsource: https://chatgpt.com/c/abc\nmodel: GPT-4\n---\n\n# Notes\n"
        ));
    }

    #[test]
    fn test_hidden_messages_keep_image_numbering() {
        let conversation = ConversationBuilder::new("c")
            .user_images(&["file-service://u1"])
            .tool_code("python", "print(1)")
            .tool_images("dalle", &["file-service://d1"])
            .build();
        let images = vec![marker("[first]"), marker("[second]")];
        let output = render(&conversation, &images, &Settings::default());

        assert!(!output.contains("print(1)"));
        assert!(output.contains("#### You:\n\n[first]"));
        assert!(output.contains("#### Plugin (dalle):\n\n[second]"));
    }

    #[test]
    fn test_footnotes_follow_message_body() {
        let mut message = Message::new(
            "m1",
            Author::new(Role::Assistant),
            Content::text("Evidence 【3†(SourceName)】"),
        );
        message.metadata.citations.push(Citation::new(3, "SourceName"));
        let conversation = ConversationBuilder::new("c").message(message).build();

        let output = render(&conversation, &[], &Settings::default());
        assert!(output.contains("#### ChatGPT:\n\nEvidence [^3]\n\n[^3]: SourceName\n"));
    }

    #[test]
    fn test_timestamps() {
        let conversation = ConversationBuilder::new("c").user_text("hi").build();
        let mut settings = Settings::default();
        settings.timestamp.enabled = true;

        let output = render(&conversation, &[], &settings);
        assert!(output.contains(
            "#### You:\n<time datetime=\"2023-11-14T22:13:20+00:00\" title=\"2023-11-14 22:13:20\">2023-11-14 22:13:20</time>\n\nhi"
        ));

        settings.timestamp.markdown = false;
        assert!(!render(&conversation, &[], &settings).contains("<time"));
    }
}
