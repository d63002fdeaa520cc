//! Standalone HTML page exporter

use super::exporter::{DocumentExporter, DocumentFormat, ExportContext};
use super::template::{fill_page, TemplateValues};
use crate::conversation::{is_message_visible, Message};
use crate::error::Result;
use crate::image::image_offsets;
use crate::render::{escape_html, ContentRenderer, HtmlSyntax, TextPipeline};
use crate::types::Role;

const PAGE_TEMPLATE: &str = include_str!("template.html");

/// HTML exporter
pub struct HtmlExporter {
    renderer: ContentRenderer<HtmlSyntax>,
}

impl HtmlExporter {
    pub fn new() -> Self {
        Self {
            renderer: ContentRenderer::new(HtmlSyntax),
        }
    }

    /// Collapsible key/value table of the configured metadata fields
    fn render_metadata(&self, ctx: &ExportContext<'_>) -> String {
        let metadata = &ctx.settings.metadata;
        if !metadata.enabled || metadata.fields.is_empty() {
            return String::new();
        }

        let values = TemplateValues::for_conversation(
            ctx.conversation,
            &ctx.settings.timestamp,
            ctx.exported_at,
        );
        let rows: Vec<String> = metadata
            .fields
            .iter()
            .map(|field| {
                format!(
                    "<tr><th>{}</th><td>{}</td></tr>",
                    escape_html(&field.name),
                    escape_html(&values.apply(&field.value))
                )
            })
            .collect();

        format!(
            "<details class=\"metadata\">\n<summary>Metadata</summary>\n<table>\n{}\n</table>\n</details>",
            rows.join("\n")
        )
    }

    fn render_message(
        &self,
        ctx: &ExportContext<'_>,
        message: &Message,
        image_start: usize,
    ) -> Result<Option<String>> {
        let Some(content) = &message.content else {
            return Ok(None);
        };

        let pipeline = TextPipeline::for_author(message.role(), DocumentFormat::Html);
        let fragment = self.renderer.render(
            content,
            &message.metadata,
            &pipeline,
            ctx.images,
            image_start,
        )?;

        let label = message.author.display_label();
        let avatar = label.chars().next().map(String::from).unwrap_or_default();

        let timestamps = &ctx.settings.timestamp;
        let time = match message.created_at() {
            Some(time) if timestamps.enabled && timestamps.html => format!(
                "\n        <time datetime=\"{}\">{}</time>",
                time.to_rfc3339(),
                time.format(timestamps.pattern())
            ),
            _ => String::new(),
        };

        Ok(Some(format!(
            "<div class=\"conversation-item\">\n    \
             <div class=\"author {}\">{}</div>\n    \
             <div class=\"conversation-content-wrapper\">\n        \
             <div class=\"author-name\">{}</div>\n        \
             <div class=\"conversation-content\">{}</div>{}\n    \
             </div>\n\
             </div>",
            role_class(message.role()),
            escape_html(&avatar),
            escape_html(&label),
            fragment.body,
            time
        )))
    }
}

impl Default for HtmlExporter {
    fn default() -> Self {
        Self::new()
    }
}

fn role_class(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "assistant",
        _ => "tool",
    }
}

impl DocumentExporter for HtmlExporter {
    fn render(&self, ctx: &ExportContext<'_>) -> Result<String> {
        let mut items = Vec::new();
        for (message, start) in image_offsets(ctx.conversation) {
            if !is_message_visible(message) {
                continue;
            }
            if let Some(item) = self.render_message(ctx, message, start)? {
                items.push(item);
            }
        }

        let title = escape_html(&ctx.conversation.title);
        let lang = escape_html(&ctx.settings.html.lang);
        let metadata = self.render_metadata(ctx);
        let conversations = items.join("\n");

        fill_page(
            PAGE_TEMPLATE,
            &[
                ("title", title.as_str()),
                ("lang", lang.as_str()),
                ("theme", ctx.settings.html.theme.as_str()),
                ("metadata", metadata.as_str()),
                ("conversations", conversations.as_str()),
            ],
        )
    }

    fn format_name(&self) -> &str {
        "html"
    }

    fn file_extension(&self) -> &str {
        "html"
    }

    fn document_format(&self) -> DocumentFormat {
        DocumentFormat::Html
    }
}
