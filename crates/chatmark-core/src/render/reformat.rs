//! Math-safe re-serialization of message prose
//!
//! Assistant prose goes through a Markdown parse-and-print round trip
//! (or a Markdown to HTML conversion). The printer escapes characters that
//! matter inside math, so math spans and footnote references are swapped
//! for `╬<n>╬` sentinels before the round trip and put back afterwards.

use crate::conversation::MessageMetadata;
use crate::error::{ChatmarkError, Result};
use crate::export::DocumentFormat;
use crate::types::Role;
use comrak::{format_commonmark, format_html, parse_document, Arena, ComrakOptions};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::syntax::escape_html;

const SENTINEL: char = '╬';

static FOOTNOTE_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"【(\d+)†(?:\((.+?)\)|([^】]+?))】").expect("footnote pattern is valid")
});
static DISPLAY_BRACKETS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\\\[(.+?)\\\]").expect("display math pattern is valid"));
static INLINE_BRACKETS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\\\((.+?)\\\)").expect("inline math pattern is valid"));
// Code spans come first so a `$` inside them never opens a math span.
static PROTECTED_SPAN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?P<code>`+[^`]*`+)|\$\$[\s\S]+?\$\$|\$[^$\n]+?\$|\[\^\d+\]")
        .expect("protected span pattern is valid")
});
static SENTINEL_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"╬(\d+)╬").expect("sentinel pattern is valid"));

/// A collected footnote definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Footnote {
    pub index: u32,
    pub title: String,
}

impl Footnote {
    pub fn to_markdown(&self) -> String {
        format!("[^{}]: {}", self.index, self.title)
    }
}

/// Reformatted prose with the footnotes it references
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reformatted {
    pub text: String,
    pub footnotes: Vec<Footnote>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Identity,
    AssistantMarkdown,
    AssistantHtml,
    PlainHtml,
}

/// Post-processing applied to the prose of one message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextPipeline {
    mode: Mode,
}

impl TextPipeline {
    /// Pipeline for a message written by `role` in `format`
    pub fn for_author(role: Role, format: DocumentFormat) -> Self {
        let mode = match (role, format) {
            (Role::Assistant, DocumentFormat::Markdown) => Mode::AssistantMarkdown,
            (Role::Assistant, DocumentFormat::Html) => Mode::AssistantHtml,
            (_, DocumentFormat::Html) => Mode::PlainHtml,
            _ => Mode::Identity,
        };
        Self { mode }
    }

    /// Leaves text untouched
    pub fn identity() -> Self {
        Self {
            mode: Mode::Identity,
        }
    }

    pub fn process(&self, text: &str, metadata: &MessageMetadata) -> Result<Reformatted> {
        match self.mode {
            Mode::Identity => Ok(Reformatted {
                text: text.to_string(),
                footnotes: Vec::new(),
            }),
            Mode::PlainHtml => Ok(Reformatted {
                text: format!("<p class=\"no-katex\">{}</p>", escape_html(text)),
                footnotes: Vec::new(),
            }),
            Mode::AssistantMarkdown => {
                let (rewritten, footnotes) = rewrite_footnotes(text, metadata, true);
                Ok(Reformatted {
                    text: reformat_markdown(&rewritten)?,
                    footnotes,
                })
            }
            Mode::AssistantHtml => {
                let (rewritten, _) = rewrite_footnotes(text, metadata, false);
                Ok(Reformatted {
                    text: reformat_html(&rewritten)?,
                    footnotes: Vec::new(),
                })
            }
        }
    }
}

/// Replace citation markers that have a matching citation
///
/// With `collect`, a marker becomes `[^n]` and one definition per index is
/// returned; without it the marker is deleted. Unmatched markers stay.
pub fn rewrite_footnotes(
    text: &str,
    metadata: &MessageMetadata,
    collect: bool,
) -> (String, Vec<Footnote>) {
    let mut footnotes: Vec<Footnote> = Vec::new();
    let rewritten = FOOTNOTE_MARKER.replace_all(text, |caps: &Captures| {
        let whole = caps[0].to_string();
        let Ok(index) = caps[1].parse::<u32>() else {
            return whole;
        };
        let Some(citation) = metadata.citation_for(index) else {
            return whole;
        };
        if !collect {
            return String::new();
        }
        if !footnotes.iter().any(|f| f.index == index) {
            let label = caps.get(2).or_else(|| caps.get(3)).map(|m| m.as_str());
            let title = citation.title().or(label).unwrap_or_default();
            footnotes.push(Footnote {
                index,
                title: title.to_string(),
            });
        }
        format!("[^{}]", index)
    });
    (rewritten.into_owned(), footnotes)
}

/// Rewrite `\[..\]` and `\(..\)` delimiters to dollar form
pub fn normalize_math(text: &str) -> String {
    let display = DISPLAY_BRACKETS.replace_all(text, |caps: &Captures| format!("$${}$$", &caps[1]));
    INLINE_BRACKETS
        .replace_all(&display, |caps: &Captures| format!("${}$", &caps[1]))
        .into_owned()
}

/// Whether the text contains a fenced code block
pub fn has_code_fence(text: &str) -> bool {
    text.contains("```") || text.contains("~~~")
}

/// Swap protected spans for sentinels
///
/// Returns `None` when the text already contains the sentinel character.
fn protect(text: &str) -> Option<(String, Vec<String>)> {
    if text.contains(SENTINEL) {
        return None;
    }
    let mut spans = Vec::new();
    let protected = PROTECTED_SPAN.replace_all(text, |caps: &Captures| {
        if caps.name("code").is_some() {
            return caps[0].to_string();
        }
        spans.push(caps[0].to_string());
        format!("{}{}{}", SENTINEL, spans.len() - 1, SENTINEL)
    });
    Some((protected.into_owned(), spans))
}

fn restore(text: &str, spans: &[String], escape: bool) -> String {
    SENTINEL_TOKEN
        .replace_all(text, |caps: &Captures| {
            let span = caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|index| spans.get(index));
            match span {
                Some(span) if escape => escape_text(span),
                Some(span) => span.clone(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Markdown round trip with math protection
pub fn reformat_markdown(text: &str) -> Result<String> {
    if has_code_fence(text) {
        return Ok(text.to_string());
    }
    let normalized = normalize_math(text);
    let Some((protected, spans)) = protect(&normalized) else {
        return Ok(text.to_string());
    };
    let printed = markdown_round_trip(&protected)?;
    Ok(restore(&printed, &spans, false))
}

/// Markdown to HTML with math protection
pub fn reformat_html(text: &str) -> Result<String> {
    if has_code_fence(text) {
        return markdown_to_html(text);
    }
    let normalized = normalize_math(text);
    let Some((protected, spans)) = protect(&normalized) else {
        return markdown_to_html(text);
    };
    let html = markdown_to_html(&protected)?;
    Ok(restore(&html, &spans, true))
}

fn comrak_options() -> ComrakOptions<'static> {
    let mut options = ComrakOptions::default();
    options.extension.table = true;
    options.extension.strikethrough = true;
    options.extension.autolink = true;
    options.extension.tasklist = true;
    options
}

fn markdown_round_trip(text: &str) -> Result<String> {
    let arena = Arena::new();
    let options = comrak_options();
    let root = parse_document(&arena, text, &options);

    let mut output = Vec::new();
    format_commonmark(root, &options, &mut output)
        .map_err(|e| ChatmarkError::Render(format!("Markdown serialization failed: {}", e)))?;
    let markdown = String::from_utf8(output)
        .map_err(|e| ChatmarkError::Render(format!("UTF-8 conversion failed: {}", e)))?;

    Ok(markdown
        .replace("<!-- end list -->\n\n", "")
        .trim_end()
        .to_string())
}

fn markdown_to_html(text: &str) -> Result<String> {
    let arena = Arena::new();
    let mut options = comrak_options();
    options.render.escape = true;
    let root = parse_document(&arena, text, &options);

    let mut output = Vec::new();
    format_html(root, &options, &mut output)
        .map_err(|e| ChatmarkError::Render(format!("HTML rendering failed: {}", e)))?;
    let html = String::from_utf8(output)
        .map_err(|e| ChatmarkError::Render(format!("UTF-8 conversion failed: {}", e)))?;

    Ok(html.trim_end().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Citation;

    fn cited(index: u32, title: &str) -> MessageMetadata {
        MessageMetadata {
            citations: vec![Citation::new(index, title)],
            ..MessageMetadata::default()
        }
    }

    fn assistant(format: DocumentFormat) -> TextPipeline {
        TextPipeline::for_author(Role::Assistant, format)
    }

    #[test]
    fn test_normalize_math() {
        assert_eq!(normalize_math(r"a \(x^2\) b"), "a $x^2$ b");
        assert_eq!(normalize_math("\\[\na_1\n\\]"), "$$\na_1\n$$");
    }

    #[test]
    fn test_inline_math_survives_markdown() {
        let out = assistant(DocumentFormat::Markdown)
            .process(r"The area is \(x^2\) and *more*", &MessageMetadata::default())
            .unwrap();
        assert_eq!(out.text, "The area is $x^2$ and *more*");
    }

    #[test]
    fn test_inline_math_survives_html() {
        let out = assistant(DocumentFormat::Html)
            .process(r"The area is \(x^2\)", &MessageMetadata::default())
            .unwrap();
        assert_eq!(out.text, "<p>The area is $x^2$</p>");
    }

    #[test]
    fn test_display_math_with_markdown_characters() {
        let text = "Sum:\n\n$$\na_1 * b_2 = [c]\n$$";
        let out = reformat_markdown(text).unwrap();
        assert!(out.contains("$$\na_1 * b_2 = [c]\n$$"));
    }

    #[test]
    fn test_html_restore_escapes_spans() {
        let out = reformat_html("If $a<b$ then").unwrap();
        assert_eq!(out, "<p>If $a&lt;b$ then</p>");
    }

    #[test]
    fn test_dollar_signs_in_code_spans() {
        let text = "Set `$HOME` and `$PATH` first";
        assert_eq!(
            reformat_html(text).unwrap(),
            "<p>Set <code>$HOME</code> and <code>$PATH</code> first</p>"
        );
        assert_eq!(reformat_markdown(text).unwrap(), text);

        let mixed = reformat_html("Run `echo $A` then $x^2$").unwrap();
        assert_eq!(mixed, "<p>Run <code>echo $A</code> then $x^2$</p>");
    }

    #[test]
    fn test_footnote_markdown() {
        let out = assistant(DocumentFormat::Markdown)
            .process("Evidence 【3†(SourceName)】", &cited(3, "SourceName"))
            .unwrap();
        assert_eq!(out.text, "Evidence [^3]");
        assert_eq!(out.footnotes.len(), 1);
        assert_eq!(out.footnotes[0].to_markdown(), "[^3]: SourceName");
    }

    #[test]
    fn test_footnote_html_removed() {
        let out = assistant(DocumentFormat::Html)
            .process("Evidence 【3†(SourceName)】", &cited(3, "SourceName"))
            .unwrap();
        assert!(!out.text.contains('【'));
        assert!(!out.text.contains("[^3]"));
        assert!(out.footnotes.is_empty());
    }

    #[test]
    fn test_footnote_collected_once() {
        let (text, footnotes) = rewrite_footnotes(
            "a【1†(x)】 b【1†(x)】 c【2†(y)】",
            &cited(1, "Docs"),
            true,
        );
        assert_eq!(text, "a[^1] b[^1] c【2†(y)】");
        assert_eq!(
            footnotes,
            vec![Footnote {
                index: 1,
                title: "Docs".to_string()
            }]
        );
    }

    #[test]
    fn test_footnote_without_parentheses_uses_label_fallback() {
        let mut metadata = cited(5, "");
        if let Some(meta) = metadata.citations[0].metadata.as_mut() {
            meta.title = None;
        }
        let (text, footnotes) = rewrite_footnotes("see 【5†wiki】", &metadata, true);
        assert_eq!(text, "see [^5]");
        assert_eq!(footnotes[0].title, "wiki");
    }

    #[test]
    fn test_code_fence_skips_round_trip() {
        let text = "Run:\n\n```\nlet a = \\(b\\);\n```\n*  item";
        assert_eq!(reformat_markdown(text).unwrap(), text);

        let html = reformat_html(text).unwrap();
        assert!(html.contains("<pre><code>let a = \\(b\\);"));
    }

    #[test]
    fn test_existing_sentinel_skips_protection() {
        let text = "odd ╬0╬ text with $x$";
        assert_eq!(reformat_markdown(text).unwrap(), text);
        assert!(reformat_html(text).unwrap().starts_with("<p>odd ╬0╬"));
    }

    #[test]
    fn test_raw_html_escaped_in_assistant_html() {
        let out = reformat_html("hi <script>alert(1)</script>").unwrap();
        assert!(!out.contains("<script>"));
        assert!(out.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_non_assistant_pipelines() {
        let metadata = cited(1, "Docs");
        let md = TextPipeline::for_author(Role::User, DocumentFormat::Markdown)
            .process("keep 【1†(x)】 \\(y\\)", &metadata)
            .unwrap();
        assert_eq!(md.text, "keep 【1†(x)】 \\(y\\)");

        let html = TextPipeline::for_author(Role::User, DocumentFormat::Html)
            .process("a < b", &metadata)
            .unwrap();
        assert_eq!(html.text, "<p class=\"no-katex\">a &lt; b</p>");
    }
}
