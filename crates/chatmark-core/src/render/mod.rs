//! Message content rendering
//!
//! [`ContentRenderer`] dispatches on the content type and spells each
//! block through a [`FragmentSyntax`]. Prose is passed through the
//! message's [`TextPipeline`].

mod content;
mod reformat;
mod syntax;

pub use content::{ContentRenderer, Fragment};
pub use reformat::{
    has_code_fence, normalize_math, reformat_html, reformat_markdown, rewrite_footnotes, Footnote,
    Reformatted, TextPipeline,
};
pub use syntax::{escape_html, FragmentSyntax, HtmlSyntax, MarkdownSyntax};
