//! Output file naming

use crate::conversation::Conversation;
use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// Maximum length of a sanitized name in bytes
pub const MAX_NAME_BYTES: usize = 200;

const INVALID_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];
const STAMP_PATTERN: &str = "%Y-%m-%d_%H-%M-%S";

/// Make a title usable as a file name on every platform
///
/// Drops path separators, reserved and control characters, folds runs of
/// whitespace to one space, trims dots and spaces from both ends and caps
/// the result at [`MAX_NAME_BYTES`]. An empty result becomes `untitled`.
pub fn sanitize_title(title: &str) -> String {
    let mut cleaned = String::with_capacity(title.len());
    let mut pending_space = false;

    for c in title.chars() {
        if INVALID_CHARS.contains(&c) || (c.is_control() && !c.is_whitespace()) {
            continue;
        }
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space && !cleaned.is_empty() {
            cleaned.push(' ');
        }
        pending_space = false;
        cleaned.push(c);
    }

    let trimmed = truncate_bytes(cleaned.trim_matches(|c: char| c == '.' || c == ' '), MAX_NAME_BYTES)
        .trim_end_matches(|c: char| c == '.' || c == ' ');
    if trimmed.is_empty() {
        "untitled".to_string()
    } else {
        trimmed.to_string()
    }
}

fn truncate_bytes(text: &str, limit: usize) -> &str {
    if text.len() <= limit {
        return text;
    }
    let mut end = limit;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Render a file name template for one conversation
///
/// `.<ext>` is appended unless the template places `{ext}` itself.
pub fn render_file_name(
    template: &str,
    conversation: &Conversation,
    exported_at: DateTime<Utc>,
    ext: &str,
) -> String {
    let stamp = |time: Option<DateTime<Utc>>| {
        time.map(|t| t.format(STAMP_PATTERN).to_string())
            .unwrap_or_default()
    };
    let has_ext = template.contains("{ext}");
    let rendered = template
        .replace("{title}", &sanitize_title(&conversation.title))
        .replace("{chat_id}", &conversation.id)
        .replace("{create_time}", &stamp(conversation.created_at()))
        .replace("{update_time}", &stamp(conversation.updated_at()))
        .replace("{timestamp}", &stamp(Some(exported_at)))
        .replace("{ext}", ext);

    if has_ext {
        sanitize_title(&rendered)
    } else {
        format!("{}.{}", sanitize_title(&rendered), ext)
    }
}

/// Manifest file name for a multi-file export
pub fn manifest_file_name(title: &str, strategy: &str) -> String {
    format!("{}-{}-metadata.json", sanitize_title(title), strategy)
}

/// Split `name.ext` at the last dot
pub fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    }
}

/// Allocates names that are unique within one batch
///
/// Collisions get ` (1)`, ` (2)` and so on before the extension. Every
/// returned name is reserved, so a title that literally reads `name (1)`
/// cannot take a name handed out earlier. Comparison ignores case.
#[derive(Debug, Default)]
pub struct UniqueNames {
    taken: HashSet<String>,
}

impl UniqueNames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self, name: &str) -> String {
        if self.reserve(name) {
            return name.to_string();
        }
        let (stem, ext) = split_extension(name);
        let mut n = 1;
        loop {
            let candidate = match ext {
                Some(ext) => format!("{} ({}).{}", stem, n, ext),
                None => format!("{} ({})", stem, n),
            };
            if self.reserve(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    fn reserve(&mut self, name: &str) -> bool {
        self.taken.insert(name.to_lowercase())
    }
}
