//! MIME inference and sibling file naming

use crate::types::{Author, Role};
use deunicode::deunicode;

/// MIME type used when nothing better is known
pub const PLACEHOLDER_MIME: &str = "image/png";

/// Directory that sibling image files live in
pub const IMAGE_DIR: &str = "images";

/// Infer a MIME type from a locator without fetching it
pub fn infer_mime(locator: &str) -> String {
    if let Some(rest) = locator.strip_prefix("data:") {
        if let Some(mime) = rest.split([';', ',']).next() {
            if mime.starts_with("image/") {
                return mime.to_string();
            }
        }
        return PLACEHOLDER_MIME.to_string();
    }

    let path = locator.split(['?', '#']).next().unwrap_or(locator);
    let extension = path
        .rsplit('/')
        .next()
        .and_then(|segment| segment.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase());

    match extension.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        Some("bmp") => "image/bmp",
        _ => PLACEHOLDER_MIME,
    }
    .to_string()
}

/// File extension for a MIME type
pub fn extension_for(mime: &str) -> &'static str {
    let essence = mime.split(';').next().unwrap_or(mime).trim();
    match essence.to_ascii_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/svg+xml" => "svg",
        "image/bmp" => "bmp",
        _ => "png",
    }
}

/// File name prefix for the owning author
pub fn role_prefix(author: Option<&Author>) -> String {
    let raw = match author {
        Some(Author {
            role: Role::Assistant,
            ..
        }) => "chatgpt-response".to_string(),
        Some(Author {
            role: Role::User, ..
        }) => "user-upload".to_string(),
        Some(Author {
            role: Role::Tool,
            name: Some(name),
        }) if !name.trim().is_empty() => format!("tool-{}", name),
        Some(Author {
            role: Role::Tool, ..
        }) => "tool".to_string(),
        _ => "image".to_string(),
    };
    sanitize_segment(&raw)
}

/// `<prefix>-<NNN>.<ext>`, numbered from 1 by global position
pub fn image_file_name(author: Option<&Author>, global_index: usize, mime: &str) -> String {
    format!(
        "{}-{:03}.{}",
        role_prefix(author),
        global_index + 1,
        extension_for(mime)
    )
}

/// Relative path of a sibling image file
pub fn image_path(file_name: &str) -> String {
    format!("{}/{}", IMAGE_DIR, file_name)
}

/// Lower-case ASCII, whitespace folded to hyphens, everything path-unsafe dropped
fn sanitize_segment(input: &str) -> String {
    let ascii = deunicode(input).to_ascii_lowercase();
    let mut result = String::with_capacity(ascii.len());
    let mut last_was_hyphen = false;

    for c in ascii.chars() {
        if c.is_whitespace() || c == '-' || c == '.' {
            if !last_was_hyphen {
                result.push('-');
                last_was_hyphen = true;
            }
        } else if c.is_ascii_alphanumeric() || c == '_' {
            result.push(c);
            last_was_hyphen = false;
        }
    }

    let trimmed = result.trim_matches('-');
    if trimmed.is_empty() {
        "image".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_mime_from_extension() {
        assert_eq!(infer_mime("https://x.test/a/plot.JPG?sig=1"), "image/jpeg");
        assert_eq!(infer_mime("https://x.test/a/anim.gif"), "image/gif");
        assert_eq!(infer_mime("https://x.test/a/vector.svg#frag"), "image/svg+xml");
        assert_eq!(infer_mime("file-service://file-abc"), PLACEHOLDER_MIME);
    }

    #[test]
    fn test_infer_mime_from_data_uri() {
        assert_eq!(infer_mime("data:image/webp;base64,AAAA"), "image/webp");
        assert_eq!(infer_mime("data:text/plain,hi"), PLACEHOLDER_MIME);
    }

    #[test]
    fn test_extension_for() {
        assert_eq!(extension_for("image/jpeg"), "jpg");
        assert_eq!(extension_for("image/svg+xml; charset=utf-8"), "svg");
        assert_eq!(extension_for("application/octet-stream"), "png");
    }

    #[test]
    fn test_role_prefixes() {
        assert_eq!(role_prefix(Some(&Author::new(Role::Assistant))), "chatgpt-response");
        assert_eq!(role_prefix(Some(&Author::new(Role::User))), "user-upload");
        assert_eq!(role_prefix(Some(&Author::new(Role::Tool))), "tool");
        assert_eq!(
            role_prefix(Some(&Author::named(Role::Tool, "Image  Gen"))),
            "tool-image-gen"
        );
        assert_eq!(
            role_prefix(Some(&Author::named(Role::Tool, "../../etc"))),
            "tool-etc"
        );
        assert_eq!(
            role_prefix(Some(&Author::named(Role::Tool, "Café"))),
            "tool-cafe"
        );
        assert_eq!(role_prefix(None), "image");
    }

    #[test]
    fn test_image_file_name() {
        let author = Author::new(Role::Assistant);
        assert_eq!(
            image_file_name(Some(&author), 0, "image/png"),
            "chatgpt-response-001.png"
        );
        assert_eq!(
            image_file_name(Some(&Author::new(Role::User)), 41, "image/jpeg"),
            "user-upload-042.jpg"
        );
        assert_eq!(image_path("a.png"), "images/a.png");
    }
}
