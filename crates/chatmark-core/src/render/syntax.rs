//! Target-format syntax for rendered fragments

/// Escape text for HTML element content and attribute values
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// How each building block of a fragment is spelled in one output format
pub trait FragmentSyntax: Send + Sync {
    /// Plain text that must reach the reader as-is
    fn literal(&self, text: &str) -> String;

    fn code_block(&self, language: Option<&str>, code: &str) -> String;

    fn image(&self, src: &str) -> String;

    fn quote(&self, text: &str) -> String;

    /// Quoted list of `(title, url)` links
    fn link_list(&self, links: &[(&str, &str)]) -> String;

    fn join(&self, blocks: &[String]) -> String;
}

/// CommonMark output
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownSyntax;

impl FragmentSyntax for MarkdownSyntax {
    fn literal(&self, text: &str) -> String {
        text.to_string()
    }

    fn code_block(&self, language: Option<&str>, code: &str) -> String {
        let fence = "`".repeat(longest_backtick_run(code).max(2) + 1);
        format!(
            "{fence}{}\n{}\n{fence}",
            language.unwrap_or_default(),
            code.trim_end_matches('\n')
        )
    }

    fn image(&self, src: &str) -> String {
        format!("![image]({})", src)
    }

    fn quote(&self, text: &str) -> String {
        text.lines()
            .map(|line| format!("> {}", line))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn link_list(&self, links: &[(&str, &str)]) -> String {
        links
            .iter()
            .map(|(title, url)| format!("> [{}]({})", title, url))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn join(&self, blocks: &[String]) -> String {
        blocks.join("\n")
    }
}

/// HTML fragment output; every literal is escaped
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlSyntax;

impl FragmentSyntax for HtmlSyntax {
    fn literal(&self, text: &str) -> String {
        escape_html(text)
    }

    fn code_block(&self, language: Option<&str>, code: &str) -> String {
        match language.filter(|l| !l.is_empty()) {
            Some(language) => format!(
                "<pre><code class=\"language-{}\">{}</code></pre>",
                escape_html(language),
                escape_html(code)
            ),
            None => format!("<pre><code>{}</code></pre>", escape_html(code)),
        }
    }

    fn image(&self, src: &str) -> String {
        format!("<img src=\"{}\" alt=\"image\" />", escape_html(src))
    }

    fn quote(&self, text: &str) -> String {
        let lines: Vec<String> = text.lines().map(escape_html).collect();
        format!("<blockquote>{}</blockquote>", lines.join("<br>"))
    }

    fn link_list(&self, links: &[(&str, &str)]) -> String {
        let items: Vec<String> = links
            .iter()
            .map(|(title, url)| {
                format!(
                    "<a href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\">{}</a>",
                    escape_html(url),
                    escape_html(title)
                )
            })
            .collect();
        format!("<blockquote>{}</blockquote>", items.join("<br>"))
    }

    fn join(&self, blocks: &[String]) -> String {
        blocks.join("\n")
    }
}

fn longest_backtick_run(text: &str) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for c in text.chars() {
        if c == '`' {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_markdown_code_block() {
        assert_eq!(
            MarkdownSyntax.code_block(Some("rust"), "fn main() {}\n"),
            "```rust\nfn main() {}\n```"
        );
        assert_eq!(
            MarkdownSyntax.code_block(None, "x = ```y```"),
            "````\nx = ```y```\n````"
        );
    }

    #[test]
    fn test_markdown_quote_and_links() {
        assert_eq!(MarkdownSyntax.quote("a\nb"), "> a\n> b");
        assert_eq!(
            MarkdownSyntax.link_list(&[("Docs", "https://d.test"), ("Blog", "https://b.test")]),
            "> [Docs](https://d.test)\n> [Blog](https://b.test)"
        );
    }

    #[test]
    fn test_html_escapes_everything_it_emits() {
        assert_eq!(
            HtmlSyntax.code_block(Some("html"), "<b>"),
            "<pre><code class=\"language-html\">&lt;b&gt;</code></pre>"
        );
        assert_eq!(HtmlSyntax.quote("1 < 2"), "<blockquote>1 &lt; 2</blockquote>");
        assert_eq!(
            HtmlSyntax.image("images/a.png"),
            "<img src=\"images/a.png\" alt=\"image\" />"
        );
        assert!(HtmlSyntax
            .link_list(&[("<T>", "https://x.test/?a=1&b=2")])
            .contains("href=\"https://x.test/?a=1&amp;b=2\""));
    }
}
