/// Markdown to plain text conversion for embedding requests
use crate::application::providers::{NormalizationError, TextNormalizer};
use pulldown_cmark::{Event, Parser, TagEnd};
use regex::Regex;
use std::sync::OnceLock;

/// Strips markdown markup, raw HTML tags and Hugo shortcodes from a post body
#[derive(Debug)]
pub struct MarkdownStripper {
    paired_shortcode_regex: Regex,
    shortcode_regex: Regex,
    html_tag_regex: Regex,
    blank_lines_regex: Regex,
}

impl MarkdownStripper {
    pub fn new() -> Self {
        MarkdownStripper {
            // {{< name >}} ... {{< /name >}} together with everything between
            paired_shortcode_regex: Regex::new(r"(?s)\{\{<\s*[^>]+>\}\}.*?\{\{<\s*/[^>]+>\}\}")
                .unwrap(),
            // Lone {{< name >}} or {{% name %}}
            shortcode_regex: Regex::new(r"(?s)\{\{[<%].*?[%>]\}\}").unwrap(),
            html_tag_regex: Regex::new(r"<[^>]*>").unwrap(),
            blank_lines_regex: Regex::new(r"\n[ \t]*(\n[ \t]*)+").unwrap(),
        }
    }

    /// Get a singleton instance (the regexes are compiled once)
    pub fn instance() -> &'static Self {
        static INSTANCE: OnceLock<MarkdownStripper> = OnceLock::new();
        INSTANCE.get_or_init(MarkdownStripper::new)
    }

    fn remove_shortcodes(&self, body: &str) -> String {
        let text = self.paired_shortcode_regex.replace_all(body, "");
        self.shortcode_regex.replace_all(&text, "").into_owned()
    }

    fn render_text(&self, markdown: &str) -> String {
        let mut text = String::with_capacity(markdown.len());

        for event in Parser::new(markdown) {
            match event {
                Event::Text(t) | Event::Code(t) => text.push_str(&t),
                Event::Html(html) | Event::InlineHtml(html) => {
                    text.push_str(&self.html_tag_regex.replace_all(&html, ""));
                }
                Event::SoftBreak => text.push(' '),
                Event::HardBreak => text.push('\n'),
                Event::End(TagEnd::TableCell) => text.push(' '),
                Event::End(
                    TagEnd::Paragraph
                    | TagEnd::Heading(_)
                    | TagEnd::CodeBlock
                    | TagEnd::Item
                    | TagEnd::TableHead
                    | TagEnd::TableRow,
                ) => text.push('\n'),
                _ => {}
            }
        }

        text
    }
}

impl Default for MarkdownStripper {
    fn default() -> Self {
        Self::new()
    }
}

impl TextNormalizer for MarkdownStripper {
    fn strip(&self, body: &str) -> Result<String, NormalizationError> {
        let without_shortcodes = self.remove_shortcodes(body);
        let text = self.render_text(&without_shortcodes);
        let text = self.blank_lines_regex.replace_all(&text, "\n\n");
        let text = text.trim();

        if text.is_empty() {
            return Err(NormalizationError::Empty);
        }

        Ok(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_markdown_formatting() {
        let stripper = MarkdownStripper::new();
        let text = stripper
            .strip("# Title\n\nSome **bold** and _italic_ text with a [link](https://example.com).\n")
            .unwrap();

        assert_eq!(text, "Title\nSome bold and italic text with a link.");
    }

    #[test]
    fn test_keeps_code_text() {
        let stripper = MarkdownStripper::new();
        let text = stripper
            .strip("Use `cargo build`.\n\n```rust\nfn main() {}\n```\n")
            .unwrap();

        assert!(text.contains("Use cargo build."));
        assert!(text.contains("fn main() {}"));
    }

    #[test]
    fn test_removes_paired_shortcodes() {
        let stripper = MarkdownStripper::new();
        let text = stripper
            .strip("Before\n\n{{< details summary=\"x\" >}}\nhidden text\n{{< /details >}}\n\nAfter\n")
            .unwrap();

        assert!(text.contains("Before"));
        assert!(text.contains("After"));
        assert!(!text.contains("hidden"));
        assert!(!text.contains("{{"));
    }

    #[test]
    fn test_removes_single_shortcodes() {
        let stripper = MarkdownStripper::new();
        let text = stripper
            .strip("Look at this {{< figure src=\"a.png\" >}} and {{% ref \"x\" %}} here.\n")
            .unwrap();

        assert_eq!(text, "Look at this  and  here.");
    }

    #[test]
    fn test_drops_html_tags_but_keeps_their_text() {
        let stripper = MarkdownStripper::new();
        let text = stripper.strip("Hello <span class=\"x\">world</span>!\n").unwrap();

        assert_eq!(text, "Hello world!");
    }

    #[test]
    fn test_list_items_are_separated() {
        let stripper = MarkdownStripper::new();
        let text = stripper.strip("- one\n- two\n- three\n").unwrap();

        assert_eq!(text, "one\ntwo\nthree");
    }

    #[test]
    fn test_empty_body_is_an_error() {
        let stripper = MarkdownStripper::new();

        assert_eq!(stripper.strip(""), Err(NormalizationError::Empty));
        assert_eq!(stripper.strip("   \n\n  "), Err(NormalizationError::Empty));
        assert_eq!(
            stripper.strip("{{< gallery >}}{{< /gallery >}}\n"),
            Err(NormalizationError::Empty)
        );
    }

    #[test]
    fn test_is_deterministic() {
        let stripper = MarkdownStripper::instance();
        let body = "## Heading\n\nParagraph one.\n\n> Quoted\n";

        assert_eq!(stripper.strip(body), stripper.strip(body));
    }
}
