//! Render-time interpretation of assistant content markers.
//!
//! Assistant content is plain text that may embed lightweight structural
//! markers: a bold line (`**...**`), a bullet line (`- ` / `* `), a numbered
//! line (`1. `). They are classified here and styled by the CLI; the
//! transcript itself never stores styling.

use regex::Regex;

/// One classified line of assistant content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentLine {
    /// A line wrapped in `**`, shown as a heading.
    Heading(String),
    /// A bullet item.
    Bullet(String),
    /// A numbered item, keeping its original number.
    Numbered(u32, String),
    /// Anything else.
    Plain(String),
}

/// Classify every line of a message body.
pub fn parse_lines(content: &str) -> Vec<ContentLine> {
    let numbered = Regex::new(r"^(\d+)\.\s+(.*)$").unwrap();
    content
        .lines()
        .map(|line| classify(line.trim_end(), &numbered))
        .collect()
}

fn classify(line: &str, numbered: &Regex) -> ContentLine {
    let trimmed = line.trim_start();

    if let Some(inner) = trimmed
        .strip_prefix("**")
        .and_then(|rest| rest.strip_suffix("**"))
    {
        if !inner.is_empty() {
            return ContentLine::Heading(inner.to_string());
        }
    }

    if let Some(item) = trimmed.strip_prefix("- ").or_else(|| trimmed.strip_prefix("* ")) {
        return ContentLine::Bullet(item.to_string());
    }

    if let Some(caps) = numbered.captures(trimmed) {
        if let Ok(index) = caps[1].parse::<u32>() {
            return ContentLine::Numbered(index, caps[2].to_string());
        }
    }

    ContentLine::Plain(line.to_string())
}

/// Format cited pages for display, e.g. `pages 2, 5`.
pub fn format_source_pages(pages: &[u32]) -> Option<String> {
    if pages.is_empty() {
        return None;
    }
    let list = pages
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    let label = if pages.len() == 1 { "page" } else { "pages" };
    Some(format!("{label} {list}"))
}
