//! Word counts and outlines for the dashboard

use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};

/// Summary of one document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentStats {
    /// Words in prose, headings and inline code; fenced code is skipped
    pub words: usize,
    /// Top-level and second-level headings, in order
    pub outline: Vec<String>,
}

fn parser_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_MATH);
    options
}

/// Compute word count and outline of Markdown `content`
pub fn analyze(content: &str) -> DocumentStats {
    let mut stats = DocumentStats::default();
    let mut in_code_block = false;
    let mut heading: Option<String> = None;

    for event in Parser::new_ext(content, parser_options()) {
        match event {
            Event::Start(Tag::CodeBlock(_)) => in_code_block = true,
            Event::End(TagEnd::CodeBlock) => in_code_block = false,
            Event::Start(Tag::Heading { level, .. })
                if matches!(level, HeadingLevel::H1 | HeadingLevel::H2) =>
            {
                heading = Some(String::new());
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some(text) = heading.take() {
                    let text = text.trim().to_string();
                    if !text.is_empty() {
                        stats.outline.push(text);
                    }
                }
            }
            Event::Text(text) | Event::Code(text) if !in_code_block => {
                stats.words += text
                    .split_whitespace()
                    .filter(|word| word.chars().any(char::is_alphanumeric))
                    .count();
                if let Some(ref mut heading) = heading {
                    heading.push_str(&text);
                }
            }
            _ => {}
        }
    }

    stats
}
