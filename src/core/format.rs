//! Toolbar formatting commands applied to the editor buffer

use std::ops::Range;

/// A discrete formatting command from the toolbar or a shortcut
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatCommand {
    Bold,
    Italic,
    Heading,
    BulletList,
    CodeBlock,
    Link,
    InlineMath,
    DisplayMath,
}

/// How a command changes the selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edit {
    /// Surround the selected text with markers
    Wrap(&'static str, &'static str),
    /// Replace the selection with a template
    Insert(&'static str),
}

impl FormatCommand {
    /// Every command in toolbar order
    pub const ALL: [FormatCommand; 8] = [
        FormatCommand::Bold,
        FormatCommand::Italic,
        FormatCommand::Heading,
        FormatCommand::BulletList,
        FormatCommand::CodeBlock,
        FormatCommand::Link,
        FormatCommand::InlineMath,
        FormatCommand::DisplayMath,
    ];

    /// Short toolbar label
    pub fn label(self) -> &'static str {
        match self {
            FormatCommand::Bold => "B",
            FormatCommand::Italic => "I",
            FormatCommand::Heading => "H1",
            FormatCommand::BulletList => "\u{2022}",
            FormatCommand::CodeBlock => "</>",
            FormatCommand::Link => "\u{1F517}",
            FormatCommand::InlineMath => "$x$",
            FormatCommand::DisplayMath => "\u{2211}",
        }
    }

    /// Hover text for the toolbar button
    pub fn title(self) -> &'static str {
        match self {
            FormatCommand::Bold => "Bold (Ctrl+B)",
            FormatCommand::Italic => "Italic (Ctrl+I)",
            FormatCommand::Heading => "Heading",
            FormatCommand::BulletList => "List",
            FormatCommand::CodeBlock => "Code Block",
            FormatCommand::Link => "Link",
            FormatCommand::InlineMath => "Inline math",
            FormatCommand::DisplayMath => "Display math",
        }
    }

    fn edit(self) -> Edit {
        match self {
            FormatCommand::Bold => Edit::Wrap("**", "**"),
            FormatCommand::Italic => Edit::Wrap("*", "*"),
            FormatCommand::Heading => Edit::Wrap("# ", ""),
            FormatCommand::InlineMath => Edit::Wrap("$", "$"),
            FormatCommand::BulletList => Edit::Insert("\n- "),
            FormatCommand::CodeBlock => Edit::Insert("\n```\n\n```\n"),
            FormatCommand::Link => Edit::Insert("[]()"),
            FormatCommand::DisplayMath => Edit::Insert("\n$$\n\n$$\n"),
        }
    }
}

/// Apply `command` to `text` at the char-index `selection`.
///
/// The edit is applied in place as one replacement. Returns the selection
/// to restore: a collapsed cursor after the inserted text, or between the
/// markers when an empty selection was wrapped.
pub fn apply(text: &mut String, selection: Range<usize>, command: FormatCommand) -> Range<usize> {
    let char_count = text.chars().count();
    let start = selection.start.min(selection.end).min(char_count);
    let end = selection.start.max(selection.end).min(char_count);

    let byte_start = byte_offset(text, start);
    let byte_end = byte_offset(text, end);

    match command.edit() {
        Edit::Wrap(prefix, suffix) => {
            let selected = &text[byte_start..byte_end];
            let replacement = format!("{prefix}{selected}{suffix}");
            text.replace_range(byte_start..byte_end, &replacement);

            let cursor = if start == end {
                start + prefix.chars().count()
            } else {
                start + replacement.chars().count()
            };
            cursor..cursor
        }
        Edit::Insert(template) => {
            text.replace_range(byte_start..byte_end, template);
            let cursor = start + template.chars().count();
            cursor..cursor
        }
    }
}

fn byte_offset(text: &str, char_index: usize) -> usize {
    text.char_indices()
        .nth(char_index)
        .map(|(offset, _)| offset)
        .unwrap_or(text.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bold_wraps_selection() {
        let mut text = "make this bold".to_string();
        let selection = apply(&mut text, 10..14, FormatCommand::Bold);

        assert_eq!(text, "make this **bold**");
        assert_eq!(selection, 18..18);
    }

    #[test]
    fn test_wrap_empty_selection_places_cursor_inside() {
        let mut text = "ab".to_string();
        let selection = apply(&mut text, 1..1, FormatCommand::InlineMath);

        assert_eq!(text, "a$$b");
        assert_eq!(selection, 2..2);
    }

    #[test]
    fn test_heading_prefixes_selection() {
        let mut text = "Introduction".to_string();
        apply(&mut text, 0..12, FormatCommand::Heading);
        assert_eq!(text, "# Introduction");
    }

    #[test]
    fn test_insert_replaces_selection() {
        let mut text = "see here".to_string();
        let selection = apply(&mut text, 4..8, FormatCommand::Link);

        assert_eq!(text, "see []()");
        assert_eq!(selection, 8..8);
    }

    #[test]
    fn test_code_block_template() {
        let mut text = String::new();
        apply(&mut text, 0..0, FormatCommand::CodeBlock);
        assert_eq!(text, "\n```\n\n```\n");
    }

    #[test]
    fn test_multibyte_selection_uses_char_indices() {
        let mut text = "Größe Ω".to_string();
        let selection = apply(&mut text, 6..7, FormatCommand::Italic);

        assert_eq!(text, "Größe *Ω*");
        assert_eq!(selection, 9..9);
    }

    #[test]
    fn test_reversed_and_out_of_range_selection() {
        let mut text = "abc".to_string();
        apply(&mut text, 10..1, FormatCommand::Bold);
        assert_eq!(text, "a**bc**");
    }
}
