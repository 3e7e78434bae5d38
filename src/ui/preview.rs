//! Read-only preview surface using egui_commonmark

use eframe::egui;
use egui_commonmark::{CommonMarkCache, CommonMarkViewer};

/// Rendered, read-only view of the committed document
pub struct PreviewSurface;

impl PreviewSurface {
    /// Show the preview of `content` with body text at `font_size`
    pub fn show(ui: &mut egui::Ui, cache: &mut CommonMarkCache, content: &str, font_size: f32) {
        egui::ScrollArea::vertical()
            .id_salt("preview_scroll")
            .auto_shrink([false, false])
            .show(ui, |ui| {
                let body = preview_body(content);
                if body.trim().is_empty() {
                    Self::show_empty(ui);
                    return;
                }

                ui.style_mut()
                    .text_styles
                    .insert(egui::TextStyle::Body, egui::FontId::proportional(font_size));
                CommonMarkViewer::new().show(ui, cache, body);
            });
    }

    /// Show empty state
    fn show_empty(ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            ui.add_space(50.0);
            ui.label(
                egui::RichText::new("Start typing to see your content rendered here...")
                    .italics()
                    .weak(),
            );
        });
    }
}

/// Content without a leading `---` metadata block
pub fn preview_body(content: &str) -> &str {
    let Some(rest) = content.strip_prefix("---") else {
        return content;
    };

    match rest.find("\n---") {
        Some(end) => {
            let after = &rest[end + "\n---".len()..];
            after.trim_start_matches(['\r', '\n'])
        }
        None => content,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_body_strips_metadata() {
        let content = "---\ntitle: Paper\nauthors: [A, B]\n---\n\n# Introduction\n";
        assert_eq!(preview_body(content), "# Introduction\n");
    }

    #[test]
    fn test_preview_body_without_metadata() {
        assert_eq!(preview_body("# Just text"), "# Just text");
        assert_eq!(preview_body("--- unterminated"), "--- unterminated");
    }
}
