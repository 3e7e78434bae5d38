//! Paper editor: toolbar, edit surface and preview surface

use eframe::egui;
use eframe::egui::text::{CCursor, CCursorRange};
use egui_commonmark::CommonMarkCache;
use tokio::sync::watch;

use super::preview::PreviewSurface;
use crate::core::editor_config::EditorConfig;
use crate::core::format::FormatCommand;
use crate::core::session::{EditorSession, SaveStatus};
use crate::core::store::Surface;

const MINIMAP_WIDTH: f32 = 90.0;

/// Requests the editor hands back to the app shell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorAction {
    Save,
    Export,
    OpenSettings,
}

/// Widget state for one open paper.
///
/// The buffer belongs to the text widget; the store only sees it through
/// the session's debouncer, and the buffer is refreshed from the store
/// whenever no typed text is in flight.
pub struct EditorView {
    buffer: String,
    changes: watch::Receiver<u64>,
    text_id: egui::Id,
    fullscreen: bool,
}

impl EditorView {
    pub fn new(session: &EditorSession) -> Self {
        Self {
            buffer: session.store().content(),
            changes: session.store().subscribe(),
            text_id: egui::Id::new(("paper_editor", session.paper_id().to_owned())),
            fullscreen: false,
        }
    }

    /// Whether the editor asked to hide the surrounding chrome
    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    /// Show the editor for `session`
    pub fn show(
        &mut self,
        ui: &mut egui::Ui,
        session: &mut EditorSession,
        cache: &mut CommonMarkCache,
        preview_font_size: f32,
    ) -> Option<EditorAction> {
        self.sync_from_store(session);

        let snapshot = session.store().snapshot();
        let config = snapshot.config;
        let surface = snapshot.surface;
        let editable = !session.store().is_preview() && !config.read_only;
        let mut action = None;
        let mut format = None;

        // Keyboard shortcuts
        let body_focused = ui.memory(|m| m.has_focus(self.text_id));
        let (mut save, mut toggle, mut fullscreen) = ui.input(|i| {
            let command = i.modifiers.command;
            format = format_shortcut(body_focused, i.modifiers, |key| i.key_pressed(key));
            (
                command && i.key_pressed(egui::Key::S),
                command && i.key_pressed(egui::Key::P),
                i.key_pressed(egui::Key::F11),
            )
        });

        let mut title = session.title().to_owned();
        let title_edit = ui.add(
            egui::TextEdit::singleline(&mut title)
                .font(egui::TextStyle::Heading)
                .hint_text("Untitled Paper")
                .frame(false)
                .desired_width(f32::INFINITY),
        );
        if title_edit.changed() {
            session.set_title(title);
        }

        // Toolbar
        ui.horizontal(|ui| {
            let toggle_label = match surface {
                Surface::Edit => "👁 Preview",
                Surface::Preview => "✏ Edit",
            };
            if ui.button(toggle_label).on_hover_text("Toggle preview (Ctrl+P)").clicked() {
                toggle = true;
            }

            ui.separator();

            for command in FormatCommand::ALL {
                let button = ui
                    .add_enabled(editable, egui::Button::new(command.label()))
                    .on_hover_text(command.title());
                if button.clicked() {
                    format = Some(command);
                }
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let fullscreen_label = if self.fullscreen { "🗗" } else { "⛶" };
                if ui.button(fullscreen_label).on_hover_text("Fullscreen (F11)").clicked() {
                    fullscreen = true;
                }
                if ui.button("⚙").on_hover_text("Editor settings").clicked() {
                    action = Some(EditorAction::OpenSettings);
                }
                if ui.button("⬇ Export").on_hover_text("Export as Markdown").clicked() {
                    action = Some(EditorAction::Export);
                }
                let save_button = ui
                    .add_enabled(session.can_save(), egui::Button::new("💾 Save"))
                    .on_hover_text("Save (Ctrl+S)");
                if save_button.clicked() {
                    save = true;
                }

                Self::show_status(ui, session);
            });
        });

        ui.separator();

        if toggle {
            session.toggle_preview();
            if session.store().surface() == Surface::Edit {
                self.buffer = session.store().content();
            }
        }
        if fullscreen {
            self.fullscreen = !self.fullscreen;
        }
        if save {
            action = Some(EditorAction::Save);
        }
        if let Some(command) = format.filter(|_| editable && !toggle) {
            self.apply_format(ui.ctx(), session, command);
        }

        match session.store().surface() {
            Surface::Edit => self.show_edit_surface(ui, session, &config),
            Surface::Preview => {
                let content = session.store().content();
                PreviewSurface::show(ui, cache, &content, preview_font_size);
            }
        }

        action
    }

    /// Save state indicator next to the save button
    fn show_status(ui: &mut egui::Ui, session: &EditorSession) {
        match session.status() {
            SaveStatus::Saving => {
                ui.spinner();
                ui.label("Saving...");
            }
            SaveStatus::Failed(e) => {
                ui.colored_label(ui.visuals().error_fg_color, "Save failed")
                    .on_hover_text(e.as_str());
            }
            SaveStatus::Saved(_) | SaveStatus::Idle => {}
        }

        if session.can_save() {
            ui.colored_label(ui.visuals().warn_fg_color, "● Unsaved changes");
        } else if matches!(session.status(), SaveStatus::Saved(_)) {
            ui.weak("Saved");
        }
    }

    /// Refresh the buffer after store commits, unless typed text is pending
    fn sync_from_store(&mut self, session: &EditorSession) {
        if !self.changes.has_changed().unwrap_or(false) {
            return;
        }
        let _ = self.changes.borrow_and_update();

        if session.has_pending_input() {
            return;
        }
        let content = session.store().content();
        if content != self.buffer {
            self.buffer = content;
        }
    }

    /// Run a format command on the widget selection and restore it
    fn apply_format(&mut self, ctx: &egui::Context, session: &mut EditorSession, command: FormatCommand) {
        let mut state = egui::text_edit::TextEditState::load(ctx, self.text_id).unwrap_or_default();
        let end = self.buffer.chars().count();
        let selection = state
            .cursor
            .char_range()
            .map(|range| {
                let (a, b) = (range.primary.index, range.secondary.index);
                a.min(b)..a.max(b)
            })
            .unwrap_or(end..end);

        let selection = session.apply_format(&mut self.buffer, selection, command);

        state.cursor.set_char_range(Some(CCursorRange::two(
            CCursor::new(selection.start),
            CCursor::new(selection.end),
        )));
        state.store(ctx, self.text_id);
        ctx.memory_mut(|m| m.request_focus(self.text_id));
    }

    /// Text widget with optional gutter and minimap
    fn show_edit_surface(&mut self, ui: &mut egui::Ui, session: &mut EditorSession, config: &EditorConfig) {
        let font_id = if config.is_proportional() {
            egui::FontId::proportional(config.font_size)
        } else {
            egui::FontId::monospace(config.font_size)
        };
        let word_wrap = config.word_wrap;
        let minimap_width = if config.minimap { MINIMAP_WIDTH } else { 0.0 };

        ui.horizontal_top(|ui| {
            let editor_width = (ui.available_width() - minimap_width).max(100.0);
            let scroll = if word_wrap {
                egui::ScrollArea::vertical()
            } else {
                egui::ScrollArea::both()
            };

            scroll
                .id_salt(self.text_id.with("scroll"))
                .max_width(editor_width)
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    ui.horizontal_top(|ui| {
                        if config.line_numbers {
                            Self::show_gutter(ui, &self.buffer, &font_id);
                        }

                        let mut layouter = |ui: &egui::Ui, text: &dyn egui::TextBuffer, wrap_width: f32| {
                            let job = egui::text::LayoutJob::simple(
                                text.as_str().to_owned(),
                                font_id.clone(),
                                ui.visuals().text_color(),
                                if word_wrap { wrap_width } else { f32::INFINITY },
                            );
                            ui.fonts(|fonts| fonts.layout_job(job))
                        };

                        let output = egui::TextEdit::multiline(&mut self.buffer)
                            .id(self.text_id)
                            .font(font_id.clone())
                            .lock_focus(true)
                            .interactive(!config.read_only)
                            .desired_width(f32::INFINITY)
                            .desired_rows(30)
                            .layouter(&mut layouter)
                            .show(ui);

                        if output.response.changed() {
                            session.input(self.buffer.clone());
                        }
                    });
                });

            if config.minimap {
                Self::show_minimap(ui, &self.buffer, self.text_id);
            }
        });
    }

    /// Line numbers for each hard line of `text`
    fn show_gutter(ui: &mut egui::Ui, text: &str, font_id: &egui::FontId) {
        let lines = text.split('\n').count();
        let numbers = (1..=lines).map(|n| n.to_string()).collect::<Vec<_>>().join("\n");

        ui.add(
            egui::Label::new(
                egui::RichText::new(numbers)
                    .font(font_id.clone())
                    .color(ui.visuals().weak_text_color()),
            )
            .selectable(false),
        );
    }

    /// Scaled-down overview of the whole document
    fn show_minimap(ui: &mut egui::Ui, text: &str, id: egui::Id) {
        egui::ScrollArea::vertical()
            .id_salt(id.with("minimap"))
            .max_width(MINIMAP_WIDTH)
            .auto_shrink([true, false])
            .show(ui, |ui| {
                ui.set_width(MINIMAP_WIDTH);
                ui.add(
                    egui::Label::new(
                        egui::RichText::new(text)
                            .font(egui::FontId::monospace(3.0))
                            .color(ui.visuals().weak_text_color()),
                    )
                    .wrap_mode(egui::TextWrapMode::Truncate)
                    .selectable(false),
                );
            });
    }
}

/// Format command bound to a pressed shortcut.
///
/// Ctrl+B and Ctrl+I only apply while the paper body has focus, so the
/// title field and other inputs keep their own handling of those keys.
fn format_shortcut(
    body_focused: bool,
    modifiers: egui::Modifiers,
    pressed: impl Fn(egui::Key) -> bool,
) -> Option<FormatCommand> {
    if !body_focused || !modifiers.command {
        return None;
    }
    if pressed(egui::Key::B) {
        Some(FormatCommand::Bold)
    } else if pressed(egui::Key::I) {
        Some(FormatCommand::Italic)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_shortcut_requires_body_focus() {
        let ctrl_b = |key: egui::Key| key == egui::Key::B;
        assert_eq!(format_shortcut(false, egui::Modifiers::COMMAND, ctrl_b), None);
        assert_eq!(
            format_shortcut(true, egui::Modifiers::COMMAND, ctrl_b),
            Some(FormatCommand::Bold)
        );
    }

    #[test]
    fn test_format_shortcut_keys() {
        let ctrl_i = |key: egui::Key| key == egui::Key::I;
        assert_eq!(
            format_shortcut(true, egui::Modifiers::COMMAND, ctrl_i),
            Some(FormatCommand::Italic)
        );
        assert_eq!(format_shortcut(true, egui::Modifiers::NONE, ctrl_i), None);
        assert_eq!(format_shortcut(true, egui::Modifiers::COMMAND, |_| false), None);
    }
}
