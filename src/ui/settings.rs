//! Settings view: editor preferences, profile and password

use eframe::egui;

use crate::app::PaperdeskApp;
use crate::backend::settings::{Theme, UserSettings};
use crate::core::editor_config::{MAX_FONT_SIZE, MIN_FONT_SIZE};

/// Settings page form state
#[derive(Debug, Clone, Default)]
pub struct SettingsForm {
    /// Working copy of the user's settings row
    pub edited: Option<UserSettings>,
    pub display_name: String,
    pub new_password: String,
    pub confirm_password: String,
}

impl SettingsForm {
    /// Start editing from `settings`
    pub fn reset(&mut self, settings: &UserSettings) {
        self.edited = Some(settings.clone());
    }

    pub fn clear_password(&mut self) {
        self.new_password.clear();
        self.confirm_password.clear();
    }

    pub fn validate_password(&self) -> Result<(), String> {
        if self.new_password.is_empty() {
            return Err("Please enter a new password".to_string());
        }
        if self.new_password != self.confirm_password {
            return Err("Passwords do not match".to_string());
        }
        Ok(())
    }

    /// Whether the working copy differs from `saved`
    pub fn has_changes(&self, saved: Option<&UserSettings>) -> bool {
        match (saved, &self.edited) {
            (Some(saved), Some(edited)) => !saved.diff(edited).is_empty(),
            _ => false,
        }
    }
}

/// Settings panel
pub struct SettingsPanel;

impl SettingsPanel {
    /// Show the settings panel
    pub fn show(ui: &mut egui::Ui, app: &mut PaperdeskApp) {
        egui::ScrollArea::vertical()
            .id_salt("settings_scroll")
            .show(ui, |ui| {
                ui.heading("Settings");
                ui.add_space(12.0);

                Self::show_preferences(ui, app);
                ui.add_space(16.0);
                Self::show_profile(ui, app);
                ui.add_space(16.0);
                Self::show_password(ui, app);
            });
    }

    fn show_preferences(ui: &mut egui::Ui, app: &mut PaperdeskApp) {
        let has_changes = app.settings_form.has_changes(app.settings.as_ref());
        let Some(ref mut edited) = app.settings_form.edited else {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label("Loading settings...");
            });
            return;
        };

        ui.collapsing("Appearance", |ui| {
            ui.horizontal(|ui| {
                ui.label("Theme");
                for theme in Theme::ALL {
                    ui.selectable_value(&mut edited.theme, theme, theme.label());
                }
            });
            ui.horizontal(|ui| {
                ui.label("Preview font size");
                ui.add(egui::Slider::new(&mut edited.preview_font_size, 10.0..=32.0));
            });
        });

        ui.collapsing("Editor", |ui| {
            ui.horizontal(|ui| {
                ui.label("Font size");
                ui.add(egui::Slider::new(
                    &mut edited.editor_font_size,
                    MIN_FONT_SIZE..=MAX_FONT_SIZE,
                ));
            });
            ui.horizontal(|ui| {
                ui.label("Font family");
                egui::ComboBox::from_id_salt("font_family")
                    .selected_text(edited.editor_font_family.as_str())
                    .show_ui(ui, |ui| {
                        for family in ["monospace", "proportional"] {
                            ui.selectable_value(&mut edited.editor_font_family, family.to_string(), family);
                        }
                    });
            });
            ui.checkbox(&mut edited.show_line_numbers, "Show line numbers");
            ui.checkbox(&mut edited.word_wrap, "Word wrap");
            ui.checkbox(&mut edited.minimap_enabled, "Show minimap");
            ui.checkbox(&mut edited.vim_mode_enabled, "Vim mode");
            ui.horizontal(|ui| {
                ui.label("Auto-save every");
                ui.add(
                    egui::DragValue::new(&mut edited.auto_save_interval)
                        .range(0..=3600)
                        .suffix(" s"),
                );
                ui.weak("(0 disables)");
            });
        });

        ui.collapsing("Notifications", |ui| {
            ui.checkbox(&mut edited.notifications_enabled, "Enable notifications");
            ui.checkbox(&mut edited.email_notifications, "Email notifications");
        });

        ui.add_space(8.0);
        let mut save = false;
        let mut revert = false;
        ui.horizontal(|ui| {
            save = ui
                .add_enabled(has_changes && !app.is_busy(), egui::Button::new("Save settings"))
                .clicked();
            revert = ui.add_enabled(has_changes, egui::Button::new("Revert")).clicked();
        });

        if save {
            app.save_settings();
        }
        if revert {
            if let Some(saved) = app.settings.clone() {
                app.settings_form.reset(&saved);
            }
        }
    }

    fn show_profile(ui: &mut egui::Ui, app: &mut PaperdeskApp) {
        ui.label(egui::RichText::new("Profile").strong());
        if let Some(ref user) = app.user {
            ui.weak(user.email.as_str());
        }
        ui.horizontal(|ui| {
            ui.label("Display name");
            ui.text_edit_singleline(&mut app.settings_form.display_name);
        });
        if ui
            .add_enabled(!app.is_busy(), egui::Button::new("Update profile"))
            .clicked()
        {
            app.update_profile();
        }
    }

    fn show_password(ui: &mut egui::Ui, app: &mut PaperdeskApp) {
        ui.label(egui::RichText::new("Change password").strong());
        ui.add(
            egui::TextEdit::singleline(&mut app.settings_form.new_password)
                .password(true)
                .hint_text("New password"),
        );
        ui.add(
            egui::TextEdit::singleline(&mut app.settings_form.confirm_password)
                .password(true)
                .hint_text("Confirm new password"),
        );
        if ui
            .add_enabled(!app.is_busy(), egui::Button::new("Update password"))
            .clicked()
        {
            app.update_password();
        }
    }
}
