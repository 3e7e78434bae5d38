//! Dashboard, paper lists and template gallery

use std::time::SystemTime;

use eframe::egui;

use crate::app::{display_title, PaperdeskApp, Route};
use crate::core::stats::{self, DocumentStats};
use crate::core::templates::{self, PaperTemplate};

/// Number of papers listed under "Recent" on the dashboard
const RECENT_LIMIT: usize = 5;

/// One row of a paper list
struct PaperRow {
    id: String,
    title: String,
    stats: DocumentStats,
    unsaved: bool,
    modified: SystemTime,
}

/// Dashboard and list pages
pub struct DashboardPanel;

impl DashboardPanel {
    /// Show the dashboard
    pub fn show(ui: &mut egui::Ui, app: &mut PaperdeskApp) {
        let rows = Self::rows_by_recency(app);
        let total_words: usize = rows.iter().map(|row| row.stats.words).sum();
        let unsaved = rows.iter().filter(|row| row.unsaved).count();

        let greeting = match app.user {
            Some(ref user) => format!("Welcome back, {}", user.label()),
            None => "Welcome".to_string(),
        };
        ui.heading(greeting);
        ui.add_space(12.0);

        ui.horizontal(|ui| {
            Self::stat_card(ui, "Open papers", rows.len().to_string());
            Self::stat_card(ui, "Words written", total_words.to_string());
            Self::stat_card(ui, "Unsaved", unsaved.to_string());
        });
        ui.add_space(16.0);

        ui.label(egui::RichText::new("Quick actions").strong());
        ui.horizontal(|ui| {
            if ui.button("➕ New paper").clicked() {
                let title = std::mem::take(&mut app.new_paper_title);
                app.create_paper(&templates::BLANK, &title);
            }
            if ui.button("📋 Browse templates").clicked() {
                app.navigate(Route::Templates);
            }
            if ui.button("⚙ Settings").clicked() {
                app.navigate(Route::Settings);
            }
        });
        ui.add_space(16.0);

        ui.label(egui::RichText::new("Recent papers").strong());
        if rows.is_empty() {
            ui.weak("No papers yet. Create one to get started.");
        }
        Self::paper_list(ui, app, rows.into_iter().take(RECENT_LIMIT));
    }

    /// Show all open papers in opening order
    pub fn show_papers(ui: &mut egui::Ui, app: &mut PaperdeskApp) {
        ui.heading("My papers");
        ui.add_space(12.0);
        let rows: Vec<PaperRow> = app.papers.iter().map(Self::row).collect();
        if rows.is_empty() {
            Self::show_empty(ui, app);
            return;
        }
        Self::paper_list(ui, app, rows.into_iter());
    }

    /// Show open papers, most recently edited first
    pub fn show_recent(ui: &mut egui::Ui, app: &mut PaperdeskApp) {
        ui.heading("Recent");
        ui.add_space(12.0);
        let rows = Self::rows_by_recency(app);
        if rows.is_empty() {
            ui.weak("Nothing edited yet.");
            return;
        }
        Self::paper_list(ui, app, rows.into_iter());
    }

    /// Show the template gallery
    pub fn show_templates(ui: &mut egui::Ui, app: &mut PaperdeskApp) {
        ui.heading("Templates");
        ui.add_space(12.0);
        ui.horizontal(|ui| {
            ui.label("Title");
            ui.add(egui::TextEdit::singleline(&mut app.new_paper_title).hint_text("Untitled Paper"));
        });
        ui.add_space(8.0);

        let mut chosen: Option<PaperTemplate> = None;
        egui::ScrollArea::vertical()
            .id_salt("templates_scroll")
            .show(ui, |ui| {
                for template in templates::TEMPLATES {
                    egui::Frame::group(ui.style()).show(ui, |ui| {
                        ui.set_width(ui.available_width());
                        ui.label(egui::RichText::new(template.name).strong());
                        ui.weak(template.description);
                        if ui.button("Use template").clicked() {
                            chosen = Some(template);
                        }
                    });
                    ui.add_space(6.0);
                }
            });

        if let Some(template) = chosen {
            let title = std::mem::take(&mut app.new_paper_title);
            app.create_paper(&template, &title);
        }
    }

    /// Shown where an editor would be but no paper is open
    pub fn show_empty(ui: &mut egui::Ui, app: &mut PaperdeskApp) {
        ui.vertical_centered(|ui| {
            ui.add_space(100.0);
            ui.heading("No paper open");
            ui.add_space(20.0);
            ui.label("Create a paper or start from a template.");
            ui.add_space(10.0);
            ui.horizontal(|ui| {
                if ui.button("➕ New paper").clicked() {
                    app.create_paper(&templates::BLANK, "");
                }
                if ui.button("📋 Templates").clicked() {
                    app.navigate(Route::Templates);
                }
            });
            ui.add_space(20.0);
            ui.label("Keyboard shortcuts:");
            ui.label("  Ctrl+S - Save");
            ui.label("  Ctrl+P - Toggle preview");
            ui.label("  Ctrl+B / Ctrl+I - Bold / italic");
            ui.label("  F11 - Fullscreen editor");
        });
    }

    fn row(paper: &crate::app::OpenPaper) -> PaperRow {
        let session = &paper.session;
        PaperRow {
            id: session.paper_id().to_owned(),
            title: display_title(session.title()).to_owned(),
            stats: stats::analyze(&session.store().content()),
            unsaved: session.can_save(),
            modified: session.last_modified(),
        }
    }

    fn rows_by_recency(app: &PaperdeskApp) -> Vec<PaperRow> {
        let mut rows: Vec<PaperRow> = app.papers.iter().map(Self::row).collect();
        rows.sort_by(|a, b| b.modified.cmp(&a.modified));
        rows
    }

    fn stat_card(ui: &mut egui::Ui, label: &str, value: String) {
        egui::Frame::group(ui.style()).inner_margin(12.0).show(ui, |ui| {
            ui.set_min_width(140.0);
            ui.vertical(|ui| {
                ui.weak(label);
                ui.heading(value);
            });
        });
    }

    fn paper_list(ui: &mut egui::Ui, app: &mut PaperdeskApp, rows: impl Iterator<Item = PaperRow>) {
        let mut open = None;
        let mut close = None;

        for row in rows {
            egui::Frame::group(ui.style()).show(ui, |ui| {
                ui.set_width(ui.available_width());
                ui.horizontal(|ui| {
                    let title = if row.unsaved {
                        format!("{}*", row.title)
                    } else {
                        row.title.clone()
                    };
                    if ui.link(egui::RichText::new(title).strong()).clicked() {
                        open = Some(row.id.clone());
                    }
                    ui.weak(format!("{} words", row.stats.words));
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.small_button("✕").on_hover_text("Close").clicked() {
                            close = Some(row.id.clone());
                        }
                    });
                });
                if !row.stats.outline.is_empty() {
                    ui.weak(row.stats.outline.join(" · "));
                }
            });
        }

        if let Some(id) = open {
            app.activate_paper(&id);
        }
        if let Some(id) = close {
            app.request_close(&id);
        }
    }
}
