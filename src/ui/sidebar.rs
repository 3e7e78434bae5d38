//! Collapsible navigation sidebar

use eframe::egui;

use crate::app::{display_title, PaperdeskApp, Route};
use crate::core::templates;

/// Navigation entries: icon, label, route
const NAV_ITEMS: [(&str, &str, Route); 5] = [
    ("🏠", "Dashboard", Route::Dashboard),
    ("📄", "My Papers", Route::Papers),
    ("📋", "Templates", Route::Templates),
    ("🕘", "Recent", Route::Recent),
    ("⚙", "Settings", Route::Settings),
];

/// Sidebar with navigation and open papers
pub struct Sidebar;

impl Sidebar {
    /// Show the sidebar
    pub fn show(ui: &mut egui::Ui, app: &mut PaperdeskApp) {
        let collapsed = app.config.ui.sidebar_collapsed;

        ui.vertical(|ui| {
            let toggle = if collapsed { "»" } else { "«" };
            if ui.button(toggle).on_hover_text("Toggle sidebar").clicked() {
                app.toggle_sidebar();
            }
            ui.separator();

            let new_label = if collapsed { "➕" } else { "➕ New Paper" };
            if ui.button(new_label).on_hover_text("New paper").clicked() {
                app.create_paper(&templates::BLANK, "");
            }
            ui.add_space(8.0);

            for (icon, label, route) in NAV_ITEMS {
                let text = if collapsed {
                    icon.to_string()
                } else {
                    format!("{} {}", icon, label)
                };
                let response = ui.selectable_label(app.route == route, text).on_hover_text(label);
                if response.clicked() {
                    app.navigate(route);
                }
            }

            // Open papers
            if !collapsed && !app.papers.is_empty() {
                ui.separator();
                ui.collapsing("Open Papers", |ui| {
                    let mut activate = None;
                    for paper in &app.papers {
                        let id = paper.session.paper_id();
                        let is_active = app.route == Route::Editor && app.active_paper.as_deref() == Some(id);
                        let mut title = display_title(paper.session.title()).to_owned();
                        if paper.session.can_save() {
                            title.push('*');
                        }
                        if ui.selectable_label(is_active, title).clicked() {
                            activate = Some(id.to_owned());
                        }
                    }
                    if let Some(id) = activate {
                        app.activate_paper(&id);
                    }
                });
            }
        });
    }
}
