//! Main application state and UI coordination

use std::future::Future;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use eframe::egui;
use egui_commonmark::CommonMarkCache;
use tokio::runtime::Handle;

use crate::backend::identity::{require_auth, Access, AuthData, IdentityProvider, ProfilePatch, User};
use crate::backend::settings::{SettingsStore, Theme, UserSettings};
use crate::backend::{Backend, BackendError, DocumentSink};
use crate::core::config::AppConfig;
use crate::core::editor_config::{EditorConfig, EditorConfigPatch};
use crate::core::export;
use crate::core::session::{EditorHooks, EditorSession, SaveOutcome, SaveTicket};
use crate::core::templates::PaperTemplate;
use crate::ui::auth::{AuthForm, AuthPanel};
use crate::ui::dashboard::DashboardPanel;
use crate::ui::editor::{EditorAction, EditorView};
use crate::ui::settings::{SettingsForm, SettingsPanel};
use crate::ui::sidebar::Sidebar;

/// Top-level views
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Route {
    #[default]
    SignIn,
    Dashboard,
    Papers,
    Templates,
    Recent,
    Editor,
    Settings,
}

/// Results of backend requests, delivered back to the UI thread
#[derive(Debug)]
pub enum AppEvent {
    SessionRestored(Result<Access, BackendError>),
    SignedIn(Result<AuthData, BackendError>),
    SignedOut(Result<(), BackendError>),
    PasswordResetSent(Result<(), BackendError>),
    PasswordUpdated(Result<(), BackendError>),
    ProfileUpdated(Result<Option<User>, BackendError>),
    SettingsLoaded(Result<UserSettings, BackendError>),
    SettingsSaved(Result<UserSettings, BackendError>),
    PaperCreated { title: String, result: Result<(), BackendError> },
    PaperSaved { ticket: SaveTicket, result: Result<(), BackendError> },
}

/// Transient message shown at the bottom of the window
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Info(String),
    Error(String),
}

/// An open paper and its widget state
pub struct OpenPaper {
    pub session: EditorSession,
    pub view: EditorView,
}

/// Main application state
pub struct PaperdeskApp {
    runtime: Handle,
    backend: Backend,
    events_tx: mpsc::Sender<AppEvent>,
    events_rx: mpsc::Receiver<AppEvent>,
    ctx: egui::Context,
    /// Requests still waiting for a response
    pending_requests: usize,
    /// Application configuration
    pub config: AppConfig,
    /// Signed-in user
    pub user: Option<User>,
    /// Settings row of the signed-in user
    pub settings: Option<UserSettings>,
    pub route: Route,
    /// Open papers in opening order
    pub papers: Vec<OpenPaper>,
    pub active_paper: Option<String>,
    /// Paper waiting for a discard confirmation before closing
    pub confirm_close: Option<String>,
    pub auth: AuthForm,
    pub settings_form: SettingsForm,
    pub notice: Option<Notice>,
    /// Title typed on the templates page
    pub new_paper_title: String,
    /// Commonmark cache for preview
    pub commonmark_cache: CommonMarkCache,
}

impl PaperdeskApp {
    /// Create a new application instance and start restoring the session
    pub fn new(cc: &eframe::CreationContext<'_>, runtime: Handle, backend: Backend, config: AppConfig) -> Self {
        egui_extras::install_image_loaders(&cc.egui_ctx);
        apply_theme(&cc.egui_ctx, config.ui.theme);

        let (events_tx, events_rx) = mpsc::channel();
        let auth = AuthForm::with_email(config.ui.last_email.clone().unwrap_or_default());

        let mut app = Self {
            runtime,
            backend,
            events_tx,
            events_rx,
            ctx: cc.egui_ctx.clone(),
            pending_requests: 0,
            config,
            user: None,
            settings: None,
            route: Route::SignIn,
            papers: Vec::new(),
            active_paper: None,
            confirm_close: None,
            auth,
            settings_form: SettingsForm::default(),
            notice: None,
            new_paper_title: String::new(),
            commonmark_cache: CommonMarkCache::default(),
        };

        let backend = app.backend.clone();
        app.spawn_event(async move { AppEvent::SessionRestored(require_auth(&backend).await) });
        app
    }

    /// Whether a backend request is in flight
    pub fn is_busy(&self) -> bool {
        self.pending_requests > 0
    }

    pub fn backend_description(&self) -> String {
        self.backend.describe()
    }

    /// Run `request` on the runtime and deliver its event on a later frame
    fn spawn_event<F>(&mut self, request: F)
    where
        F: Future<Output = AppEvent> + Send + 'static,
    {
        self.pending_requests += 1;
        let tx = self.events_tx.clone();
        let ctx = self.ctx.clone();
        self.runtime.spawn(async move {
            let event = request.await;
            if tx.send(event).is_err() {
                tracing::debug!("App closed before a backend response arrived");
            }
            ctx.request_repaint();
        });
    }

    /// Go to `route`; everything but sign-in requires a user
    pub fn navigate(&mut self, route: Route) {
        self.route = if self.user.is_some() { route } else { Route::SignIn };
    }

    pub fn toggle_sidebar(&mut self) {
        self.config.ui.sidebar_collapsed = !self.config.ui.sidebar_collapsed;
        self.save_config();
    }

    fn save_config(&self) {
        if let Err(e) = self.config.save() {
            tracing::warn!("Failed to save config: {:#}", e);
        }
    }

    pub fn sign_in(&mut self) {
        if let Err(message) = self.auth.validate() {
            self.auth.error = Some(message);
            return;
        }
        self.auth.begin_request();
        let email = self.auth.email.trim().to_owned();
        let password = self.auth.password.clone();
        let backend = self.backend.clone();
        self.spawn_event(async move { AppEvent::SignedIn(backend.sign_in(&email, &password).await) });
    }

    pub fn sign_up(&mut self) {
        if let Err(message) = self.auth.validate() {
            self.auth.error = Some(message);
            return;
        }
        self.auth.begin_request();
        let email = self.auth.email.trim().to_owned();
        let password = self.auth.password.clone();
        let display_name = self.auth.display_name.trim().to_owned();
        let backend = self.backend.clone();
        self.spawn_event(async move {
            AppEvent::SignedIn(backend.sign_up(&email, &password, &display_name).await)
        });
    }

    pub fn request_password_reset(&mut self) {
        if let Err(message) = self.auth.validate() {
            self.auth.error = Some(message);
            return;
        }
        self.auth.begin_request();
        let email = self.auth.email.trim().to_owned();
        let backend = self.backend.clone();
        self.spawn_event(async move { AppEvent::PasswordResetSent(backend.reset_password(&email).await) });
    }

    pub fn sign_out(&mut self) {
        if self.papers.iter().any(|paper| paper.session.can_save()) {
            self.notice = Some(Notice::Error(
                "You have unsaved changes. Save or close your papers before signing out.".to_string(),
            ));
            return;
        }
        let backend = self.backend.clone();
        self.spawn_event(async move { AppEvent::SignedOut(backend.sign_out().await) });
    }

    pub fn update_password(&mut self) {
        if let Err(message) = self.settings_form.validate_password() {
            self.notice = Some(Notice::Error(message));
            return;
        }
        let password = self.settings_form.new_password.clone();
        let backend = self.backend.clone();
        self.spawn_event(async move { AppEvent::PasswordUpdated(backend.update_password(&password).await) });
    }

    pub fn update_profile(&mut self) {
        let patch = ProfilePatch {
            display_name: Some(self.settings_form.display_name.trim().to_owned()),
            avatar_url: None,
        };
        let backend = self.backend.clone();
        self.spawn_event(async move {
            let result = match backend.update_profile(&patch).await {
                Ok(()) => backend.current_user().await,
                Err(e) => Err(e),
            };
            AppEvent::ProfileUpdated(result)
        });
    }

    /// Persist the edited settings as a partial update
    pub fn save_settings(&mut self) {
        let Some(user_id) = self.user.as_ref().map(|user| user.id.clone()) else {
            return;
        };
        let patch = match (&self.settings, &self.settings_form.edited) {
            (Some(current), Some(edited)) => current.diff(edited),
            _ => return,
        };
        if patch.is_empty() {
            self.notice = Some(Notice::Info("No changes to save".to_string()));
            return;
        }
        let backend = self.backend.clone();
        self.spawn_event(async move {
            AppEvent::SettingsSaved(backend.update_user_settings(&user_id, &patch).await)
        });
    }

    /// Editor configuration for newly opened papers
    pub fn editor_config(&self) -> EditorConfig {
        let mut config = self.config.editor.clone();
        if let Some(ref settings) = self.settings {
            config.merge(&EditorConfigPatch::from(settings));
        }
        config
    }

    /// Create a paper from `template`, open it and store it
    pub fn create_paper(&mut self, template: &PaperTemplate, title: &str) {
        let paper = template.instantiate(title);
        let (id, title, content) = (paper.id.clone(), paper.title.clone(), paper.content.clone());

        let ctx = self.ctx.clone();
        let hooks = EditorHooks::new()
            .on_change(move |_| ctx.request_repaint())
            .on_save(|content| tracing::debug!("Saving {} bytes", content.len()));
        let session = EditorSession::open(
            self.runtime.clone(),
            paper,
            self.editor_config(),
            self.config.debounce(),
            hooks,
        );
        let view = EditorView::new(&session);
        self.papers.push(OpenPaper { session, view });
        tracing::info!("Created paper {} from template {}", id, template.name);

        let backend = self.backend.clone();
        let paper_id = id.clone();
        self.spawn_event(async move {
            let result = backend.save_document(&paper_id, &title, &content).await;
            AppEvent::PaperCreated { title, result }
        });

        self.activate_paper(&id);
    }

    pub fn activate_paper(&mut self, id: &str) {
        if self.papers.iter().any(|paper| paper.session.paper_id() == id) {
            self.active_paper = Some(id.to_owned());
            self.navigate(Route::Editor);
        }
    }

    /// Close a paper, asking first when it has unsaved changes
    pub fn request_close(&mut self, id: &str) {
        let dirty = self
            .papers
            .iter()
            .any(|paper| paper.session.paper_id() == id && paper.session.can_save());
        if dirty {
            self.confirm_close = Some(id.to_owned());
        } else {
            self.close_paper(id);
        }
    }

    /// Close a paper; pending input is dropped with its session
    fn close_paper(&mut self, id: &str) {
        self.papers.retain(|paper| paper.session.paper_id() != id);
        if self.active_paper.as_deref() == Some(id) {
            self.active_paper = self.papers.last().map(|paper| paper.session.paper_id().to_owned());
            if self.active_paper.is_none() && self.route == Route::Editor {
                self.route = Route::Dashboard;
            }
        }
    }

    pub fn save_paper(&mut self, id: &str) {
        let Some(paper) = self.papers.iter_mut().find(|paper| paper.session.paper_id() == id) else {
            return;
        };
        let Some(ticket) = paper.session.begin_save() else {
            return;
        };
        let backend = self.backend.clone();
        self.spawn_event(async move {
            let result = backend
                .save_document(&ticket.paper_id, &ticket.title, ticket.content())
                .await;
            AppEvent::PaperSaved { ticket, result }
        });
    }

    /// Write the committed content of a paper to a `.md` file
    pub fn export_paper(&mut self, id: &str) {
        let Some(paper) = self.papers.iter_mut().find(|paper| paper.session.paper_id() == id) else {
            return;
        };
        paper.session.flush_input();
        let content = paper.session.store().content();
        let file_name = export::suggested_file_name(paper.session.title());

        let Some(path) = rfd::FileDialog::new()
            .set_file_name(file_name)
            .add_filter("Markdown", &["md"])
            .save_file()
        else {
            return;
        };

        self.notice = Some(match export::export_markdown(&path, &content) {
            Ok(path) => Notice::Info(format!("Exported to {}", path.display())),
            Err(e) => {
                tracing::error!("Export failed: {:#}", e);
                Notice::Error(format!("Export failed: {:#}", e))
            }
        });
    }

    fn handle_event(&mut self, event: AppEvent) {
        self.pending_requests = self.pending_requests.saturating_sub(1);

        match event {
            AppEvent::SessionRestored(Ok(Access::Granted(user))) => self.enter(user),
            AppEvent::SessionRestored(Ok(Access::SignInRequired)) => self.route = Route::SignIn,
            AppEvent::SessionRestored(Err(e)) => {
                tracing::warn!("Could not restore session: {}", e);
                self.notice = Some(Notice::Error(format!("Could not restore session: {}", e)));
            }
            AppEvent::SignedIn(Ok(AuthData { user, session: Some(_) })) => {
                self.config.ui.last_email = Some(user.email.clone());
                self.save_config();
                self.auth.clear_secrets();
                self.enter(user);
            }
            AppEvent::SignedIn(Ok(AuthData { session: None, .. })) => {
                self.auth.clear_secrets();
                self.auth.info = Some("Check your email to confirm your account, then sign in.".to_string());
            }
            AppEvent::SignedIn(Err(e)) => self.auth.error = Some(e.to_string()),
            AppEvent::SignedOut(result) => {
                if let Err(e) = result {
                    tracing::warn!("Sign-out request failed: {}", e);
                }
                self.leave();
            }
            AppEvent::PasswordResetSent(Ok(())) => {
                self.auth.info = Some("Check your email for a password reset link.".to_string());
            }
            AppEvent::PasswordResetSent(Err(e)) => self.auth.error = Some(e.to_string()),
            AppEvent::PasswordUpdated(Ok(())) => {
                self.settings_form.clear_password();
                self.notice = Some(Notice::Info("Password updated".to_string()));
            }
            AppEvent::PasswordUpdated(Err(e)) => self.notice = Some(Notice::Error(e.to_string())),
            AppEvent::ProfileUpdated(Ok(Some(user))) => {
                self.settings_form.display_name = user.display_name.clone().unwrap_or_default();
                self.user = Some(user);
                self.notice = Some(Notice::Info("Profile updated".to_string()));
            }
            AppEvent::ProfileUpdated(Ok(None)) => self.leave(),
            AppEvent::ProfileUpdated(Err(e)) => self.notice = Some(Notice::Error(e.to_string())),
            AppEvent::SettingsLoaded(Ok(settings)) => self.apply_settings(settings),
            AppEvent::SettingsLoaded(Err(e)) => {
                tracing::warn!("Using default settings: {}", e);
                if !matches!(e, BackendError::SettingsNotFound(_)) {
                    self.notice = Some(Notice::Error(format!("Could not load settings: {}", e)));
                }
                if let Some(user_id) = self.user.as_ref().map(|user| user.id.clone()) {
                    self.apply_settings(UserSettings::new(user_id));
                }
            }
            AppEvent::SettingsSaved(Ok(settings)) => {
                self.apply_settings(settings);
                self.notice = Some(Notice::Info("Settings saved".to_string()));
            }
            AppEvent::SettingsSaved(Err(e)) => {
                self.notice = Some(Notice::Error(format!("Could not save settings: {}", e)));
            }
            AppEvent::PaperCreated { title, result } => {
                if let Err(e) = result {
                    tracing::warn!("Failed to store new paper: {}", e);
                    self.notice = Some(Notice::Error(format!("Could not create \"{}\": {}", title, e)));
                }
            }
            AppEvent::PaperSaved { ticket, result } => self.finish_save(ticket, result),
        }
    }

    fn finish_save(&mut self, ticket: SaveTicket, result: Result<(), BackendError>) {
        let title = ticket.title.clone();
        let Some(paper) = self
            .papers
            .iter_mut()
            .find(|paper| paper.session.paper_id() == ticket.paper_id)
        else {
            // Closed while saving; only failures are worth reporting
            if let Err(e) = result {
                self.notice = Some(Notice::Error(format!("Could not save \"{}\": {}", title, e)));
            }
            return;
        };

        match paper.session.finish_save(ticket, result) {
            Ok(SaveOutcome::SavedWithNewerEdits) => {
                tracing::debug!("Paper {} changed while saving", paper.session.paper_id());
            }
            Ok(_) => {}
            Err(e) if e.is_auth() => {
                self.notice = Some(Notice::Error(format!(
                    "Could not save \"{}\": your session has expired. Sign in again to save.",
                    title
                )));
            }
            Err(e) => {
                self.notice = Some(Notice::Error(format!("Could not save \"{}\": {}", title, e)));
            }
        }
    }

    /// Signed in: show the dashboard and load the user's settings
    fn enter(&mut self, user: User) {
        tracing::info!("Signed in as {}", user.id);
        let user_id = user.id.clone();
        self.settings_form.display_name = user.display_name.clone().unwrap_or_default();
        self.user = Some(user);
        self.route = Route::Dashboard;

        let backend = self.backend.clone();
        self.spawn_event(async move { AppEvent::SettingsLoaded(backend.get_user_settings(&user_id).await) });
    }

    /// Signed out: drop everything that belonged to the user
    fn leave(&mut self) {
        tracing::info!("Signed out");
        self.user = None;
        self.settings = None;
        self.papers.clear();
        self.active_paper = None;
        self.confirm_close = None;
        self.settings_form = SettingsForm::default();
        self.route = Route::SignIn;
    }

    /// Push loaded settings into the theme and every open editor
    fn apply_settings(&mut self, settings: UserSettings) {
        let patch = EditorConfigPatch::from(&settings);
        for paper in &self.papers {
            paper.session.store().update_config(&patch);
        }
        apply_theme(&self.ctx, settings.theme);
        self.settings_form.reset(&settings);
        self.settings = Some(settings);
    }

    /// Save every paper whose auto-save interval has elapsed
    fn run_autosave(&mut self) {
        let Some(interval) = self
            .settings
            .as_ref()
            .map(|settings| Duration::from_secs(settings.auto_save_interval))
        else {
            return;
        };
        if interval.is_zero() {
            return;
        }

        let now = Instant::now();
        let due: Vec<String> = self
            .papers
            .iter()
            .filter(|paper| paper.session.autosave_due(interval, now))
            .map(|paper| paper.session.paper_id().to_owned())
            .collect();
        for id in due {
            tracing::debug!("Auto-saving paper {}", id);
            self.save_paper(&id);
        }

        if self.papers.iter().any(|paper| paper.session.can_save()) {
            self.ctx.request_repaint_after(Duration::from_secs(1));
        }
    }

    fn active_view_fullscreen(&self) -> bool {
        self.route == Route::Editor
            && self
                .papers
                .iter()
                .any(|paper| Some(paper.session.paper_id()) == self.active_paper.as_deref() && paper.view.is_fullscreen())
    }

    /// Render the top bar
    fn render_top_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Paperdesk");
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("Sign out").clicked() {
                        self.sign_out();
                    }
                    if let Some(ref user) = self.user {
                        ui.label(user.label());
                    }
                    if self.is_busy() {
                        ui.spinner();
                    }
                    ui.weak(self.backend.describe());
                });
            });
        });
    }

    fn render_notice(&mut self, ctx: &egui::Context) {
        let Some(notice) = self.notice.clone() else {
            return;
        };
        egui::TopBottomPanel::bottom("notice_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                match notice {
                    Notice::Info(ref message) => ui.label(message.as_str()),
                    Notice::Error(ref message) => ui.colored_label(ui.visuals().error_fg_color, message.as_str()),
                };
                if ui.small_button("✕").clicked() {
                    self.notice = None;
                }
            });
        });
    }

    /// Render open paper tabs and the active editor
    fn render_editor(&mut self, ui: &mut egui::Ui) {
        if !self.active_view_fullscreen() && self.papers.len() > 1 {
            self.render_tabs(ui);
            ui.separator();
        }

        let preview_font_size = self
            .settings
            .as_ref()
            .map_or(16.0, |settings| settings.preview_font_size);
        let Some(id) = self.active_paper.clone() else {
            DashboardPanel::show_empty(ui, self);
            return;
        };
        let Some(paper) = self.papers.iter_mut().find(|paper| paper.session.paper_id() == id) else {
            return;
        };

        let action = paper
            .view
            .show(ui, &mut paper.session, &mut self.commonmark_cache, preview_font_size);
        match action {
            Some(EditorAction::Save) => self.save_paper(&id),
            Some(EditorAction::Export) => self.export_paper(&id),
            Some(EditorAction::OpenSettings) => self.navigate(Route::Settings),
            None => {}
        }
    }

    /// Show paper tabs
    fn render_tabs(&mut self, ui: &mut egui::Ui) {
        let mut activate = None;
        let mut close = None;

        ui.horizontal(|ui| {
            for paper in &self.papers {
                let id = paper.session.paper_id();
                let title = display_title(paper.session.title());
                let title = if paper.session.can_save() {
                    format!("{}*", title)
                } else {
                    title.to_owned()
                };

                let is_active = self.active_paper.as_deref() == Some(id);
                if ui.selectable_label(is_active, title).clicked() {
                    activate = Some(id.to_owned());
                }
                if ui.small_button("✕").on_hover_text("Close").clicked() {
                    close = Some(id.to_owned());
                }
                ui.separator();
            }
        });

        if let Some(id) = activate {
            self.activate_paper(&id);
        }
        if let Some(id) = close {
            self.request_close(&id);
        }
    }

    fn render_close_confirmation(&mut self, ctx: &egui::Context) {
        let Some(id) = self.confirm_close.clone() else {
            return;
        };

        let mut discard = None;
        egui::Window::new("Unsaved changes")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label("This paper has unsaved changes. Discard them?");
                ui.horizontal(|ui| {
                    if ui.button("Discard").clicked() {
                        discard = Some(true);
                    }
                    if ui.button("Cancel").clicked() {
                        discard = Some(false);
                    }
                });
            });

        match discard {
            Some(true) => {
                self.confirm_close = None;
                self.close_paper(&id);
            }
            Some(false) => self.confirm_close = None,
            None => {}
        }
    }
}

impl eframe::App for PaperdeskApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_event(event);
        }

        // Auth gate
        if self.user.is_none() {
            self.route = Route::SignIn;
        }

        if self.route == Route::SignIn {
            self.render_notice(ctx);
            egui::CentralPanel::default().show(ctx, |ui| {
                AuthPanel::show(ui, self);
            });
            return;
        }

        self.run_autosave();

        if !self.active_view_fullscreen() {
            self.render_top_bar(ctx);

            let width = if self.config.ui.sidebar_collapsed { 48.0 } else { 220.0 };
            egui::SidePanel::left("sidebar")
                .resizable(false)
                .exact_width(width)
                .show(ctx, |ui| {
                    Sidebar::show(ui, self);
                });
        }

        self.render_notice(ctx);

        egui::CentralPanel::default().show(ctx, |ui| match self.route {
            Route::Dashboard => DashboardPanel::show(ui, self),
            Route::Papers => DashboardPanel::show_papers(ui, self),
            Route::Recent => DashboardPanel::show_recent(ui, self),
            Route::Templates => DashboardPanel::show_templates(ui, self),
            Route::Settings => SettingsPanel::show(ui, self),
            Route::Editor => self.render_editor(ui),
            Route::SignIn => {}
        });

        self.render_close_confirmation(ctx);
    }
}

/// Theme preference for the window visuals
fn apply_theme(ctx: &egui::Context, theme: Theme) {
    ctx.set_theme(match theme {
        Theme::Light => egui::ThemePreference::Light,
        Theme::Dark => egui::ThemePreference::Dark,
        Theme::System => egui::ThemePreference::System,
    });
}

/// Title shown for a paper, with a placeholder for blank titles
pub fn display_title(title: &str) -> &str {
    let title = title.trim();
    if title.is_empty() {
        "Untitled Paper"
    } else {
        title
    }
}
