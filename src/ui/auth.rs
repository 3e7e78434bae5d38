//! Sign-in, sign-up and password reset views

use eframe::egui;

use crate::app::PaperdeskApp;

/// Which auth form is shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    #[default]
    SignIn,
    SignUp,
    ResetPassword,
}

/// Auth form fields and the last provider response
#[derive(Debug, Clone, Default)]
pub struct AuthForm {
    pub mode: AuthMode,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub display_name: String,
    /// Provider error, shown verbatim
    pub error: Option<String>,
    pub info: Option<String>,
}

impl AuthForm {
    pub fn with_email(email: String) -> Self {
        Self {
            email,
            ..Default::default()
        }
    }

    /// Switch forms, keeping the email
    pub fn switch_to(&mut self, mode: AuthMode) {
        self.mode = mode;
        self.error = None;
        self.info = None;
        self.clear_secrets();
    }

    pub fn begin_request(&mut self) {
        self.error = None;
        self.info = None;
    }

    pub fn clear_secrets(&mut self) {
        self.password.clear();
        self.confirm_password.clear();
    }

    /// Local checks before anything is sent to the provider
    pub fn validate(&self) -> Result<(), String> {
        let email = self.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err("Please enter a valid email address".to_string());
        }

        match self.mode {
            AuthMode::SignIn if self.password.is_empty() => Err("Please enter your password".to_string()),
            AuthMode::SignUp if self.password.is_empty() => Err("Please choose a password".to_string()),
            AuthMode::SignUp if self.password != self.confirm_password => {
                Err("Passwords do not match".to_string())
            }
            _ => Ok(()),
        }
    }
}

/// Centered auth card
pub struct AuthPanel;

impl AuthPanel {
    /// Show the auth panel
    pub fn show(ui: &mut egui::Ui, app: &mut PaperdeskApp) {
        ui.vertical_centered(|ui| {
            ui.add_space(80.0);
            ui.heading("Paperdesk");
            ui.weak("Write, format and preview academic papers");
            ui.add_space(20.0);

            egui::Frame::group(ui.style()).inner_margin(16.0).show(ui, |ui| {
                ui.set_width(340.0);
                match app.auth.mode {
                    AuthMode::SignIn => Self::show_sign_in(ui, app),
                    AuthMode::SignUp => Self::show_sign_up(ui, app),
                    AuthMode::ResetPassword => Self::show_reset(ui, app),
                }

                if let Some(ref error) = app.auth.error {
                    ui.add_space(8.0);
                    ui.colored_label(ui.visuals().error_fg_color, error.as_str());
                }
                if let Some(ref info) = app.auth.info {
                    ui.add_space(8.0);
                    ui.label(info.as_str());
                }
                if app.is_busy() {
                    ui.add_space(8.0);
                    ui.spinner();
                }
            });

            ui.add_space(12.0);
            ui.weak(app.backend_description());
        });
    }

    fn show_sign_in(ui: &mut egui::Ui, app: &mut PaperdeskApp) {
        ui.label(egui::RichText::new("Sign in").strong());
        ui.add_space(8.0);

        Self::email_field(ui, &mut app.auth.email);
        let password = ui.add(
            egui::TextEdit::singleline(&mut app.auth.password)
                .password(true)
                .hint_text("Password"),
        );
        let submitted = password.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));

        ui.add_space(8.0);
        if ui.add_enabled(!app.is_busy(), egui::Button::new("Sign in")).clicked() || submitted {
            app.sign_in();
        }

        ui.horizontal(|ui| {
            if ui.link("Forgot password?").clicked() {
                app.auth.switch_to(AuthMode::ResetPassword);
            }
            if ui.link("Create an account").clicked() {
                app.auth.switch_to(AuthMode::SignUp);
            }
        });
    }

    fn show_sign_up(ui: &mut egui::Ui, app: &mut PaperdeskApp) {
        ui.label(egui::RichText::new("Create an account").strong());
        ui.add_space(8.0);

        ui.add(egui::TextEdit::singleline(&mut app.auth.display_name).hint_text("Display name"));
        Self::email_field(ui, &mut app.auth.email);
        ui.add(
            egui::TextEdit::singleline(&mut app.auth.password)
                .password(true)
                .hint_text("Password"),
        );
        ui.add(
            egui::TextEdit::singleline(&mut app.auth.confirm_password)
                .password(true)
                .hint_text("Confirm password"),
        );

        ui.add_space(8.0);
        if ui.add_enabled(!app.is_busy(), egui::Button::new("Sign up")).clicked() {
            app.sign_up();
        }
        if ui.link("Already have an account? Sign in").clicked() {
            app.auth.switch_to(AuthMode::SignIn);
        }
    }

    fn show_reset(ui: &mut egui::Ui, app: &mut PaperdeskApp) {
        ui.label(egui::RichText::new("Reset password").strong());
        ui.add_space(8.0);

        Self::email_field(ui, &mut app.auth.email);

        ui.add_space(8.0);
        if ui
            .add_enabled(!app.is_busy(), egui::Button::new("Send reset link"))
            .clicked()
        {
            app.request_password_reset();
        }
        if ui.link("Back to sign in").clicked() {
            app.auth.switch_to(AuthMode::SignIn);
        }
    }

    fn email_field(ui: &mut egui::Ui, email: &mut String) {
        ui.add(egui::TextEdit::singleline(email).hint_text("Email"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(mode: AuthMode, email: &str, password: &str, confirm: &str) -> AuthForm {
        AuthForm {
            mode,
            email: email.to_string(),
            password: password.to_string(),
            confirm_password: confirm.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_email() {
        let err = form(AuthMode::ResetPassword, "  ", "", "").validate().unwrap_err();
        assert_eq!(err, "Please enter a valid email address");
        assert!(form(AuthMode::ResetPassword, "a@b.org", "", "").validate().is_ok());
    }

    #[test]
    fn test_validate_sign_up_passwords() {
        let err = form(AuthMode::SignUp, "a@b.org", "secret1", "secret2").validate().unwrap_err();
        assert_eq!(err, "Passwords do not match");
        assert!(form(AuthMode::SignUp, "a@b.org", "secret1", "secret1").validate().is_ok());
    }

    #[test]
    fn test_validate_sign_in_needs_password() {
        assert!(form(AuthMode::SignIn, "a@b.org", "", "").validate().is_err());
        assert!(form(AuthMode::SignIn, "a@b.org", "pw", "").validate().is_ok());
    }

    #[test]
    fn test_switch_keeps_email_and_clears_secrets() {
        let mut auth = form(AuthMode::SignIn, "a@b.org", "pw", "pw");
        auth.error = Some("Invalid login credentials".to_string());
        auth.switch_to(AuthMode::SignUp);

        assert_eq!(auth.email, "a@b.org");
        assert!(auth.password.is_empty());
        assert!(auth.error.is_none());
    }
}
