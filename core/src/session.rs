//! Session management: login, registration, logout, restore, profile.
//!
//! The session is the in-memory `User` plus the `token`/`user` pair in
//! storage. Both are written together by `establish_session` and cleared
//! together by `logout`.

use serde_json::Value;
use tracing::{info, warn};

use crate::context::{AppContext, OnUnauthorized};
use crate::error::ApiError;
use crate::http::Transport;
use crate::multipart::MultipartForm;
use crate::outcome::Outcome;
use crate::storage::{Storage, TOKEN_KEY, USER_KEY};
use crate::types::{lenient_id, Credentials, ProfileUpdate, Upload, User};

pub const TEST_ACCOUNT_USERNAME: &str = "testuser";
pub const TEST_ACCOUNT_PASSWORD: &str = "123456";
pub const TEST_ACCOUNT_NAME: &str = "Test User";
pub const TEST_ACCOUNT_ID: u64 = 999;
pub const TEST_ACCOUNT_TOKEN: &str = "test-token";
const TEST_ACCOUNT_AVATAR: &str = "/assets/test-avatar.jpg";

/// Token stored when the backend accepts credentials without issuing one.
const FALLBACK_TOKEN: &str = "api-token";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub user: Option<User>,
}

fn is_test_account(username: &str, password: &str) -> bool {
    username == TEST_ACCOUNT_USERNAME && password == TEST_ACCOUNT_PASSWORD
}

fn test_account_user() -> User {
    User {
        id: TEST_ACCOUNT_ID,
        name: TEST_ACCOUNT_NAME.to_string(),
        username: TEST_ACCOUNT_USERNAME.to_string(),
        avatar: Some(TEST_ACCOUNT_AVATAR.to_string()),
        ..Default::default()
    }
}

/// A non-empty string field.
fn text<'a>(data: &'a Value, key: &str) -> Option<&'a str> {
    data.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn id_field(data: &Value, key: &str) -> Option<u64> {
    data.get(key).and_then(lenient_id).filter(|id| *id != 0)
}

/// The user and token carried by a login or register response.
fn auth_user(data: &Value, username: &str) -> (User, String) {
    let user = User {
        id: id_field(data, "id").or_else(|| id_field(data, "userId")).unwrap_or(0),
        name: text(data, "name")
            .or_else(|| text(data, "username"))
            .unwrap_or(username)
            .to_string(),
        username: text(data, "username").unwrap_or(username).to_string(),
        avatar: text(data, "avatar").map(str::to_string),
        ..Default::default()
    };
    let token = text(data, "token").unwrap_or(FALLBACK_TOKEN).to_string();
    (user, token)
}

/// Normalize a profile payload. Missing names are synthesized from the id
/// and avatar paths are resolved against `uploads`.
fn profile_user(data: &Value, requested: Option<u64>, uploads: &str) -> User {
    let found = id_field(data, "userId").or_else(|| id_field(data, "id"));
    let label = found.or(requested).map(|id| id.to_string()).unwrap_or_default();
    let username = text(data, "username").map(str::to_string);
    let avatar_url = text(data, "avatarUrl").map(str::to_string);

    User {
        id: found.or(requested).unwrap_or(0),
        name: username
            .clone()
            .unwrap_or_else(|| format!("User {label}").trim_end().to_string()),
        username: username.unwrap_or_else(|| format!("user{label}")),
        avatar: avatar_url.as_ref().map(|url| format!("{uploads}/{url}")),
        user_id: id_field(data, "userId"),
        student_id: text(data, "studentId").map(str::to_string),
        gender: text(data, "gender").map(str::to_string),
        email: text(data, "email").map(str::to_string),
        phone_number: text(data, "phoneNumber").map(str::to_string),
        avatar_url,
    }
}

impl<T: Transport, S: Storage> AppContext<T, S> {
    /// Log in. The built-in test account never touches the network.
    pub fn login(&mut self, username: &str, password: &str) -> Outcome<()> {
        if is_test_account(username, password) {
            self.establish_session(test_account_user(), TEST_ACCOUNT_TOKEN);
            info!("logged in with the built-in test account");
            return Outcome::success("login successful", ());
        }
        self.try_login(username, password).into()
    }

    fn try_login(&mut self, username: &str, password: &str) -> Result<(String, ()), ApiError> {
        let credentials = Credentials {
            username: username.to_string(),
            password: password.to_string(),
        };
        let request = self.client.build_login(&credentials)?;
        let envelope = self.dispatch(request, OnUnauthorized::Ignore)?;

        let (user, token) = auth_user(&envelope.data, username);
        info!(user_id = user.id, "logged in");
        self.establish_session(user, &token);

        // Enrichment is best effort; the basic record stays on failure.
        let profile = self.get_user_profile(None);
        match profile.data {
            Some(full) if profile.success => self.store_user(full),
            _ => warn!(reason = %profile.message, "profile enrichment failed, keeping basic user"),
        }

        Ok((envelope.message_or("login successful"), ()))
    }

    /// Register a new account and log it in.
    pub fn register(&mut self, username: &str, password: &str) -> Outcome<()> {
        if username == TEST_ACCOUNT_USERNAME {
            return Outcome::failure(&ApiError::UsernameTaken);
        }
        self.try_register(username, password).into()
    }

    fn try_register(&mut self, username: &str, password: &str) -> Result<(String, ()), ApiError> {
        let credentials = Credentials {
            username: username.to_string(),
            password: password.to_string(),
        };
        let request = self.client.build_register(&credentials)?;
        let envelope = self.dispatch(request, OnUnauthorized::Ignore)?;

        let (user, token) = auth_user(&envelope.data, username);
        info!(user_id = user.id, "registered");
        self.establish_session(user, &token);
        Ok((envelope.message_or("registration successful"), ()))
    }

    /// Clear the in-memory user and the persisted token and user.
    pub fn logout(&mut self) {
        self.session.user = None;
        self.storage.remove(TOKEN_KEY);
        self.storage.remove(USER_KEY);
        info!("session cleared");
    }

    /// Restore the session persisted by a previous run. A corrupt user
    /// record logs out.
    pub fn initialize_auth(&mut self) {
        let token = self.storage.get(TOKEN_KEY).filter(|t| !t.is_empty());
        let raw = self.storage.get(USER_KEY).filter(|u| !u.is_empty());
        let (Some(_), Some(raw)) = (token, raw) else {
            return;
        };

        match serde_json::from_str::<User>(&raw) {
            Ok(mut user) => {
                if user.username.is_empty() {
                    if let Some(email) = user.email.clone() {
                        user.username = email;
                    }
                }
                info!(user_id = user.id, "restored session");
                self.session.user = Some(user);
            }
            Err(e) => {
                warn!(error = %e, "stored user is corrupt");
                self.logout();
            }
        }
    }

    /// Fetch the current user's profile, or another user's public profile.
    pub fn get_user_profile(&mut self, user_id: Option<u64>) -> Outcome<User> {
        let token = self.token();
        let request = self.client.build_get_profile(token.as_deref(), user_id);
        let uploads = self.client.uploads_url();
        self.dispatch(request, OnUnauthorized::Logout)
            .map(|envelope| {
                let user = profile_user(&envelope.data, user_id, &uploads);
                ("profile loaded".to_string(), user)
            })
            .into()
    }

    /// Upload changed profile fields. Unlike the other operations, failures
    /// are returned as errors.
    pub fn update_user_profile(&mut self, update: &ProfileUpdate) -> Result<User, ApiError> {
        let mut form = MultipartForm::new();
        let fields = [
            ("phoneNumber", &update.phone_number),
            ("studentId", &update.student_id),
            ("gender", &update.gender),
            ("email", &update.email),
        ];
        for (name, value) in fields {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                form = form.text(name, value);
            }
        }
        if let Some(avatar) = update.avatar.as_deref().filter(|a| !a.is_empty()) {
            form = if avatar.starts_with("data:") {
                form.file("avatar", Upload::from_data_url(avatar, "avatar.jpg")?)
            } else {
                form.text("avatar", avatar)
            };
        }

        let token = self.token();
        let request = self.client.build_update_profile(token.as_deref(), &form);
        let envelope = self.dispatch(request, OnUnauthorized::Logout)?;
        let user = profile_user(&envelope.data, None, &self.client.uploads_url());

        if self.session.user.as_ref().is_some_and(|current| current.id == user.id) {
            self.store_user(user.clone());
        }
        Ok(user)
    }

    fn establish_session(&mut self, user: User, token: &str) {
        self.storage.set(TOKEN_KEY, token);
        self.store_user(user);
    }

    fn store_user(&mut self, user: User) {
        match serde_json::to_string(&user) {
            Ok(raw) => {
                self.storage.set(USER_KEY, &raw);
            }
            Err(e) => warn!(error = %e, "cannot serialize user"),
        }
        self.session.user = Some(user);
    }
}
