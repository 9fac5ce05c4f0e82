use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use serde::Deserialize;

use crate::{
    db::Store,
    error::{AppError, AppResult, FormErrors, NON_FIELD_ERRORS},
    models::User,
};

pub const USERNAME_MAX_LEN: usize = 150;
pub const PASSWORD_MIN_LEN: usize = 8;

/// Signup form as submitted
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignupForm {
    pub username: Option<String>,
    pub password1: Option<String>,
    pub password2: Option<String>,
}

/// Login form as submitted
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginForm {
    pub username: Option<String>,
    pub password: Option<String>,
    pub next: Option<String>,
}

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

/// Checks a password against a stored argon2id hash
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

fn validate_username(username: &str, errors: &mut FormErrors) {
    if username.is_empty() {
        errors.add("username", "This field is required.");
    } else if username.chars().count() > USERNAME_MAX_LEN {
        errors.add(
            "username",
            format!(
                "Ensure this value has at most {} characters.",
                USERNAME_MAX_LEN
            ),
        );
    } else if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
        errors.add(
            "username",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        );
    }
}

fn validate_password(password: &str, username: &str, errors: &mut FormErrors) {
    if password.is_empty() {
        errors.add("password1", "This field is required.");
        return;
    }
    if password.chars().count() < PASSWORD_MIN_LEN {
        errors.add(
            "password1",
            format!(
                "This password is too short. It must contain at least {} characters.",
                PASSWORD_MIN_LEN
            ),
        );
    }
    if password.chars().all(|c| c.is_ascii_digit()) {
        errors.add("password1", "This password is entirely numeric.");
    }
    if !username.is_empty() && password.to_lowercase() == username.to_lowercase() {
        errors.add("password1", "The password is too similar to the username.");
    }
}

fn username_taken(username: &str) -> AppError {
    let mut errors = FormErrors::single("username", "A user with that username already exists.");
    errors.keep("username", username);
    AppError::Validation(errors)
}

/// Validates a signup form and creates the account
pub async fn register(store: &dyn Store, form: &SignupForm) -> AppResult<User> {
    let username = form.username.as_deref().unwrap_or_default().trim();
    let password1 = form.password1.as_deref().unwrap_or_default();
    let password2 = form.password2.as_deref().unwrap_or_default();

    let mut errors = FormErrors::new();
    validate_username(username, &mut errors);
    validate_password(password1, username, &mut errors);
    if password2.is_empty() {
        errors.add("password2", "This field is required.");
    } else if password1 != password2 {
        errors.add("password2", "The two password fields didn't match.");
    }

    if !errors.has("username") && store.username_taken(username).await? {
        errors.add("username", "A user with that username already exists.");
    }

    if !errors.is_empty() {
        errors.keep("username", username);
        return Err(AppError::Validation(errors));
    }

    let hash = hash_password(password1)?;
    let account = match store.create_user(username, &hash).await {
        Ok(account) => account,
        Err(AppError::Conflict(_)) => return Err(username_taken(username)),
        Err(e) => return Err(e),
    };

    tracing::info!(user_id = account.id, username = %account.username, "Account created");
    Ok(account.into())
}

/// Resolves login credentials to a user
pub async fn authenticate(store: &dyn Store, form: &LoginForm) -> AppResult<User> {
    let username = form.username.as_deref().unwrap_or_default().trim();
    let password = form.password.as_deref().unwrap_or_default();

    let mut errors = FormErrors::new();
    if username.is_empty() {
        errors.add("username", "This field is required.");
    }
    if password.is_empty() {
        errors.add("password", "This field is required.");
    }
    if errors.is_empty() {
        if let Some(account) = store.find_user_by_username(username).await? {
            if verify_password(password, &account.password_hash) {
                tracing::info!(user_id = account.id, "Signed in");
                return Ok(account.into());
            }
        }
        tracing::info!(username = %username, "Failed sign-in attempt");
        errors.add(
            NON_FIELD_ERRORS,
            "Please enter a correct username and password. Note that both fields may be case-sensitive.",
        );
    }

    errors.keep("username", username);
    if let Some(next) = &form.next {
        errors.keep("next", next.as_str());
    }
    Err(AppError::Validation(errors))
}

/// Where to send the user after signing in; only local paths are honored
pub fn redirect_target(next: Option<&str>) -> String {
    match next.map(str::trim) {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path.to_string()
        }
        _ => "/".to_string(),
    }
}
