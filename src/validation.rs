use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::{CreateUserForm, LoginForm, RegisterForm};

const MAX_FIELD_LEN: usize = 255;
const MIN_PASSWORD_LEN: usize = 8;

/// ValidationErrors
///
/// Field name to human-readable messages, serialized as a flat JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: &str) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: &str) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.to_string());
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn messages(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn finish<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

/// UserInput
///
/// Registration data that passed validation. The password is still plaintext here;
/// hashing happens at the handler boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInput {
    pub name: String,
    pub email: String,
    pub password: String,
    pub is_admin: bool,
}

/// Credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// parse_admin_flag
///
/// Explicit boolean parse of the `is_admin` checkbox. HTML forms omit unchecked boxes,
/// so absence means `false`. Unknown spellings are rejected rather than coerced.
pub fn parse_admin_flag(raw: Option<&str>) -> Option<bool> {
    match raw.map(str::trim) {
        None | Some("") | Some("0") | Some("false") | Some("off") => Some(false),
        Some("1") | Some("true") | Some("on") => Some(true),
        Some(_) => None,
    }
}

/// Self-service registration. The resulting input is never an admin.
pub fn validate_registration(form: &RegisterForm) -> Result<UserInput, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let name = check_name(&form.name, &mut errors);
    let email = check_email(&form.email, &mut errors);
    check_password(&form.password, &form.password_confirmation, &mut errors);

    errors.finish(UserInput {
        name,
        email,
        password: form.password.clone(),
        is_admin: false,
    })
}

/// Admin-initiated creation. The `is_admin` flag is honoured as submitted.
pub fn validate_admin_creation(form: &CreateUserForm) -> Result<UserInput, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let name = check_name(&form.name, &mut errors);
    let email = check_email(&form.email, &mut errors);
    check_password(&form.password, &form.password_confirmation, &mut errors);

    let is_admin = parse_admin_flag(form.is_admin.as_deref()).unwrap_or_else(|| {
        errors.add("is_admin", "The is admin field must be true or false.");
        false
    });

    errors.finish(UserInput {
        name,
        email,
        password: form.password.clone(),
        is_admin,
    })
}

pub fn validate_login(form: &LoginForm) -> Result<Credentials, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let email = normalize_email(&form.email);
    if email.is_empty() {
        errors.add("email", "The email field is required.");
    }
    if form.password.is_empty() {
        errors.add("password", "The password field is required.");
    }
    errors.finish(Credentials {
        email,
        password: form.password.clone(),
    })
}

/// Emails are compared case-insensitively, so they are stored lower-cased.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn check_name(raw: &str, errors: &mut ValidationErrors) -> String {
    let name = raw.trim();
    if name.is_empty() {
        errors.add("name", "The name field is required.");
    } else if name.chars().count() > MAX_FIELD_LEN {
        errors.add("name", "The name may not be greater than 255 characters.");
    }
    name.to_string()
}

fn check_email(raw: &str, errors: &mut ValidationErrors) -> String {
    let email = normalize_email(raw);
    if email.is_empty() {
        errors.add("email", "The email field is required.");
        return email;
    }
    if email.chars().count() > MAX_FIELD_LEN {
        errors.add("email", "The email may not be greater than 255 characters.");
    }
    let well_formed = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };
    if !well_formed {
        errors.add("email", "The email must be a valid email address.");
    }
    email
}

fn check_password(password: &str, confirmation: &str, errors: &mut ValidationErrors) {
    if password.is_empty() {
        errors.add("password", "The password field is required.");
        return;
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        errors.add("password", "The password must be at least 8 characters.");
    }
    if password != confirmation {
        errors.add("password", "The password confirmation does not match.");
    }
}
