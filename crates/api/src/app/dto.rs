use serde::{Deserialize, Serialize};

use authn_core::UserId;

use crate::store::UserRecord;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

// -------------------------
// Response DTOs
// -------------------------

/// Public view of a user. Never carries the password hash.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

impl From<&UserRecord> for UserResponse {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

// -------------------------
// Validation
// -------------------------

pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Default)]
pub struct FieldErrors(serde_json::Map<String, serde_json::Value>);

impl FieldErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        let entry = self
            .0
            .entry(field.to_string())
            .or_insert_with(|| serde_json::Value::Array(Vec::new()));
        if let serde_json::Value::Array(messages) = entry {
            messages.push(serde_json::Value::String(message.into()));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_map(self) -> serde_json::Map<String, serde_json::Value> {
        self.0
    }
}

fn required(errors: &mut FieldErrors, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.add(field, format!("the {field} field is required"));
    }
}

impl RegisterRequest {
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::default();
        required(&mut errors, "name", &self.name);
        required(&mut errors, "email", &self.email);
        required(&mut errors, "password", &self.password);
        required(&mut errors, "confirm_password", &self.confirm_password);

        if !self.email.is_empty() && !self.email.contains('@') {
            errors.add("email", "the email field must be a valid email address");
        }
        if !self.password.is_empty() && self.password.len() < MIN_PASSWORD_LEN {
            errors.add(
                "password",
                format!("the password field must be at least {MIN_PASSWORD_LEN} characters"),
            );
        }
        if !self.password.is_empty()
            && !self.confirm_password.is_empty()
            && self.password != self.confirm_password
        {
            let message = "password and confirmation password do not match";
            errors.add("password", message);
            errors.add("confirm_password", message);
        }
        errors
    }
}

impl LoginRequest {
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::default();
        required(&mut errors, "email", &self.email);
        required(&mut errors, "password", &self.password);
        errors
    }
}
