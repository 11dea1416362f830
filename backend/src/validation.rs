//! Shape checks for incoming auth payloads. Nothing here touches the store.

use common::{
    utils::{is_strong_secret, is_valid_login_name, MAX_SECRET_BYTES},
    FieldViolation, LoginRequest, RegisterRequest,
};
use validator::{Validate, ValidationErrors};

pub type ValidationResult = Result<(), Vec<FieldViolation>>;

pub fn validate_registration(payload: &RegisterRequest) -> ValidationResult {
    let mut violations = derived_violations(payload.validate());
    violations.extend(check_login_name_charset(&payload.login_name));
    violations.extend(check_secret_strength(&payload.secret));
    violations.extend(check_secret_bytes(&payload.secret));
    violations.extend(check_not_blank("name", &payload.name));
    finish(violations)
}

pub fn validate_login(payload: &LoginRequest) -> ValidationResult {
    let mut violations = Vec::new();
    violations.extend(check_not_blank("loginName", &payload.login_name));
    violations.extend(check_not_blank("secret", &payload.secret));
    finish(violations)
}

fn check_login_name_charset(login_name: &str) -> Option<FieldViolation> {
    (!login_name.is_empty() && !is_valid_login_name(login_name)).then(|| {
        FieldViolation::new(
            "loginName",
            "charset",
            "may only contain letters, digits and . _ - @ +",
        )
    })
}

fn check_secret_strength(secret: &str) -> Option<FieldViolation> {
    (!is_strong_secret(secret))
        .then(|| FieldViolation::new("secret", "strength", "must contain a letter and a digit"))
}

// Counted in bytes: multi-byte characters pass the length check but not bcrypt.
fn check_secret_bytes(secret: &str) -> Option<FieldViolation> {
    (secret.len() > MAX_SECRET_BYTES).then(|| {
        FieldViolation::new(
            "secret",
            "too_long",
            format!("must be at most {MAX_SECRET_BYTES} bytes"),
        )
    })
}

fn check_not_blank(field: &str, value: &str) -> Option<FieldViolation> {
    value
        .trim()
        .is_empty()
        .then(|| FieldViolation::new(field, "required", "must not be blank"))
}

/// Flattens the derive-generated checks into wire-named violations.
fn derived_violations(result: Result<(), ValidationErrors>) -> Vec<FieldViolation> {
    let Err(errors) = result else {
        return Vec::new();
    };

    let mut violations = Vec::new();
    for (field, field_errors) in errors.field_errors() {
        let field = wire_name(&field);
        for error in field_errors.iter() {
            let message = match &error.message {
                Some(message) => message.to_string(),
                None => describe(&error.code, error.params.get("min"), error.params.get("max")),
            };
            violations.push(FieldViolation::new(field, &error.code, message));
        }
    }
    violations
}

fn describe(
    code: &str,
    min: Option<&serde_json::Value>,
    max: Option<&serde_json::Value>,
) -> String {
    match (code, min, max) {
        ("length", Some(min), Some(max)) => format!("must be between {min} and {max} characters"),
        ("email", _, _) => "must be a valid email address".to_string(),
        _ => format!("failed check '{code}'"),
    }
}

fn wire_name(field: &str) -> &str {
    match field {
        "login_name" => "loginName",
        other => other,
    }
}

fn finish(mut violations: Vec<FieldViolation>) -> ValidationResult {
    if violations.is_empty() {
        return Ok(());
    }
    violations.sort();
    violations.dedup_by(|a, b| a.field == b.field && a.code == b.code);
    Err(violations)
}
