use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AuthError;

const MIN_LOGIN_CHARS: usize = 3;
const MAX_LOGIN_CHARS: usize = 128;
const MIN_PASSWORD_CHARS: usize = 8;
const MAX_PASSWORD_CHARS: usize = 128;

const PASSWORD_RULES: &str = "Your password must be at least 8 characters. Password must contain \
numbers, upper-case letters, lower-case letters, and special characters.";

lazy_static! {
    static ref PASSWORD_CHARSET: Regex =
        Regex::new(r#"^[A-Za-z0-9!@#$%^&*()_+~{}:"<>?\[\];',./]+$"#).unwrap();
    static ref HAS_LOWER: Regex = Regex::new(r"[a-z]").unwrap();
    static ref HAS_UPPER: Regex = Regex::new(r"[A-Z]").unwrap();
    static ref HAS_DIGIT: Regex = Regex::new(r"[0-9]").unwrap();
    static ref HAS_SPECIAL: Regex = Regex::new(r#"[!@#$%^&*()_+~{}:"<>?\[\];',./]"#).unwrap();
}

/// Request body for sign-up.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    pub username: String,
    pub login: String,
    pub password: String,
    pub confirm_password: String,
}

/// Request body for sign-in.
#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub login: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SignUpResponse {
    pub message: String,
}

/// Public part of the user returned after sign-in.
#[derive(Debug, Serialize)]
pub struct SignInResponse {
    pub id: Uuid,
    pub username: String,
}

fn check_name(field: &str, value: &str) -> Result<(), AuthError> {
    let len = value.chars().count();
    if !(MIN_LOGIN_CHARS..=MAX_LOGIN_CHARS).contains(&len) {
        return Err(AuthError::Validation(format!(
            "{field} must be between {MIN_LOGIN_CHARS} and {MAX_LOGIN_CHARS} characters"
        )));
    }
    Ok(())
}

fn check_password(field: &str, value: &str) -> Result<(), AuthError> {
    let len = value.chars().count();
    if len > MAX_PASSWORD_CHARS {
        return Err(AuthError::Validation(format!(
            "Maximum {field} length: {MAX_PASSWORD_CHARS} characters"
        )));
    }
    let ok = len >= MIN_PASSWORD_CHARS
        && PASSWORD_CHARSET.is_match(value)
        && HAS_LOWER.is_match(value)
        && HAS_UPPER.is_match(value)
        && HAS_DIGIT.is_match(value)
        && HAS_SPECIAL.is_match(value);
    if !ok {
        return Err(AuthError::Validation(PASSWORD_RULES.to_string()));
    }
    Ok(())
}

impl SignUpRequest {
    /// Trim identifiers and check every field.
    pub fn normalize(mut self) -> Result<Self, AuthError> {
        self.login = self.login.trim().to_string();
        self.username = self.username.trim().to_string();
        check_name("login", &self.login)?;
        check_name("username", &self.username)?;
        check_password("password", &self.password)?;
        check_password("confirmPassword", &self.confirm_password)?;
        Ok(self)
    }
}

impl SignInRequest {
    pub fn normalize(mut self) -> Result<Self, AuthError> {
        self.login = self.login.trim().to_string();
        check_name("login", &self.login)?;
        check_password("password", &self.password)?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign_up(login: &str, password: &str) -> SignUpRequest {
        SignUpRequest {
            username: "bobby".into(),
            login: login.into(),
            password: password.into(),
            confirm_password: password.into(),
        }
    }

    #[test]
    fn sign_up_body_uses_camel_case() {
        let req: SignUpRequest = serde_json::from_str(
            r#"{"username":"bobby","login":"bob","password":"Abc123!@","confirmPassword":"Abc123!@"}"#,
        )
        .unwrap();
        assert_eq!(req.confirm_password, "Abc123!@");
    }

    #[test]
    fn accepts_a_strong_password_and_trims_login() {
        let req = sign_up("  bob  ", "Abc123!@").normalize().unwrap();
        assert_eq!(req.login, "bob");
    }

    #[test]
    fn rejects_weak_passwords() {
        for weak in [
            "Ab1!",
            "alllower1!",
            "ALLUPPER1!",
            "NoDigits!!",
            "NoSpecial12",
            "Abc 123!@",
        ] {
            let res = sign_up("bob", weak).normalize();
            assert!(matches!(res, Err(AuthError::Validation(_))), "{weak}");
        }
    }

    #[test]
    fn rejects_out_of_range_logins() {
        assert!(sign_up("ab", "Abc123!@").normalize().is_err());
        assert!(sign_up(&"a".repeat(129), "Abc123!@").normalize().is_err());
    }

    #[test]
    fn rejects_overlong_password() {
        let long = format!("Aa1!{}", "a".repeat(200));
        let err = sign_up("bob", &long).normalize().unwrap_err();
        assert!(err.to_string().contains("Maximum"));
    }

    #[test]
    fn sign_in_checks_the_same_rules() {
        let ok = SignInRequest {
            login: "bob".into(),
            password: "Abc123!@".into(),
        };
        assert!(ok.normalize().is_ok());
        let bad = SignInRequest {
            login: "bob".into(),
            password: "password".into(),
        };
        assert!(bad.normalize().is_err());
    }
}
