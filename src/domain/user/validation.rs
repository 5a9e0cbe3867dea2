//! User field validation rules

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Errors that can occur during user validation
#[derive(Debug, Error, Clone, PartialEq)]
pub enum UserValidationError {
    #[error(
        "Invalid username: must be at least 3 alphanumeric characters long - underscores(_), dots(.), and dashes(-) are allowed"
    )]
    InvalidUsername,

    #[error(
        "Invalid password: must consist of at least 8 alphanumeric characters including 1 special character"
    )]
    InvalidPassword,

    #[error("Invalid value for the \"first name\" provided")]
    InvalidFirstName,

    #[error("Invalid value for the \"last name\" provided")]
    InvalidLastName,

    #[error("Invalid telegram link provided")]
    InvalidTelegramLink,

    #[error("Invalid email provided")]
    InvalidEmail,

    #[error("User ID cannot be empty")]
    EmptyId,
}

const MIN_USERNAME_LENGTH: usize = 3;
const MAX_USERNAME_LENGTH: usize = 32;
const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_PASSWORD_LENGTH: usize = 50;
const MAX_NAME_LENGTH: usize = 100;
const MIN_TELEGRAM_LINK_LENGTH: usize = 18;
const MAX_TELEGRAM_LINK_LENGTH: usize = 45;
const MIN_EMAIL_LENGTH: usize = 5;
const MAX_EMAIL_LENGTH: usize = 70;

/// Required prefix of a telegram link, up to and including the last slash
pub const TELEGRAM_LINK_PREFIX: &str = "https://t.me/";

/// Symbols of which a password must contain at least one
pub const PASSWORD_SYMBOLS: &[char] = &['!', '@', '#', '$', '%', '^', '&', '*', '.'];

static USERNAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\p{Latin}\p{Nd}_.-]*$").unwrap());

static TELEGRAM_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\p{Latin}\p{Nd}_]*$").unwrap());

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9-]+\.[a-zA-Z]{2,}$").unwrap());

/// Character count of the value with surrounding whitespace removed
fn trimmed_len(value: &str) -> usize {
    value.trim().chars().count()
}

/// Validate a username
///
/// Rules:
/// - 3 to 32 characters after trimming
/// - Only Latin letters, decimal digits, underscores, dots and dashes
pub fn validate_username(username: &str) -> Result<(), UserValidationError> {
    let len = trimmed_len(username);

    if !(MIN_USERNAME_LENGTH..=MAX_USERNAME_LENGTH).contains(&len)
        || !USERNAME_PATTERN.is_match(username)
    {
        return Err(UserValidationError::InvalidUsername);
    }

    Ok(())
}

/// Validate a password
///
/// Rules:
/// - 8 to 50 characters after trimming
/// - At least one ASCII letter
/// - At least one of `! @ # $ % ^ & * .`
pub fn validate_password(password: &str) -> Result<(), UserValidationError> {
    let len = trimmed_len(password);
    let has_letter = password.chars().any(|c| c.is_ascii_alphabetic());
    let has_symbol = password.chars().any(|c| PASSWORD_SYMBOLS.contains(&c));

    if !(MIN_PASSWORD_LENGTH..=MAX_PASSWORD_LENGTH).contains(&len) || !has_letter || !has_symbol {
        return Err(UserValidationError::InvalidPassword);
    }

    Ok(())
}

/// Validate a first name: non-blank, at most 100 characters
pub fn validate_first_name(value: &str) -> Result<(), UserValidationError> {
    let len = trimmed_len(value);

    if len == 0 || len > MAX_NAME_LENGTH {
        return Err(UserValidationError::InvalidFirstName);
    }

    Ok(())
}

/// Validate a last name: non-blank, at most 100 characters
pub fn validate_last_name(value: &str) -> Result<(), UserValidationError> {
    let len = trimmed_len(value);

    if len == 0 || len > MAX_NAME_LENGTH {
        return Err(UserValidationError::InvalidLastName);
    }

    Ok(())
}

/// Validate a telegram link
///
/// Everything up to the last `/` must be exactly `https://t.me/`; the
/// remainder may only hold Latin letters, digits and underscores.
pub fn validate_telegram_link(value: &str) -> Result<(), UserValidationError> {
    let len = trimmed_len(value);

    let (prefix, handle) = match value.rfind('/') {
        Some(idx) => value.split_at(idx + 1),
        None => ("", value),
    };

    if !(MIN_TELEGRAM_LINK_LENGTH..=MAX_TELEGRAM_LINK_LENGTH).contains(&len)
        || prefix != TELEGRAM_LINK_PREFIX
        || !TELEGRAM_ID_PATTERN.is_match(handle)
    {
        return Err(UserValidationError::InvalidTelegramLink);
    }

    Ok(())
}

/// Validate an email address of the `local@domain.tld` shape, 5 to 70 characters
pub fn validate_email(value: &str) -> Result<(), UserValidationError> {
    let len = trimmed_len(value);

    if !(MIN_EMAIL_LENGTH..=MAX_EMAIL_LENGTH).contains(&len) || !EMAIL_PATTERN.is_match(value) {
        return Err(UserValidationError::InvalidEmail);
    }

    Ok(())
}
