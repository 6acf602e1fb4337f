//! Input rules shared by the step preconditions.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::error::ValidationError;

pub const PASSWORD_MIN_LEN: usize = 8;
pub const OTP_CODE_LEN: usize = 6;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$")
        .expect("email pattern compiles")
});

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9]{10,15}$").expect("phone pattern compiles"));

/// Strips the separators people type into phone fields.
pub fn normalize_phone(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '(' && *c != ')')
        .collect()
}

pub fn validate_phone(raw: &str) -> Result<String, ValidationError> {
    let phone = normalize_phone(raw);
    if phone.is_empty() {
        return Err(ValidationError::EmptyPhone);
    }
    if !PHONE_RE.is_match(&phone) {
        return Err(ValidationError::InvalidPhone);
    }
    Ok(phone)
}

pub fn validate_email(raw: &str) -> Result<(), ValidationError> {
    if EMAIL_RE.is_match(raw.trim()) {
        Ok(())
    } else {
        Err(ValidationError::InvalidEmail)
    }
}

pub fn validate_password(password: &str, confirm: &str) -> Result<(), ValidationError> {
    if password.chars().count() < PASSWORD_MIN_LEN {
        return Err(ValidationError::PasswordTooShort {
            min: PASSWORD_MIN_LEN,
        });
    }
    if password != confirm {
        return Err(ValidationError::PasswordMismatch);
    }
    Ok(())
}

pub fn validate_otp_code(code: &str) -> Result<(), ValidationError> {
    let code = code.trim();
    if code.len() == OTP_CODE_LEN && code.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::IncompleteOtp)
    }
}

pub fn parse_birth_date(raw: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| ValidationError::InvalidBirthDate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_accepts_local_and_international_forms() {
        assert_eq!(validate_phone("0812-3456-7890"), Ok("081234567890".to_string()));
        assert_eq!(validate_phone("+62 812 3456 7890"), Ok("+6281234567890".to_string()));
        assert_eq!(validate_phone("   "), Err(ValidationError::EmptyPhone));
        assert_eq!(validate_phone("08123"), Err(ValidationError::InvalidPhone));
        assert_eq!(validate_phone("08abc4567890"), Err(ValidationError::InvalidPhone));
    }

    #[test]
    fn email_requires_domain_with_tld() {
        assert!(validate_email("a@b.co").is_ok());
        assert!(validate_email("siti.aminah+kes@mail.example.id").is_ok());
        assert!(validate_email("a@b").is_err());
        assert!(validate_email("no-at-sign.co").is_err());
    }

    #[test]
    fn password_minimum_counts_characters() {
        assert_eq!(
            validate_password("1234567", "1234567"),
            Err(ValidationError::PasswordTooShort { min: 8 })
        );
        assert!(validate_password("12345678", "12345678").is_ok());
        // seven characters but eight bytes
        assert!(validate_password("rahasié", "rahasié").is_err());
        assert!(validate_password("rahasiaé", "rahasiaé").is_ok());
        assert_eq!(
            validate_password("12345678", "12345679"),
            Err(ValidationError::PasswordMismatch)
        );
    }

    #[test]
    fn otp_must_be_six_digits() {
        assert!(validate_otp_code("123456").is_ok());
        assert!(validate_otp_code("12345").is_err());
        assert!(validate_otp_code("12a456").is_err());
    }

    #[test]
    fn birth_date_is_iso_formatted() {
        assert!(parse_birth_date("1995-04-17").is_ok());
        assert_eq!(
            parse_birth_date("17/04/1995"),
            Err(ValidationError::InvalidBirthDate)
        );
    }
}
