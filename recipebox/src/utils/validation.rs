use regex::Regex;
use std::sync::OnceLock;

const MAX_USERNAME_LEN: usize = 100;
const MAX_EMAIL_LEN: usize = 150;

/// Validates an email address. Deliberately loose: something@something.tld, no spaces.
pub fn validate_email(email: &str) -> Result<(), String> {
    let email = email.trim();
    if email.is_empty() {
        return Err("Email is required".to_string());
    }
    if email.len() > MAX_EMAIL_LEN {
        return Err(format!("Email must be at most {MAX_EMAIL_LEN} characters long"));
    }

    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());

    if !re.is_match(email) {
        return Err("Email address is not valid".to_string());
    }
    Ok(())
}

pub fn validate_username(username: &str) -> Result<(), String> {
    let username = username.trim();
    if username.is_empty() {
        return Err("Username is required".to_string());
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(format!("Username must be at most {MAX_USERNAME_LEN} characters long"));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required".to_string());
    }
    Ok(())
}

pub fn validate_title(title: &str) -> Result<(), String> {
    if title.trim().is_empty() {
        return Err("Title is required".to_string());
    }
    Ok(())
}

pub fn validate_collection_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("Collection name is required".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emails() {
        assert!(validate_email("cook@example.com").is_ok());
        assert!(validate_email("  Cook@Example.com ").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("cook").is_err());
        assert!(validate_email("cook@example").is_err());
        assert!(validate_email("co ok@example.com").is_err());
        assert!(validate_email(&format!("{}@example.com", "a".repeat(150))).is_err());
    }

    #[test]
    fn usernames() {
        assert!(validate_username("julia").is_ok());
        assert!(validate_username("   ").is_err());
        assert!(validate_username(&"x".repeat(101)).is_err());
    }

    #[test]
    fn titles_and_names() {
        assert!(validate_title("Soup").is_ok());
        assert!(validate_title(" ").is_err());
        assert!(validate_collection_name("Dinners").is_ok());
        assert!(validate_collection_name("").is_err());
        assert!(validate_password("").is_err());
    }
}
