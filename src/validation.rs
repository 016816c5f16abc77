/// Shared input validation for auth, profile and authoring routes.

/// Password strength: 8-256 chars with upper, lower and digit.
pub fn validate_password(password: &str) -> Result<(), &'static str> {
    if password.len() < 8 {
        return Err("Password must be at least 8 characters");
    }
    if password.len() > 256 {
        return Err("Password must be at most 256 characters");
    }
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !has_upper || !has_lower || !has_digit {
        return Err("Password must contain an uppercase letter, a lowercase letter and a digit");
    }
    Ok(())
}

/// Email format: user@domain.tld
pub fn is_valid_email(email: &str) -> bool {
    if email.len() > 254 {
        return false;
    }
    let parts: Vec<&str> = email.splitn(2, '@').collect();
    if parts.len() != 2 {
        return false;
    }
    let (local, domain) = (parts[0], parts[1]);
    if local.is_empty() || local.len() > 64 {
        return false;
    }
    if !local
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b'_' || b == b'+' || b == b'-')
    {
        return false;
    }
    // No leading/trailing/consecutive dots in the local part
    if local.starts_with('.') || local.ends_with('.') || local.contains("..") {
        return false;
    }
    if domain.is_empty() || !domain.contains('.') {
        return false;
    }
    if !domain
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'.')
    {
        return false;
    }
    domain
        .split('.')
        .all(|part| !part.is_empty() && !part.starts_with('-') && !part.ends_with('-'))
}

/// Username: 2-50 chars; letters, digits, underscore, hyphen and space.
pub fn validate_username(username: &str) -> Result<(), &'static str> {
    let char_count = username.chars().count();
    if char_count < 2 || char_count > 50 {
        return Err("Username must be between 2 and 50 characters");
    }
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == ' ')
    {
        return Err("Username may only contain letters, digits, underscores, hyphens and spaces");
    }
    Ok(())
}

/// Title for courses, modules, lessons and live sessions: 1-200 chars, non-blank.
pub fn validate_title(title: &str) -> Result<(), &'static str> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err("Title must not be empty");
    }
    if trimmed.chars().count() > 200 {
        return Err("Title must be at most 200 characters");
    }
    Ok(())
}

/// Progress percentage must land in [0, 100].
pub fn validate_percentage(value: f64) -> Result<(), &'static str> {
    if !value.is_finite() || !(0.0..=100.0).contains(&value) {
        return Err("Percentage must be between 0 and 100");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_password_accepted() {
        assert!(validate_password("Abc12345").is_ok());
    }

    #[test]
    fn short_password_rejected() {
        assert!(validate_password("Ab1").is_err());
    }

    #[test]
    fn password_without_digit_rejected() {
        assert!(validate_password("Abcdefgh").is_err());
    }

    #[test]
    fn valid_email_accepted() {
        assert!(is_valid_email("student@example.com"));
        assert!(is_valid_email("first.last+tag@my-domain.com"));
    }

    #[test]
    fn malformed_emails_rejected() {
        assert!(!is_valid_email("studentexample.com"));
        assert!(!is_valid_email("student@example"));
        assert!(!is_valid_email(".student@example.com"));
        assert!(!is_valid_email("stu..dent@example.com"));
        assert!(!is_valid_email("student@-example.com"));
        assert!(!is_valid_email("stu dent@example.com"));
    }

    #[test]
    fn valid_username_accepted() {
        assert!(validate_username("vocal_coach-1").is_ok());
    }

    #[test]
    fn short_username_rejected() {
        assert!(validate_username("a").is_err());
    }

    #[test]
    fn unicode_username_counts_characters() {
        assert!(validate_username("歌手").is_ok());
        assert!(validate_username(&"歌".repeat(51)).is_err());
    }

    #[test]
    fn blank_title_rejected() {
        assert!(validate_title("   ").is_err());
        assert!(validate_title("Warmups 101").is_ok());
    }

    #[test]
    fn percentage_bounds_enforced() {
        assert!(validate_percentage(0.0).is_ok());
        assert!(validate_percentage(100.0).is_ok());
        assert!(validate_percentage(100.1).is_err());
        assert!(validate_percentage(-0.1).is_err());
        assert!(validate_percentage(f64::NAN).is_err());
    }
}
