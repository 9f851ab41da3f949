use validator::ValidateEmail;

/// Validates that the input looks like a valid email address
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    !email.is_empty() && email.validate_email()
}

/// Validates a referral id taken from a URL or request body.
/// Rules:
/// - 1-64 characters
/// - Only ASCII letters, numbers, hyphens, underscores (URL-safe base64 alphabet)
pub fn is_valid_referral_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 64
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
