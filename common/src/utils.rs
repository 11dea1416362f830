/// Characters allowed in a login name besides ASCII alphanumerics.
const LOGIN_NAME_SYMBOLS: &[char] = &['.', '_', '-', '@', '+'];

/// Checks that a login name only uses the permitted character set.
pub fn is_valid_login_name(login_name: &str) -> bool {
    !login_name.is_empty()
        && login_name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || LOGIN_NAME_SYMBOLS.contains(&c))
}

/// A secret is strong enough when it mixes letters and digits.
pub fn is_strong_secret(secret: &str) -> bool {
    secret.chars().any(|c| c.is_alphabetic()) && secret.chars().any(|c| c.is_ascii_digit())
}

/// bcrypt only reads this many bytes of a secret.
pub const MAX_SECRET_BYTES: usize = 72;

/// Login names are compared case-insensitively.
pub fn normalize_login_name(login_name: &str) -> String {
    login_name.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_name_charset() {
        assert!(is_valid_login_name("alice"));
        assert!(is_valid_login_name("alice.smith+test@example.com"));
        assert!(!is_valid_login_name("alice smith"));
        assert!(!is_valid_login_name("al/ice"));
        assert!(!is_valid_login_name(""));
    }

    #[test]
    fn secret_strength() {
        assert!(is_strong_secret("Str0ngP@ss"));
        assert!(is_strong_secret("password123"));
        assert!(!is_strong_secret("onlyletters"));
        assert!(!is_strong_secret("1234567890"));
    }

    #[test]
    fn normalization_lowercases_and_trims() {
        assert_eq!(normalize_login_name("  Alice "), "alice");
    }
}
