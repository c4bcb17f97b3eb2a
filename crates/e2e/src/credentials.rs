//! Throwaway test identities

use pavlo_contract::AuthRequest;
use uuid::Uuid;

/// Password used for generated accounts. Satisfies the server's rule of at
/// least 8 characters with upper, lower, and digit.
pub const DEFAULT_PASSWORD: &str = "TestPass123!";

/// Domain for generated addresses
pub const EMAIL_DOMAIN: &str = "example.com";

fn suffix() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// `{prefix}_{8 hex}@example.com`, unique per call
pub fn unique_email(prefix: &str) -> String {
    format!("{}_{}@{}", prefix, suffix(), EMAIL_DOMAIN)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn generate(prefix: &str) -> Self {
        Self {
            email: unique_email(prefix),
            password: DEFAULT_PASSWORD.to_string(),
        }
    }

    pub fn request(&self) -> AuthRequest {
        AuthRequest {
            email: self.email.clone(),
            password: self.password.clone(),
        }
    }

    /// Same email, different password
    pub fn with_wrong_password(&self) -> AuthRequest {
        AuthRequest {
            email: self.email.clone(),
            password: format!("Wrong{}", self.password),
        }
    }

    /// An address that was never registered
    pub fn unknown_email(&self) -> AuthRequest {
        AuthRequest {
            email: format!("nonexistent_{}", self.email),
            password: self.password.clone(),
        }
    }
}

impl From<AuthRequest> for Credentials {
    fn from(req: AuthRequest) -> Self {
        Self {
            email: req.email,
            password: req.password,
        }
    }
}

/// A fresh request id as sent with scrape and history calls
pub fn request_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_emails_are_unique() {
        let a = Credentials::generate("testuser");
        let b = Credentials::generate("testuser");
        assert_ne!(a.email, b.email);
        assert!(a.email.starts_with("testuser_"));
        assert!(a.email.ends_with("@example.com"));
        // prefix + '_' + 8 hex + '@' + domain
        assert_eq!(a.email.len(), "testuser_".len() + 8 + 1 + EMAIL_DOMAIN.len());
    }

    #[test]
    fn test_variants() {
        let creds = Credentials::generate("u");
        assert_ne!(creds.with_wrong_password().password, creds.password);
        assert_eq!(creds.with_wrong_password().email, creds.email);
        assert_ne!(creds.unknown_email().email, creds.email);
    }
}
