//! Session credentials: signed, time-bounded JWTs naming a user id.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{JwtConfig, MAX_TOKEN_TTL_MINUTES};
use crate::error::StartupError;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,   // Subject (user id)
    pub iat: i64,      // Issued at
    pub exp: i64,      // Expiration time
    pub nonce: String, // Keeps two credentials issued in the same second distinct
}

/// Why a presented credential was not accepted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("Missing bearer credential")]
    Missing,
    #[error("Invalid credential")]
    Invalid,
    #[error("Credential expired")]
    Expired,
}

/// The identity a valid credential resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: i64,
}

#[derive(Debug)]
pub struct IssuedCredential {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Signs and verifies credentials with a shared HMAC secret.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenKeys {
    pub fn new(config: &JwtConfig) -> Result<Self, StartupError> {
        let minutes = config.access_token_expires_minutes;
        let ttl = Duration::try_minutes(minutes)
            .filter(|_| (1..=MAX_TOKEN_TTL_MINUTES).contains(&minutes))
            .ok_or_else(|| {
                StartupError::InvalidConfig(format!(
                    "jwt.access_token_expires_minutes out of range: {minutes}"
                ))
            })?;

        Ok(Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            ttl,
        })
    }

    pub fn issue(&self, user_id: i64) -> Result<IssuedCredential, jsonwebtoken::errors::Error> {
        let nonce: String = rand::rng()
            .sample_iter(&rand::distr::Alphanumeric)
            .take(16)
            .map(char::from)
            .collect();

        let now = Utc::now();
        let expires_at = now + self.ttl;
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            nonce,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;

        Ok(IssuedCredential { token, expires_at })
    }

    pub fn verify(&self, token: &str) -> Result<Identity, CredentialError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        let token_data =
            decode::<Claims>(token, &self.decoding, &validation).map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => CredentialError::Expired,
                _ => CredentialError::Invalid,
            })?;

        let user_id = token_data
            .claims
            .sub
            .parse()
            .map_err(|_| CredentialError::Invalid)?;

        Ok(Identity { user_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(secret: &str) -> TokenKeys {
        TokenKeys::new(&JwtConfig {
            secret: secret.to_string(),
            access_token_expires_minutes: 15,
        })
        .unwrap()
    }

    #[test]
    fn issued_credential_verifies_to_its_user() {
        let keys = keys("unit-test-secret-0123456789");
        let issued = keys.issue(42).unwrap();
        assert!(issued.expires_at > Utc::now());
        assert_eq!(keys.verify(&issued.token), Ok(Identity { user_id: 42 }));
    }

    #[test]
    fn credentials_are_unique_per_issue() {
        let keys = keys("unit-test-secret-0123456789");
        let a = keys.issue(1).unwrap();
        let b = keys.issue(1).unwrap();
        assert_ne!(a.token, b.token);
    }

    #[test]
    fn foreign_signature_is_invalid() {
        let issued = keys("unit-test-secret-0123456789").issue(7).unwrap();
        let other = keys("another-secret-9876543210");
        assert_eq!(other.verify(&issued.token), Err(CredentialError::Invalid));
    }

    #[test]
    fn tampered_payload_is_invalid() {
        let keys = keys("unit-test-secret-0123456789");
        let issued = keys.issue(7).unwrap();
        let mut parts: Vec<&str> = issued.token.split('.').collect();
        let forged = "eyJzdWIiOiIxIiwiaWF0IjowLCJleHAiOjk5OTk5OTk5OTksIm5vbmNlIjoieCJ9";
        parts[1] = forged;
        assert_eq!(keys.verify(&parts.join(".")), Err(CredentialError::Invalid));
    }

    #[test]
    fn expired_credential_is_reported_as_expired() {
        let secret = "unit-test-secret-0123456789";
        let claims = Claims {
            sub: "3".to_string(),
            iat: (Utc::now() - Duration::hours(2)).timestamp(),
            exp: (Utc::now() - Duration::hours(1)).timestamp(),
            nonce: "n".to_string(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap();
        assert_eq!(keys(secret).verify(&token), Err(CredentialError::Expired));
    }

    #[test]
    fn out_of_range_lifetime_is_a_startup_error() {
        for minutes in [0, -1, i64::MAX] {
            let result = TokenKeys::new(&JwtConfig {
                secret: "unit-test-secret-0123456789".to_string(),
                access_token_expires_minutes: minutes,
            });
            assert!(matches!(result, Err(StartupError::InvalidConfig(_))));
        }
    }

    #[test]
    fn garbage_is_invalid() {
        assert_eq!(
            keys("unit-test-secret-0123456789").verify("not-a-token"),
            Err(CredentialError::Invalid)
        );
    }
}
