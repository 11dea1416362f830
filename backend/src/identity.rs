use std::sync::Arc;

use bcrypt::{non_truncating_hash, non_truncating_verify, BcryptError};
use common::{
    utils::normalize_login_name, AuthResponse, FieldViolation, LoginRequest, RegisterRequest,
    UserProfile,
};
use once_cell::sync::OnceCell;
use tokio::task;

use crate::db::{Database, NewUser, User};
use crate::error::AppError;
use crate::token::{CredentialError, Identity, TokenKeys};

/// Register, login and profile lookups on top of the user table.
#[derive(Clone)]
pub struct IdentityService {
    db: Database,
    tokens: TokenKeys,
    bcrypt_cost: u32,
    // Verified against when the login name is unknown, so both failures cost the same.
    dummy_hash: Arc<OnceCell<String>>,
}

/// Plaintext behind `dummy_hash`.
const DUMMY_SECRET: &str = "no-such-user-placeholder";

impl IdentityService {
    pub fn new(db: Database, tokens: TokenKeys, bcrypt_cost: u32) -> Self {
        Self {
            db,
            tokens,
            bcrypt_cost,
            dummy_hash: Arc::new(OnceCell::new()),
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Creates a user from an already validated payload.
    pub async fn register(&self, payload: RegisterRequest) -> Result<AuthResponse, AppError> {
        let login_name = normalize_login_name(&payload.login_name);
        tracing::info!("Registering user: {}", login_name);

        if self.db.find_user_by_login_name(&login_name).await?.is_some() {
            return Err(AppError::Conflict(
                "User with this login name already exists".to_string(),
            ));
        }

        let cost = self.bcrypt_cost;
        let secret = payload.secret;
        let hashed = task::spawn_blocking(move || non_truncating_hash(secret, cost)).await?;
        let password_hash = match hashed {
            Ok(hash) => hash,
            Err(BcryptError::Truncation(len)) => {
                return Err(AppError::ValidationError(vec![FieldViolation::new(
                    "secret",
                    "too_long",
                    format!("must be at most 72 bytes, got {len}"),
                )]));
            }
            Err(e) => return Err(e.into()),
        };

        let user = self
            .db
            .insert_user(NewUser {
                login_name,
                password_hash,
                display_name: payload.name.trim().to_string(),
                email: payload.email,
            })
            .await?;

        self.respond_with_credential(&user)
    }

    /// Checks a login name and secret. Unknown names and wrong secrets fail alike.
    pub async fn login(&self, payload: LoginRequest) -> Result<AuthResponse, AppError> {
        let login_name = normalize_login_name(&payload.login_name);
        tracing::info!("Logging in user: {}", login_name);

        let Some(user) = self.db.find_user_by_login_name(&login_name).await? else {
            self.burn_dummy_verify(payload.secret).await?;
            return Err(AppError::InvalidLogin);
        };

        let stored_hash = user.password_hash.clone();
        let secret = payload.secret;
        match task::spawn_blocking(move || non_truncating_verify(secret, &stored_hash)).await? {
            Ok(true) => {}
            // Over-long secrets can never have been registered.
            Ok(false) | Err(BcryptError::Truncation(_)) => {
                tracing::warn!("Wrong secret for user id {}", user.id);
                return Err(AppError::InvalidLogin);
            }
            Err(e) => return Err(e.into()),
        }

        self.respond_with_credential(&user)
    }

    async fn burn_dummy_verify(&self, secret: String) -> Result<(), AppError> {
        let dummy_hash = self.dummy_hash.clone();
        let cost = self.bcrypt_cost;
        task::spawn_blocking(move || -> Result<(), BcryptError> {
            let hash = dummy_hash.get_or_try_init(|| non_truncating_hash(DUMMY_SECRET, cost))?;
            match non_truncating_verify(secret, hash) {
                Ok(_) | Err(BcryptError::Truncation(_)) => Ok(()),
                Err(e) => Err(e),
            }
        })
        .await??;
        Ok(())
    }

    pub async fn get_profile(&self, identity: Identity) -> Result<UserProfile, AppError> {
        self.db
            .find_user_by_id(identity.user_id)
            .await?
            .map(|user| user.profile())
            .ok_or(AppError::NotFound)
    }

    /// Every user, unpaginated.
    pub async fn get_all_users(&self) -> Result<Vec<UserProfile>, AppError> {
        let users = self.db.list_users().await?;
        Ok(users.iter().map(User::profile).collect())
    }

    pub fn verify_credential(&self, token: &str) -> Result<Identity, CredentialError> {
        self.tokens.verify(token)
    }

    fn respond_with_credential(&self, user: &User) -> Result<AuthResponse, AppError> {
        let issued = self.tokens.issue(user.id).map_err(|e| {
            AppError::InternalServerError(format!("failed to sign credential: {e}"))
        })?;

        Ok(AuthResponse {
            profile: user.profile(),
            credential: issued.token,
            token_type: "Bearer".to_string(),
            expires_at: issued.expires_at,
        })
    }
}
