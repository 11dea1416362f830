use crate::{error::AppError, token::Identity, web_server::AppState};
use axum::{
    extract::{FromRequest, FromRequestParts},
    http::request::Parts,
};

/// Identity attached to the request by `auth_middleware`.
#[derive(Clone, Copy, Debug)]
pub struct AuthIdentity(pub Identity);

impl FromRequestParts<AppState> for AuthIdentity {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // The middleware is responsible for putting the identity in extensions.
        // If it's not there, the route was wired without it.
        let identity = parts.extensions.get::<AuthIdentity>().ok_or_else(|| {
            AppError::InternalServerError(
                "AuthIdentity not found in request extensions. Is the auth middleware missing?"
                    .into(),
            )
        })?;

        Ok(*identity)
    }
}

/// `axum::Json` whose rejections become structured 400 responses.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);
