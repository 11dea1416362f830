use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
    Json,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    typed_header::TypedHeaderRejection,
    TypedHeader,
};
use common::{AuthResponse, ErrorBody, LoginRequest, RegisterRequest, UserProfile};

use crate::error::AppError;
use crate::extractors::{AppJson, AuthIdentity};
use crate::token::CredentialError;
use crate::validation::{validate_login, validate_registration};
use crate::web_server::AppState;

// --- API Handlers ---

/// ## Register a new user
/// Validates the payload, hashes the secret and stores the user.
#[utoipa::path(
    post,
    path = "/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created", body = AuthResponse),
        (status = 400, description = "Invalid data provided", body = ErrorBody),
        (status = 409, description = "Login name already taken", body = ErrorBody),
    )
)]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    validate_registration(&payload).map_err(AppError::ValidationError)?;

    let response = state.identity.register(payload).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// ## Login an existing user
/// Returns the public profile and a fresh bearer credential.
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 400, description = "Missing fields", body = ErrorBody),
        (status = 401, description = "Invalid credentials", body = ErrorBody),
    )
)]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    validate_login(&payload).map_err(AppError::ValidationError)?;

    let response = state.identity.login(payload).await?;
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/profile",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Profile of the caller", body = UserProfile),
        (status = 401, description = "Missing, invalid or expired credential", body = ErrorBody),
        (status = 404, description = "User no longer exists", body = ErrorBody),
    )
)]
pub async fn profile(
    State(state): State<AppState>,
    AuthIdentity(identity): AuthIdentity,
) -> Result<Json<UserProfile>, AppError> {
    let profile = state.identity.get_profile(identity).await?;
    Ok(Json(profile))
}

// Listed without authentication, matching the existing route table.
#[utoipa::path(
    get,
    path = "/users",
    responses(
        (status = 200, description = "All users", body = [UserProfile]),
        (status = 500, description = "Store failure", body = ErrorBody),
    )
)]
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<UserProfile>>, AppError> {
    tracing::info!("Fetching all users");
    let users = state.identity.get_all_users().await?;
    Ok(Json(users))
}

// --- Middleware for bearer authentication ---

pub async fn auth_middleware(
    State(state): State<AppState>,
    auth_header: Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = match auth_header {
        Ok(TypedHeader(authorization)) => authorization.token().to_owned(),
        Err(rejection) if rejection.is_missing() => return Err(CredentialError::Missing.into()),
        Err(_) => return Err(CredentialError::Invalid.into()),
    };

    let identity = state.identity.verify_credential(&token)?;

    request.extensions_mut().insert(AuthIdentity(identity));

    Ok(next.run(request).await)
}
