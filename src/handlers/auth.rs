// src/handlers/auth.rs

use axum::{
    extract::{Multipart, State},
    response::IntoResponse,
    Json,
};
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError, ErrorBody},
    config::AppState,
    handlers::read_file_field,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::auth::{AuthResponse, LoginUserPayload, User, UserTenant},
};

// POST /api/auth/login
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginUserPayload,
    responses(
        (status = 200, description = "Login realizado", body = AuthResponse),
        (status = 400, description = "Payload inválido", body = ErrorBody),
        (status = 401, description = "Credenciais inválidas", body = ErrorBody)
    )
)]
pub async fn login(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<LoginUserPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let token = app_state
        .auth_service
        .login_user(&payload.email, &payload.password)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(AuthResponse { token }))
}

// GET /api/users/me
#[utoipa::path(
    get,
    path = "/api/users/me",
    tag = "Users",
    responses(
        (status = 200, description = "Usuário autenticado", body = User),
        (status = 401, description = "Token ausente ou inválido", body = ErrorBody)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_me(AuthenticatedUser(user): AuthenticatedUser) -> Json<User> {
    Json(user)
}

// GET /api/users/me/tenants
#[utoipa::path(
    get,
    path = "/api/users/me/tenants",
    tag = "Users",
    responses(
        (status = 200, description = "Lojas do usuário", body = Vec<UserTenant>)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_my_tenants(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let tenants = app_state
        .auth_service
        .my_tenants(user.0.id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(tenants))
}

// POST /api/users/me/profile-picture (multipart, campo "file")
#[utoipa::path(
    post,
    path = "/api/users/me/profile-picture",
    tag = "Users",
    request_body(content_type = "multipart/form-data", description = "Campo `file` com PNG, JPEG ou WEBP (até 5 MiB)"),
    responses(
        (status = 200, description = "Foto atualizada", body = User),
        (status = 400, description = "Arquivo inválido", body = ErrorBody),
        (status = 413, description = "Arquivo grande demais", body = ErrorBody)
    ),
    security(("api_jwt" = []))
)]
pub async fn upload_profile_picture(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let bytes = read_file_field(multipart).await.map_err(to_api)?;
    let url = app_state
        .upload_service
        .store_image("profile-pictures", &bytes)
        .await
        .map_err(to_api)?;

    let updated = app_state
        .auth_service
        .set_profile_picture(user.0.id, &url)
        .await
        .map_err(to_api)?;

    Ok(Json(updated))
}
