//! Handshake authentication
//!
//! The token comes from the `token` query parameter or an `Authorization: Bearer`
//! header, in that order.

use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use socket_common::{AppError, Claims, ErrorResponse, JwtService};

/// Query parameters accepted on the WebSocket endpoint
#[derive(Debug, Default, Deserialize)]
pub struct ConnectParams {
    pub token: Option<String>,
}

/// Extract the handshake token
pub fn extract_token<'a>(params: &'a ConnectParams, headers: &'a HeaderMap) -> Option<&'a str> {
    params
        .token
        .as_deref()
        .filter(|token| !token.is_empty())
        .or_else(|| {
            headers
                .get(header::AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.strip_prefix("Bearer "))
                .map(str::trim)
                .filter(|token| !token.is_empty())
        })
}

/// Verify the handshake token
pub fn authenticate(
    jwt: &JwtService,
    params: &ConnectParams,
    headers: &HeaderMap,
) -> Result<Claims, AppError> {
    let token = extract_token(params, headers).ok_or(AppError::MissingAuth)?;
    jwt.validate(token)
}

/// Response for a rejected handshake
pub fn reject(error: &AppError) -> Response {
    let status = StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::UNAUTHORIZED);
    (status, Json(ErrorResponse::from(error))).into_response()
}
