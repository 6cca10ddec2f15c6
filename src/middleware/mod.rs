use axum::{
    extract::{FromRequest, FromRequestParts},
    http::request::Parts,
};

use crate::error::AppError;

// Заголовки проставляет внешний auth-шлюз
pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

fn header_value<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Покупатель, от имени которого выполняется запрос.
#[derive(Debug, Clone)]
pub struct CustomerId(pub String);

impl<S> FromRequestParts<S> for CustomerId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        header_value(parts, USER_ID_HEADER)
            .map(|id| CustomerId(id.to_string()))
            .ok_or(AppError::Unauthorized)
    }
}

/// Администратор: нужен и идентификатор, и роль `admin`.
#[derive(Debug, Clone)]
pub struct AdminUser(pub String);

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let CustomerId(user_id) = CustomerId::from_request_parts(parts, state).await?;
        match header_value(parts, USER_ROLE_HEADER) {
            Some(role) if role.eq_ignore_ascii_case("admin") => Ok(AdminUser(user_id)),
            _ => {
                tracing::warn!("User {} denied access to admin route {}", user_id, parts.uri.path());
                Err(AppError::Forbidden)
            }
        }
    }
}

/// JSON-тело запроса; ошибки разбора отдаются в общем формате `AppError`.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);
