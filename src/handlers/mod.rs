//! HTTP 处理器模块

pub mod auth;
pub mod comment;
pub mod health;
pub mod post;
pub mod user;

use crate::error::AppError;
use axum::{
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;

/// JSON 请求体提取器
///
/// Same as `Json<T>`, but a missing field, a malformed body or a wrong content
/// type is rejected as `InvalidInput` (400) inside the usual error envelope.
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::InvalidInput(rejection.body_text()))?;

        Ok(Self(value))
    }
}
