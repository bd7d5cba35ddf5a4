use crate::error::ServiceError;
use axum::extract::FromRequest;

/// `Json` whose rejections answer 400 with the usual `{error}` body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ServiceError))]
pub struct ApiJson<T>(pub T);
