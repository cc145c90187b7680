//! Caller identity extraction
//!
//! Identity verification happens upstream (session middleware / gateway);
//! by the time a request reaches a handler the validated user id is on the
//! `x-identity` header. Flows receive it as an explicit parameter, never
//! from ambient state.

use crate::error::OpError;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

/// Pre-validated caller identity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity(pub Uuid);

pub const IDENTITY_HEADER: &str = "x-identity";

#[async_trait]
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = OpError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(IDENTITY_HEADER)
            .ok_or(OpError::Unauthorized)?;
        let id = value
            .to_str()
            .ok()
            .and_then(|s| Uuid::parse_str(s).ok())
            .ok_or(OpError::Unauthorized)?;
        Ok(Identity(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(request: Request<()>) -> Result<Identity, OpError> {
        let (mut parts, ()) = request.into_parts();
        Identity::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn valid_header_yields_identity() {
        let id = Uuid::new_v4();
        let request = Request::builder()
            .header(IDENTITY_HEADER, id.to_string())
            .body(())
            .unwrap();
        assert_eq!(extract(request).await.unwrap(), Identity(id));
    }

    #[tokio::test]
    async fn missing_header_is_unauthorized() {
        let request = Request::builder().body(()).unwrap();
        assert!(matches!(extract(request).await, Err(OpError::Unauthorized)));
    }

    #[tokio::test]
    async fn garbage_header_is_unauthorized() {
        let request = Request::builder()
            .header(IDENTITY_HEADER, "not-a-uuid")
            .body(())
            .unwrap();
        assert!(matches!(extract(request).await, Err(OpError::Unauthorized)));
    }
}
