//! Caller identity extraction and ownership guards.
//!
//! The identity provider itself is an external collaborator; by the
//! time a request reaches this service the fronting identity layer has
//! authenticated the caller and forwarded the principal in a header.
//! This crate turns that ambient principal into an explicit value that
//! handlers receive as a parameter.

use axum::extract::{FromRequestParts, OptionalFromRequestParts};
use axum::http::request::Parts;

use bookhub_http::error::AppError;
use bookhub_kernel::settings::AuthSettings;

/// The authenticated caller, as forwarded by the identity layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity(pub String);

impl Identity {
    pub fn user_id(&self) -> &str {
        &self.0
    }
}

fn identity_from_parts(parts: &Parts) -> Option<Identity> {
    // The configured header name rides along as a router extension;
    // default settings cover bare routers (tests, tools).
    let header = parts
        .extensions
        .get::<AuthSettings>()
        .cloned()
        .unwrap_or_default()
        .user_header;

    let value = parts.headers.get(header.as_str())?.to_str().ok()?.trim();
    if value.is_empty() {
        return None;
    }
    Some(Identity(value.to_string()))
}

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        identity_from_parts(parts).ok_or_else(|| AppError::unauthorized("authentication required"))
    }
}

impl<S> OptionalFromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(identity_from_parts(parts))
    }
}

/// Ownership guard: the caller must be the stored owner of the
/// resource. Failures surface as Unauthorized, not Forbidden.
pub fn ensure_owner(owner: &str, identity: &Identity) -> Result<(), AppError> {
    if owner != identity.user_id() {
        tracing::warn!(owner, caller = identity.user_id(), "ownership check failed");
        return Err(AppError::unauthorized(
            "only the owning user may modify this resource",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with_header(name: &str, value: &str) -> Parts {
        let (parts, _) = Request::builder()
            .uri("/")
            .header(name, value)
            .body(())
            .unwrap()
            .into_parts();
        parts
    }

    #[tokio::test]
    async fn extracts_identity_from_default_header() {
        let mut parts = parts_with_header("x-bookhub-user", "user-1");
        let identity = <Identity as FromRequestParts<()>>::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(identity.user_id(), "user-1");
    }

    #[tokio::test]
    async fn missing_header_is_unauthorized() {
        let (mut parts, _) = Request::builder().uri("/").body(()).unwrap().into_parts();
        let result = <Identity as FromRequestParts<()>>::from_request_parts(&mut parts, &()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn blank_header_is_unauthorized() {
        let mut parts = parts_with_header("x-bookhub-user", "   ");
        let result = <Identity as FromRequestParts<()>>::from_request_parts(&mut parts, &()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn optional_extraction_yields_none_without_header() {
        let (mut parts, _) = Request::builder().uri("/").body(()).unwrap().into_parts();
        let identity =
            <Identity as OptionalFromRequestParts<()>>::from_request_parts(&mut parts, &())
                .await
                .unwrap();
        assert!(identity.is_none());
    }

    #[test]
    fn owner_check_accepts_owner_and_rejects_others() {
        let caller = Identity("user-1".to_string());
        assert!(ensure_owner("user-1", &caller).is_ok());
        assert!(ensure_owner("user-2", &caller).is_err());
    }
}
