//! Caller identity extractor.
//!
//! Clients identify themselves with an `X-User-Id` header carrying the
//! account id returned at login. The extractor never rejects: whether a
//! missing or unknown caller is acceptable is decided by the access gate.

use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};

/// The HTTP header carrying the caller's account id.
pub const CALLER_HEADER: &str = "x-user-id";

/// The raw caller header, if one was sent.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(caller: Caller) -> impl IntoResponse {
///     catalog.delete(caller.id(), &id).await
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct Caller(Option<String>);

impl Caller {
    /// The caller header value, trimmed. `None` if absent or blank.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get(CALLER_HEADER)
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_owned);

        // Associate any error captured during this request with the caller.
        if let Some(id) = &id {
            sentry::configure_scope(|scope| {
                scope.set_user(Some(sentry::User {
                    id: Some(id.clone()),
                    ..Default::default()
                }));
            });
        }

        Ok(Self(id))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;

    async fn extract(header: Option<&str>) -> Caller {
        let mut builder = Request::builder().uri("/api/products");
        if let Some(value) = header {
            builder = builder.header("X-User-Id", value);
        }
        let (mut parts, ()) = builder.body(()).unwrap().into_parts();
        Caller::from_request_parts(&mut parts, &()).await.unwrap()
    }

    #[tokio::test]
    async fn test_header_present() {
        let caller = extract(Some(" 6f1c2d7e-3b0a-4c55-9a8e-0d3b8f2a1e44 ")).await;
        assert_eq!(caller.id(), Some("6f1c2d7e-3b0a-4c55-9a8e-0d3b8f2a1e44"));
    }

    #[tokio::test]
    async fn test_header_missing_or_blank() {
        assert_eq!(extract(None).await.id(), None);
        assert_eq!(extract(Some("   ")).await.id(), None);
    }
}
