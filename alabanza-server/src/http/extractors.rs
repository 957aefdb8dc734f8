//! Custom Axum extractors

use std::sync::Arc;

use axum::extract::{FromRequestParts, Query};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use serde::Deserialize;

use super::error::ApiError;
use super::server::AppState;

/// Whether the caller presented the admin token.
///
/// Never rejects. Used where unprivileged callers are still served, such as
/// the alert socket, which viewers join read-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Access {
    pub privileged: bool,
}

impl FromRequestParts<Arc<AppState>> for Access {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let privileged = match state.admin_token.as_deref() {
            // No token configured: single-user local mode
            None => true,
            Some(expected) => presented_token(parts).is_some_and(|t| tokens_match(&t, expected)),
        };
        Ok(Self { privileged })
    }
}

/// Gate for mutating routes.
///
/// Accepts `Authorization: Bearer <token>`, or a `token` query parameter for
/// clients that cannot set headers (browser WebSockets).
#[derive(Debug, Clone, Copy)]
pub struct Privileged;

impl FromRequestParts<Arc<AppState>> for Privileged {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let access = Access::from_request_parts(parts, state)
            .await
            .unwrap_or_else(|never| match never {});
        if access.privileged {
            Ok(Self)
        } else {
            Err(ApiError::Forbidden {
                reason: "admin token required",
            })
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenParam {
    token: Option<String>,
}

fn presented_token(parts: &Parts) -> Option<String> {
    let from_header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_owned());

    from_header.or_else(|| {
        Query::<TokenParam>::try_from_uri(&parts.uri)
            .ok()
            .and_then(|Query(param)| param.token)
    })
}

/// Compare without short-circuiting on the first differing byte
fn tokens_match(presented: &str, expected: &str) -> bool {
    let (a, b) = (presented.as_bytes(), expected.as_bytes());
    let diff = a
        .iter()
        .zip(b)
        .fold(a.len() ^ b.len(), |acc, (x, y)| acc | usize::from(x ^ y));
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(uri: &str, auth: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri(uri);
        if let Some(auth) = auth {
            builder = builder.header(AUTHORIZATION, auth);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn reads_bearer_header() {
        let p = parts("/songs", Some("Bearer s3cret"));
        assert_eq!(presented_token(&p).as_deref(), Some("s3cret"));
    }

    #[test]
    fn reads_query_token() {
        let p = parts("/ws?room=main&token=s3cret", None);
        assert_eq!(presented_token(&p).as_deref(), Some("s3cret"));
    }

    #[test]
    fn query_token_is_percent_decoded() {
        let p = parts("/ws?token=a%2Bb%2F%3D", None);
        assert_eq!(presented_token(&p).as_deref(), Some("a+b/="));
    }

    #[test]
    fn header_wins_over_query() {
        let p = parts("/ws?token=other", Some("Bearer s3cret"));
        assert_eq!(presented_token(&p).as_deref(), Some("s3cret"));
    }

    #[test]
    fn missing_query_token_is_none() {
        let p = parts("/ws?room=main", None);
        assert_eq!(presented_token(&p), None);
    }

    #[test]
    fn token_comparison() {
        assert!(tokens_match("s3cret", "s3cret"));
        assert!(!tokens_match("s3cret", "s3creT"));
        assert!(!tokens_match("s3cre", "s3cret"));
        assert!(!tokens_match("", "s3cret"));
    }

    #[test]
    fn ignores_other_schemes() {
        let p = parts("/songs", Some("Basic s3cret"));
        assert_eq!(presented_token(&p), None);
    }
}
