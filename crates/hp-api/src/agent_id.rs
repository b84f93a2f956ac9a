//! `X-Agent-ID` extractor.
//!
//! Every endpoint that acts on behalf of an agent (as opposed to the
//! no-auth `/health`, `/sse`, and `/ws` endpoints) requires this header.
//! It identifies which agent is making the call, independent of the
//! `AuthLayer`'s API-key check, which only establishes that the caller
//! holds a valid key at all.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use uuid::Uuid;

pub struct AgentId(pub Uuid);

impl<S> FromRequestParts<S> for AgentId
where
    S: Send + Sync,
{
    type Rejection = AgentIdRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get("x-agent-id")
            .ok_or(AgentIdRejection::Missing)?;
        let raw = header.to_str().map_err(|_| AgentIdRejection::Invalid)?;
        let id = Uuid::parse_str(raw).map_err(|_| AgentIdRejection::Invalid)?;
        Ok(AgentId(id))
    }
}

pub enum AgentIdRejection {
    Missing,
    Invalid,
}

impl IntoResponse for AgentIdRejection {
    fn into_response(self) -> Response {
        let msg = match self {
            AgentIdRejection::Missing => "missing X-Agent-ID header",
            AgentIdRejection::Invalid => "X-Agent-ID header is not a valid uuid",
        };
        (
            StatusCode::UNAUTHORIZED,
            axum::Json(serde_json::json!({ "error": msg })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[tokio::test]
    async fn accepts_valid_uuid() {
        let req = Request::builder()
            .header("x-agent-id", Uuid::nil().to_string())
            .body(())
            .unwrap();
        let (mut parts, _) = req.into_parts();
        let extracted = AgentId::from_request_parts(&mut parts, &()).await;
        assert!(extracted.is_ok());
    }

    #[tokio::test]
    async fn rejects_missing_header() {
        let req = Request::builder().body(()).unwrap();
        let (mut parts, _) = req.into_parts();
        let extracted = AgentId::from_request_parts(&mut parts, &()).await;
        assert!(matches!(extracted, Err(AgentIdRejection::Missing)));
    }
}
