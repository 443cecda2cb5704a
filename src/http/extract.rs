//! Bearer-token authentication extractor.

use super::AppState;
use crate::auth::Principal;
use crate::error::EscrowError;
use crate::ledger::LedgerClient;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

/// The caller behind `Authorization: Bearer <token>`.
pub struct Authenticated {
    pub principal: Principal,
    pub token: String,
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let header = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[async_trait]
impl<L: LedgerClient + 'static> FromRequestParts<AppState<L>> for Authenticated {
    type Rejection = EscrowError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<L>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(EscrowError::Unauthorized)?;
        let principal = state.authenticate(token)?;
        Ok(Self {
            principal,
            token: token.to_string(),
        })
    }
}
