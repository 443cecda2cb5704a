//! Route handlers.
//!
//! Request and response bodies keep the treasury API's field names. Request
//! fields also accept the workflow names (`identity`, `proof`,
//! `authorizationPayload`) as aliases.

use super::extract::Authenticated;
use super::AppState;
use crate::error::{EscrowError, EscrowResult};
use crate::identity::Role;
use crate::ledger::{Drops, LedgerClient};
use crate::proposal::Proposal;
use crate::service::require_role;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

type JsonBody<T> = Result<Json<T>, JsonRejection>;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default, alias = "identity")]
    pub address: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub challenge: String,
    pub expires_in_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    #[serde(default, alias = "identity")]
    pub address: String,
    #[serde(default, alias = "proof")]
    pub signature: String,
}

#[derive(Debug, Serialize)]
pub struct UserView {
    pub address: String,
    pub role: Role,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub token: String,
    pub user: UserView,
}

/// Amounts arrive as JSON strings or numbers.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    Text(String),
    Number(serde_json::Number),
}

impl AmountInput {
    fn as_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Number(number) => number.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateProposalRequest {
    #[serde(default)]
    pub amount: Option<AmountInput>,
    #[serde(default)]
    pub destination: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProposalResponse {
    pub proposal: Proposal,
    /// Ledger outcome code of the lock-up.
    pub xrpl_result: String,
}

#[derive(Debug, Serialize)]
pub struct ProposalListResponse {
    pub proposals: Vec<Proposal>,
}

#[derive(Debug, Deserialize)]
pub struct SignRequest {
    #[serde(default, alias = "authorizationPayload")]
    pub tx_blob: String,
}

#[derive(Debug, Serialize)]
pub struct ProposalResponse {
    pub proposal: Proposal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseResponse {
    pub proposal: Proposal,
    pub xrpl_result: String,
    pub tx_hash: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResponse {
    pub treasury_address: String,
    pub treasury_balance_xrp: Drops,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub ledger_connected: bool,
    pub treasury_address: String,
    pub verifier_count: usize,
}

pub async fn health<L: LedgerClient + 'static>(
    State(service): State<AppState<L>>,
) -> EscrowResult<Json<HealthResponse>> {
    let report = service.health()?;
    Ok(Json(HealthResponse {
        status: "ok",
        ledger_connected: report.ledger_connected,
        treasury_address: report.treasury.to_string(),
        verifier_count: report.approver_count,
    }))
}

pub async fn login<L: LedgerClient + 'static>(
    State(service): State<AppState<L>>,
    body: JsonBody<LoginRequest>,
) -> EscrowResult<Json<LoginResponse>> {
    let Json(request) = body?;
    let issued = service.login(&request.address)?;
    Ok(Json(LoginResponse {
        challenge: issued.payload,
        expires_in_ms: issued.ttl.as_millis() as u64,
    }))
}

pub async fn verify<L: LedgerClient + 'static>(
    State(service): State<AppState<L>>,
    body: JsonBody<VerifyRequest>,
) -> EscrowResult<Json<VerifyResponse>> {
    let Json(request) = body?;
    let outcome = service.verify(&request.address, &request.signature)?;
    Ok(Json(VerifyResponse {
        token: outcome.token,
        user: UserView {
            address: outcome.principal.identity.to_string(),
            role: outcome.principal.role,
        },
    }))
}

pub async fn logout<L: LedgerClient + 'static>(
    State(service): State<AppState<L>>,
    auth: Authenticated,
) -> EscrowResult<StatusCode> {
    service.logout(&auth.token)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn create_proposal<L: LedgerClient + 'static>(
    State(service): State<AppState<L>>,
    auth: Authenticated,
    body: JsonBody<CreateProposalRequest>,
) -> EscrowResult<(StatusCode, Json<CreateProposalResponse>)> {
    require_role(&auth.principal, Role::Initiator)?;
    let Json(request) = body?;
    let amount = request
        .amount
        .map(|amount| amount.as_text())
        .unwrap_or_default();

    let created = service
        .create_proposal(&auth.principal, &amount, &request.destination)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateProposalResponse {
            proposal: created.proposal,
            xrpl_result: created.lock.outcome,
        }),
    ))
}

pub async fn list_proposals<L: LedgerClient + 'static>(
    State(service): State<AppState<L>>,
    auth: Authenticated,
) -> EscrowResult<Json<ProposalListResponse>> {
    let proposals = service.list_proposals(&auth.principal)?;
    Ok(Json(ProposalListResponse { proposals }))
}

pub async fn sign<L: LedgerClient + 'static>(
    State(service): State<AppState<L>>,
    auth: Authenticated,
    Path(id): Path<String>,
    body: JsonBody<SignRequest>,
) -> EscrowResult<Json<ProposalResponse>> {
    require_role(&auth.principal, Role::Approver)?;
    let Json(request) = body?;
    let proposal = service.sign(&auth.principal, &id, &request.tx_blob).await?;
    Ok(Json(ProposalResponse { proposal }))
}

pub async fn release<L: LedgerClient + 'static>(
    State(service): State<AppState<L>>,
    auth: Authenticated,
    Path(id): Path<String>,
) -> EscrowResult<Json<ReleaseResponse>> {
    let released = service.release(&auth.principal, &id).await?;
    Ok(Json(ReleaseResponse {
        proposal: released.proposal,
        xrpl_result: released.outcome,
        tx_hash: released.tx_hash,
    }))
}

pub async fn balances<L: LedgerClient + 'static>(
    State(service): State<AppState<L>>,
    auth: Authenticated,
) -> EscrowResult<Json<BalanceResponse>> {
    let balance = service.balance(&auth.principal).await?;
    Ok(Json(BalanceResponse {
        treasury_address: balance.treasury.to_string(),
        treasury_balance_xrp: balance.balance,
    }))
}

/// Unmatched routes.
pub async fn not_found() -> EscrowError {
    EscrowError::NotFound("route".to_string())
}
