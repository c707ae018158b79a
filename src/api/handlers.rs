use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    Form,
};
use serde::Deserialize;

use super::{admin_view, AppState};
use crate::errors::AppError;
use crate::gate::{DecisionOutcome, GateResult};
use crate::models::access::AccessStatus;

// ── Request DTOs ─────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CheckAccessParams {
    pub email: Option<String>,
}

#[derive(Deserialize)]
pub struct DecisionForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub decision: String, // "approved" | "rejected" | "pending"
}

// ── Handlers ─────────────────────────────────────────────────

/// GET /check-access?email= — the endpoint clients poll.
///
/// 200 with the payload once approved; every other outcome is a
/// non-success response whose body is a script comment.
pub async fn check_access(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CheckAccessParams>,
) -> Result<Response, AppError> {
    let email = params
        .email
        .filter(|e| !e.is_empty())
        .ok_or(AppError::MissingIdentifier)?;

    match state.gate.evaluate(&email).await? {
        GateResult::Granted(payload) => Ok((
            [(header::CONTENT_TYPE, "application/javascript")],
            payload,
        )
            .into_response()),
        GateResult::Pending => Err(AppError::AccessPending),
        GateResult::Denied(status) => Err(AppError::NotApproved { status }),
    }
}

/// GET /admin — all records with approve/reject controls.
pub async fn admin_panel(State(state): State<Arc<AppState>>) -> Result<Html<String>, AppError> {
    let records = state.gate.store().list().await?;
    Ok(Html(admin_view::render(&records)))
}

/// POST /action — operator decision, then back to the admin panel.
///
/// Unknown identifiers are a silent no-op; the operator is redirected either
/// way.
pub async fn record_decision(
    State(state): State<Arc<AppState>>,
    Form(form): Form<DecisionForm>,
) -> Result<Response, AppError> {
    let status = AccessStatus::parse_decision(&form.decision).ok_or_else(|| {
        tracing::warn!("record_decision: invalid decision: {}", form.decision);
        AppError::InvalidDecision(form.decision.clone())
    })?;

    if form.email.is_empty() {
        tracing::warn!("record_decision: missing email");
    } else if state.gate.decide(&form.email, status).await? == DecisionOutcome::UnknownIdentifier {
        tracing::debug!("record_decision: no record for {}", form.email);
    }

    Ok((StatusCode::FOUND, [(header::LOCATION, "/admin")]).into_response())
}

pub async fn healthz() -> &'static str {
    "ok"
}
