use auth::LockoutState;
use axum::extract::Path;
use axum::extract::State;
use axum::http::StatusCode;
use chrono::DateTime;
use chrono::Utc;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use crate::domain::principal::models::PrincipalId;
use crate::domain::principal::models::Role;
use crate::inbound::http::middleware::AuthenticatedPrincipal;
use crate::inbound::http::router::AppState;

pub async fn block_principal(
    State(state): State<AppState>,
    actor: AuthenticatedPrincipal,
    Path(principal_id): Path<i64>,
) -> Result<ApiSuccess<LockoutStatusData>, ApiError> {
    ensure_admin(&state, &actor).await?;

    let id = PrincipalId(principal_id);
    let lockout = state.auth_service.block(id).await?;
    tracing::info!(actor = %actor.id, principal_id = %id, "Administrative block");

    Ok(ApiSuccess::new(
        StatusCode::OK,
        LockoutStatusData::new(id, lockout),
    ))
}

pub async fn unblock_principal(
    State(state): State<AppState>,
    actor: AuthenticatedPrincipal,
    Path(principal_id): Path<i64>,
) -> Result<ApiSuccess<LockoutStatusData>, ApiError> {
    ensure_admin(&state, &actor).await?;

    let id = PrincipalId(principal_id);
    let lockout = state.auth_service.unblock(id).await?;
    tracing::info!(actor = %actor.id, principal_id = %id, "Administrative unblock");

    Ok(ApiSuccess::new(
        StatusCode::OK,
        LockoutStatusData::new(id, lockout),
    ))
}

/// The role claim may be stale, so administrative actions re-check the
/// acting principal against the store.
async fn ensure_admin(state: &AppState, actor: &AuthenticatedPrincipal) -> Result<(), ApiError> {
    state.auth_service.authorize(actor.id, Role::Admin).await?;
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LockoutStatusData {
    pub id: i64,
    pub state: &'static str,
    pub locked_until: Option<DateTime<Utc>>,
}

impl LockoutStatusData {
    fn new(id: PrincipalId, lockout: LockoutState) -> Self {
        let (state, locked_until) = match lockout {
            LockoutState::Open => ("OPEN", None),
            LockoutState::Warning { .. } => ("WARNING", None),
            LockoutState::LockedTemporary { until } => ("LOCKED_TEMPORARY", Some(until)),
            LockoutState::LockedPermanent => ("LOCKED_PERMANENT", None),
        };

        Self {
            id: id.0,
            state,
            locked_until,
        }
    }
}
