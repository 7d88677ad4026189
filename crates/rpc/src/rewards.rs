//! `/blockchain/rewards` endpoints.

use axum::extract::{Path as AxumPath, State};
use axum::Json;
use tracing::debug;
use waves_rewards::{LedgerView, RewardInfo, RewardInfoPresenter};
use waves_types::Height;

use crate::server::{ApiError, SharedState};

/// GET /blockchain/rewards - reward info at the current height
pub(crate) async fn handle_rewards(
    State(state): State<SharedState>,
) -> Result<Json<RewardInfo>, ApiError> {
    state.record_request();
    let ledger = state.ledger.read();
    let info = RewardInfoPresenter::present(&*ledger, ledger.height())?;
    Ok(Json(info))
}

/// GET /blockchain/rewards/:height - reward info at a past height
pub(crate) async fn handle_rewards_at_height(
    State(state): State<SharedState>,
    AxumPath(height): AxumPath<String>,
) -> Result<Json<RewardInfo>, ApiError> {
    state.record_request();
    let height = parse_height(&height)?;
    debug!(target: "rpc", height, "reward info requested");

    let ledger = state.ledger.read();
    let info = RewardInfoPresenter::present(&*ledger, height)?;
    Ok(Json(info))
}

fn parse_height(value: &str) -> Result<Height, ApiError> {
    value
        .trim()
        .parse::<Height>()
        .map_err(|_| ApiError::bad_request(format!("invalid height: {value}")))
}
