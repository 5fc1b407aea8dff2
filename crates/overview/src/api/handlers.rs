//! API handlers for the funding overview endpoints

use std::sync::Arc;

use axum::{
    extract::{RawQuery, State},
    http::StatusCode,
    Json,
};
use common::checksum;
use round_data::RoundDataError;
use tokio_util::sync::CancellationToken;

use crate::api::models::{parse_overview_request, ErrorBody, InvalidateResponse};
use crate::assembler::{FundingOverview, OverviewAssembler};
use crate::error::OverviewError;

pub struct OverviewApiState {
    pub assembler: Arc<OverviewAssembler>,
    /// Parent of every request's cancellation token; cancelled on shutdown
    pub shutdown: CancellationToken,
}

type ApiError = (StatusCode, Json<ErrorBody>);

/// `GET /api/v1/funding-overview?round=<id>[&chain=<id>][&pricing=spot|average]`
pub async fn funding_overview(
    State(state): State<Arc<OverviewApiState>>,
    RawQuery(query): RawQuery,
) -> Result<Json<FundingOverview>, ApiError> {
    let request = parse_overview_request(query.as_deref()).map_err(|e| error_response(&e, None))?;
    let round_id = checksum(&request.round_id);

    state
        .assembler
        .funding_overview(request, state.shutdown.child_token())
        .await
        .map(Json)
        .map_err(|e| error_response(&e, Some(round_id)))
}

/// `DELETE /api/v1/metadata-cache?round=<id>[&chain=<id>]`
pub async fn invalidate_metadata(
    State(state): State<Arc<OverviewApiState>>,
    RawQuery(query): RawQuery,
) -> Result<Json<InvalidateResponse>, ApiError> {
    let request = parse_overview_request(query.as_deref()).map_err(|e| error_response(&e, None))?;
    let chain_id = request
        .chain_id
        .unwrap_or_else(|| state.assembler.chains().default_chain());

    let invalidated = state.assembler.invalidate_round(chain_id, &request.round_id);
    Ok(Json(InvalidateResponse { invalidated }))
}

/// Status code for an overview failure
///
/// 400 is reserved for request parsing; malformed upstream data is a 500.
pub fn status_for(error: &OverviewError) -> StatusCode {
    match error {
        OverviewError::InvalidInput(_) | OverviewError::UnknownChain(_) => StatusCode::BAD_REQUEST,
        OverviewError::RoundData(RoundDataError::RoundNotFound { .. }) => StatusCode::NOT_FOUND,
        OverviewError::RoundData(_)
        | OverviewError::Matching(_)
        | OverviewError::Prices(_)
        | OverviewError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        OverviewError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        OverviewError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
    }
}

pub fn error_response(error: &OverviewError, round_id: Option<String>) -> ApiError {
    let round = match error {
        OverviewError::RoundData(RoundDataError::MetadataUnavailable { round, .. }) => {
            Some(round.as_ref().clone())
        }
        _ => None,
    };

    (
        status_for(error),
        Json(ErrorBody {
            message: error.to_string(),
            round_id,
            round,
        }),
    )
}

