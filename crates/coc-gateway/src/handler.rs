use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use bytes::Bytes;
use coc_ledger::RecordCodec;
use coc_protocol::{
    endpoints, BatchStatusResponse, HealthResponse, StateResponse, SubmitResponse,
    TransactionsResponse,
};
use coc_types::LedgerAddress;
use serde::Deserialize;

use crate::error::{GatewayError, GatewayResult};
use crate::processor::BatchProcessor;

pub type SharedProcessor = Arc<BatchProcessor>;

/// Health check handler.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}

/// `POST /batches`: verify now, commit later.
pub async fn submit_batches(
    State(processor): State<SharedProcessor>,
    body: Bytes,
) -> GatewayResult<(StatusCode, Json<SubmitResponse>)> {
    let ids = processor.accept(&body).await?;
    let link = endpoints::batch_status_link(&ids.join(","));
    Ok((StatusCode::ACCEPTED, Json(SubmitResponse { link })))
}

/// `GET /state/{address}`
pub async fn get_state(
    State(processor): State<SharedProcessor>,
    Path(address): Path<String>,
) -> GatewayResult<Json<StateResponse>> {
    let address = LedgerAddress::parse(&address)?;
    let bytes = processor
        .state(&address)?
        .ok_or_else(|| GatewayError::NotFound(format!("no state at {}", address.short())))?;
    Ok(Json(StateResponse {
        data: RecordCodec::bytes_to_transport(&bytes),
        link: Some(endpoints::state_path(address.as_str())),
    }))
}

/// `GET /transactions`
pub async fn list_transactions(
    State(processor): State<SharedProcessor>,
) -> Json<TransactionsResponse> {
    Json(TransactionsResponse {
        data: processor.transactions().await,
    })
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    /// Comma-separated batch ids.
    pub id: String,
}

/// `GET /batch_statuses?id=a,b`
pub async fn batch_statuses(
    State(processor): State<SharedProcessor>,
    Query(query): Query<StatusQuery>,
) -> GatewayResult<Json<BatchStatusResponse>> {
    let ids: Vec<&str> = query
        .id
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .collect();
    if ids.is_empty() {
        return Err(GatewayError::BadRequest("id must name at least one batch".into()));
    }
    let mut data = Vec::with_capacity(ids.len());
    for id in ids {
        data.push(processor.status(id).await);
    }
    Ok(Json(BatchStatusResponse { data }))
}
