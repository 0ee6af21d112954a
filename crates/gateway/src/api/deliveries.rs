//! Deliveries API — outgoing-message status records.

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Json};
use serde::Deserialize;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListDeliveriesQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    25
}

/// `GET /v1/deliveries`
pub async fn list_deliveries(
    State(state): State<AppState>,
    Query(query): Query<ListDeliveriesQuery>,
) -> impl IntoResponse {
    let (deliveries, total) = state.deliveries.list(query.limit, query.offset).await;

    Json(serde_json::json!({
        "deliveries": deliveries,
        "total": total,
    }))
}
