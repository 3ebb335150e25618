//! Transactions API endpoints

use api_types::{
    transaction::{TransactionList, TransactionListResponse, TransactionReverse, TransactionView},
    wallet::LedgerReceipt,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{ServerError, server::ServerState, views};

const DEFAULT_PER_PAGE: u64 = 20;

pub async fn list(
    State(state): State<ServerState>,
    Path(account_id): Path<String>,
    Query(query): Query<TransactionList>,
) -> Result<Json<TransactionListResponse>, ServerError> {
    let filter = engine::TransactionListFilter {
        status: query.status.map(views::engine_status),
        category: query.category.map(views::engine_category),
        kind: query.kind.map(views::engine_kind),
        from: query.from,
        to: query.to,
    };

    let page = state
        .engine
        .list_transactions(
            &account_id,
            query.page.unwrap_or(1),
            query.per_page.unwrap_or(DEFAULT_PER_PAGE),
            &filter,
        )
        .await?;

    Ok(Json(TransactionListResponse {
        transactions: page.items.into_iter().map(views::transaction).collect(),
        page: page.page,
        per_page: page.per_page,
        total_items: page.total_items,
        total_pages: page.total_pages,
    }))
}

/// Looks a transaction up by reference, or by id when the path is a UUID.
pub async fn get(
    State(state): State<ServerState>,
    Path(key): Path<String>,
) -> Result<Json<TransactionView>, ServerError> {
    let tx = match Uuid::parse_str(&key) {
        Ok(id) => state.engine.transaction(id).await?,
        Err(_) => state.engine.transaction_by_reference(&key).await?,
    };
    Ok(Json(views::transaction(tx)))
}

pub async fn reverse(
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TransactionReverse>,
) -> Result<(StatusCode, Json<LedgerReceipt>), ServerError> {
    let reason = payload.reason.trim();
    if reason.is_empty() {
        return Err(ServerError::Generic("reason is required".to_string()));
    }

    let receipt = state.engine.reverse(id, reason).await?;
    Ok((StatusCode::CREATED, Json(views::receipt(receipt))))
}
