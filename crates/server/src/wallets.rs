//! Wallets API endpoints.

use api_types::wallet::{CreditNew, DebitNew, LedgerReceipt, RefundNew, WalletView};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::{CreditCmd, DebitCmd, RefundCmd};

use crate::{ServerError, server::ServerState, views};

pub async fn get_or_create(
    State(state): State<ServerState>,
    Path(account_id): Path<String>,
) -> Result<Json<WalletView>, ServerError> {
    let wallet = state.engine.get_or_create_wallet(&account_id).await?;
    Ok(Json(views::wallet(wallet)))
}

pub async fn show(
    State(state): State<ServerState>,
    Path(account_id): Path<String>,
) -> Result<Json<WalletView>, ServerError> {
    let wallet = state.engine.wallet(&account_id).await?;
    Ok(Json(views::wallet(wallet)))
}

pub async fn credit(
    State(state): State<ServerState>,
    Path(account_id): Path<String>,
    Json(payload): Json<CreditNew>,
) -> Result<(StatusCode, Json<LedgerReceipt>), ServerError> {
    let mut cmd = CreditCmd::new(
        account_id,
        payload.amount_minor,
        views::engine_category(payload.category),
        views::engine_balance_type(payload.balance_type),
    );
    if let Some(description) = payload.description {
        cmd = cmd.description(description);
    }
    if let Some(reference) = payload.reference {
        cmd = cmd.reference(reference);
    }
    if let Some(metadata) = payload.metadata {
        cmd = cmd.metadata(metadata);
    }

    let receipt = state.engine.credit(cmd).await?;
    Ok((StatusCode::CREATED, Json(views::receipt(receipt))))
}

pub async fn debit(
    State(state): State<ServerState>,
    Path(account_id): Path<String>,
    Json(payload): Json<DebitNew>,
) -> Result<(StatusCode, Json<LedgerReceipt>), ServerError> {
    let mut cmd = DebitCmd::new(
        account_id,
        payload.amount_minor,
        views::engine_category(payload.category),
        views::engine_balance_type(payload.balance_type),
    );
    if let Some(description) = payload.description {
        cmd = cmd.description(description);
    }
    if let Some(reference) = payload.reference {
        cmd = cmd.reference(reference);
    }
    if let Some(metadata) = payload.metadata {
        cmd = cmd.metadata(metadata);
    }

    let receipt = state.engine.debit(cmd).await?;
    Ok((StatusCode::CREATED, Json(views::receipt(receipt))))
}

pub async fn refund(
    State(state): State<ServerState>,
    Path(account_id): Path<String>,
    Json(payload): Json<RefundNew>,
) -> Result<(StatusCode, Json<LedgerReceipt>), ServerError> {
    if payload.reason.trim().is_empty() {
        return Err(ServerError::Generic("reason is required".to_string()));
    }
    let cmd = RefundCmd::new(
        account_id,
        payload.amount_minor,
        payload.original_reference,
        payload.reason,
    )
    .balance_type(views::engine_balance_type(payload.balance_type));

    let receipt = state.engine.refund(cmd).await?;
    Ok((StatusCode::CREATED, Json(views::receipt(receipt))))
}

pub async fn disable(
    State(state): State<ServerState>,
    Path(account_id): Path<String>,
) -> Result<Json<WalletView>, ServerError> {
    let wallet = state.engine.disable_wallet(&account_id).await?;
    Ok(Json(views::wallet(wallet)))
}
