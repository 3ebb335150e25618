//! Accounts API endpoints.

use api_types::{account::AccountNew, wallet::WalletView};
use axum::{Json, extract::State, http::StatusCode};

use crate::{ServerError, server::ServerState, views};

pub async fn open(
    State(state): State<ServerState>,
    Json(payload): Json<AccountNew>,
) -> Result<(StatusCode, Json<WalletView>), ServerError> {
    let display_name = payload.display_name.as_deref().unwrap_or_default();
    let wallet = state
        .engine
        .open_account(&payload.account_id, display_name)
        .await?;

    Ok((StatusCode::CREATED, Json(views::wallet(wallet))))
}
