//! Per-wallet mutual exclusion.
//!
//! The lock is the `is_locked` column, flipped with a single conditional
//! UPDATE so two callers can never both observe it free.

use chrono::Utc;
use sea_orm::{QueryFilter, prelude::*, sea_query::Expr};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, wallets};

use super::Engine;

impl Engine {
    /// Compare-and-set `is_locked` from false to true on an active wallet.
    pub(super) async fn acquire_lock(&self, wallet_id: Uuid, account_id: &str) -> ResultEngine<()> {
        let result = wallets::Entity::update_many()
            .col_expr(wallets::Column::IsLocked, Expr::value(true))
            .filter(wallets::Column::Id.eq(wallet_id.to_string()))
            .filter(wallets::Column::IsLocked.eq(false))
            .filter(wallets::Column::IsActive.eq(true))
            .exec(&self.database)
            .await?;
        if result.rows_affected == 1 {
            tracing::debug!(%wallet_id, "wallet lock acquired");
            return Ok(());
        }

        let model = wallets::Entity::find_by_id(wallet_id.to_string())
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::WalletNotFound(account_id.to_string()))?;
        if !model.is_active {
            Err(EngineError::WalletInactive(account_id.to_string()))
        } else {
            tracing::debug!(%wallet_id, "wallet lock contended");
            Err(EngineError::WalletLocked(account_id.to_string()))
        }
    }

    /// Clears the lock. A disabled wallet stays locked.
    ///
    /// Release errors are logged, never returned.
    pub(super) async fn release_lock(&self, wallet_id: Uuid) {
        let result = wallets::Entity::update_many()
            .col_expr(wallets::Column::IsLocked, Expr::value(false))
            .col_expr(wallets::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(wallets::Column::Id.eq(wallet_id.to_string()))
            .filter(wallets::Column::IsActive.eq(true))
            .exec(&self.database)
            .await;
        match result {
            Ok(_) => tracing::debug!(%wallet_id, "wallet lock released"),
            Err(err) => tracing::error!(%wallet_id, error = %err, "failed to release wallet lock"),
        }
    }
}
