use chrono::Utc;
use sea_orm::{
    ActiveValue, ConnectionTrait, QueryFilter, SqlErr, TransactionTrait, prelude::*,
    sea_query::Expr,
};

use crate::{Account, EngineError, ResultEngine, Wallet, accounts, util::normalize_optional_text, wallets};

use super::{Engine, with_tx};

impl Engine {
    /// Registers an account holder and opens its wallet.
    pub async fn open_account(&self, account_id: &str, display_name: &str) -> ResultEngine<Wallet> {
        let account_id = normalize_account_id(account_id)?;
        let display_name =
            normalize_optional_text(Some(display_name)).unwrap_or_else(|| account_id.clone());

        let wallet = with_tx!(self, |db_tx| {
            if accounts::Entity::find_by_id(account_id.clone())
                .one(&db_tx)
                .await?
                .is_some()
            {
                return Err(EngineError::ExistingKey(account_id));
            }
            let account = Account::new(account_id.clone(), display_name);
            accounts::ActiveModel::from(&account).insert(&db_tx).await?;

            let wallet = Wallet::new(account_id.clone());
            wallets::ActiveModel::from(&wallet).insert(&db_tx).await?;
            Ok(wallet)
        })?;

        tracing::info!(account_id = %wallet.account_id, wallet_id = %wallet.id, "account opened");
        Ok(wallet)
    }

    /// Returns the wallet of `account_id`, creating an empty one on first use.
    ///
    /// Two concurrent first calls race on the unique `account_id` index; the
    /// loser re-reads the winner's row.
    pub async fn get_or_create_wallet(&self, account_id: &str) -> ResultEngine<Wallet> {
        let account_id = normalize_account_id(account_id)?;
        if let Some(model) = self.find_wallet_model(&self.database, &account_id).await? {
            return Wallet::try_from(model);
        }

        let account = accounts::Entity::find_by_id(account_id.clone())
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::AccountNotFound(account_id.clone()))?;
        if !account.is_active {
            return Err(EngineError::AccountInactive(account_id));
        }

        let wallet = Wallet::new(account_id.clone());
        match wallets::ActiveModel::from(&wallet).insert(&self.database).await {
            Ok(_) => {
                tracing::info!(%account_id, wallet_id = %wallet.id, "wallet created");
                Ok(wallet)
            }
            Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                tracing::debug!(%account_id, "wallet created concurrently, re-reading");
                self.wallet(&account_id).await
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Returns the wallet of `account_id`.
    pub async fn wallet(&self, account_id: &str) -> ResultEngine<Wallet> {
        let account_id = normalize_account_id(account_id)?;
        let model = self
            .find_wallet_model(&self.database, &account_id)
            .await?
            .ok_or_else(|| EngineError::WalletNotFound(account_id.clone()))?;
        Wallet::try_from(model)
    }

    /// Permanently disables a wallet: inactive and locked. Idempotent.
    pub async fn disable_wallet(&self, account_id: &str) -> ResultEngine<Wallet> {
        let account_id = normalize_account_id(account_id)?;
        let account_id = account_id.as_str();
        let wallet = with_tx!(self, |db_tx| {
            let model = self
                .find_wallet_model(&db_tx, account_id)
                .await?
                .ok_or_else(|| EngineError::WalletNotFound(account_id.to_string()))?;
            if !model.is_active && model.is_locked {
                return Wallet::try_from(model);
            }

            wallets::Entity::update_many()
                .col_expr(wallets::Column::IsActive, Expr::value(false))
                .col_expr(wallets::Column::IsLocked, Expr::value(true))
                .col_expr(wallets::Column::UpdatedAt, Expr::value(Utc::now()))
                .filter(wallets::Column::Id.eq(model.id.clone()))
                .exec(&db_tx)
                .await?;

            let model = self
                .find_wallet_model(&db_tx, account_id)
                .await?
                .ok_or_else(|| EngineError::WalletNotFound(account_id.to_string()))?;
            Wallet::try_from(model)
        })?;

        tracing::warn!(account_id = %wallet.account_id, "wallet disabled");
        Ok(wallet)
    }

    pub(super) async fn find_wallet_model<C: ConnectionTrait>(
        &self,
        db: &C,
        account_id: &str,
    ) -> ResultEngine<Option<wallets::Model>> {
        Ok(wallets::Entity::find()
            .filter(wallets::Column::AccountId.eq(account_id.to_string()))
            .one(db)
            .await?)
    }

    /// Fresh read of a wallet by id, used inside locked sections.
    pub(super) async fn wallet_by_id<C: ConnectionTrait>(
        &self,
        db: &C,
        wallet: &Wallet,
    ) -> ResultEngine<Wallet> {
        let model = wallets::Entity::find_by_id(wallet.id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::WalletNotFound(wallet.account_id.clone()))?;
        Wallet::try_from(model)
    }

    /// Writes new balances and counters of a wallet. `total` is derived.
    pub(super) async fn store_balances<C: ConnectionTrait>(
        &self,
        db: &C,
        wallet: &Wallet,
    ) -> ResultEngine<()> {
        let active = wallets::ActiveModel {
            id: ActiveValue::Set(wallet.id.to_string()),
            deposit_balance: ActiveValue::Set(wallet.deposit_balance),
            withdrawable_balance: ActiveValue::Set(wallet.withdrawable_balance),
            total_balance: ActiveValue::Set(wallet.deposit_balance + wallet.withdrawable_balance),
            total_deposited: ActiveValue::Set(wallet.total_deposited),
            total_withdrawn: ActiveValue::Set(wallet.total_withdrawn),
            total_winnings: ActiveValue::Set(wallet.total_winnings),
            updated_at: ActiveValue::Set(Utc::now()),
            ..Default::default()
        };
        active.update(db).await?;
        Ok(())
    }
}

fn normalize_account_id(value: &str) -> ResultEngine<String> {
    normalize_optional_text(Some(value))
        .ok_or_else(|| EngineError::AccountNotFound("account id must not be empty".to_string()))
}
