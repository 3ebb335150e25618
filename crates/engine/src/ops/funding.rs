use sea_orm::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    BalanceType, EngineError, FundingCmd, ResultEngine, Transaction, TransactionCategory,
    TransactionKind, accounts,
    payments::ChargeRequest,
    transactions::NewEntry,
    util::{ensure_positive, new_reference, normalize_optional_text},
};

use super::{Engine, ledger::insert_entry};

/// A started wallet top-up waiting for the payer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FundingStarted {
    pub transaction_id: Uuid,
    pub payment_reference: String,
    pub provider_reference: String,
    pub checkout_url: String,
    pub amount_minor: i64,
}

impl Engine {
    /// Starts an external payment that will credit the deposit balance once
    /// the provider confirms it.
    ///
    /// Records a PENDING entry keyed by the payment reference; balances are
    /// untouched until reconciliation completes it.
    pub async fn initiate_funding(&self, cmd: FundingCmd) -> ResultEngine<FundingStarted> {
        ensure_positive(cmd.amount_minor)?;
        let gateway = self.gateway()?;

        let wallet = self.wallet(&cmd.account_id).await?;
        if !wallet.is_active {
            return Err(EngineError::WalletInactive(wallet.account_id));
        }
        let customer_name = accounts::Entity::find_by_id(wallet.account_id.clone())
            .one(&self.database)
            .await?
            .map(|account| account.display_name)
            .unwrap_or_else(|| wallet.account_id.clone());

        let description = normalize_optional_text(cmd.description.as_deref())
            .unwrap_or_else(|| "Wallet funding".to_string());
        let payment_reference = new_reference("PAY_");
        let request = ChargeRequest {
            amount_minor: cmd.amount_minor,
            customer_ref: wallet.account_id.clone(),
            customer_name,
            payment_reference: payment_reference.clone(),
            description: description.clone(),
            methods: cmd.methods,
        };

        let handle = gateway.initiate_charge(request).await.map_err(|err| {
            tracing::error!(
                account_id = %wallet.account_id,
                %payment_reference,
                error = %err,
                "charge initiation failed"
            );
            EngineError::from(err)
        })?;

        let entry = NewEntry {
            reference: payment_reference.clone(),
            kind: TransactionKind::Credit,
            category: TransactionCategory::Deposit,
            balance_type: BalanceType::Deposit,
            amount_minor: cmd.amount_minor,
            description,
            external_reference: Some(handle.provider_reference.clone()),
            metadata: Some(serde_json::json!({ "checkout_url": handle.checkout_url })),
        };
        let pending = Transaction::pending(
            wallet.id,
            wallet.account_id.clone(),
            entry,
            wallet.balances(),
        );
        insert_entry(&self.database, &pending).await?;

        tracing::info!(
            account_id = %wallet.account_id,
            %payment_reference,
            provider_reference = %handle.provider_reference,
            amount_minor = cmd.amount_minor,
            "funding initiated"
        );
        Ok(FundingStarted {
            transaction_id: pending.id,
            payment_reference,
            provider_reference: handle.provider_reference,
            checkout_url: handle.checkout_url,
            amount_minor: cmd.amount_minor,
        })
    }
}
