use chrono::{DateTime, Utc};
use sea_orm::{PaginatorTrait, QueryFilter, QueryOrder, prelude::*};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine, Transaction, TransactionCategory, TransactionKind,
    TransactionStatus, transactions,
};

use super::Engine;

const MAX_PER_PAGE: u64 = 100;

/// Filters for listing a wallet's transactions.
///
/// `from` is inclusive and `to` is exclusive (`[from, to)`), both in UTC.
#[derive(Clone, Debug, Default)]
pub struct TransactionListFilter {
    pub status: Option<TransactionStatus>,
    pub category: Option<TransactionCategory>,
    pub kind: Option<TransactionKind>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

fn validate_list_filter(filter: &TransactionListFilter) -> ResultEngine<()> {
    if let (Some(from), Some(to)) = (filter.from, filter.to)
        && from >= to
    {
        return Err(EngineError::InvalidPayload(
            "invalid range: from must be < to".to_string(),
        ));
    }
    Ok(())
}

trait ApplyTxFilters: QueryFilter + Sized {
    fn apply_tx_filters(self, filter: &TransactionListFilter) -> Self;
}

impl<T> ApplyTxFilters for T
where
    T: QueryFilter + Sized,
{
    fn apply_tx_filters(mut self, filter: &TransactionListFilter) -> Self {
        if let Some(status) = filter.status {
            self = self.filter(transactions::Column::Status.eq(status.as_str()));
        }
        if let Some(category) = filter.category {
            self = self.filter(transactions::Column::Category.eq(category.as_str()));
        }
        if let Some(kind) = filter.kind {
            self = self.filter(transactions::Column::Kind.eq(kind.as_str()));
        }
        if let Some(from) = filter.from {
            self = self.filter(transactions::Column::CreatedAt.gte(from));
        }
        if let Some(to) = filter.to {
            self = self.filter(transactions::Column::CreatedAt.lt(to));
        }
        self
    }
}

/// One page of transactions, newest first.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TransactionPage {
    pub items: Vec<Transaction>,
    /// 1-based.
    pub page: u64,
    pub per_page: u64,
    pub total_items: u64,
    pub total_pages: u64,
}

impl Engine {
    /// Returns a transaction by id.
    pub async fn transaction(&self, transaction_id: Uuid) -> ResultEngine<Transaction> {
        let model = transactions::Entity::find_by_id(transaction_id.to_string())
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(transaction_id.to_string()))?;
        Transaction::try_from(model)
    }

    /// Returns a transaction by its unique reference.
    pub async fn transaction_by_reference(&self, reference: &str) -> ResultEngine<Transaction> {
        let model = transactions::Entity::find()
            .filter(transactions::Column::Reference.eq(reference.to_string()))
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(reference.to_string()))?;
        Transaction::try_from(model)
    }

    /// Lists the transactions of a wallet, ordered by `(created_at DESC, id DESC)`.
    ///
    /// `page` is 1-based; `per_page` is clamped to `1..=100`.
    pub async fn list_transactions(
        &self,
        account_id: &str,
        page: u64,
        per_page: u64,
        filter: &TransactionListFilter,
    ) -> ResultEngine<TransactionPage> {
        validate_list_filter(filter)?;
        let wallet = self.wallet(account_id).await?;

        let page = page.max(1);
        let per_page = per_page.clamp(1, MAX_PER_PAGE);
        let paginator = transactions::Entity::find()
            .filter(transactions::Column::WalletId.eq(wallet.id.to_string()))
            .apply_tx_filters(filter)
            .order_by_desc(transactions::Column::CreatedAt)
            .order_by_desc(transactions::Column::Id)
            .paginate(&self.database, per_page);

        let counts = paginator.num_items_and_pages().await?;
        // past the last page the offset may not fit in a u64
        let items = if page > counts.number_of_pages {
            Vec::new()
        } else {
            paginator
                .fetch_page(page - 1)
                .await?
                .into_iter()
                .map(Transaction::try_from)
                .collect::<ResultEngine<Vec<_>>>()?
        };

        Ok(TransactionPage {
            items,
            page,
            per_page,
            total_items: counts.number_of_items,
            total_pages: counts.number_of_pages,
        })
    }

    /// PENDING entries created before `cutoff`, oldest first.
    pub(super) async fn pending_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> ResultEngine<Vec<Transaction>> {
        transactions::Entity::find()
            .filter(transactions::Column::Status.eq(TransactionStatus::Pending.as_str()))
            .filter(transactions::Column::CreatedAt.lt(cutoff))
            .order_by_asc(transactions::Column::CreatedAt)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Transaction::try_from)
            .collect()
    }
}
