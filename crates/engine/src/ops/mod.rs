use std::{fmt, sync::Arc};

use sea_orm::DatabaseConnection;

use crate::{
    BothSplit, EngineError, ResultEngine,
    payments::{LogNotifier, PaymentGateway, PaymentNotifier},
};

mod funding;
mod ledger;
mod lock;
mod queries;
mod reconcile;
mod reversal;
mod wallets;

pub use funding::FundingStarted;
pub use ledger::LedgerReceipt;
pub use queries::{TransactionListFilter, TransactionPage};
pub use reconcile::{ReconcileOutcome, ReconcileReport};

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result: $crate::ResultEngine<_> = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

pub struct Engine {
    database: DatabaseConnection,
    both_split: BothSplit,
    gateway: Option<Arc<dyn PaymentGateway>>,
    notifier: Arc<dyn PaymentNotifier>,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("database", &self.database)
            .field("both_split", &self.both_split)
            .field("gateway", &self.gateway.is_some())
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub fn both_split(&self) -> BothSplit {
        self.both_split
    }

    fn gateway(&self) -> ResultEngine<&dyn PaymentGateway> {
        self.gateway
            .as_deref()
            .ok_or_else(|| EngineError::GatewayUnavailable("no payment gateway configured".to_string()))
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    both_split: BothSplit,
    gateway: Option<Arc<dyn PaymentGateway>>,
    notifier: Option<Arc<dyn PaymentNotifier>>,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// How credits to both buckets are divided. Defaults to 50/50.
    pub fn both_split(mut self, split: BothSplit) -> EngineBuilder {
        self.both_split = split;
        self
    }

    /// Payment provider used for funding. Without one, funding and
    /// reconciliation fail with a gateway error.
    pub fn gateway(mut self, gateway: Arc<dyn PaymentGateway>) -> EngineBuilder {
        self.gateway = Some(gateway);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn PaymentNotifier>) -> EngineBuilder {
        self.notifier = Some(notifier);
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
            both_split: self.both_split,
            gateway: self.gateway,
            notifier: self.notifier.unwrap_or_else(|| Arc::new(LogNotifier)),
        })
    }
}
