use crate::domain::model::{Account, ChargeTicket, Deployment, PaymentOrder, Site};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::Path;

/// Outcome of the free-edit-window compare-and-set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditWindowClaim {
    /// Window still open; the edit is free.
    StillFree,
    /// Window was expired and has been extended; the caller must debit.
    /// Carries the previous value so a failed debit can restore it.
    Claimed { previous: Option<DateTime<Utc>> },
}

/// Outcome of the pending→paid compare-and-set on an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaidTransition {
    /// This call won the transition; credit exactly these tokens.
    Transitioned { account_id: String, quantity: i64 },
    AlreadyPaid,
    Unknown,
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn get(&self, account_id: &str) -> Result<Option<Account>>;

    /// Atomic read-modify-write of the token balance. A delta that would
    /// take the balance below zero is rejected without mutation
    /// (`InsufficientTokensError`). Returns the new balance.
    async fn adjust_tokens(&self, account_id: &str, delta: i64) -> Result<i64>;
}

#[async_trait]
pub trait SiteStore: Send + Sync {
    /// Inserts a pending site, atomically reserving `(account, slug)`.
    /// Fails with `DuplicateSlugError` when the pair is taken.
    async fn insert_pending(&self, site: Site) -> Result<()>;

    async fn get(&self, site_id: &str) -> Result<Option<Site>>;

    async fn update(&self, site: &Site) -> Result<()>;

    /// Removes a reservation that never went live.
    async fn remove(&self, site_id: &str) -> Result<()>;

    async fn find_by_slug(&self, account_id: &str, slug: &str) -> Result<Option<Site>>;

    async fn list_for_account(&self, account_id: &str) -> Result<Vec<Site>>;

    /// CAS on `free_edit_until`: extends the window to `new_until` only if
    /// it is absent or expired at `now`. Exactly one of N concurrent
    /// callers observes `Claimed`.
    async fn claim_edit_window(
        &self,
        site_id: &str,
        now: DateTime<Utc>,
        new_until: DateTime<Utc>,
    ) -> Result<EditWindowClaim>;

    /// Undoes a claim whose paired debit failed.
    async fn restore_edit_window(
        &self,
        site_id: &str,
        previous: Option<DateTime<Utc>>,
    ) -> Result<()>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert(&self, order: PaymentOrder) -> Result<()>;

    async fn get(&self, order_id: &str) -> Result<Option<PaymentOrder>>;

    /// CAS `pending → paid`. The winning call (and only it) receives the
    /// account and quantity to credit; repeats see `AlreadyPaid`.
    async fn mark_paid(&self, order_id: &str, paid_at: DateTime<Utc>) -> Result<PaidTransition>;
}

#[async_trait]
pub trait DeployProvider: Send + Sync {
    /// Publishes `source_dir` under `slug`. 429-class provider responses
    /// surface as `RateLimitedError`, any other failure as `DeployError`.
    async fn deploy(&self, slug: &str, source_dir: &Path) -> Result<Deployment>;

    /// Best-effort wait until the published deploy is reachable.
    async fn wait_until_ready(&self, deployment: &Deployment) -> Result<()>;
}

#[async_trait]
pub trait ChargeProvider: Send + Sync {
    /// Creates a charge for `quantity` tokens worth `amount_cents` and
    /// returns the provider order id plus the displayable payment code.
    async fn create_charge(
        &self,
        account: &Account,
        quantity: i64,
        amount_cents: i64,
    ) -> Result<ChargeTicket>;
}
