use crate::domain::model::{Account, OrderStatus, PaymentOrder, Site};
use crate::domain::ports::{
    AccountStore, EditWindowClaim, OrderStore, PaidTransition, SiteStore,
};
use crate::utils::error::{Result, SiteError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

// In-memory stores. Every multi-field invariant (balance floor, slug
// uniqueness, window claim, paid transition) is decided under the single
// store lock, which is what makes the operations atomic.

#[derive(Clone, Default)]
pub struct MemoryAccountStore {
    accounts: Arc<Mutex<HashMap<String, Account>>>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, account: Account) {
        let mut accounts = self.accounts.lock().await;
        accounts.insert(account.id.clone(), account);
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn get(&self, account_id: &str) -> Result<Option<Account>> {
        let accounts = self.accounts.lock().await;
        Ok(accounts.get(account_id).cloned())
    }

    async fn adjust_tokens(&self, account_id: &str, delta: i64) -> Result<i64> {
        let mut accounts = self.accounts.lock().await;
        let account = accounts
            .get_mut(account_id)
            .ok_or_else(|| SiteError::NotFoundError {
                resource: format!("Account '{}'", account_id),
            })?;

        let updated = account.token_balance + delta;
        if updated < 0 {
            return Err(SiteError::InsufficientTokensError {
                required: -delta,
                available: account.token_balance,
            });
        }
        account.token_balance = updated;
        Ok(updated)
    }
}

#[derive(Clone, Default)]
pub struct MemorySiteStore {
    sites: Arc<Mutex<HashMap<String, Site>>>,
}

impl MemorySiteStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SiteStore for MemorySiteStore {
    async fn insert_pending(&self, site: Site) -> Result<()> {
        let mut sites = self.sites.lock().await;
        let taken = sites
            .values()
            .any(|s| s.account_id == site.account_id && s.slug == site.slug);
        if taken {
            return Err(SiteError::DuplicateSlugError { slug: site.slug });
        }
        sites.insert(site.id.clone(), site);
        Ok(())
    }

    async fn get(&self, site_id: &str) -> Result<Option<Site>> {
        let sites = self.sites.lock().await;
        Ok(sites.get(site_id).cloned())
    }

    async fn update(&self, site: &Site) -> Result<()> {
        let mut sites = self.sites.lock().await;
        if !sites.contains_key(&site.id) {
            return Err(SiteError::NotFoundError {
                resource: format!("Site '{}'", site.id),
            });
        }
        sites.insert(site.id.clone(), site.clone());
        Ok(())
    }

    async fn remove(&self, site_id: &str) -> Result<()> {
        let mut sites = self.sites.lock().await;
        sites.remove(site_id);
        Ok(())
    }

    async fn find_by_slug(&self, account_id: &str, slug: &str) -> Result<Option<Site>> {
        let sites = self.sites.lock().await;
        Ok(sites
            .values()
            .find(|s| s.account_id == account_id && s.slug == slug)
            .cloned())
    }

    async fn list_for_account(&self, account_id: &str) -> Result<Vec<Site>> {
        let sites = self.sites.lock().await;
        let mut found: Vec<Site> = sites
            .values()
            .filter(|s| s.account_id == account_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn claim_edit_window(
        &self,
        site_id: &str,
        now: DateTime<Utc>,
        new_until: DateTime<Utc>,
    ) -> Result<EditWindowClaim> {
        let mut sites = self.sites.lock().await;
        let site = sites
            .get_mut(site_id)
            .ok_or_else(|| SiteError::NotFoundError {
                resource: format!("Site '{}'", site_id),
            })?;

        match site.free_edit_until {
            Some(until) if until > now => Ok(EditWindowClaim::StillFree),
            previous => {
                site.free_edit_until = Some(new_until);
                Ok(EditWindowClaim::Claimed { previous })
            }
        }
    }

    async fn restore_edit_window(
        &self,
        site_id: &str,
        previous: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let mut sites = self.sites.lock().await;
        if let Some(site) = sites.get_mut(site_id) {
            site.free_edit_until = previous;
        }
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct MemoryOrderStore {
    orders: Arc<Mutex<HashMap<String, PaymentOrder>>>,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn insert(&self, order: PaymentOrder) -> Result<()> {
        let mut orders = self.orders.lock().await;
        if orders.contains_key(&order.order_id) {
            return Err(SiteError::DuplicateOrderError {
                order_id: order.order_id,
            });
        }
        orders.insert(order.order_id.clone(), order);
        Ok(())
    }

    async fn get(&self, order_id: &str) -> Result<Option<PaymentOrder>> {
        let orders = self.orders.lock().await;
        Ok(orders.get(order_id).cloned())
    }

    async fn mark_paid(&self, order_id: &str, paid_at: DateTime<Utc>) -> Result<PaidTransition> {
        let mut orders = self.orders.lock().await;
        match orders.get_mut(order_id) {
            None => Ok(PaidTransition::Unknown),
            Some(order) if order.status == OrderStatus::Paid => Ok(PaidTransition::AlreadyPaid),
            Some(order) => {
                order.status = OrderStatus::Paid;
                order.paid_at = Some(paid_at);
                Ok(PaidTransition::Transitioned {
                    account_id: order.account_id.clone(),
                    quantity: order.quantity,
                })
            }
        }
    }
}
