use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Tenant account. `token_balance` is only ever mutated through the
/// ledger port and never goes below zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub document: Option<String>,
    pub token_balance: i64,
    pub privileged: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteStatus {
    Pending,
    Active,
    Error,
}

/// One provisioned website. The slug doubles as the tenant subdomain and
/// is immutable once the site exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Site {
    pub id: String,
    pub account_id: String,
    pub slug: String,
    pub config: HashMap<String, String>,
    pub status: SiteStatus,
    pub url: Option<String>,
    pub deploy_id: Option<String>,
    pub free_edit_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Paid,
}

/// Provider-issued payment order tracked locally until confirmed paid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentOrder {
    pub order_id: String,
    pub account_id: String,
    pub quantity: i64,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

/// Optional base64 data-URL image assets shipped with a provisioning request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageAssets {
    pub logo: Option<String>,
    pub cover: Option<String>,
    pub profile: Option<String>,
    pub middle: Option<String>,
}

impl ImageAssets {
    pub fn is_empty(&self) -> bool {
        self.logo.is_none() && self.cover.is_none() && self.profile.is_none() && self.middle.is_none()
    }
}

/// Result of a successful upload at the hosting provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deployment {
    pub id: String,
    pub url: String,
    pub state: Option<String>,
}

/// What the client needs to display so the user can pay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargeTicket {
    pub order_id: String,
    pub qr_payload: String,
    pub qr_image_url: Option<String>,
}

/// Outcome of a create or edit run, surfaced to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionOutcome {
    pub site: Site,
    pub token_charged: bool,
    pub remaining_tokens: i64,
}
