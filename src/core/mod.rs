pub mod ledger;
pub mod materializer;
pub mod payments;
pub mod placeholders;
pub mod provisioner;

pub use crate::domain::model::{
    Account, ChargeTicket, Deployment, ImageAssets, PaymentOrder, ProvisionOutcome, Site,
    SiteStatus,
};
pub use crate::domain::ports::{
    AccountStore, ChargeProvider, DeployProvider, OrderStore, SiteStore,
};
pub use crate::utils::error::Result;
