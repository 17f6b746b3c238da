pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::{CliArgs, ProvisionRequest};

pub use config::EngineConfig;
pub use core::{
    ledger::TokenLedger, materializer::TemplateMaterializer, payments::PaymentService,
    provisioner::Provisioner,
};
pub use utils::error::{Result, SiteError};
