use crate::core::ledger::TokenLedger;
use crate::core::materializer::TemplateMaterializer;
use crate::domain::model::{ImageAssets, ProvisionOutcome, Site, SiteStatus};
use crate::domain::ports::{AccountStore, DeployProvider, EditWindowClaim, SiteStore};
use crate::utils::error::{Result, SiteError};
use crate::utils::validation::validate_slug;
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::path::PathBuf;

pub const KEY_SLUG: &str = "SLUG";

#[derive(Debug, Clone)]
pub struct ProvisionSettings {
    pub output_root: PathBuf,
    pub site_domain: String,
    pub token_cost: i64,
    pub free_edit_window_secs: i64,
    /// 部署致命失敗後是否退還已扣的代幣。預設不退,失敗記入站點狀態。
    pub refund_on_deploy_failure: bool,
}

impl Default for ProvisionSettings {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("generated-sites"),
            site_domain: "siteforge.dev".to_string(),
            token_cost: 1,
            free_edit_window_secs: 3600,
            refund_on_deploy_failure: false,
        }
    }
}

/// 佈建協調器。狀態順序固定:
/// Validating → TokenCheck → Materializing → Deploying → Persisting。
/// 扣款一定發生在實體化與部署之前。
pub struct Provisioner<A: AccountStore, S: SiteStore, D: DeployProvider> {
    ledger: TokenLedger<A>,
    sites: S,
    deployer: D,
    materializer: TemplateMaterializer,
    settings: ProvisionSettings,
}

impl<A: AccountStore, S: SiteStore, D: DeployProvider> Provisioner<A, S, D> {
    pub fn new(
        accounts: A,
        sites: S,
        deployer: D,
        materializer: TemplateMaterializer,
        settings: ProvisionSettings,
    ) -> Self {
        Self {
            ledger: TokenLedger::new(accounts),
            sites,
            deployer,
            materializer,
            settings,
        }
    }

    /// 建站。slug 唯一性靠 pending 記錄的原子插入保證,
    /// 重複檢查先於扣款。
    pub async fn create_site(
        &self,
        account_id: &str,
        config: HashMap<String, String>,
        images: ImageAssets,
    ) -> Result<ProvisionOutcome> {
        // Validating
        let slug = config
            .get(KEY_SLUG)
            .cloned()
            .ok_or_else(|| SiteError::ValidationError {
                message: format!("Config field '{}' is required", KEY_SLUG),
            })?;
        validate_slug(KEY_SLUG, &slug)?;

        let now = Utc::now();
        let site = Site {
            id: format!("site_{}_{}", account_id, slug),
            account_id: account_id.to_string(),
            slug: slug.clone(),
            config: config.clone(),
            status: SiteStatus::Pending,
            url: None,
            deploy_id: None,
            free_edit_until: None,
            created_at: now,
        };
        // 原子保留 (account, slug),同時就是重複檢查
        self.sites.insert_pending(site.clone()).await?;
        tracing::info!("🔄 Site '{}' reserved for account {}", slug, account_id);

        // TokenCheck
        let balance = match self.ledger.debit(account_id, self.settings.token_cost).await {
            Ok(balance) => balance,
            Err(e) => {
                self.sites.remove(&site.id).await?;
                return Err(e);
            }
        };

        // Materializing
        let output_dir = self.settings.output_root.join(&slug);
        if let Err(e) = self
            .materializer
            .materialize(&output_dir, &config, &images)
            .await
        {
            // 還沒碰到外部系統,完整回滾
            self.refund_and_remove(&site.id, account_id).await;
            return Err(e);
        }

        // Deploying
        let deployment = match self.deployer.deploy(&slug, &output_dir).await {
            Ok(deployment) => deployment,
            Err(SiteError::RateLimitedError) => {
                // 限流可以稍後重試;本地不留任何痕跡,重試不會重扣
                self.refund_and_remove(&site.id, account_id).await;
                return Err(SiteError::RateLimitedError);
            }
            Err(e) => {
                if self.settings.refund_on_deploy_failure {
                    self.refund_and_remove(&site.id, account_id).await;
                } else {
                    tracing::error!(
                        "❌ Deploy for '{}' failed after debit; one token was consumed without a live site: {}",
                        slug,
                        e
                    );
                    self.mark_error(&site.id).await;
                }
                return Err(e);
            }
        };

        if let Err(e) = self.deployer.wait_until_ready(&deployment).await {
            tracing::warn!("🔶 Readiness check for '{}' did not complete: {}", slug, e);
        }

        // Persisting
        let mut live = site;
        live.status = SiteStatus::Active;
        live.url = Some(self.public_url(&slug));
        live.deploy_id = Some(deployment.id);
        live.free_edit_until = Some(now + Duration::seconds(self.settings.free_edit_window_secs));
        self.sites.update(&live).await?;

        tracing::info!("✅ Site '{}' is live at {}", slug, live.url.as_deref().unwrap_or("-"));
        Ok(ProvisionOutcome {
            site: live,
            token_charged: true,
            remaining_tokens: balance,
        })
    }

    /// 改站。免費編輯窗內不扣款;窗已過則 CAS 搶下延長權的請求
    /// 負責扣款,兩個併發編輯絕不會都免費、也不會都扣款。
    pub async fn edit_site(
        &self,
        account_id: &str,
        site_id: &str,
        config: HashMap<String, String>,
        images: ImageAssets,
    ) -> Result<ProvisionOutcome> {
        let site = self
            .sites
            .get(site_id)
            .await?
            .filter(|s| s.account_id == account_id)
            .ok_or_else(|| SiteError::NotFoundError {
                resource: format!("Site '{}'", site_id),
            })?;

        // slug 部署後不可變
        if let Some(requested) = config.get(KEY_SLUG) {
            if requested != &site.slug {
                return Err(SiteError::ValidationError {
                    message: "Slug cannot be changed after the site is deployed".to_string(),
                });
            }
        }

        let now = Utc::now();
        let new_until = now + Duration::seconds(self.settings.free_edit_window_secs);
        let claim = self.sites.claim_edit_window(site_id, now, new_until).await?;

        let token_charged = match &claim {
            EditWindowClaim::StillFree => {
                tracing::info!("🔄 Free edit for site '{}'", site.slug);
                false
            }
            EditWindowClaim::Claimed { previous } => {
                if let Err(e) = self.ledger.debit(account_id, self.settings.token_cost).await {
                    self.sites.restore_edit_window(site_id, *previous).await?;
                    return Err(e);
                }
                tracing::info!(
                    "🔄 Edit window for site '{}' extended until {}",
                    site.slug,
                    new_until
                );
                true
            }
        };

        let output_dir = self.settings.output_root.join(&site.slug);
        if let Err(e) = self
            .materializer
            .materialize(&output_dir, &config, &images)
            .await
        {
            self.rollback_edit(site_id, account_id, &claim, token_charged).await;
            return Err(e);
        }

        let deployment = match self.deployer.deploy(&site.slug, &output_dir).await {
            Ok(deployment) => deployment,
            Err(SiteError::RateLimitedError) => {
                self.rollback_edit(site_id, account_id, &claim, token_charged).await;
                return Err(SiteError::RateLimitedError);
            }
            Err(e) => {
                if self.settings.refund_on_deploy_failure {
                    self.rollback_edit(site_id, account_id, &claim, token_charged).await;
                } else {
                    if token_charged {
                        tracing::error!(
                            "❌ Deploy for '{}' failed after debit; one token was consumed without the edit going live: {}",
                            site.slug,
                            e
                        );
                    }
                    self.mark_error(site_id).await;
                }
                return Err(e);
            }
        };

        if let Err(e) = self.deployer.wait_until_ready(&deployment).await {
            tracing::warn!(
                "🔶 Readiness check for '{}' did not complete: {}",
                site.slug,
                e
            );
        }

        // 重新讀取,保留 CAS 寫入的新窗值
        let mut updated = self
            .sites
            .get(site_id)
            .await?
            .ok_or_else(|| SiteError::NotFoundError {
                resource: format!("Site '{}'", site_id),
            })?;
        updated.config = config;
        updated.status = SiteStatus::Active;
        updated.url = Some(self.public_url(&site.slug));
        updated.deploy_id = Some(deployment.id);
        self.sites.update(&updated).await?;

        let remaining = self.ledger.balance(account_id).await?;
        tracing::info!("✅ Site '{}' updated (charged: {})", site.slug, token_charged);
        Ok(ProvisionOutcome {
            site: updated,
            token_charged,
            remaining_tokens: remaining,
        })
    }

    pub async fn get_site(&self, account_id: &str, site_id: &str) -> Result<Option<Site>> {
        Ok(self
            .sites
            .get(site_id)
            .await?
            .filter(|s| s.account_id == account_id))
    }

    pub async fn list_sites(&self, account_id: &str) -> Result<Vec<Site>> {
        self.sites.list_for_account(account_id).await
    }

    pub async fn token_balance(&self, account_id: &str) -> Result<i64> {
        self.ledger.balance(account_id).await
    }

    fn public_url(&self, slug: &str) -> String {
        format!("https://{}.{}", slug, self.settings.site_domain)
    }

    // 回滾只能盡力而為;失敗時至少要留下記錄供人工對帳
    async fn refund_and_remove(&self, site_id: &str, account_id: &str) {
        if let Err(e) = self.ledger.credit(account_id, self.settings.token_cost).await {
            tracing::error!(
                "❌ Failed to refund token to account {}; manual reconciliation needed: {}",
                account_id,
                e
            );
        }
        if let Err(e) = self.sites.remove(site_id).await {
            tracing::error!("❌ Failed to release slug reservation {}: {}", site_id, e);
        }
    }

    async fn rollback_edit(
        &self,
        site_id: &str,
        account_id: &str,
        claim: &EditWindowClaim,
        token_charged: bool,
    ) {
        if let EditWindowClaim::Claimed { previous } = claim {
            if token_charged {
                if let Err(e) = self.ledger.credit(account_id, self.settings.token_cost).await {
                    tracing::error!(
                        "❌ Failed to refund token to account {}; manual reconciliation needed: {}",
                        account_id,
                        e
                    );
                }
            }
            if let Err(e) = self.sites.restore_edit_window(site_id, *previous).await {
                tracing::error!("❌ Failed to restore edit window for {}: {}", site_id, e);
            }
        }
    }

    async fn mark_error(&self, site_id: &str) {
        match self.sites.get(site_id).await {
            Ok(Some(mut current)) => {
                current.status = SiteStatus::Error;
                if let Err(e) = self.sites.update(&current).await {
                    tracing::error!("❌ Failed to mark site {} as errored: {}", site_id, e);
                }
            }
            Ok(None) => {}
            Err(e) => tracing::error!("❌ Failed to load site {}: {}", site_id, e),
        }
    }
}
