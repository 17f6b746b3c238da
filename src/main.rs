use clap::Parser;
use site_forge::adapters::memory::{MemoryAccountStore, MemorySiteStore};
use site_forge::adapters::netlify::NetlifyDeployer;
use site_forge::domain::model::Account;
use site_forge::utils::monitor::SystemMonitor;
use site_forge::utils::{logger, validation::Validate};
use site_forge::{CliArgs, EngineConfig, ProvisionRequest, Provisioner, TemplateMaterializer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    // 初始化日誌
    if args.log_json {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("Starting site-forge CLI");
    if args.verbose {
        tracing::debug!("CLI args: {:?}", args);
    }

    // 載入並驗證配置
    let config = match EngineConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Failed to load config '{}': {}", args.config, e);
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(1);
        }
    };
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let monitor = SystemMonitor::new(args.monitor);
    if monitor.is_enabled() {
        tracing::info!("🔍 System monitoring enabled");
    }

    let request = match ProvisionRequest::from_file(&args.request) {
        Ok(request) => request,
        Err(e) => {
            tracing::error!("❌ Failed to load request '{}': {}", args.request, e);
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(1);
        }
    };

    // 建立記憶體存儲並植入帳戶
    let accounts = MemoryAccountStore::new();
    accounts
        .insert(Account {
            id: request.account.id.clone(),
            name: request.account.name.clone(),
            email: request.account.email.clone(),
            phone: request.account.phone.clone(),
            document: request.account.document.clone(),
            token_balance: args.tokens,
            privileged: false,
        })
        .await;
    let sites = MemorySiteStore::new();

    let deployer = NetlifyDeployer::new(
        config.deploy.api_base.clone(),
        config.deploy.token.clone(),
        config.readiness_settings(),
    );
    let materializer = TemplateMaterializer::new(config.template_dir());
    let provisioner = Provisioner::new(
        accounts,
        sites,
        deployer,
        materializer,
        config.provision_settings(),
    );

    monitor.log_stats("provisioning start");

    let result = match &args.site_id {
        Some(site_id) => {
            provisioner
                .edit_site(
                    &request.account.id,
                    site_id,
                    request.config,
                    request.images,
                )
                .await
        }
        None => {
            provisioner
                .create_site(&request.account.id, request.config, request.images)
                .await
        }
    };

    monitor.log_final_stats();

    match result {
        Ok(outcome) => {
            tracing::info!("✅ Site provisioning completed successfully!");
            println!("✅ Site '{}' is {:?}", outcome.site.slug, outcome.site.status);
            if let Some(url) = &outcome.site.url {
                println!("🌐 Live at: {}", url);
            }
            if outcome.token_charged {
                println!("🪙 1 token charged, {} remaining", outcome.remaining_tokens);
            } else {
                println!("🪙 Free edit, {} tokens remaining", outcome.remaining_tokens);
            }
        }
        Err(e) => {
            // 記錄詳細錯誤信息
            tracing::error!(
                "❌ Provisioning failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            // 輸出用戶友好的錯誤信息
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());

            // 根據錯誤嚴重程度決定退出碼
            let exit_code = match e.severity() {
                site_forge::utils::error::ErrorSeverity::Low => 0,
                site_forge::utils::error::ErrorSeverity::Medium => 2,
                site_forge::utils::error::ErrorSeverity::High => 1,
                site_forge::utils::error::ErrorSeverity::Critical => 3,
            };

            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}
