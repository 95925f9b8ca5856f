use clap::Parser;
use mapies::config::Command;
use mapies::core::csv_processor::parse_mapping_pairs;
use mapies::core::export::export_map;
use mapies::domain::model::{PlanTier, User};
use mapies::utils::error::{ErrorSeverity, MapiesError};
use mapies::utils::{logger, validation::Validate};
use mapies::{Backend, CliConfig, LocalStorage, UploadRequest};
use std::path::Path;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();

    // 初始化日誌
    logger::init_cli_logger(config.verbose);

    tracing::info!("Starting mapies CLI");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    if let Err(e) = run(&config).await {
        tracing::error!(
            "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 建議: {}", e.recovery_suggestion());

        // 根據錯誤嚴重程度決定退出碼
        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,      // 方案限制，只提示
            ErrorSeverity::Medium => 2,   // 可重試
            ErrorSeverity::High => 1,     // 資料或權限錯誤
            ErrorSeverity::Critical => 3, // 系統錯誤
        };

        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }

    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), MapiesError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(config: &CliConfig) -> Result<(), MapiesError> {
    config.validate()?;
    let app_config = config.load_app_config()?;

    let monitor_enabled = app_config.monitoring.enabled;
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let storage = LocalStorage::new(app_config.storage.data_dir.clone());
    let backend = Backend::from_config(storage, app_config)?.with_monitoring(monitor_enabled);

    match &config.command {
        Command::CreateUser { user, email, tier } => {
            let mut doc = backend
                .maps()
                .get_user(user)
                .await?
                .unwrap_or_else(|| User::new(user.as_str(), email.as_str()));
            doc.email = email.clone();
            doc.subscription_tier = PlanTier::parse(tier);
            backend.maps().save_user(&doc).await?;
            println!("✅ User {} saved ({} plan)", doc.id, doc.subscription_tier.as_str());
        }
        Command::CreateMap { user, name } => {
            let map = backend.maps().create_map(user, name).await?;
            println!("✅ Map created: {}", map.id);
        }
        Command::Import {
            user,
            map,
            file,
            mapping,
        } => {
            let content = tokio::fs::read(file).await?;
            let filename = Path::new(file)
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or("upload.csv")
                .to_string();

            let receipt = backend
                .jobs()
                .process_csv_upload(UploadRequest {
                    user_id: user.clone(),
                    map_id: map.clone(),
                    filename,
                    content,
                    column_mapping: parse_mapping_pairs(mapping)?,
                })
                .await?;

            tracing::info!("✅ Import finished with status {:?}", receipt.status);
            print_json(&receipt)?;
        }
        Command::Retry { user, job } => {
            let receipt = backend.jobs().retry_csv_job(user, job).await?;
            print_json(&receipt)?;
        }
        Command::Status { user, job } => {
            let job = backend.jobs().job_status(user, job).await?;
            print_json(&job)?;
        }
        Command::Export { user, map } => {
            let path = export_map(backend.maps(), user, map).await?;
            println!("📁 Export saved to: {}", path);
        }
        Command::Webhook { payload, signature } => {
            let body = tokio::fs::read(payload).await?;
            let outcome = backend
                .billing()
                .handle_payload(&body, signature.as_deref())
                .await?;
            print_json(&outcome)?;
        }
        Command::RecomputeStats { map } => {
            let stats = backend.maps().recompute_stats(map).await?;
            print_json(&stats)?;
        }
    }

    Ok(())
}
