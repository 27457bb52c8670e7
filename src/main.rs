use attendance_notify::utils::{logger, validation::Validate};
use attendance_notify::{
    build_provider, AppConfig, CliConfig, NotificationSender, NotifyEngine, NotifyError,
    PortalClient, RunTarget,
};
use clap::Parser;

fn load_config(cli: &CliConfig) -> attendance_notify::Result<AppConfig> {
    let lookup = |key: &str| std::env::var(key).ok();
    let config = match &cli.config {
        Some(path) => {
            tracing::debug!("Loading config file: {}", path.display());
            let mut config = AppConfig::from_file(path)?;
            config.apply_overrides(lookup)?;
            config
        }
        None => AppConfig::from_lookup(lookup)?,
    };
    config.validate()?;
    Ok(config)
}

async fn run(cli: &CliConfig) -> attendance_notify::Result<()> {
    // 任何網路請求之前先完成配置驗證
    let config = load_config(cli)?;

    let target = RunTarget {
        username: config.portal_username()?.to_string(),
        password: config.portal_password()?.to_string(),
        recipient: config.recipient()?.to_string(),
    };
    tracing::debug!("Run target: {:?}", target);

    let portal = PortalClient::new(&config.portal, &config.http)?;
    let provider = build_provider(&config.provider, &config.http)?;
    let sender = NotificationSender::new(provider, config.notification.utc_offset_minutes)?;
    let engine = NotifyEngine::new(portal, sender).with_dry_run(cli.dry_run);

    let outcome = engine.run(&target, cli.period).await?;

    match &outcome.delivery {
        Some(delivery) => {
            tracing::info!(
                "✅ {} attendance ({}) delivered via {}",
                outcome.period,
                outcome.record.percentage_label(),
                delivery.provider
            );
            println!(
                "✅ Sent {} attendance update: {}",
                outcome.period,
                outcome.record.percentage_label()
            );
        }
        None => {
            println!("{}", outcome.body);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    // .env 不存在時忽略
    dotenvy::dotenv().ok();

    let cli = CliConfig::parse();

    if cli.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting attendance-notify");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    if let Err(e) = run(&cli).await {
        report_failure(&e);
        std::process::exit(e.exit_code());
    }
}

fn report_failure(e: &NotifyError) {
    tracing::error!(
        "❌ Run failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());
}
