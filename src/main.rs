use clap::Parser;
use job_alert::config::toml_config::DEFAULT_CONFIG_PATH;
use job_alert::utils::{logger, validation::Validate};
use job_alert::{
    AppConfig, CliArgs, JobPipeline, ListingExtractor, PipelineSettings, RateLimitedFetcher,
    Scheduler, SchedulerConfig, SmtpNotifier, SqliteSeenStore, TriggerOutcome, WatchError,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = CliArgs::parse();

    if args.log_json {
        logger::init_json_logger(args.verbose);
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("Starting job-alert");

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => exit_on_startup_error("Configuration validation failed", &e),
    };
    tracing::info!("✅ Configuration loaded and validated successfully");

    if args.dry_run {
        display_config_summary(&config);
        return Ok(());
    }

    if config.watch_list().is_empty() {
        tracing::warn!("Watch list is empty; no posting will ever match");
    }

    let database_url = config.database_url().unwrap_or_default();
    let store = match SqliteSeenStore::connect(database_url).await {
        Ok(store) => store,
        Err(e) => exit_on_startup_error("Failed to connect to seen-job store", &e),
    };

    let result = watch(&config, &args, store.clone()).await;

    // Release the store whatever happened above.
    store.close().await;
    result?;

    tracing::info!("job-alert stopped");
    Ok(())
}

fn load_config(args: &CliArgs) -> job_alert::Result<AppConfig> {
    let mut config = match &args.config {
        Some(path) => {
            tracing::info!("📁 Loading configuration from: {}", path.display());
            AppConfig::from_file(path)?
        }
        None => AppConfig::from_file_or_default(DEFAULT_CONFIG_PATH)?,
    };
    config.apply_env_overrides();
    config.validate()?;
    Ok(config)
}

async fn watch(config: &AppConfig, args: &CliArgs, store: SqliteSeenStore) -> anyhow::Result<()> {
    let fetcher = RateLimitedFetcher::from_config(config)?;
    let extractor = ListingExtractor::from_config(config)?;
    let notifier = SmtpNotifier::from_config(config)?;

    let pipeline = JobPipeline::new(
        fetcher,
        extractor,
        store,
        notifier,
        PipelineSettings {
            source_url: config.source_url().to_string(),
            watch_list: config.watch_list(),
            persistence_policy: config.persistence_policy(),
            zero_result_alert_after: config.zero_result_alert_after(),
        },
    );

    let scheduler = Arc::new(Scheduler::new(
        pipeline,
        SchedulerConfig {
            interval: config.interval(),
            shutdown_grace: config.shutdown_grace(),
        },
    ));

    if args.once {
        return match scheduler.run_once(shutdown_signal()).await {
            Some(TriggerOutcome::Failed(e)) => Err(e.into()),
            _ => Ok(()),
        };
    }

    scheduler.run(shutdown_signal()).await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C signal"),
        _ = terminate => tracing::info!("Received SIGTERM signal"),
    }
}

fn exit_on_startup_error(context: &str, e: &WatchError) -> ! {
    tracing::error!(
        "❌ {}: {} (Category: {:?}, Severity: {:?})",
        context,
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    std::process::exit(1);
}

fn display_config_summary(config: &AppConfig) {
    println!("📋 Configuration Summary:");
    println!("  Source: {}", config.source_url());
    println!(
        "  Rate limit: 1 request per {:?}",
        config.rate_limit_period()
    );
    println!(
        "  Watch list: {}",
        config.watch_list().iter().collect::<Vec<_>>().join(", ")
    );
    println!("  Store: {}", config.database_url().unwrap_or("-"));
    println!(
        "  Mail: {}:{} -> {}",
        config.smtp_host(),
        config.smtp_port(),
        config.mail.recipient.as_deref().unwrap_or("-")
    );
    println!("  Interval: {:?}", config.interval());
    println!("  On store error: {:?}", config.persistence_policy());
    println!("  🔍 DRY RUN MODE - nothing will be fetched or sent");
}
