use asfravab::config::settings::Settings;
use asfravab::core::pipeline::count_ground_motion_files;
use asfravab::domain::ports::JobProvider;
use asfravab::seismic::ida::planned_steps;
use asfravab::utils::{logger, paths, progress, validation::Validate};
use asfravab::{AssessmentEngine, AssessmentPipeline, CliConfig, LocalStorage};
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();

    let mut settings = Settings::load();
    let log_file = settings
        .log_to_file
        .then(|| paths::user_log_dir().join(logger::LOG_FILENAME));
    logger::init_cli_logger(config.verbose, &settings.log_level, log_file.as_deref());

    tracing::info!("Starting ASFRAVA-B assessment");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    settings.last_output_dir = config.output_dir.clone();
    if let Err(e) = settings.save() {
        tracing::warn!("Could not persist settings: {}", e);
    }

    let monitor_enabled = config.monitor;
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let gm_count = count_ground_motion_files(config.gmrs_dir());
    let bar = progress::analysis_bar(planned_steps(gm_count, &config.scaling()));

    let storage = LocalStorage::new(config.output_dir.clone());
    let pipeline = AssessmentPipeline::new(storage, config)
        .with_progress(progress::progress_hook(&bar));

    let engine = AssessmentEngine::new_with_monitoring(pipeline, monitor_enabled);

    match engine.run().await {
        Ok(report) => {
            bar.finish();
            tracing::info!("✅ Assessment completed successfully!");
            println!("✅ Assessment completed successfully!");
            println!("📁 EDPs: {}", report.edps_path);
            println!("📁 Fragility: {}", report.fragility_path);
            println!("📁 Vulnerability: {}", report.vulnerability_path);
            if let Some(bundle) = report.bundle_path {
                println!("📁 Bundle: {}", bundle);
            }
        }
        Err(e) => {
            bar.abandon();
            tracing::error!(
                "❌ Assessment failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());

            let exit_code = match e.severity() {
                asfravab::utils::error::ErrorSeverity::Low => 0,
                asfravab::utils::error::ErrorSeverity::Medium => 2,
                asfravab::utils::error::ErrorSeverity::High => 1,
                asfravab::utils::error::ErrorSeverity::Critical => 3,
            };

            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}
