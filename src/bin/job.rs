use asfravab::config::job::JobConfig;
use asfravab::config::settings::Settings;
use asfravab::core::pipeline::count_ground_motion_files;
use asfravab::domain::ports::JobProvider;
use asfravab::seismic::ida::{planned_steps, scale_grid};
use asfravab::utils::{logger, paths, progress, validation::Validate};
use asfravab::{AssessmentEngine, AssessmentPipeline, LocalStorage};
use clap::Parser;

#[derive(Parser)]
#[command(name = "asfravab-job")]
#[command(about = "Seismic fragility assessment driven by a TOML job file")]
struct Args {
    /// Path to the TOML job file
    #[arg(short, long, default_value = "assessment-job.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Override monitoring setting from the job file
    #[arg(long)]
    monitor: Option<bool>,

    /// Override fast mode from the job file
    #[arg(long)]
    fast: Option<bool>,

    /// Show what would be analyzed without executing
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let settings = Settings::load();
    let log_file = settings
        .log_to_file
        .then(|| paths::user_log_dir().join(logger::LOG_FILENAME));
    logger::init_cli_logger(args.verbose, &settings.log_level, log_file.as_deref());

    tracing::info!("🚀 Starting job-file assessment");
    tracing::info!("📁 Loading job from: {}", args.config);

    let mut config = match JobConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load job file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML");
            std::process::exit(1);
        }
    };

    if let Some(fast) = args.fast {
        config.scaling.fast_mode = Some(fast);
        tracing::info!("🔧 Fast mode overridden to: {}", fast);
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Job validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    tracing::info!("✅ Job loaded and validated successfully");

    display_job_summary(&config, &args);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No analysis will run");
        perform_dry_run(&config);
        return Ok(());
    }

    let monitor_enabled = args.monitor.unwrap_or_else(|| config.monitoring_enabled());
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let gm_count = count_ground_motion_files(config.gmrs_dir());
    let bar = progress::analysis_bar(planned_steps(gm_count, &config.scaling()));

    let storage = LocalStorage::new(config.output_dir().to_string());
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

fn display_job_summary(config: &JobConfig, args: &Args) {
    println!("📋 Job Summary:");
    println!("  Name: {}", config.job.name);
    if let Some(description) = &config.job.description {
        println!("  Description: {}", description);
    }
    println!("  Capacity curve: {}", config.capacity_path());
    println!("  Building params: {}", config.building_params_path());
    println!("  Ground motions: {}", config.gmrs_dir());
    println!("  Output: {}", config.output_dir());
    println!(
        "  Scales: {} to {} step {}",
        config.scaling.min_scale, config.scaling.max_scale, config.scaling.increment
    );
    println!("  Idealization: {}", config.idealization());
    println!("  Fit: {} on {}", config.fit().method, config.fit().im);
    println!("  Fast mode: {}", config.fast_mode());

    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}

fn perform_dry_run(config: &JobConfig) {
    println!("🔍 Dry Run Analysis:");
    println!();

    let gm_count = count_ground_motion_files(config.gmrs_dir());
    let scales = scale_grid(&config.scaling());
    println!("📡 Inputs:");
    println!("  Ground-motion records found: {}", gm_count);
    println!("  Scale steps per record: {}", scales.len());
    println!("  Total analysis steps: {}", planned_steps(gm_count, &config.scaling()));

    println!();
    println!("⚙️ Processing:");
    println!("  Idealization: {}", config.idealization());
    println!(
        "  Damping ratio: {}, period grid to {} s",
        config.analysis().damping_ratio,
        config.analysis().period_max
    );
    println!(
        "  Fragility: {} ({} link, {:?} regulation)",
        config.fit().method,
        config.fit().link,
        config.fit().regulation
    );
    let ratios = config.loss_ratios();
    println!("  Loss ratios: {} / {} / {}", ratios[0], ratios[1], ratios[2]);

    println!();
    println!("💾 Outputs:");
    println!("  Directory: {}", config.output_dir());
    println!("  Bundle: {}", config.bundle_outputs());

    println!();
    println!("✅ Dry run complete. Re-run without --dry-run to execute.");
}
