use asfravab::config::parse_field;
use asfravab::config::settings::Settings;
use asfravab::core::refit::RefitConfig;
use asfravab::domain::model::{
    FitConfig, FitMethod, IntensityMeasure, LinkFunction, Regulation, ScalingConfig,
};
use asfravab::utils::validation::{validate_loss_ratios, validate_ordered, validate_positive};
use asfravab::utils::{logger, paths};
use asfravab::{LocalStorage, RefitPipeline};
use clap::Parser;

/// Re-runs the statistical stage from an existing EDPs table, without
/// repeating the dynamic analysis.
#[derive(Parser)]
#[command(name = "asfravab-refit")]
#[command(about = "Refit fragility and vulnerability curves from an EDPs CSV")]
struct Args {
    /// EDPs CSV produced by a previous assessment run
    #[arg(long)]
    edps: String,

    #[arg(long, default_value = "./output")]
    output_dir: String,

    #[arg(long, default_value = "0.0")]
    min_scale: f64,

    #[arg(long, default_value = "2.0")]
    max_scale: f64,

    #[arg(long, default_value = "0.25")]
    increment: f64,

    /// Fragility regression: msa, glm or logreg
    #[arg(long, default_value = "msa")]
    fit_method: String,

    /// Intensity measure column: pga or sa
    #[arg(long, default_value = "pga")]
    intensity_measure: String,

    /// GLM link function: logit or probit
    #[arg(long, default_value = "logit")]
    link: String,

    /// Logistic regularization level: high, medium or none
    #[arg(long, default_value = "none")]
    regulation: String,

    /// Loss ratios for ds1,ds2,ds3
    #[arg(long, value_delimiter = ',', default_value = "0.15,0.6,1.0")]
    loss_ratios: Vec<f64>,

    #[arg(long, default_value = ";")]
    csv_separator: String,

    /// Enable verbose output
    #[arg(long)]
    verbose: bool,
}

impl Args {
    fn to_refit_config(&self) -> asfravab::Result<RefitConfig> {
        validate_positive("increment", self.increment)?;
        validate_ordered("min_scale/max_scale", self.min_scale, self.max_scale)?;
        validate_loss_ratios("loss_ratios", &self.loss_ratios)?;

        let fit = FitConfig {
            method: parse_field::<FitMethod>("fit_method", &self.fit_method)?,
            im: parse_field::<IntensityMeasure>("intensity_measure", &self.intensity_measure)?,
            link: parse_field::<LinkFunction>("link", &self.link)?,
            regulation: parse_field::<Regulation>("regulation", &self.regulation)?,
        };

        Ok(RefitConfig {
            edps_path: self.edps.clone(),
            output_dir: self.output_dir.clone(),
            scaling: ScalingConfig {
                min_scale: self.min_scale,
                max_scale: self.max_scale,
                increment: self.increment,
                fast_mode: false,
            },
            fit,
            loss_ratios: [
                self.loss_ratios[0],
                self.loss_ratios[1],
                self.loss_ratios[2],
            ],
            delimiter: self.csv_separator.as_bytes().first().copied().unwrap_or(b';'),
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let settings = Settings::load();
    let log_file = settings
        .log_to_file
        .then(|| paths::user_log_dir().join(logger::LOG_FILENAME));
    logger::init_cli_logger(args.verbose, &settings.log_level, log_file.as_deref());

    tracing::info!("Starting statistical refit");

    let config = match args.to_refit_config() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    let storage = LocalStorage::new(config.output_dir.clone());
    let pipeline = RefitPipeline::new(storage, config);

    match pipeline.run().await {
        Ok(report) => {
            tracing::info!("✅ Refit completed successfully!");
            println!("✅ Refit completed successfully!");
            println!("📁 Fragility: {}", report.fragility_path);
            println!("📁 Vulnerability: {}", report.vulnerability_path);
        }
        Err(e) => {
            tracing::error!("❌ Refit failed: {}", e);
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    }

    Ok(())
}
