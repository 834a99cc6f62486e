use crate::core::pipeline::{
    fragility_to_csv, vulnerability_to_csv, FRAGILITY_FILENAME, VULNERABILITY_FILENAME,
};
use crate::domain::model::{
    EdpRow, EdpTable, FitConfig, IntersectionStatus, RunReport, ScalingConfig,
};
use crate::domain::ports::Storage;
use crate::seismic::{fragility, vulnerability};
use crate::utils::error::{AssessmentError, Result};

/// Inputs for a statistical refit: everything the fitting stage needs,
/// without re-running the dynamic analysis.
#[derive(Debug, Clone)]
pub struct RefitConfig {
    pub edps_path: String,
    pub output_dir: String,
    pub scaling: ScalingConfig,
    pub fit: FitConfig,
    pub loss_ratios: [f64; 3],
    pub delimiter: u8,
}

/// Re-fits fragility and vulnerability curves from a previously written EDPs
/// table.
pub struct RefitPipeline<S: Storage> {
    storage: S,
    config: RefitConfig,
}

impl<S: Storage> RefitPipeline<S> {
    pub fn new(storage: S, config: RefitConfig) -> Self {
        Self { storage, config }
    }

    pub async fn run(&self) -> Result<RunReport> {
        tracing::info!("Refitting from {}", self.config.edps_path);
        let bytes = std::fs::read(&self.config.edps_path)?;
        let edps = parse_edps_csv(&bytes, self.config.delimiter)?;
        tracing::info!(
            "Loaded {} EDP rows over {} records",
            edps.len(),
            edps.distinct_records()
        );

        let fragility_set =
            fragility::fit_fragility(&edps, &self.config.fit, &self.config.scaling)?;
        let vulnerability_curve =
            vulnerability::vulnerability_curve(&fragility_set, self.config.loss_ratios);

        let fragility_csv = fragility_to_csv(&fragility_set, self.config.delimiter)?;
        self.storage
            .write_file(FRAGILITY_FILENAME, &fragility_csv)
            .await?;
        let vulnerability_csv =
            vulnerability_to_csv(&vulnerability_curve, self.config.delimiter)?;
        self.storage
            .write_file(VULNERABILITY_FILENAME, &vulnerability_csv)
            .await?;
        tracing::info!(
            "Saved fragility and vulnerability CSVs -> {}",
            self.config.output_dir
        );

        Ok(RunReport {
            edps_path: self.config.edps_path.clone(),
            fragility_path: format!("{}/{}", self.config.output_dir, FRAGILITY_FILENAME),
            vulnerability_path: format!("{}/{}", self.config.output_dir, VULNERABILITY_FILENAME),
            bundle_path: None,
        })
    }
}

/// Parse an EDPs table written by the load phase.
pub fn parse_edps_csv(bytes: &[u8], delimiter: u8) -> Result<EdpTable> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .from_reader(bytes);
    let headers = reader.headers()?.clone();
    let col = |name: &str| -> Result<usize> {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| AssessmentError::ValidationError {
                message: format!("EDPs file must have a '{}' column header", name),
            })
    };
    let sd_idx = col("Sd")?;
    let pga_idx = col("PGA")?;
    let sa_idx = col("SA")?;
    let status_idx = col("Status")?;
    let gmr_idx = col("GMR")?;
    let ds_idx = [col("ds1")?, col("ds2")?, col("ds3")?];

    let parse = |field: &str, name: &str| -> Result<f64> {
        field
            .trim()
            .parse::<f64>()
            .map_err(|_| AssessmentError::ValidationError {
                message: format!("{}: '{}' is not a number", name, field),
            })
    };

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let status: IntersectionStatus = record[status_idx].trim().parse().map_err(|e| {
            AssessmentError::ValidationError {
                message: format!("Status column: {}", e),
            }
        })?;
        let mut ds = [0u8; 3];
        for (slot, &idx) in ds.iter_mut().zip(ds_idx.iter()) {
            *slot = u8::from(parse(&record[idx], "ds")? != 0.0);
        }
        rows.push(EdpRow {
            sd: parse(&record[sd_idx], "Sd")?,
            pga: parse(&record[pga_idx], "PGA")?,
            sa: parse(&record[sa_idx], "SA")?,
            status,
            record: record[gmr_idx].to_string(),
            ds,
        });
    }

    if rows.is_empty() {
        return Err(AssessmentError::ValidationError {
            message: "EDPs file contains no rows".to_string(),
        });
    }
    Ok(EdpTable { rows })
}
