use crate::domain::model::{
    AssessmentInputs, AssessmentResult, BuildingModel, CapacityCurve, EdpTable, FragilitySet,
    GroundMotionRecord, RunReport, RunSummary, StoreyRow, VulnerabilityCurve,
};
use crate::domain::ports::{JobProvider, Pipeline, ProgressFn, Storage};
use crate::seismic::{adrs, fragility, ida, idealization, vulnerability};
use crate::utils::error::{AssessmentError, Result};
use std::io::Write;
use std::path::Path;
use zip::write::{FileOptions, ZipWriter};

pub const FRAGILITY_FILENAME: &str = "fragility.csv";
pub const VULNERABILITY_FILENAME: &str = "vulnerability.csv";
pub const BUNDLE_FILENAME: &str = "results_bundle.zip";
pub const SUMMARY_FILENAME: &str = "run_summary.json";

const RECORD_EXTENSIONS: [&str; 2] = ["csv", "txt"];

/// The full assessment pipeline: read the three inputs, run idealization +
/// IDA + statistical fitting, write the CSV artifacts.
pub struct AssessmentPipeline<S: Storage, C: JobProvider> {
    storage: S,
    config: C,
    progress: Option<ProgressFn>,
}

impl<S: Storage, C: JobProvider> AssessmentPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self {
            storage,
            config,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: JobProvider> Pipeline for AssessmentPipeline<S, C> {
    async fn extract(&self) -> Result<AssessmentInputs> {
        let delimiter = self.config.csv_delimiter();

        let capacity_path = self.config.capacity_path();
        tracing::debug!("Reading capacity curve from {}", capacity_path);
        let capacity = parse_capacity_csv(&std::fs::read(capacity_path)?, delimiter)?;
        let capacity_file_name = Path::new(capacity_path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "capacity.csv".to_string());

        tracing::debug!(
            "Reading building parameters from {}",
            self.config.building_params_path()
        );
        let building =
            parse_building_csv(&std::fs::read(self.config.building_params_path())?, delimiter)?;

        let gmrs_dir = self.config.gmrs_dir();
        let mut names = list_ground_motion_files(gmrs_dir)?;
        names.sort();

        let mut records = Vec::with_capacity(names.len());
        for name in names {
            let path = Path::new(gmrs_dir).join(&name);
            let parsed = std::fs::read(&path)
                .map_err(AssessmentError::from)
                .and_then(|bytes| parse_record_csv(&name, &bytes, delimiter));
            match parsed {
                Ok(record) => records.push(record),
                Err(e) => tracing::error!("Skipping unreadable record {}: {}", name, e),
            }
        }

        if records.is_empty() {
            return Err(AssessmentError::ValidationError {
                message: format!(
                    "No *.txt or *.csv ground-motion files found in \"{}\"",
                    gmrs_dir
                ),
            });
        }

        Ok(AssessmentInputs {
            capacity,
            capacity_file_name,
            building,
            records,
        })
    }

    async fn transform(&self, inputs: AssessmentInputs) -> Result<AssessmentResult> {
        let scaling = self.config.scaling();
        let analysis = self.config.analysis();
        let method = self.config.idealization();
        let tolerance = self.config.idealization_tolerance();
        let fit = self.config.fit();
        let loss_ratios = self.config.loss_ratios();
        let job = self.config.job_name().to_string();
        let progress = self.progress.clone();

        let started_at = chrono::Utc::now();
        let result = tokio::task::spawn_blocking(move || -> Result<AssessmentResult> {
            let idealized = idealization::idealize(&inputs.capacity, method, tolerance)?;
            let coefficients = adrs::transformation_coefficients(&inputs.building)?;
            let adrs_capacity = adrs::to_spectral(&idealized, coefficients);

            let outcome = ida::run(
                &idealized,
                &adrs_capacity,
                &inputs.records,
                &scaling,
                &analysis,
                progress.as_ref(),
            )?;

            let fragility_set = fragility::fit_fragility(&outcome.edps, &fit, &scaling)?;
            let vulnerability_curve =
                vulnerability::vulnerability_curve(&fragility_set, loss_ratios);

            let summary = RunSummary {
                job,
                capacity_file: inputs.capacity_file_name.clone(),
                started_at,
                finished_at: chrono::Utc::now(),
                records: inputs.records.len(),
                edp_rows: outcome.edps.len(),
                min_scale: scaling.min_scale,
                max_scale: scaling.max_scale,
                increment: scaling.increment,
                idealization: method.to_string(),
                fit_method: fit.method.to_string(),
                thresholds: outcome.thresholds,
                fit_params: fragility_set.params.to_vec(),
            };

            Ok(AssessmentResult {
                edps: outcome.edps,
                thresholds: outcome.thresholds,
                idealized,
                adrs_capacity,
                fragility: fragility_set,
                vulnerability: vulnerability_curve,
                summary,
            })
        })
        .await
        .map_err(|e| AssessmentError::ProcessingError {
            message: format!("analysis task failed: {}", e),
        })??;

        Ok(result)
    }

    async fn load(&self, result: AssessmentResult) -> Result<RunReport> {
        let delimiter = self.config.csv_delimiter();
        let output_dir = self.config.output_dir();

        let edps_name = format!("EDPs_data_{}", result.summary.capacity_file);
        let edps_csv = edps_to_csv(&result.edps, delimiter)?;
        self.storage.write_file(&edps_name, &edps_csv).await?;
        tracing::info!("EDPs written -> {}/{}", output_dir, edps_name);

        let fragility_csv = fragility_to_csv(&result.fragility, delimiter)?;
        self.storage
            .write_file(FRAGILITY_FILENAME, &fragility_csv)
            .await?;

        let vulnerability_csv = vulnerability_to_csv(&result.vulnerability, delimiter)?;
        self.storage
            .write_file(VULNERABILITY_FILENAME, &vulnerability_csv)
            .await?;
        tracing::info!(
            "Saved fragility and vulnerability CSVs -> {}",
            output_dir
        );

        let bundle_path = if self.config.bundle_outputs() {
            let summary_json = serde_json::to_vec_pretty(&result.summary)?;
            let zip_data = {
                let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
                zip.start_file::<_, ()>(edps_name.as_str(), FileOptions::default())?;
                zip.write_all(&edps_csv)?;
                zip.start_file::<_, ()>(FRAGILITY_FILENAME, FileOptions::default())?;
                zip.write_all(&fragility_csv)?;
                zip.start_file::<_, ()>(VULNERABILITY_FILENAME, FileOptions::default())?;
                zip.write_all(&vulnerability_csv)?;
                zip.start_file::<_, ()>(SUMMARY_FILENAME, FileOptions::default())?;
                zip.write_all(&summary_json)?;
                let cursor = zip.finish()?;
                cursor.into_inner()
            };
            self.storage.write_file(BUNDLE_FILENAME, &zip_data).await?;
            Some(format!("{}/{}", output_dir, BUNDLE_FILENAME))
        } else {
            None
        };

        Ok(RunReport {
            edps_path: format!("{}/{}", output_dir, edps_name),
            fragility_path: format!("{}/{}", output_dir, FRAGILITY_FILENAME),
            vulnerability_path: format!("{}/{}", output_dir, VULNERABILITY_FILENAME),
            bundle_path,
        })
    }
}

/// Files in `dir` with a ground-motion extension, non-recursive.
pub fn list_ground_motion_files(dir: &str) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let matches = Path::new(&name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| RECORD_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if matches {
            names.push(name);
        }
    }
    Ok(names)
}

/// Planned number of analysis steps, for sizing the progress bar before
/// extraction runs.
pub fn count_ground_motion_files(dir: &str) -> usize {
    list_ground_motion_files(dir).map(|v| v.len()).unwrap_or(0)
}

// ----------------------------------------------------------------------
//                           CSV parsing
// ----------------------------------------------------------------------

fn header_index(headers: &csv::StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.trim() == name)
        .ok_or_else(|| AssessmentError::ValidationError {
            message: format!("CSV must have a '{}' column header", name),
        })
}

fn parse_f64(field: &str, context: &str) -> Result<f64> {
    field
        .trim()
        .parse::<f64>()
        .map_err(|_| AssessmentError::ValidationError {
            message: format!("{}: '{}' is not a number", context, field),
        })
}

pub fn parse_capacity_csv(bytes: &[u8], delimiter: u8) -> Result<CapacityCurve> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .from_reader(bytes);
    let headers = reader.headers()?.clone();
    let dt_idx = header_index(&headers, "Dt(m)")?;
    let vb_idx = header_index(&headers, "Vb(kN)")?;

    let mut points = Vec::new();
    for record in reader.records() {
        let record = record?;
        let dt = parse_f64(&record[dt_idx], "Dt(m)")?;
        let vb = parse_f64(&record[vb_idx], "Vb(kN)")?;
        points.push((dt, vb));
    }
    if points.len() < 2 {
        return Err(AssessmentError::ValidationError {
            message: "capacity curve needs at least two samples".to_string(),
        });
    }
    Ok(CapacityCurve::new(points))
}

pub fn parse_building_csv(bytes: &[u8], delimiter: u8) -> Result<BuildingModel> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .from_reader(bytes);
    let headers = reader.headers()?.clone();
    let floor_idx = header_index(&headers, "Floor(number)")?;
    let mass_idx = header_index(&headers, "Mass(ton)")?;
    let mode_idx = header_index(&headers, "Mode(unitless)")?;

    let mut storeys = Vec::new();
    for record in reader.records() {
        let record = record?;
        storeys.push(StoreyRow {
            floor: parse_f64(&record[floor_idx], "Floor(number)")? as u32,
            mass_ton: parse_f64(&record[mass_idx], "Mass(ton)")?,
            mode_shape: parse_f64(&record[mode_idx], "Mode(unitless)")?,
        });
    }
    if storeys.is_empty() {
        return Err(AssessmentError::ValidationError {
            message: "building parameters table is empty".to_string(),
        });
    }
    Ok(BuildingModel { storeys })
}

pub fn parse_record_csv(name: &str, bytes: &[u8], delimiter: u8) -> Result<GroundMotionRecord> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(bytes);

    let mut times = Vec::new();
    let mut accel = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.len() < 2 {
            return Err(AssessmentError::ValidationError {
                message: format!("record {} needs time and acceleration columns", name),
            });
        }
        times.push(parse_f64(&record[0], "time")?);
        accel.push(parse_f64(&record[1], "acceleration")?);
    }

    if accel.len() < 2 {
        return Err(AssessmentError::ValidationError {
            message: format!("record {} has fewer than two samples", name),
        });
    }
    let dt = (times[1] - times[0]).abs();
    if dt <= 0.0 {
        return Err(AssessmentError::ValidationError {
            message: format!("record {} has a non-positive sample interval", name),
        });
    }

    Ok(GroundMotionRecord {
        name: name.to_string(),
        dt,
        accel,
    })
}

// ----------------------------------------------------------------------
//                           CSV serialization
// ----------------------------------------------------------------------

fn finish_csv(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>> {
    writer
        .into_inner()
        .map_err(|e| AssessmentError::ProcessingError {
            message: format!("CSV buffer error: {}", e),
        })
}

pub fn edps_to_csv(table: &EdpTable, delimiter: u8) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());
    writer.write_record(["Sd", "PGA", "SA", "Status", "GMR", "ds1", "ds2", "ds3"])?;
    for row in &table.rows {
        writer.write_record([
            row.sd.to_string(),
            row.pga.to_string(),
            row.sa.to_string(),
            row.status.to_string(),
            row.record.clone(),
            row.ds[0].to_string(),
            row.ds[1].to_string(),
            row.ds[2].to_string(),
        ])?;
    }
    finish_csv(writer)
}

pub fn fragility_to_csv(set: &FragilitySet, delimiter: u8) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());
    writer.write_record(["IM", "DS1", "DS2", "DS3"])?;
    for (j, im) in set.im_range.iter().enumerate() {
        writer.write_record([
            im.to_string(),
            set.probabilities[0][j].to_string(),
            set.probabilities[1][j].to_string(),
            set.probabilities[2][j].to_string(),
        ])?;
    }
    finish_csv(writer)
}

pub fn vulnerability_to_csv(curve: &VulnerabilityCurve, delimiter: u8) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());
    writer.write_record(["Loss ratio", "IM"])?;
    for (loss, im) in curve.loss_ratio.iter().zip(&curve.im) {
        writer.write_record([loss.to_string(), im.to_string()])?;
    }
    finish_csv(writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{
        AnalysisConfig, DamageThresholds, EdpRow, FitConfig, FitParams, IdealizationMethod,
        IntersectionStatus, ScalingConfig, TrilinearCurve,
    };
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        fn new() -> Self {
            Self {
                files: Arc::new(Mutex::new(HashMap::new())),
            }
        }

        async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned()
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                AssessmentError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }
    }

    struct MockConfig {
        capacity: String,
        building: String,
        gmrs: String,
        output: String,
        bundle: bool,
    }

    impl MockConfig {
        fn new(base: &std::path::Path) -> Self {
            Self {
                capacity: base.join("capacity.csv").to_string_lossy().into_owned(),
                building: base.join("building.csv").to_string_lossy().into_owned(),
                gmrs: base.join("gmrs").to_string_lossy().into_owned(),
                output: "test_output".to_string(),
                bundle: false,
            }
        }
    }

    impl JobProvider for MockConfig {
        fn job_name(&self) -> &str {
            "mock-job"
        }

        fn capacity_path(&self) -> &str {
            &self.capacity
        }

        fn building_params_path(&self) -> &str {
            &self.building
        }

        fn gmrs_dir(&self) -> &str {
            &self.gmrs
        }

        fn output_dir(&self) -> &str {
            &self.output
        }

        fn scaling(&self) -> ScalingConfig {
            ScalingConfig {
                min_scale: 0.25,
                max_scale: 0.5,
                increment: 0.25,
                fast_mode: false,
            }
        }

        fn idealization(&self) -> IdealizationMethod {
            IdealizationMethod::Epp
        }

        fn idealization_tolerance(&self) -> f64 {
            0.001
        }

        fn analysis(&self) -> AnalysisConfig {
            AnalysisConfig {
                period_step: 0.5,
                ..AnalysisConfig::default()
            }
        }

        fn fit(&self) -> FitConfig {
            FitConfig::default()
        }

        fn loss_ratios(&self) -> [f64; 3] {
            [0.15, 0.6, 1.0]
        }

        fn csv_delimiter(&self) -> u8 {
            b';'
        }

        fn bundle_outputs(&self) -> bool {
            self.bundle
        }
    }

    fn write_inputs(base: &std::path::Path) {
        let mut capacity = String::from("Dt(m);Vb(kN)\n");
        for i in 0..=20 {
            let x = i as f64 * 0.005;
            let y = if i <= 10 { i as f64 * 5.0 } else { 50.0 };
            capacity.push_str(&format!("{};{}\n", x, y));
        }
        std::fs::write(base.join("capacity.csv"), capacity).unwrap();

        std::fs::write(
            base.join("building.csv"),
            "Floor(number);Mass(ton);Mode(unitless)\n1;120;0.5\n2;110;1.0\n",
        )
        .unwrap();

        let gmrs = base.join("gmrs");
        std::fs::create_dir_all(&gmrs).unwrap();
        for name in ["r1.csv", "r2.txt"] {
            let mut content = String::from("t;a\n");
            for i in 0..24 {
                content.push_str(&format!("{};{}\n", i as f64 * 0.02, (i as f64 * 0.8).sin()));
            }
            std::fs::write(gmrs.join(name), content).unwrap();
        }
        // Non-record extension and a malformed record: both must be ignored.
        std::fs::write(gmrs.join("notes.dat"), "ignore me").unwrap();
        std::fs::write(gmrs.join("broken.csv"), "t;a\nonly-one-row;x\n").unwrap();
    }

    #[tokio::test]
    async fn extract_reads_all_inputs() {
        let tmp = tempfile::tempdir().unwrap();
        write_inputs(tmp.path());
        let pipeline = AssessmentPipeline::new(MockStorage::new(), MockConfig::new(tmp.path()));

        let inputs = pipeline.extract().await.unwrap();
        assert_eq!(inputs.capacity.points.len(), 21);
        assert_eq!(inputs.building.storeys.len(), 2);
        // broken.csv is skipped, notes.dat never considered.
        assert_eq!(inputs.records.len(), 2);
        assert_eq!(inputs.records[0].name, "r1.csv");
        assert!((inputs.records[0].dt - 0.02).abs() < 1e-12);
        assert_eq!(inputs.capacity_file_name, "capacity.csv");
    }

    #[tokio::test]
    async fn extract_fails_without_records() {
        let tmp = tempfile::tempdir().unwrap();
        write_inputs(tmp.path());
        std::fs::remove_file(tmp.path().join("gmrs/r1.csv")).unwrap();
        std::fs::remove_file(tmp.path().join("gmrs/r2.txt")).unwrap();
        std::fs::remove_file(tmp.path().join("gmrs/broken.csv")).unwrap();

        let pipeline = AssessmentPipeline::new(MockStorage::new(), MockConfig::new(tmp.path()));
        let err = pipeline.extract().await.unwrap_err();
        assert!(err.to_string().contains("ground-motion"));
    }

    #[tokio::test]
    async fn transform_produces_one_row_per_record_and_scale() {
        let tmp = tempfile::tempdir().unwrap();
        write_inputs(tmp.path());
        let pipeline = AssessmentPipeline::new(MockStorage::new(), MockConfig::new(tmp.path()));

        let inputs = pipeline.extract().await.unwrap();
        let result = pipeline.transform(inputs).await.unwrap();

        assert_eq!(result.edps.len(), 4);
        assert_eq!(result.summary.records, 2);
        assert_eq!(result.summary.edp_rows, 4);
        assert_eq!(result.summary.capacity_file, "capacity.csv");
        assert_eq!(result.fragility.probabilities[0].len(), result.fragility.im_range.len());
        assert_eq!(result.vulnerability.im.len(), result.fragility.im_range.len());
    }

    fn tiny_result() -> AssessmentResult {
        let curve = TrilinearCurve::new((0.0, 0.0), (0.05, 50.0), (0.1, 50.0));
        let thresholds = DamageThresholds {
            ds1: 0.01,
            ds2: 0.02,
            ds3: 0.03,
        };
        let fragility = FragilitySet {
            im_range: vec![0.25, 0.5],
            probabilities: [vec![0.1, 0.4], vec![0.05, 0.2], vec![0.0, 0.1]],
            params: [FitParams::Lognormal { mu: 0.0, sigma: 0.5 }; 3],
            scatter: None,
        };
        let vulnerability = VulnerabilityCurve {
            im: vec![0.25, 0.5],
            loss_ratio: vec![0.05, 0.2],
        };
        AssessmentResult {
            edps: EdpTable {
                rows: vec![EdpRow {
                    sd: 0.0123,
                    pga: 0.25,
                    sa: 0.2,
                    status: IntersectionStatus::Intersected,
                    record: "r1.csv".to_string(),
                    ds: [1, 0, 0],
                }],
            },
            thresholds,
            idealized: curve,
            adrs_capacity: curve,
            fragility,
            vulnerability,
            summary: RunSummary {
                job: "mock-job".to_string(),
                capacity_file: "capacity.csv".to_string(),
                started_at: chrono::Utc::now(),
                finished_at: chrono::Utc::now(),
                records: 1,
                edp_rows: 1,
                min_scale: 0.25,
                max_scale: 0.5,
                increment: 0.25,
                idealization: "EPP".to_string(),
                fit_method: "MSA".to_string(),
                thresholds,
                fit_params: vec![FitParams::Lognormal { mu: 0.0, sigma: 0.5 }; 3],
            },
        }
    }

    #[tokio::test]
    async fn load_writes_all_csvs() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = MockStorage::new();
        let config = MockConfig::new(tmp.path());
        let pipeline = AssessmentPipeline::new(storage.clone(), config);

        let report = pipeline.load(tiny_result()).await.unwrap();
        assert_eq!(report.edps_path, "test_output/EDPs_data_capacity.csv");
        assert!(report.bundle_path.is_none());

        let edps = storage.get_file("EDPs_data_capacity.csv").await.unwrap();
        let text = String::from_utf8(edps).unwrap();
        assert!(text.starts_with("Sd;PGA;SA;Status;GMR;ds1;ds2;ds3"));
        assert!(text.contains("0.0123;0.25;0.2;intersected;r1.csv;1;0;0"));

        let fragility = storage.get_file(FRAGILITY_FILENAME).await.unwrap();
        let text = String::from_utf8(fragility).unwrap();
        assert!(text.starts_with("IM;DS1;DS2;DS3"));

        let vulnerability = storage.get_file(VULNERABILITY_FILENAME).await.unwrap();
        let text = String::from_utf8(vulnerability).unwrap();
        assert!(text.starts_with("Loss ratio;IM"));
    }

    #[tokio::test]
    async fn load_bundles_outputs_when_asked() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = MockStorage::new();
        let mut config = MockConfig::new(tmp.path());
        config.bundle = true;
        let pipeline = AssessmentPipeline::new(storage.clone(), config);

        let report = pipeline.load(tiny_result()).await.unwrap();
        assert_eq!(
            report.bundle_path.as_deref(),
            Some("test_output/results_bundle.zip")
        );

        let zip_bytes = storage.get_file(BUNDLE_FILENAME).await.unwrap();
        let cursor = std::io::Cursor::new(zip_bytes);
        let mut archive = zip::ZipArchive::new(cursor).unwrap();
        assert_eq!(archive.len(), 4);

        let mut names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "EDPs_data_capacity.csv",
                FRAGILITY_FILENAME,
                SUMMARY_FILENAME,
                VULNERABILITY_FILENAME,
            ]
        );
    }

    #[test]
    fn capacity_csv_requires_headers() {
        let bad = b"a;b\n0;0\n0.1;10\n";
        assert!(parse_capacity_csv(bad, b';').is_err());
        let good = b"Dt(m);Vb(kN)\n0;0\n0.1;10\n";
        let curve = parse_capacity_csv(good, b';').unwrap();
        assert_eq!(curve.points.len(), 2);
    }

    #[test]
    fn record_csv_derives_dt() {
        let bytes = b"t;a\n0.0;0.0\n0.02;0.5\n0.04;-0.5\n";
        let record = parse_record_csv("r.csv", bytes, b';').unwrap();
        assert!((record.dt - 0.02).abs() < 1e-12);
        assert_eq!(record.accel, vec![0.0, 0.5, -0.5]);
    }
}
