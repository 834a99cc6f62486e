use asfravab::core::refit::{RefitConfig, RefitPipeline};
use asfravab::domain::model::{FitConfig, FitMethod, ScalingConfig};
use asfravab::LocalStorage;
use tempfile::TempDir;

fn write_edps(path: &std::path::Path) {
    let mut content = String::from("Sd;PGA;SA;Status;GMR;ds1;ds2;ds3\n");
    // Two records, four stripes; exceedance grows with the scale.
    let stripes = [
        (0.25, [0u8, 0, 0], [0u8, 0, 0]),
        (0.5, [1, 0, 0], [0, 0, 0]),
        (0.75, [1, 1, 0], [1, 0, 0]),
        (1.0, [1, 1, 1], [1, 1, 0]),
    ];
    for (pga, a, b) in stripes {
        for (record, ds) in [("quake_a.csv", a), ("quake_b.csv", b)] {
            content.push_str(&format!(
                "{sd};{pga};{sa};intersected;{record};{d0};{d1};{d2}\n",
                sd = pga * 0.04,
                pga = pga,
                sa = pga * 0.8,
                record = record,
                d0 = ds[0],
                d1 = ds[1],
                d2 = ds[2],
            ));
        }
    }
    std::fs::write(path, content).unwrap();
}

fn refit_config(edps: &std::path::Path, output: &std::path::Path, method: FitMethod) -> RefitConfig {
    RefitConfig {
        edps_path: edps.to_string_lossy().into_owned(),
        output_dir: output.to_string_lossy().into_owned(),
        scaling: ScalingConfig {
            min_scale: 0.25,
            max_scale: 1.0,
            increment: 0.25,
            fast_mode: false,
        },
        fit: FitConfig {
            method,
            ..FitConfig::default()
        },
        loss_ratios: [0.15, 0.6, 1.0],
        delimiter: b';',
    }
}

async fn run_refit(method: FitMethod) -> (TempDir, Vec<Vec<f64>>) {
    let tmp = TempDir::new().unwrap();
    let edps_path = tmp.path().join("EDPs_data_capacity.csv");
    write_edps(&edps_path);

    let config = refit_config(&edps_path, tmp.path(), method);
    let storage = LocalStorage::new(tmp.path().to_path_buf());
    let pipeline = RefitPipeline::new(storage, config);
    pipeline.run().await.unwrap();

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .from_path(tmp.path().join("fragility.csv"))
        .unwrap();
    let rows: Vec<Vec<f64>> = reader
        .records()
        .map(|r| {
            r.unwrap()
                .iter()
                .map(|f| f.parse::<f64>().unwrap())
                .collect()
        })
        .collect();
    (tmp, rows)
}

#[tokio::test]
async fn refit_msa_from_existing_edps() {
    let (tmp, rows) = run_refit(FitMethod::Msa).await;
    assert!(!rows.is_empty());
    for row in &rows {
        // IM; DS1; DS2; DS3 with ordered exceedance probabilities.
        assert_eq!(row.len(), 4);
        for p in &row[1..4] {
            assert!((0.0..=1.0).contains(p));
        }
    }
    assert!(tmp.path().join("vulnerability.csv").exists());
}

#[tokio::test]
async fn refit_glm_from_existing_edps() {
    let (_tmp, rows) = run_refit(FitMethod::Glm).await;
    // The ds1 curve must rise with intensity for this staircase data.
    let first = rows.first().unwrap();
    let last = rows.last().unwrap();
    assert!(first[1] < last[1]);
}

#[tokio::test]
async fn refit_logreg_from_existing_edps() {
    let (_tmp, rows) = run_refit(FitMethod::LogregMl).await;
    let first = rows.first().unwrap();
    let last = rows.last().unwrap();
    assert!(first[1] < last[1]);
    for row in &rows {
        for p in &row[1..4] {
            assert!((0.0..=1.0).contains(p));
        }
    }
}

#[tokio::test]
async fn refit_fails_on_missing_edps_file() {
    let tmp = TempDir::new().unwrap();
    let config = refit_config(
        &tmp.path().join("nope.csv"),
        tmp.path(),
        FitMethod::Msa,
    );
    let storage = LocalStorage::new(tmp.path().to_path_buf());
    let pipeline = RefitPipeline::new(storage, config);
    assert!(pipeline.run().await.is_err());
}
