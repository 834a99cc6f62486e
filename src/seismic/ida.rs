use crate::domain::model::{
    AnalysisConfig, DamageThresholds, EdpRow, EdpTable, GroundMotionRecord, IntersectionStatus,
    ScalingConfig, TrilinearCurve,
};
use crate::domain::ports::ProgressFn;
use crate::seismic::intersection::{find_performance_point, round4};
use crate::seismic::sdof::{response_spectrum, SdofProperties};
use crate::utils::error::{AssessmentError, Result};

/// Margin past the ultimate spectral displacement assigned to runs whose
/// demand never meets capacity.
const FAIL_STATE_MARGIN: f64 = 1.01;

/// Damage-state spectral-displacement thresholds from the ADRS capacity
/// curve: slight, moderate (midpoint), near-collapse.
pub fn damage_thresholds(adrs_capacity: &TrilinearCurve) -> DamageThresholds {
    let ds1 = adrs_capacity.yield_point().0 * 0.75;
    let ds3 = adrs_capacity.ultimate_point().0;
    DamageThresholds {
        ds1,
        ds2: (ds1 + ds3) / 2.0,
        ds3,
    }
}

/// Scale factors from min to max inclusive, each rounded to 2 decimals.
pub fn scale_grid(scaling: &ScalingConfig) -> Vec<f64> {
    let mut scales = Vec::new();
    let mut k = 0u32;
    loop {
        let scale = scaling.min_scale + f64::from(k) * scaling.increment;
        if scale > scaling.max_scale + scaling.increment * 0.5 {
            break;
        }
        scales.push((scale * 100.0).round() / 100.0);
        k += 1;
    }
    scales
}

/// Number of (record, scale) analysis steps a run will perform; drives the
/// progress bar total.
pub fn planned_steps(record_count: usize, scaling: &ScalingConfig) -> u64 {
    record_count as u64 * scale_grid(scaling).len() as u64
}

pub struct IdaOutcome {
    pub edps: EdpTable,
    pub thresholds: DamageThresholds,
}

/// Incremental dynamic analysis over every record and scale factor. A record
/// whose analysis fails is logged and skipped; its rows computed so far are
/// kept, as are all other records.
pub fn run(
    idealized: &TrilinearCurve,
    adrs_capacity: &TrilinearCurve,
    records: &[GroundMotionRecord],
    scaling: &ScalingConfig,
    analysis: &AnalysisConfig,
    progress: Option<&ProgressFn>,
) -> Result<IdaOutcome> {
    let props = SdofProperties::from_idealized(idealized)?;
    let thresholds = damage_thresholds(adrs_capacity);
    let fail_sd = thresholds.ds3 * FAIL_STATE_MARGIN;
    let fail_sa = adrs_capacity.ultimate_point().1;
    let capacity_poly: Vec<(f64, f64)> = adrs_capacity.points.to_vec();
    let scales = scale_grid(scaling);

    let mut rows: Vec<EdpRow> = Vec::with_capacity(records.len() * scales.len());

    for record in records {
        let before = rows.len();
        if let Err(e) = analyze_record(
            record,
            &props,
            &capacity_poly,
            &scales,
            analysis,
            scaling.fast_mode,
            fail_sd,
            fail_sa,
            &mut rows,
            progress,
        ) {
            tracing::error!("Analysis error with record {}: {}", record.name, e);
            // Burn the remaining progress ticks so the bar still completes.
            if let Some(tick) = progress {
                for _ in rows.len() - before..scales.len() {
                    tick();
                }
            }
        }
    }

    for row in &mut rows {
        row.ds = [
            u8::from(row.sd >= thresholds.ds1),
            u8::from(row.sd >= thresholds.ds2),
            u8::from(row.sd >= thresholds.ds3),
        ];
    }

    Ok(IdaOutcome {
        edps: EdpTable { rows },
        thresholds,
    })
}

#[allow(clippy::too_many_arguments)]
fn analyze_record(
    record: &GroundMotionRecord,
    props: &SdofProperties,
    capacity_poly: &[(f64, f64)],
    scales: &[f64],
    analysis: &AnalysisConfig,
    fast_mode: bool,
    fail_sd: f64,
    fail_sa: f64,
    rows: &mut Vec<EdpRow>,
    progress: Option<&ProgressFn>,
) -> Result<()> {
    let peak = record
        .accel
        .iter()
        .fold(0.0f64, |acc, a| acc.max(a.abs()));
    if peak <= 0.0 {
        return Err(AssessmentError::ProcessingError {
            message: format!("record {} has zero peak acceleration", record.name),
        });
    }
    let normalized: Vec<f64> = record.accel.iter().map(|a| a / peak).collect();

    for (idx, &scale) in scales.iter().enumerate() {
        if scale == 0.0 {
            // Unscaled ground: no demand, trivially on the capacity curve.
            rows.push(EdpRow {
                sd: 0.0,
                pga: 0.0,
                sa: 0.0,
                status: IntersectionStatus::Intersected,
                record: record.name.clone(),
                ds: [0, 0, 0],
            });
            tick(progress);
            tracing::info!("Record: {}, Scale: {:.2}, State: intersected", record.name, scale);
            continue;
        }

        let scaled: Vec<f64> = normalized.iter().map(|a| a * scale).collect();
        let spectrum = response_spectrum(*props, &scaled, record.dt, analysis)?;
        let point = find_performance_point(&spectrum, capacity_poly, &record.name, scale);

        let status = if point.is_some() {
            IntersectionStatus::Intersected
        } else {
            IntersectionStatus::NotIntersected
        };
        let (sd, sa) = point.unwrap_or((fail_sd, fail_sa));
        rows.push(EdpRow {
            sd: round4(sd),
            pga: round4(scale),
            sa: round4(sa),
            status,
            record: record.name.clone(),
            ds: [0, 0, 0],
        });
        tick(progress);
        tracing::info!(
            "Record: {}, Scale: {:.2}, State: {}",
            record.name,
            scale,
            status
        );

        if fast_mode && status == IntersectionStatus::NotIntersected {
            // Demand already clears capacity: stronger shaking cannot
            // intersect either, so pre-fill the remaining scales as failed.
            let remaining = &scales[idx + 1..];
            for &higher in remaining {
                rows.push(EdpRow {
                    sd: round4(fail_sd),
                    pga: round4(higher),
                    sa: round4(fail_sa),
                    status: IntersectionStatus::NotIntersected,
                    record: record.name.clone(),
                    ds: [0, 0, 0],
                });
                tick(progress);
            }
            tracing::info!(
                "[FAST-MODE] {}: first miss at scale {:.2}; skipped {} higher scales.",
                record.name,
                scale,
                remaining.len()
            );
            break;
        }
    }

    Ok(())
}

fn tick(progress: Option<&ProgressFn>) {
    if let Some(f) = progress {
        f();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scaling(min: f64, max: f64, inc: f64, fast: bool) -> ScalingConfig {
        ScalingConfig {
            min_scale: min,
            max_scale: max,
            increment: inc,
            fast_mode: fast,
        }
    }

    fn test_curves() -> (TrilinearCurve, TrilinearCurve) {
        let idealized = TrilinearCurve::new((0.0, 0.0), (0.02, 40.0), (0.08, 44.0));
        let adrs = TrilinearCurve::new((0.0, 0.0), (0.025, 0.25), (0.1, 0.275));
        (idealized, adrs)
    }

    fn sine_record(name: &str) -> GroundMotionRecord {
        GroundMotionRecord {
            name: name.to_string(),
            dt: 0.02,
            accel: (0..40).map(|i| (i as f64 * 0.6).sin() * 0.4).collect(),
        }
    }

    #[test]
    fn thresholds_follow_adrs_curve() {
        let adrs = TrilinearCurve::new((0.0, 0.0), (0.04, 0.3), (0.12, 0.3));
        let t = damage_thresholds(&adrs);
        assert!((t.ds1 - 0.03).abs() < 1e-12);
        assert!((t.ds3 - 0.12).abs() < 1e-12);
        assert!((t.ds2 - 0.075).abs() < 1e-12);
    }

    #[test]
    fn scale_grid_is_inclusive_and_rounded() {
        let grid = scale_grid(&scaling(0.0, 1.0, 0.25, false));
        assert_eq!(grid, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        let grid = scale_grid(&scaling(0.1, 0.3, 0.1, false));
        assert_eq!(grid, vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn planned_steps_multiplies_records_by_scales() {
        assert_eq!(planned_steps(3, &scaling(0.0, 1.0, 0.25, false)), 15);
    }

    #[test]
    fn zero_scale_rows_are_trivially_intersected() {
        let (idealized, adrs) = test_curves();
        let analysis = AnalysisConfig {
            period_step: 0.5,
            ..AnalysisConfig::default()
        };
        let records = vec![sine_record("r1.csv")];
        let out = run(
            &idealized,
            &adrs,
            &records,
            &scaling(0.0, 0.0, 0.25, false),
            &analysis,
            None,
        )
        .unwrap();
        assert_eq!(out.edps.len(), 1);
        let row = &out.edps.rows[0];
        assert_eq!(row.sd, 0.0);
        assert_eq!(row.pga, 0.0);
        assert_eq!(row.status, IntersectionStatus::Intersected);
        assert_eq!(row.ds, [0, 0, 0]);
    }

    #[test]
    fn every_record_and_scale_yields_one_row() {
        let (idealized, adrs) = test_curves();
        let analysis = AnalysisConfig {
            period_step: 0.5,
            ..AnalysisConfig::default()
        };
        let records = vec![sine_record("r1.csv"), sine_record("r2.csv")];
        let cfg = scaling(0.0, 0.5, 0.25, false);
        let out = run(&idealized, &adrs, &records, &cfg, &analysis, None).unwrap();
        assert_eq!(out.edps.len(), 6);
        assert_eq!(out.edps.distinct_records(), 2);
        for row in &out.edps.rows {
            assert!(row.sd.is_finite());
            assert!(row.sa.is_finite());
            // Flags are consistent with the row's Sd.
            assert_eq!(row.ds[0], u8::from(row.sd >= out.thresholds.ds1));
            assert_eq!(row.ds[2], u8::from(row.sd >= out.thresholds.ds3));
        }
    }

    #[test]
    fn fast_mode_prefills_remaining_scales() {
        let (idealized, _) = test_curves();
        // A capacity curve far above any demand guarantees a miss at every
        // scale, so fast mode must fill everything after the first one.
        let unreachable = TrilinearCurve::new((0.0, 10.0), (0.001, 12.0), (0.002, 13.0));
        let analysis = AnalysisConfig {
            period_step: 1.0,
            ..AnalysisConfig::default()
        };
        let records = vec![sine_record("r1.csv")];
        let cfg = scaling(0.25, 1.0, 0.25, true);
        let out = run(&idealized, &unreachable, &records, &cfg, &analysis, None).unwrap();
        assert_eq!(out.edps.len(), 4);
        for row in &out.edps.rows {
            assert_eq!(row.status, IntersectionStatus::NotIntersected);
            assert_eq!(row.ds, [1, 1, 1]);
        }
        // Pre-filled rows carry the scale as PGA.
        assert_eq!(out.edps.rows[1].pga, 0.5);
        assert_eq!(out.edps.rows[3].pga, 1.0);
    }

    #[test]
    fn zero_amplitude_record_is_skipped() {
        let (idealized, adrs) = test_curves();
        let analysis = AnalysisConfig {
            period_step: 1.0,
            ..AnalysisConfig::default()
        };
        let records = vec![
            GroundMotionRecord {
                name: "flat.csv".to_string(),
                dt: 0.02,
                accel: vec![0.0; 16],
            },
            sine_record("ok.csv"),
        ];
        let cfg = scaling(0.25, 0.25, 0.25, false);
        let out = run(&idealized, &adrs, &records, &cfg, &analysis, None).unwrap();
        assert_eq!(out.edps.distinct_records(), 1);
        assert_eq!(out.edps.rows[0].record, "ok.csv");
    }
}
