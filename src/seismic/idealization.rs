use crate::domain::model::{CapacityCurve, IdealizationMethod, TrilinearCurve};
use crate::utils::error::{AssessmentError, Result};

/// Yield-displacement search step [m].
const SEARCH_STEP: f64 = 0.00001;

/// Area under the trilinear curve origin -> p2 -> p3: triangle to yield,
/// plateau rectangle, hardening triangle.
pub fn area_three_point(p2: (f64, f64), p3: (f64, f64)) -> f64 {
    let area1 = p2.0 * p2.1 / 2.0;
    let area2 = p2.1 * (p3.0 - p2.0);
    let area3 = (p3.1 - p2.1) * (p3.0 - p2.0) / 2.0;
    area1 + area2 + area3
}

/// Trapezoidal area under the pushover curve up to `idx_max` inclusive.
pub fn area_under_pushover(points: &[(f64, f64)], idx_max: usize) -> f64 {
    let mut area = 0.0;
    for i in 1..=idx_max {
        let dx = points[i].0 - points[i - 1].0;
        let dy = points[i].1 - points[i - 1].1;
        area += dx * dy / 2.0 + dx * points[i - 1].1;
    }
    area
}

/// Base shear at displacement `x` by linear interpolation along the pushover
/// curve. Past the last sample the final segment's slope is extrapolated.
pub fn interpolate_shear(points: &[(f64, f64)], x: f64) -> f64 {
    if let Some(p) = points.iter().find(|p| p.0 == x) {
        return p.1;
    }
    let idx = match points.iter().position(|p| p.0 > x) {
        Some(0) => 0,
        Some(i) => i - 1,
        None => points.len().saturating_sub(2),
    };
    let (x1, y1) = points[idx];
    let (x2, y2) = points[idx + 1];
    y1 + (x - x1) * (y2 - y1) / (x2 - x1)
}

pub fn idealize(
    curve: &CapacityCurve,
    method: IdealizationMethod,
    tolerance: f64,
) -> Result<TrilinearCurve> {
    match method {
        IdealizationMethod::Epp => epp(curve, tolerance),
        IdealizationMethod::Sh => sh(curve, tolerance),
    }
}

/// Elastic-perfectly-plastic idealization: march the yield displacement until
/// the trilinear area balances the pushover area.
pub fn epp(curve: &CapacityCurve, tolerance: f64) -> Result<TrilinearCurve> {
    let (max_point, po_area) = curve_reference(curve)?;

    let mut x = 0.0;
    let mut area = 0.0;
    let p1 = (0.0, 0.0);
    let mut p2 = (0.0, max_point.1);

    while ((po_area - area) / po_area).abs() >= tolerance {
        x += SEARCH_STEP;
        if x > max_point.0 {
            return Err(AssessmentError::ProcessingError {
                message: format!(
                    "EPP idealization did not converge within tolerance {}",
                    tolerance
                ),
            });
        }
        p2 = (x, max_point.1);
        area = area_three_point(p2, max_point);
    }

    Ok(TrilinearCurve::new(p1, p2, max_point))
}

/// Strain-hardening idealization: the intermediate point is taken on the
/// pushover curve and pushed out along its secant by the 0.6 factor.
pub fn sh(curve: &CapacityCurve, tolerance: f64) -> Result<TrilinearCurve> {
    let (max_point, po_area) = curve_reference(curve)?;

    let mut x = 0.0;
    let mut area = 0.0;
    let p1 = (0.0, 0.0);
    let mut p2 = (0.0, 0.0);

    while ((po_area - area) / po_area).abs() >= tolerance {
        x += SEARCH_STEP;
        if x / 0.6 > max_point.0 {
            return Err(AssessmentError::ProcessingError {
                message: format!(
                    "SH idealization did not converge within tolerance {}",
                    tolerance
                ),
            });
        }
        let shear = interpolate_shear(&curve.points, x);
        if shear <= 0.0 {
            continue;
        }
        p2 = (x / 0.6, shear / 0.6);
        area = area_three_point(p2, max_point);
    }

    Ok(TrilinearCurve::new(p1, p2, max_point))
}

fn curve_reference(curve: &CapacityCurve) -> Result<((f64, f64), f64)> {
    if curve.points.len() < 2 {
        return Err(AssessmentError::ValidationError {
            message: "capacity curve needs at least two samples".to_string(),
        });
    }
    let idx_max = curve.max_shear_index();
    let max_point = curve.points[idx_max];
    let po_area = area_under_pushover(&curve.points, idx_max);
    if po_area <= 0.0 {
        return Err(AssessmentError::ValidationError {
            message: "capacity curve encloses no area up to peak shear".to_string(),
        });
    }
    Ok((max_point, po_area))
}
