use crate::domain::model::SpectralPoint;

/// Sub-segments per polyline segment in the refinement fallback.
const REFINEMENT_FACTOR: usize = 6;

/// Intersection of two segments via the determinant form. Accepts points
/// inside both segments' coordinate ranges.
pub fn segment_intersection_determinant(
    (x1, y1): (f64, f64),
    (x2, y2): (f64, f64),
    (x3, y3): (f64, f64),
    (x4, y4): (f64, f64),
) -> Option<(f64, f64)> {
    let a1 = y2 - y1;
    let b1 = x1 - x2;
    let c1 = a1 * x1 + b1 * y1;

    let a2 = y4 - y3;
    let b2 = x3 - x4;
    let c2 = a2 * x3 + b2 * y3;

    let det = a1 * b2 - a2 * b1;
    if det == 0.0 {
        return None;
    }

    let x = (b2 * c1 - b1 * c2) / det;
    let y = (a1 * c2 - a2 * c1) / det;
    let in_range = x1.min(x2) <= x
        && x <= x1.max(x2)
        && x3.min(x4) <= x
        && x <= x3.max(x4)
        && y1.min(y2) <= y
        && y <= y1.max(y2)
        && y3.min(y4) <= y
        && y <= y3.max(y4);
    in_range.then_some((x, y))
}

/// Parametric segment intersection used on the refined polylines.
pub fn segment_intersection_parametric(
    (x1, y1): (f64, f64),
    (x2, y2): (f64, f64),
    (x3, y3): (f64, f64),
    (x4, y4): (f64, f64),
) -> Option<(f64, f64)> {
    let denom = (y4 - y3) * (x2 - x1) - (x4 - x3) * (y2 - y1);
    if denom == 0.0 {
        return None;
    }
    let ua = ((x4 - x3) * (y1 - y3) - (y4 - y3) * (x1 - x3)) / denom;
    let ub = ((x2 - x1) * (y1 - y3) - (y2 - y1) * (x1 - x3)) / denom;
    if (0.0..=1.0).contains(&ua) && (0.0..=1.0).contains(&ub) {
        Some((x1 + ua * (x2 - x1), y1 + ua * (y2 - y1)))
    } else {
        None
    }
}

/// Subdivide every segment into `REFINEMENT_FACTOR` equal parts.
pub fn refine_polyline(points: &[(f64, f64)]) -> Vec<(f64, f64)> {
    let mut refined = Vec::with_capacity(points.len() * REFINEMENT_FACTOR);
    for window in points.windows(2) {
        let (x1, y1) = window[0];
        let (x2, y2) = window[1];
        for k in 0..REFINEMENT_FACTOR {
            let t = k as f64 / REFINEMENT_FACTOR as f64;
            refined.push((x1 + (x2 - x1) * t, y1 + (y2 - y1) * t));
        }
    }
    if let Some(&last) = points.last() {
        refined.push(last);
    }
    refined
}

fn pairwise_intersections(
    demand: &[(f64, f64)],
    capacity: &[(f64, f64)],
    intersect: fn((f64, f64), (f64, f64), (f64, f64), (f64, f64)) -> Option<(f64, f64)>,
) -> Vec<(f64, f64)> {
    let mut found = Vec::new();
    for d in demand.windows(2) {
        for c in capacity.windows(2) {
            if let Some(point) = intersect(d[0], d[1], c[0], c[1]) {
                found.push(point);
            }
        }
    }
    found
}

/// Performance point of the scaled record: the lowest-Sd crossing of the
/// demand spectrum with the ADRS capacity polyline. Falls back to refined
/// segments when the direct pass finds nothing.
pub fn find_performance_point(
    demand: &[SpectralPoint],
    capacity: &[(f64, f64)],
    record: &str,
    scale: f64,
) -> Option<(f64, f64)> {
    let demand_poly: Vec<(f64, f64)> = demand.iter().map(|p| (p.sd, p.sa)).collect();

    let mut intersections =
        pairwise_intersections(&demand_poly, capacity, segment_intersection_determinant);

    if intersections.is_empty() {
        let refined_demand = refine_polyline(&demand_poly);
        let refined_capacity = refine_polyline(capacity);
        intersections = pairwise_intersections(
            &refined_demand,
            &refined_capacity,
            segment_intersection_parametric,
        );
    }

    let best = intersections
        .into_iter()
        .min_by(|a, b| a.0.total_cmp(&b.0));

    match best {
        Some((x, y)) => {
            let x = round4(x);
            let y = round4(y);
            tracing::info!(
                "Intersection found for Record: {}, Scale: {:.2} at point: ({:.4}, {:.4})",
                record,
                scale,
                x,
                y
            );
            Some((x, y))
        }
        None => {
            tracing::info!("No intersection for Record: {}, Scale: {:.2}", record, scale);
            None
        }
    }
}

pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn determinant_finds_crossing() {
        let point = segment_intersection_determinant(
            (0.0, 0.0),
            (1.0, 1.0),
            (0.0, 1.0),
            (1.0, 0.0),
        )
        .unwrap();
        assert!((point.0 - 0.5).abs() < 1e-12);
        assert!((point.1 - 0.5).abs() < 1e-12);
    }

    #[test]
    fn determinant_rejects_parallel_and_disjoint() {
        assert!(segment_intersection_determinant(
            (0.0, 0.0),
            (1.0, 1.0),
            (0.0, 1.0),
            (1.0, 2.0)
        )
        .is_none());
        assert!(segment_intersection_determinant(
            (0.0, 0.0),
            (1.0, 1.0),
            (2.0, 3.0),
            (3.0, 2.0)
        )
        .is_none());
    }

    #[test]
    fn parametric_agrees_with_determinant() {
        let a = segment_intersection_determinant((0.0, 0.0), (2.0, 2.0), (0.0, 2.0), (2.0, 0.0));
        let b = segment_intersection_parametric((0.0, 0.0), (2.0, 2.0), (0.0, 2.0), (2.0, 0.0));
        assert_eq!(a, b);
    }

    #[test]
    fn refine_polyline_keeps_endpoints() {
        let refined = refine_polyline(&[(0.0, 0.0), (1.0, 2.0)]);
        assert_eq!(refined.len(), 7);
        assert_eq!(refined[0], (0.0, 0.0));
        assert_eq!(*refined.last().unwrap(), (1.0, 2.0));
    }

    #[test]
    fn performance_point_takes_lowest_sd() {
        // Demand crosses the capacity plateau twice; the earlier crossing wins.
        let demand = vec![
            SpectralPoint { sd: 0.0, sa: 1.5 },
            SpectralPoint { sd: 0.2, sa: 0.5 },
            SpectralPoint { sd: 0.3, sa: 1.5 },
            SpectralPoint { sd: 0.4, sa: 0.5 },
        ];
        let capacity = vec![(0.0, 0.0), (0.05, 1.0), (0.5, 1.0)];
        let point = find_performance_point(&demand, &capacity, "rec", 1.0).unwrap();
        assert!(point.0 < 0.2, "picked {:?}", point);
        assert!((point.1 - 1.0).abs() < 1e-9);
    }

    #[test]
    fn no_crossing_returns_none() {
        let demand = vec![
            SpectralPoint { sd: 0.0, sa: 3.0 },
            SpectralPoint { sd: 0.5, sa: 2.5 },
        ];
        let capacity = vec![(0.0, 0.0), (0.05, 1.0), (0.5, 1.0)];
        assert!(find_performance_point(&demand, &capacity, "rec", 1.0).is_none());
    }

    #[test]
    fn round4_rounds_to_four_decimals() {
        assert_eq!(round4(0.123_44), 0.1234);
        assert_eq!(round4(0.123_46), 0.1235);
        assert_eq!(round4(-0.123_46), -0.1235);
    }
}
