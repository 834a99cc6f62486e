use crate::domain::model::{BuildingModel, TrilinearCurve};
use crate::utils::error::{AssessmentError, Result};

/// Mass-to-weight conversion [m/s^2].
const STANDARD_GRAVITY: f64 = 9.80665;

/// Divisors taking the idealized pushover curve into spectral (Sd/Sa)
/// coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdrsCoefficients {
    pub sd: f64,
    pub sa: f64,
}

/// Modal transformation coefficients from the storey table. Mode-shape
/// ordinates are normalized by the first storey's ordinate.
pub fn transformation_coefficients(building: &BuildingModel) -> Result<AdrsCoefficients> {
    let first = building.storeys.first().ok_or_else(|| AssessmentError::ValidationError {
        message: "building parameters table is empty".to_string(),
    })?;
    if first.mode_shape == 0.0 {
        return Err(AssessmentError::ValidationError {
            message: "first-storey mode-shape ordinate must be non-zero".to_string(),
        });
    }

    let mut mxmode1 = 0.0;
    let mut mxmode2 = 0.0;
    for storey in &building.storeys {
        let phi = storey.mode_shape / first.mode_shape;
        let weight = storey.mass_ton * STANDARD_GRAVITY;
        mxmode1 += weight * phi;
        mxmode2 += weight * phi * phi;
    }
    if mxmode2 == 0.0 {
        return Err(AssessmentError::ValidationError {
            message: "modal participation is degenerate (all masses zero?)".to_string(),
        });
    }

    Ok(AdrsCoefficients {
        sd: mxmode1 / mxmode2,
        sa: mxmode1 * mxmode1 / mxmode2,
    })
}

/// Idealized capacity curve in spectral coordinates.
pub fn to_spectral(curve: &TrilinearCurve, coef: AdrsCoefficients) -> TrilinearCurve {
    curve.scaled_by(coef.sd, coef.sa)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::StoreyRow;

    fn two_storey() -> BuildingModel {
        BuildingModel {
            storeys: vec![
                StoreyRow { floor: 1, mass_ton: 100.0, mode_shape: 0.5 },
                StoreyRow { floor: 2, mass_ton: 100.0, mode_shape: 1.0 },
            ],
        }
    }

    #[test]
    fn coefficients_for_two_storey_frame() {
        // phi = [1, 2], w = 100 * 9.80665 each:
        // m1 = w*(1+2), m2 = w*(1+4)  ->  sd = 3/5, sa = m1 * 3/5.
        let coef = transformation_coefficients(&two_storey()).unwrap();
        let w = 100.0 * 9.80665;
        assert!((coef.sd - 0.6).abs() < 1e-12);
        assert!((coef.sa - 3.0 * w * 0.6).abs() < 1e-9);
    }

    #[test]
    fn empty_table_is_rejected() {
        let building = BuildingModel { storeys: vec![] };
        assert!(transformation_coefficients(&building).is_err());
    }

    #[test]
    fn spectral_transform_divides_by_coefficients() {
        let curve = TrilinearCurve::new((0.0, 0.0), (0.06, 300.0), (0.18, 300.0));
        let coef = AdrsCoefficients { sd: 0.6, sa: 1500.0 };
        let adrs = to_spectral(&curve, coef);
        assert!((adrs.yield_point().0 - 0.1).abs() < 1e-12);
        assert!((adrs.yield_point().1 - 0.2).abs() < 1e-12);
    }
}
