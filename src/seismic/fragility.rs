use crate::domain::model::{
    EdpTable, FitConfig, FitMethod, FitParams, FragilitySet, LinkFunction, ScalingConfig,
    StripeData,
};
use crate::seismic::ida::scale_grid;
use crate::utils::error::{AssessmentError, Result};
use statrs::function::erf::erf;
use std::collections::BTreeMap;
use std::f64::consts::{PI, SQRT_2};

/// Probability clip applied inside the Bernoulli log-likelihood.
const PROB_EPS: f64 = 1e-10;

/// Offset keeping log-intensities finite at zero.
const LOG_OFFSET: f64 = 1e-6;

fn norm_cdf(x: f64) -> f64 {
    if x.is_nan() {
        return f64::NAN;
    }
    if x.is_infinite() {
        return if x < 0.0 { 0.0 } else { 1.0 };
    }
    0.5 * (1.0 + erf(x / SQRT_2))
}

fn norm_pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / (2.0 * PI).sqrt()
}

fn sigmoid(eta: f64) -> f64 {
    1.0 / (1.0 + (-eta).exp())
}

/// Inclusive linear grid, numpy-linspace style.
pub fn linspace(start: f64, end: f64, num: usize) -> Vec<f64> {
    if num < 2 {
        return vec![start];
    }
    let step = (end - start) / (num - 1) as f64;
    (0..num).map(|i| start + step * i as f64).collect()
}

/// Piecewise-linear interpolation with end clamping, numpy-interp style.
fn interp(x_new: &[f64], xp: &[f64], fp: &[f64]) -> Vec<f64> {
    x_new
        .iter()
        .map(|&x| {
            if xp.is_empty() {
                return 0.0;
            }
            if x <= xp[0] {
                return fp[0];
            }
            if x >= xp[xp.len() - 1] {
                return fp[fp.len() - 1];
            }
            let mut i = 0;
            while xp[i + 1] < x {
                i += 1;
            }
            let t = (x - xp[i]) / (xp[i + 1] - xp[i]);
            fp[i] + t * (fp[i + 1] - fp[i])
        })
        .collect()
}

/// Fit fragility curves for all three damage states over
/// `IM_range = linspace(min, max, max/0.01)`.
pub fn fit_fragility(
    edps: &EdpTable,
    fit: &FitConfig,
    scaling: &ScalingConfig,
) -> Result<FragilitySet> {
    if edps.is_empty() {
        return Err(AssessmentError::ValidationError {
            message: "EDP table is empty; nothing to fit".to_string(),
        });
    }

    tracing::info!(
        "Running {} regression with selected IM: {}",
        fit.method,
        fit.im
    );

    let steps = ((scaling.max_scale / 0.01) as usize).max(2);
    let im_range = linspace(scaling.min_scale, scaling.max_scale, steps);

    match fit.method {
        FitMethod::Msa => fit_msa(edps, scaling, im_range),
        FitMethod::Glm => fit_glm(edps, fit, im_range),
        FitMethod::LogregMl => fit_logreg(edps, fit, im_range),
    }
}

// ----------------------------------------------------------------------
//                 MSA: stripe fractions + lognormal MLE
// ----------------------------------------------------------------------

fn fit_msa(edps: &EdpTable, scaling: &ScalingConfig, im_range: Vec<f64>) -> Result<FragilitySet> {
    let num_records = edps.distinct_records();
    if num_records == 0 {
        return Err(AssessmentError::ValidationError {
            message: "EDP table names no ground-motion records".to_string(),
        });
    }

    // Exceedance counts per PGA stripe, keyed on the rounded PGA value.
    let mut stripes: BTreeMap<i64, [f64; 3]> = BTreeMap::new();
    for row in &edps.rows {
        let key = (row.pga * 10_000.0).round() as i64;
        let entry = stripes.entry(key).or_insert([0.0; 3]);
        for (slot, &flag) in entry.iter_mut().zip(row.ds.iter()) {
            *slot += f64::from(flag);
        }
    }
    let stripe_x: Vec<f64> = stripes.keys().map(|&k| k as f64 / 10_000.0).collect();
    let x = scale_grid(scaling);

    let mut params = Vec::with_capacity(3);
    let mut probabilities = Vec::with_capacity(3);
    let mut scatter = Vec::with_capacity(3);
    for state in 0..3 {
        let counts: Vec<f64> = stripes.values().map(|v| v[state]).collect();
        let interpolated = interp(&x, &stripe_x, &counts);
        let fractions: Vec<f64> = interpolated
            .iter()
            .map(|c| c / num_records as f64)
            .collect();

        let (mu, sigma) = fit_lognormal_mle(&x, &fractions);
        params.push(FitParams::Lognormal { mu, sigma });
        probabilities.push(
            im_range
                .iter()
                .map(|&im| norm_cdf((im.ln() - mu) / sigma))
                .collect::<Vec<f64>>(),
        );
        scatter.push(StripeData {
            im: x.clone(),
            fraction: fractions,
        });
    }

    let params: [FitParams; 3] = [params[0], params[1], params[2]];
    let probabilities: [Vec<f64>; 3] = [
        probabilities.remove(0),
        probabilities.remove(0),
        probabilities.remove(0),
    ];
    let scatter: [StripeData; 3] = [
        scatter.remove(0),
        scatter.remove(0),
        scatter.remove(0),
    ];

    Ok(FragilitySet {
        im_range,
        probabilities,
        params,
        scatter: Some(scatter),
    })
}

fn neg_loglik(theta: [f64; 2], x: &[f64], y: &[f64]) -> f64 {
    let (mu, sigma) = (theta[0], theta[1]);
    let mut ll = 0.0;
    for (&xi, &yi) in x.iter().zip(y) {
        let mut p = norm_cdf((xi.ln() - mu) / sigma);
        if p.is_nan() {
            p = 0.5;
        }
        let p = p.clamp(PROB_EPS, 1.0 - PROB_EPS);
        ll += yi * p.ln() + (1.0 - yi) * (1.0 - p).ln();
    }
    -ll
}

/// Maximum-likelihood lognormal fragility parameters from observed
/// exceedance fractions, via a Nelder-Mead simplex started at (0, 1).
pub fn fit_lognormal_mle(x: &[f64], y: &[f64]) -> (f64, f64) {
    let theta = nelder_mead(|t| neg_loglik(t, x, y), [0.0, 1.0], 400, 1e-10);
    (theta[0], theta[1])
}

/// Two-parameter Nelder-Mead with the standard reflection/expansion/
/// contraction/shrink coefficients.
fn nelder_mead<F: Fn([f64; 2]) -> f64>(
    f: F,
    start: [f64; 2],
    max_iter: usize,
    tol: f64,
) -> [f64; 2] {
    let mut simplex = vec![start];
    for i in 0..2 {
        let mut v = start;
        if v[i] != 0.0 {
            v[i] *= 1.05;
        } else {
            v[i] = 0.00025;
        }
        simplex.push(v);
    }
    let mut values: Vec<f64> = simplex.iter().map(|&v| f(v)).collect();

    for _ in 0..max_iter {
        // Order best to worst.
        let mut idx = [0usize, 1, 2];
        idx.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
        simplex = vec![simplex[idx[0]], simplex[idx[1]], simplex[idx[2]]];
        values = vec![values[idx[0]], values[idx[1]], values[idx[2]]];

        if (values[2] - values[0]).abs() <= tol {
            break;
        }

        let centroid = [
            (simplex[0][0] + simplex[1][0]) / 2.0,
            (simplex[0][1] + simplex[1][1]) / 2.0,
        ];
        let reflect = |c: f64, w: f64| c + (c - w);
        let xr = [
            reflect(centroid[0], simplex[2][0]),
            reflect(centroid[1], simplex[2][1]),
        ];
        let fr = f(xr);

        if fr < values[0] {
            let xe = [
                centroid[0] + 2.0 * (centroid[0] - simplex[2][0]),
                centroid[1] + 2.0 * (centroid[1] - simplex[2][1]),
            ];
            let fe = f(xe);
            if fe < fr {
                simplex[2] = xe;
                values[2] = fe;
            } else {
                simplex[2] = xr;
                values[2] = fr;
            }
        } else if fr < values[1] {
            simplex[2] = xr;
            values[2] = fr;
        } else {
            // Contract toward the better of the reflected and worst points.
            let (base, fbase) = if fr < values[2] {
                (xr, fr)
            } else {
                (simplex[2], values[2])
            };
            let xc = [
                centroid[0] + 0.5 * (base[0] - centroid[0]),
                centroid[1] + 0.5 * (base[1] - centroid[1]),
            ];
            let fc = f(xc);
            if fc < fbase {
                simplex[2] = xc;
                values[2] = fc;
            } else {
                // Shrink toward the best vertex.
                for i in 1..3 {
                    simplex[i] = [
                        simplex[0][0] + 0.5 * (simplex[i][0] - simplex[0][0]),
                        simplex[0][1] + 0.5 * (simplex[i][1] - simplex[0][1]),
                    ];
                    values[i] = f(simplex[i]);
                }
            }
        }
    }

    let mut idx = [0usize, 1, 2];
    idx.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
    simplex[idx[0]]
}

// ----------------------------------------------------------------------
//                  GLM: binomial IRLS, logit or probit
// ----------------------------------------------------------------------

fn fit_glm(edps: &EdpTable, fit: &FitConfig, im_range: Vec<f64>) -> Result<FragilitySet> {
    let x: Vec<f64> = edps
        .im_values(fit.im)
        .iter()
        .map(|v| (v + LOG_OFFSET).ln())
        .collect();
    let log_range: Vec<f64> = im_range.iter().map(|v| (v + LOG_OFFSET).ln()).collect();

    let mut params = Vec::with_capacity(3);
    let mut probabilities = Vec::with_capacity(3);
    for state in 0..3 {
        let y = edps.flags(state);
        let (intercept, slope) = irls_binomial(&x, &y, fit.link)?;
        tracing::debug!(
            "Damage state ds{}, link {}: intercept {:.4}, slope {:.4}",
            state + 1,
            fit.link,
            intercept,
            slope
        );
        params.push(FitParams::Link { intercept, slope });
        probabilities.push(
            log_range
                .iter()
                .map(|&lx| {
                    let eta = intercept + slope * lx;
                    match fit.link {
                        LinkFunction::Logit => sigmoid(eta.clamp(-30.0, 30.0)),
                        LinkFunction::Probit => norm_cdf(eta),
                    }
                })
                .collect::<Vec<f64>>(),
        );
    }

    Ok(FragilitySet {
        im_range,
        probabilities: [
            probabilities.remove(0),
            probabilities.remove(0),
            probabilities.remove(0),
        ],
        params: [params[0], params[1], params[2]],
        scatter: None,
    })
}

fn irls_binomial(x: &[f64], y: &[f64], link: LinkFunction) -> Result<(f64, f64)> {
    let mut b0 = 0.0;
    let mut b1 = 0.0;

    for _ in 0..50 {
        let mut s_w = 0.0;
        let mut s_wx = 0.0;
        let mut s_wxx = 0.0;
        let mut s_wz = 0.0;
        let mut s_wxz = 0.0;

        for (&xi, &yi) in x.iter().zip(y) {
            let eta = (b0 + b1 * xi).clamp(-30.0, 30.0);
            let (mu, deriv) = match link {
                LinkFunction::Logit => {
                    let m = sigmoid(eta);
                    (m, m * (1.0 - m))
                }
                LinkFunction::Probit => (norm_cdf(eta), norm_pdf(eta)),
            };
            let mu = mu.clamp(PROB_EPS, 1.0 - PROB_EPS);
            let deriv = deriv.max(PROB_EPS);
            let w = deriv * deriv / (mu * (1.0 - mu));
            let z = eta + (yi - mu) / deriv;

            s_w += w;
            s_wx += w * xi;
            s_wxx += w * xi * xi;
            s_wz += w * z;
            s_wxz += w * xi * z;
        }

        let det = s_w * s_wxx - s_wx * s_wx;
        if det.abs() <= 1e-12 * (s_w * s_wxx).abs().max(1e-12) {
            return Err(AssessmentError::ProcessingError {
                message: "intensity measure has no variation; GLM design is singular"
                    .to_string(),
            });
        }

        let nb0 = (s_wxx * s_wz - s_wx * s_wxz) / det;
        let nb1 = (s_w * s_wxz - s_wx * s_wz) / det;
        let delta = (nb0 - b0).abs() + (nb1 - b1).abs();
        b0 = nb0;
        b1 = nb1;
        if delta < 1e-8 {
            break;
        }
    }

    Ok((b0, b1))
}

// ----------------------------------------------------------------------
//             LogregML: L2-penalized logistic regression
// ----------------------------------------------------------------------

fn fit_logreg(edps: &EdpTable, fit: &FitConfig, im_range: Vec<f64>) -> Result<FragilitySet> {
    let raw: Vec<f64> = edps
        .im_values(fit.im)
        .iter()
        .map(|v| (v + LOG_OFFSET).ln())
        .collect();
    let x = standardize(&raw)?;

    // The prediction grid is standardized by its own moments, matching the
    // original's separate feature/range scalers.
    let raw_range: Vec<f64> = im_range.iter().map(|v| (v + LOG_OFFSET).ln()).collect();
    let range_scaled = standardize(&raw_range)?;

    let lambda = 1.0 / fit.regulation.c_value();

    let mut params = Vec::with_capacity(3);
    let mut probabilities = Vec::with_capacity(3);
    for state in 0..3 {
        let y = edps.flags(state);
        let (intercept, slope) = ridge_logistic(&x, &y, lambda)?;
        params.push(FitParams::Link { intercept, slope });
        probabilities.push(
            range_scaled
                .iter()
                .map(|&z| sigmoid((intercept + slope * z).clamp(-30.0, 30.0)))
                .collect::<Vec<f64>>(),
        );
    }

    Ok(FragilitySet {
        im_range,
        probabilities: [
            probabilities.remove(0),
            probabilities.remove(0),
            probabilities.remove(0),
        ],
        params: [params[0], params[1], params[2]],
        scatter: None,
    })
}

fn standardize(values: &[f64]) -> Result<Vec<f64>> {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    let std = var.sqrt();
    if std <= 0.0 {
        return Err(AssessmentError::ProcessingError {
            message: "cannot standardize a constant intensity-measure column".to_string(),
        });
    }
    Ok(values.iter().map(|v| (v - mean) / std).collect())
}

/// Newton iteration for the logistic log-likelihood with an L2 penalty on
/// the slope (the intercept stays unpenalized).
fn ridge_logistic(x: &[f64], y: &[f64], lambda: f64) -> Result<(f64, f64)> {
    let mut b0 = 0.0;
    let mut b1 = 0.0;

    for _ in 0..100 {
        let mut g0 = 0.0;
        let mut g1 = 0.0;
        let mut h00 = 0.0;
        let mut h01 = 0.0;
        let mut h11 = 0.0;

        for (&xi, &yi) in x.iter().zip(y) {
            let eta = (b0 + b1 * xi).clamp(-30.0, 30.0);
            let mu = sigmoid(eta);
            let w = (mu * (1.0 - mu)).max(PROB_EPS);
            g0 += yi - mu;
            g1 += (yi - mu) * xi;
            h00 += w;
            h01 += w * xi;
            h11 += w * xi * xi;
        }
        g1 -= lambda * b1;
        h11 += lambda;

        let det = h00 * h11 - h01 * h01;
        if det.abs() <= 1e-12 * (h00 * h11).abs().max(1e-12) {
            return Err(AssessmentError::ProcessingError {
                message: "logistic fit Hessian is singular".to_string(),
            });
        }
        let db0 = (h11 * g0 - h01 * g1) / det;
        let db1 = (h00 * g1 - h01 * g0) / det;
        b0 += db0;
        b1 += db1;
        if db0.abs() + db1.abs() < 1e-8 {
            break;
        }
    }

    Ok((b0, b1))
}
