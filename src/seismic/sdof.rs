use crate::domain::model::{AnalysisConfig, SpectralPoint, TrilinearCurve};
use crate::utils::error::{AssessmentError, Result};
use rayon::prelude::*;
use std::f64::consts::PI;

/// Ground-motion scaling [m/s^2]; records are stored in units of g.
pub const GRAVITY: f64 = 9.81;

/// Sub-steps per record sample interval.
const SUBSTEPS: usize = 4;

/// Surrogate oscillator parameters taken from the idealized (pushover-domain)
/// capacity curve. The elastic stiffness is fixed; the mass is chosen per
/// period so the elastic period matches.
#[derive(Debug, Clone, Copy)]
pub struct SdofProperties {
    pub yield_disp: f64,
    pub yield_force: f64,
    pub hardening_stiffness: f64,
}

impl SdofProperties {
    pub fn from_idealized(curve: &TrilinearCurve) -> Result<Self> {
        let (dy, fy) = curve.yield_point();
        let (du, fu) = curve.ultimate_point();
        if dy <= 0.0 || fy <= 0.0 {
            return Err(AssessmentError::ValidationError {
                message: "idealized curve has a non-positive yield point".to_string(),
            });
        }
        let hardening_stiffness = if du > dy { (fu - fy) / (du - dy) } else { 0.0 };
        Ok(Self {
            yield_disp: dy,
            yield_force: fy,
            hardening_stiffness,
        })
    }

    pub fn elastic_stiffness(&self) -> f64 {
        self.yield_force / self.yield_disp
    }
}

/// Rate-independent bilinear law with kinematic hardening, updated by return
/// mapping on the plastic displacement and back force.
#[derive(Debug, Clone, Copy)]
pub struct BilinearMaterial {
    k0: f64,
    fy: f64,
    kh: f64,
    plastic_disp: f64,
    back_force: f64,
}

impl BilinearMaterial {
    pub fn new(k0: f64, fy: f64, kh: f64) -> Self {
        Self {
            k0,
            fy,
            kh,
            plastic_disp: 0.0,
            back_force: 0.0,
        }
    }

    /// Restoring force and tangent stiffness at `u` without committing state.
    pub fn trial(&self, u: f64) -> (f64, f64) {
        let f_trial = self.k0 * (u - self.plastic_disp);
        let xi = f_trial - self.back_force;
        let over = xi.abs() - self.fy;
        if over > 0.0 {
            let sign = if xi >= 0.0 { 1.0 } else { -1.0 };
            let dgamma = over / (self.k0 + self.kh);
            let force = f_trial - self.k0 * dgamma * sign;
            let tangent = self.k0 * self.kh / (self.k0 + self.kh);
            (force, tangent)
        } else {
            (f_trial, self.k0)
        }
    }

    /// Commit the state at the converged displacement.
    pub fn commit(&mut self, u: f64) {
        let f_trial = self.k0 * (u - self.plastic_disp);
        let xi = f_trial - self.back_force;
        let over = xi.abs() - self.fy;
        if over > 0.0 {
            let sign = if xi >= 0.0 { 1.0 } else { -1.0 };
            let dgamma = over / (self.k0 + self.kh);
            self.plastic_disp += dgamma * sign;
            self.back_force += self.kh * dgamma * sign;
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct NewmarkOptions {
    pub gamma: f64,
    pub beta: f64,
    pub tol: f64,
    pub max_iters: usize,
    /// Iteration cap for the coarse-step retry after a failed interval.
    pub relaxed_iters: usize,
}

impl Default for NewmarkOptions {
    fn default() -> Self {
        Self {
            gamma: 0.5,
            beta: 0.25,
            tol: 1e-6,
            max_iters: 200,
            relaxed_iters: 10,
        }
    }
}

/// One Newmark step from (u0, v0, a0) under end-of-step load `p`, solved by
/// Newton iteration on the displacement increment. Does not commit the
/// material; returns (u, v, a, converged).
fn newmark_step(
    mass: f64,
    damping: f64,
    material: &BilinearMaterial,
    u0: f64,
    v0: f64,
    a0: f64,
    p: f64,
    h: f64,
    opts: &NewmarkOptions,
    max_iters: usize,
) -> (f64, f64, f64, bool) {
    let c0 = 1.0 / (opts.beta * h * h);
    let c1 = opts.gamma / (opts.beta * h);
    let mut u = u0;
    let mut converged = false;

    for _ in 0..max_iters {
        let acc = c0 * (u - u0) - v0 / (opts.beta * h) - (0.5 / opts.beta - 1.0) * a0;
        let vel = v0 + h * ((1.0 - opts.gamma) * a0 + opts.gamma * acc);
        let (fs, kt) = material.trial(u);
        let residual = p - fs - damping * vel - mass * acc;
        let keff = kt + damping * c1 + mass * c0;
        let du = residual / keff;
        u += du;
        if du.abs() < opts.tol {
            converged = true;
            break;
        }
    }

    let acc = c0 * (u - u0) - v0 / (opts.beta * h) - (0.5 / opts.beta - 1.0) * a0;
    let vel = v0 + h * ((1.0 - opts.gamma) * a0 + opts.gamma * acc);
    (u, vel, acc, converged)
}

/// Peak absolute displacement of the oscillator under `ground_accel` (in g),
/// sampled at `dt`. Integration runs at `dt`/SUBSTEPS with linear
/// interpolation of the excitation; a failed interval is retried once as a
/// single step at the record `dt` and then accepted.
pub fn peak_displacement(
    mass: f64,
    damping: f64,
    material: BilinearMaterial,
    ground_accel: &[f64],
    dt: f64,
    opts: &NewmarkOptions,
) -> Result<f64> {
    if ground_accel.len() < 2 {
        return Err(AssessmentError::ValidationError {
            message: "ground-motion record needs at least two samples".to_string(),
        });
    }
    if dt <= 0.0 || mass <= 0.0 {
        return Err(AssessmentError::ValidationError {
            message: "time step and mass must be positive".to_string(),
        });
    }

    let mut mat = material;
    let mut u = 0.0;
    let mut v = 0.0;
    let (f0, _) = mat.trial(u);
    let mut a = (-mass * ground_accel[0] * GRAVITY - damping * v - f0) / mass;
    let mut peak = 0.0f64;
    let h = dt / SUBSTEPS as f64;
    let n_intervals = ground_accel.len() - 1;
    let mut unconverged = 0usize;

    // One zero-excitation interval past the end, as the original analysis
    // window extends one sample beyond the record.
    for i in 0..=n_intervals {
        let (ag0, ag1) = if i < n_intervals {
            (ground_accel[i], ground_accel[i + 1])
        } else {
            (0.0, 0.0)
        };

        let snapshot = (u, v, a, mat);
        let mut failed = false;
        for s in 0..SUBSTEPS {
            let frac = (s + 1) as f64 / SUBSTEPS as f64;
            let p = -mass * (ag0 + (ag1 - ag0) * frac) * GRAVITY;
            let (u1, v1, a1, ok) =
                newmark_step(mass, damping, &mat, u, v, a, p, h, opts, opts.max_iters);
            if !ok {
                failed = true;
                break;
            }
            mat.commit(u1);
            u = u1;
            v = v1;
            a = a1;
            peak = peak.max(u.abs());
        }

        if failed {
            let (u0, v0, a0, m0) = snapshot;
            mat = m0;
            let p = -mass * ag1 * GRAVITY;
            let (u1, v1, a1, ok) =
                newmark_step(mass, damping, &mat, u0, v0, a0, p, dt, opts, opts.relaxed_iters);
            if !ok {
                unconverged += 1;
            }
            mat.commit(u1);
            u = u1;
            v = v1;
            a = a1;
            peak = peak.max(u.abs());
        }
    }

    if unconverged > 0 {
        tracing::trace!("{} Newmark intervals accepted without convergence", unconverged);
    }

    Ok(peak)
}

/// Period grid: near-rigid seed point, then `period_step` increments up to
/// `period_max`.
pub fn period_grid(cfg: &AnalysisConfig) -> Vec<f64> {
    let n = (cfg.period_max / cfg.period_step).round() as usize;
    let mut grid = Vec::with_capacity(n + 1);
    grid.push(1e-6);
    for k in 1..=n {
        grid.push(k as f64 * cfg.period_step);
    }
    grid
}

/// Inelastic demand spectrum of the scaled record: one oscillator per period,
/// swept in parallel. Ordinates are (Sd [m], Sa [g]) in period order.
pub fn response_spectrum(
    props: SdofProperties,
    ground_accel: &[f64],
    dt: f64,
    cfg: &AnalysisConfig,
) -> Result<Vec<SpectralPoint>> {
    let k0 = props.elastic_stiffness();
    let opts = NewmarkOptions::default();

    period_grid(cfg)
        .par_iter()
        .map(|&period| -> Result<SpectralPoint> {
            let mass = period * period * k0 / (4.0 * PI * PI);
            let omega = (k0 / mass).sqrt();
            let damping = 2.0 * cfg.damping_ratio / omega * k0;
            let material = BilinearMaterial::new(k0, props.yield_force, props.hardening_stiffness);
            let sd = peak_displacement(mass, damping, material, ground_accel, dt, &opts)?;
            Ok(SpectralPoint {
                sd,
                sa: sd * omega * omega / GRAVITY,
            })
        })
        .collect()
}
