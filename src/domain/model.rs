use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Pushover capacity curve: ordered (roof displacement [m], base shear [kN])
/// samples as read from the capacity CSV.
#[derive(Debug, Clone)]
pub struct CapacityCurve {
    pub points: Vec<(f64, f64)>,
}

impl CapacityCurve {
    pub fn new(points: Vec<(f64, f64)>) -> Self {
        Self { points }
    }

    /// Index of the first sample reaching the maximum base shear.
    pub fn max_shear_index(&self) -> usize {
        let mut best = 0;
        for (i, p) in self.points.iter().enumerate() {
            if p.1 > self.points[best].1 {
                best = i;
            }
        }
        best
    }
}

/// One storey of the building parameters table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreyRow {
    pub floor: u32,
    pub mass_ton: f64,
    pub mode_shape: f64,
}

#[derive(Debug, Clone)]
pub struct BuildingModel {
    pub storeys: Vec<StoreyRow>,
}

/// A single ground-motion record: header-stripped time/acceleration series.
#[derive(Debug, Clone)]
pub struct GroundMotionRecord {
    pub name: String,
    pub dt: f64,
    pub accel: Vec<f64>,
}

/// Trilinear curve through origin, yield and ultimate points. Used both in
/// the pushover domain (Dt/Vb) and, after transformation, in spectral
/// coordinates (Sd/Sa).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrilinearCurve {
    pub points: [(f64, f64); 3],
}

impl TrilinearCurve {
    pub fn new(p1: (f64, f64), p2: (f64, f64), p3: (f64, f64)) -> Self {
        Self { points: [p1, p2, p3] }
    }

    pub fn yield_point(&self) -> (f64, f64) {
        self.points[1]
    }

    pub fn ultimate_point(&self) -> (f64, f64) {
        self.points[2]
    }

    /// Divide displacements and forces by the given coefficients.
    pub fn scaled_by(&self, disp_divisor: f64, force_divisor: f64) -> Self {
        let mut points = self.points;
        for p in &mut points {
            p.0 /= disp_divisor;
            p.1 /= force_divisor;
        }
        Self { points }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdealizationMethod {
    #[default]
    Epp,
    Sh,
}

impl FromStr for IdealizationMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "epp" => Ok(Self::Epp),
            "sh" => Ok(Self::Sh),
            other => Err(format!("unknown idealization method: {}", other)),
        }
    }
}

impl fmt::Display for IdealizationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Epp => write!(f, "EPP"),
            Self::Sh => write!(f, "SH"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FitMethod {
    #[default]
    Msa,
    Glm,
    LogregMl,
}

impl FromStr for FitMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "msa" => Ok(Self::Msa),
            "glm" => Ok(Self::Glm),
            "logreg" | "logregml" => Ok(Self::LogregMl),
            other => Err(format!("unknown fit method: {}", other)),
        }
    }
}

impl fmt::Display for FitMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Msa => write!(f, "MSA"),
            Self::Glm => write!(f, "GLM"),
            Self::LogregMl => write!(f, "LogregML"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IntensityMeasure {
    #[default]
    Pga,
    Sa,
}

impl FromStr for IntensityMeasure {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pga" => Ok(Self::Pga),
            "sa" => Ok(Self::Sa),
            other => Err(format!("unknown intensity measure: {}", other)),
        }
    }
}

impl fmt::Display for IntensityMeasure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pga => write!(f, "PGA"),
            Self::Sa => write!(f, "SA"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkFunction {
    #[default]
    Logit,
    Probit,
}

impl FromStr for LinkFunction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "logit" => Ok(Self::Logit),
            "probit" => Ok(Self::Probit),
            other => Err(format!("unknown link function: {}", other)),
        }
    }
}

impl fmt::Display for LinkFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Logit => write!(f, "Logit"),
            Self::Probit => write!(f, "Probit"),
        }
    }
}

/// Regularization level for the ML logistic fit. Maps to the inverse
/// regularization strength C.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Regulation {
    High,
    Medium,
    #[default]
    None,
}

impl Regulation {
    pub fn c_value(&self) -> f64 {
        match self {
            Self::High => 1.0,
            Self::Medium => 10.0,
            Self::None => 1e5,
        }
    }
}

impl FromStr for Regulation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "none" | "no" => Ok(Self::None),
            other => Err(format!("unknown regulation level: {}", other)),
        }
    }
}

/// Spectral displacement thresholds separating the three damage states.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DamageThresholds {
    pub ds1: f64,
    pub ds2: f64,
    pub ds3: f64,
}

impl DamageThresholds {
    pub fn as_array(&self) -> [f64; 3] {
        [self.ds1, self.ds2, self.ds3]
    }
}

pub const DAMAGE_STATES: [&str; 3] = ["ds1", "ds2", "ds3"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntersectionStatus {
    Intersected,
    NotIntersected,
}

impl fmt::Display for IntersectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Intersected => write!(f, "intersected"),
            Self::NotIntersected => write!(f, "not intersected"),
        }
    }
}

impl FromStr for IntersectionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "intersected" => Ok(Self::Intersected),
            "not intersected" => Ok(Self::NotIntersected),
            other => Err(format!("unknown intersection status: {}", other)),
        }
    }
}

/// One engineering-demand-parameter row: the outcome of analyzing a single
/// (record, scale) pair.
#[derive(Debug, Clone)]
pub struct EdpRow {
    pub sd: f64,
    pub pga: f64,
    pub sa: f64,
    pub status: IntersectionStatus,
    pub record: String,
    pub ds: [u8; 3],
}

#[derive(Debug, Clone, Default)]
pub struct EdpTable {
    pub rows: Vec<EdpRow>,
}

impl EdpTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn distinct_records(&self) -> usize {
        self.rows
            .iter()
            .map(|r| r.record.as_str())
            .collect::<HashSet<_>>()
            .len()
    }

    pub fn im_values(&self, im: IntensityMeasure) -> Vec<f64> {
        self.rows
            .iter()
            .map(|r| match im {
                IntensityMeasure::Pga => r.pga,
                IntensityMeasure::Sa => r.sa,
            })
            .collect()
    }

    /// 0/1 exceedance flags for the given damage state (0-based).
    pub fn flags(&self, state: usize) -> Vec<f64> {
        self.rows.iter().map(|r| f64::from(r.ds[state])).collect()
    }
}

/// One demand-spectrum ordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectralPoint {
    pub sd: f64,
    pub sa: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct ScalingConfig {
    pub min_scale: f64,
    pub max_scale: f64,
    pub increment: f64,
    pub fast_mode: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct AnalysisConfig {
    pub damping_ratio: f64,
    pub period_step: f64,
    pub period_max: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            damping_ratio: 0.05,
            period_step: 0.02,
            period_max: 4.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FitConfig {
    pub method: FitMethod,
    pub im: IntensityMeasure,
    pub link: LinkFunction,
    pub regulation: Regulation,
}

/// Fitted parameters for one damage state, reported in the run summary.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum FitParams {
    /// Lognormal CDF fit from the MSA/MLE path.
    Lognormal { mu: f64, sigma: f64 },
    /// Intercept/slope on log intensity from the GLM and logistic paths.
    Link { intercept: f64, slope: f64 },
}

/// Observed exceedance fractions per scale stripe (MSA scatter output).
#[derive(Debug, Clone, Serialize)]
pub struct StripeData {
    pub im: Vec<f64>,
    pub fraction: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct FragilitySet {
    pub im_range: Vec<f64>,
    pub probabilities: [Vec<f64>; 3],
    pub params: [FitParams; 3],
    pub scatter: Option<[StripeData; 3]>,
}

#[derive(Debug, Clone)]
pub struct VulnerabilityCurve {
    pub im: Vec<f64>,
    pub loss_ratio: Vec<f64>,
}

/// Everything read during the extract phase.
#[derive(Debug, Clone)]
pub struct AssessmentInputs {
    pub capacity: CapacityCurve,
    pub capacity_file_name: String,
    pub building: BuildingModel,
    pub records: Vec<GroundMotionRecord>,
}

/// Everything computed during the transform phase.
#[derive(Debug, Clone)]
pub struct AssessmentResult {
    pub edps: EdpTable,
    pub thresholds: DamageThresholds,
    pub idealized: TrilinearCurve,
    pub adrs_capacity: TrilinearCurve,
    pub fragility: FragilitySet,
    pub vulnerability: VulnerabilityCurve,
    pub summary: RunSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub job: String,
    pub capacity_file: String,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub finished_at: chrono::DateTime<chrono::Utc>,
    pub records: usize,
    pub edp_rows: usize,
    pub min_scale: f64,
    pub max_scale: f64,
    pub increment: f64,
    pub idealization: String,
    pub fit_method: String,
    pub thresholds: DamageThresholds,
    pub fit_params: Vec<FitParams>,
}

/// Paths of the written artifacts, returned by the load phase.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub edps_path: String,
    pub fragility_path: String,
    pub vulnerability_path: String,
    pub bundle_path: Option<String>,
}
