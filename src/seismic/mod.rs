// Seismic computation modules: capacity idealization, spectral
// transformation, nonlinear SDOF response, capacity/demand intersection,
// incremental dynamic analysis, and statistical fitting.

pub mod adrs;
pub mod fragility;
pub mod ida;
pub mod idealization;
pub mod intersection;
pub mod sdof;
pub mod vulnerability;
