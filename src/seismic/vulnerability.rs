use crate::domain::model::{FragilitySet, VulnerabilityCurve};

/// Expected loss ratio over the intensity range: the probability of being in
/// exactly damage state i (difference of consecutive exceedance curves)
/// weighted by that state's loss ratio.
pub fn vulnerability_curve(fragility: &FragilitySet, loss_ratios: [f64; 3]) -> VulnerabilityCurve {
    let n = fragility.im_range.len();
    let mut loss = Vec::with_capacity(n);
    for j in 0..n {
        let p = [
            fragility.probabilities[0][j],
            fragility.probabilities[1][j],
            fragility.probabilities[2][j],
        ];
        let mut expected = 0.0;
        for i in 0..3 {
            let next = if i < 2 { p[i + 1] } else { 0.0 };
            expected += (p[i] - next) * loss_ratios[i];
        }
        loss.push(expected);
    }
    VulnerabilityCurve {
        im: fragility.im_range.clone(),
        loss_ratio: loss,
    }
}
