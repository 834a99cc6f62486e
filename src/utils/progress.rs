use crate::domain::ports::ProgressFn;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;

/// Terminal bar for the IDA loop; one tick per (record, scale) step.
pub fn analysis_bar(total_steps: u64) -> ProgressBar {
    let bar = ProgressBar::new(total_steps.max(1));
    let style = ProgressStyle::with_template(
        "{bar:40.green} {pos}/{len} {msg}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar());
    bar.set_style(style);
    bar
}

pub fn progress_hook(bar: &ProgressBar) -> ProgressFn {
    let bar = bar.clone();
    Arc::new(move || bar.inc(1))
}
