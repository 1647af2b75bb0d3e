//! Renders a `zif_progress::State` tree as a single `indicatif` bar.

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use zif_progress::State;

/// Attach a progress bar to `state`, advancing whenever its reported
/// percentage increases. The bar is suppressed entirely in `quiet` mode.
pub fn attach(state: &Arc<State>, quiet: bool) {
    if quiet {
        return;
    }
    let bar = ProgressBar::new(100);
    if let Ok(style) = ProgressStyle::with_template("{bar:40.cyan/blue} {pos:>3}% {msg}") {
        bar.set_style(style);
    }
    state.set_progress_callback(move |percent| {
        bar.set_position(u64::from(percent));
        if percent >= 100 {
            bar.finish_and_clear();
        }
    });
}
