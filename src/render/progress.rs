//! Text rendering of generation progress

use crate::session::ProgressState;

const BAR_FILL: char = '#';
const BAR_EMPTY: char = '-';

/// `Step 12 / 24 (50%)`
pub fn progress_line(progress: &ProgressState) -> String {
    format!(
        "Step {} / {} ({}%)",
        progress.step,
        progress.total,
        progress.percent()
    )
}

/// Fixed-width bar for a percentage, e.g. `[#####-----]` at 50%
pub fn progress_bar(percent: u8, width: usize) -> String {
    let percent = percent.min(100) as usize;
    let filled = (percent * width + 50) / 100;
    let mut bar = String::with_capacity(width + 2);
    bar.push('[');
    bar.extend(std::iter::repeat(BAR_FILL).take(filled));
    bar.extend(std::iter::repeat(BAR_EMPTY).take(width - filled));
    bar.push(']');
    bar
}

/// Bar followed by the step line, or the idle placeholder
pub fn status_line(progress: Option<&ProgressState>, width: usize) -> String {
    match progress {
        Some(p) => format!("{} {}", progress_bar(p.percent(), width), progress_line(p)),
        None => progress_bar(0, width),
    }
}
