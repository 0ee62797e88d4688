//! Step progress reported during a generation

/// Current step out of total, as last reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressState {
    pub step: u32,
    pub total: u32,
}

impl ProgressState {
    pub fn new(step: u32, total: u32) -> Self {
        Self { step, total }
    }

    /// Completion percentage in `0..=100`
    pub fn percent(&self) -> u8 {
        percent(self.step, self.total)
    }
}

/// `round(100 * step / max(1, total))`, clamped to `0..=100`
pub fn percent(step: u32, total: u32) -> u8 {
    let ratio = step as f64 / total.max(1) as f64;
    (ratio * 100.0).round().clamp(0.0, 100.0) as u8
}
