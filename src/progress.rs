// Transfer progress: a pure renderer plus a small reporter that keeps the
// rendered line redrawn in place on the terminal.

use indicatif::{ProgressBar, ProgressStyle};

/// Number of segments in the text bar.
pub const BAR_WIDTH: usize = 20;

/// Render `current` out of `total` bytes as `  [████░░…] 42.0%`.
///
/// A zero `total` means there is nothing to transfer and renders as 100%.
pub fn render(current: u64, total: u64) -> String {
    let pct = if total == 0 {
        100.0
    } else {
        current as f64 * 100.0 / total as f64
    };
    let filled = ((pct / 5.0) as usize).min(BAR_WIDTH);
    format!(
        "  [{}{}] {:5.1}%",
        "█".repeat(filled),
        "░".repeat(BAR_WIDTH - filled),
        pct
    )
}

/// Terminal reporter for a single transfer. Hidden automatically when
/// stderr is not a terminal.
pub struct Progress {
    bar: ProgressBar,
}

impl Progress {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template("{msg}").unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        Progress { bar }
    }

    /// Redraw the line. Transfers of unknown size are not drawn.
    pub fn update(&self, current: u64, total: u64) {
        if total == 0 {
            return;
        }
        self.bar.set_message(render(current, total));
    }

    /// Leave the last drawn line on screen.
    pub fn finish(&self) {
        self.bar.finish();
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_half_way() {
        assert_eq!(render(50, 100), "  [██████████░░░░░░░░░░]  50.0%");
    }

    #[test]
    fn renders_partial_segments_rounded_down() {
        // 33.3% fills 6 of 20 segments
        let line = render(1, 3);
        assert!(line.starts_with("  [██████░"));
        assert!(line.ends_with(" 33.3%"));
    }

    #[test]
    fn renders_complete_and_empty() {
        assert_eq!(render(0, 10), format!("  [{}]   0.0%", "░".repeat(BAR_WIDTH)));
        assert_eq!(render(10, 10), format!("  [{}] 100.0%", "█".repeat(BAR_WIDTH)));
    }

    #[test]
    fn zero_total_is_complete() {
        assert_eq!(render(0, 0), render(1, 1));
    }

    #[test]
    fn overshoot_does_not_overflow_bar() {
        let line = render(300, 100);
        assert_eq!(line.matches('█').count(), BAR_WIDTH);
        assert!(line.ends_with("300.0%"));
    }

    #[test]
    fn reporter_skips_unknown_sizes() {
        let progress = Progress::new();
        progress.update(512, 0);
        assert_eq!(progress.bar.message(), "");

        progress.update(512, 1024);
        assert_eq!(progress.bar.message(), render(512, 1024));

        progress.update(1024, 0);
        assert_eq!(progress.bar.message(), render(512, 1024));
    }
}
