//! Per-line register pressure layered over a disassembly listing

use serde::Serialize;
use std::fmt;

/// Register totals reported for a whole entry point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RegisterSummary {
    /// Registers available on the target
    pub total: u32,
    /// Hardware allocation block size
    pub granularity: u32,
    pub used: u32,
    pub allocated: u32,
}

/// Live-register value attached to one disassembly line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LiveRegisterCell {
    /// Line was skipped (unpaired padding) or never reached
    Empty,
    /// Label row; carries no count
    Label,
    Count { used: u32, granularity: u32 },
    /// The report row paired with this line did not match it
    Unmatched,
}

impl fmt::Display for LiveRegisterCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiveRegisterCell::Empty | LiveRegisterCell::Label => Ok(()),
            LiveRegisterCell::Count { used, .. } => write!(f, "{used}"),
            LiveRegisterCell::Unmatched => f.write_str("N/A"),
        }
    }
}

/// Live-register overlay for one loaded entry point.
///
/// Holds the per-line cells, the lines that reach the maximum count and a
/// navigation cursor that cycles through them.
#[derive(Debug, Clone)]
pub struct LiveRegisterOverlay {
    summary: RegisterSummary,
    cells: Vec<LiveRegisterCell>,
    max_vgprs: u32,
    /// Ascending disassembly line indices at the maximum count
    max_line_numbers: Vec<usize>,
    /// Parallel to `max_line_numbers`; at most one entry is true
    is_current_max_line: Vec<bool>,
    current_max_index: usize,
    navigation_enabled: bool,
    unmatched_count: usize,
}

impl LiveRegisterOverlay {
    pub(crate) fn new(
        summary: RegisterSummary,
        cells: Vec<LiveRegisterCell>,
        max_vgprs: u32,
        max_line_numbers: Vec<usize>,
        unmatched_count: usize,
    ) -> Self {
        let is_current_max_line = vec![false; max_line_numbers.len()];
        Self {
            summary,
            cells,
            max_vgprs,
            max_line_numbers,
            is_current_max_line,
            current_max_index: 0,
            navigation_enabled: false,
            unmatched_count,
        }
    }

    pub fn summary(&self) -> &RegisterSummary {
        &self.summary
    }

    pub fn cell(&self, line_index: usize) -> Option<&LiveRegisterCell> {
        self.cells.get(line_index)
    }

    pub fn cells(&self) -> &[LiveRegisterCell] {
        &self.cells
    }

    pub fn max_vgprs(&self) -> u32 {
        self.max_vgprs
    }

    pub fn max_line_numbers(&self) -> &[usize] {
        &self.max_line_numbers
    }

    pub fn unmatched_count(&self) -> usize {
        self.unmatched_count
    }

    /// Advance to the next maximum-pressure line, wrapping at the end.
    ///
    /// The first call after load or reset only activates the cursor on the
    /// first maximum line.
    pub fn next_max_line(&mut self) -> Option<usize> {
        if self.max_line_numbers.is_empty() {
            return None;
        }

        if self.navigation_enabled {
            self.current_max_index = (self.current_max_index + 1) % self.max_line_numbers.len();
        } else {
            self.navigation_enabled = true;
        }

        self.highlight_current();
        Some(self.max_line_numbers[self.current_max_index])
    }

    /// Step back to the previous maximum-pressure line, wrapping at the start
    pub fn previous_max_line(&mut self) -> Option<usize> {
        if self.max_line_numbers.is_empty() {
            return None;
        }

        if self.navigation_enabled {
            self.current_max_index = self
                .current_max_index
                .checked_sub(1)
                .unwrap_or(self.max_line_numbers.len() - 1);
        } else {
            self.navigation_enabled = true;
        }

        self.highlight_current();
        Some(self.max_line_numbers[self.current_max_index])
    }

    /// Recompute the marker vector so only the cursor position is set
    pub fn highlight_current(&mut self) {
        self.is_current_max_line.fill(false);
        if let Some(flag) = self.is_current_max_line.get_mut(self.current_max_index) {
            *flag = true;
        }
    }

    pub fn reset_navigation(&mut self) {
        self.current_max_index = 0;
        self.navigation_enabled = false;
        self.is_current_max_line.fill(false);
    }

    pub fn is_navigation_enabled(&self) -> bool {
        self.navigation_enabled
    }

    /// Line the cursor currently points at, once navigation is active
    pub fn current_max_line(&self) -> Option<usize> {
        if !self.navigation_enabled {
            return None;
        }
        self.max_line_numbers.get(self.current_max_index).copied()
    }

    pub fn is_current_max_line(&self, line_index: usize) -> bool {
        self.max_line_numbers
            .binary_search(&line_index)
            .ok()
            .and_then(|position| self.is_current_max_line.get(position))
            .copied()
            .unwrap_or(false)
    }

    /// Tooltip for a line carrying a count
    pub fn tooltip(&self, line_index: usize) -> Option<String> {
        match self.cells.get(line_index)? {
            LiveRegisterCell::Count { used, granularity } => {
                allocation_tooltip(*used, *granularity, self.summary.total)
            }
            _ => None,
        }
    }

    /// Column header, e.g. `VGPR pressure (used:24, allocated:32/256)`
    pub fn header_text(&self) -> String {
        format!(
            "VGPR pressure (used:{}, allocated:{}/{})",
            self.summary.used, self.summary.allocated, self.summary.total
        )
    }

    /// True when some line uses every register the target has
    pub fn is_at_register_limit(&self) -> bool {
        self.summary.total > 0 && self.max_vgprs >= self.summary.total
    }

    /// User-facing note about alignment divergence, if there was any
    pub fn unmatched_note(&self) -> Option<String> {
        match self.unmatched_count {
            0 => None,
            1 => Some("1 instruction could not be matched".to_string()),
            n => Some(format!("{n} instructions could not be matched")),
        }
    }
}

fn allocation_tooltip(used: u32, granularity: u32, total: u32) -> Option<String> {
    if granularity == 0 {
        return None;
    }

    if used % granularity == 0 {
        return Some(format!(
            "Live VGPRs: {used}, allocated: {used}/{total}"
        ));
    }

    let allocated = (used / granularity + 1) * granularity;
    let reduction = used % granularity;
    Some(format!(
        "Live VGPRs: {used}, allocated: {allocated}/{total}. \
         Reducing usage by {reduction} would free {granularity} VGPRs \
         (allocation granularity is {granularity})"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overlay_with_max_lines(lines: Vec<usize>) -> LiveRegisterOverlay {
        let summary = RegisterSummary {
            total: 256,
            granularity: 4,
            used: 7,
            allocated: 8,
        };
        let cells = vec![
            LiveRegisterCell::Count {
                used: 4,
                granularity: 4,
            },
            LiveRegisterCell::Count {
                used: 7,
                granularity: 4,
            },
            LiveRegisterCell::Count {
                used: 7,
                granularity: 4,
            },
        ];
        LiveRegisterOverlay::new(summary, cells, 7, lines, 0)
    }

    #[test]
    fn test_first_next_activates_without_moving() {
        let mut overlay = overlay_with_max_lines(vec![1, 2]);
        assert_eq!(overlay.current_max_line(), None);

        assert_eq!(overlay.next_max_line(), Some(1));
        assert!(overlay.is_current_max_line(1));
        assert!(!overlay.is_current_max_line(2));

        assert_eq!(overlay.next_max_line(), Some(2));
        assert_eq!(overlay.next_max_line(), Some(1));
    }

    #[test]
    fn test_previous_wraps_backwards() {
        let mut overlay = overlay_with_max_lines(vec![0, 1, 2]);
        assert_eq!(overlay.previous_max_line(), Some(0));
        assert_eq!(overlay.previous_max_line(), Some(2));
        assert_eq!(overlay.previous_max_line(), Some(1));
    }

    #[test]
    fn test_reset_disables_navigation() {
        let mut overlay = overlay_with_max_lines(vec![1, 2]);
        overlay.next_max_line();
        overlay.next_max_line();
        overlay.reset_navigation();

        assert!(!overlay.is_navigation_enabled());
        assert!(!overlay.is_current_max_line(2));
        assert_eq!(overlay.next_max_line(), Some(1));
    }

    #[test]
    fn test_navigation_without_max_lines() {
        let mut overlay = overlay_with_max_lines(Vec::new());
        assert_eq!(overlay.next_max_line(), None);
        assert_eq!(overlay.previous_max_line(), None);
    }

    #[test]
    fn test_tooltip_rounds_up_to_granularity() {
        let overlay = overlay_with_max_lines(vec![1, 2]);

        let exact = overlay.tooltip(0).unwrap();
        assert_eq!(exact, "Live VGPRs: 4, allocated: 4/256");

        let rounded = overlay.tooltip(1).unwrap();
        assert!(rounded.starts_with("Live VGPRs: 7, allocated: 8/256"));
        assert!(rounded.contains("Reducing usage by 3 would free 4 VGPRs"));
    }

    #[test]
    fn test_header_and_limit() {
        let overlay = overlay_with_max_lines(vec![1, 2]);
        assert_eq!(
            overlay.header_text(),
            "VGPR pressure (used:7, allocated:8/256)"
        );
        assert!(!overlay.is_at_register_limit());

        let summary = RegisterSummary {
            total: 7,
            ..*overlay.summary()
        };
        let saturated = LiveRegisterOverlay::new(summary, Vec::new(), 7, vec![1], 2);
        assert!(saturated.is_at_register_limit());
        assert_eq!(
            saturated.unmatched_note().as_deref(),
            Some("2 instructions could not be matched")
        );
    }

    #[test]
    fn test_cell_display() {
        assert_eq!(LiveRegisterCell::Unmatched.to_string(), "N/A");
        assert_eq!(LiveRegisterCell::Label.to_string(), "");
        assert_eq!(
            LiveRegisterCell::Count {
                used: 12,
                granularity: 4
            }
            .to_string(),
            "12"
        );
    }
}
