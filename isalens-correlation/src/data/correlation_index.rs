//! Bidirectional source line ↔ disassembly line lookup for one entry point

use crate::core::{DisassemblyLine, InstructionLine};
use crate::data::LiveRegisterOverlay;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

/// Parsed disassembly of one entry point plus its correlation tables.
///
/// Only the parser builds these, and only hands one out after the whole
/// file parsed, so queries never see a partially populated index.
#[derive(Debug, Clone, Default)]
pub struct CorrelationIndex {
    /// Rows in file order; the position is the line index
    lines: Vec<DisassemblyLine>,

    /// Disassembly line index → source line (instruction rows with a
    /// source annotation only)
    line_to_source: HashMap<usize, u32>,

    /// Source line → disassembly line indices, in disassembly order
    source_to_lines: BTreeMap<u32, Vec<usize>>,

    /// Smallest and largest source line seen
    source_bounds: Option<(u32, u32)>,

    /// Label name (without trailing colon) → line index
    label_to_line: HashMap<String, usize>,

    /// Currently highlighted disassembly lines
    correlated_lines: HashSet<usize>,

    live_registers: Option<LiveRegisterOverlay>,
}

impl CorrelationIndex {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_instruction(&mut self, instruction: InstructionLine, source_line: Option<u32>) {
        let line_index = self.lines.len();

        if let Some(source_line) = source_line {
            self.line_to_source.insert(line_index, source_line);
            self.source_to_lines
                .entry(source_line)
                .or_default()
                .push(line_index);

            self.source_bounds = Some(match self.source_bounds {
                Some((min, max)) => (min.min(source_line), max.max(source_line)),
                None => (source_line, source_line),
            });
        }

        self.lines.push(DisassemblyLine::Instruction(instruction));
    }

    pub(crate) fn push_label(&mut self, name: String) {
        let line_index = self.lines.len();
        self.label_to_line
            .entry(label_key(&name).to_string())
            .or_insert(line_index);
        self.lines.push(DisassemblyLine::Label { name });
    }

    pub fn lines(&self) -> &[DisassemblyLine] {
        &self.lines
    }

    pub fn line(&self, line_index: usize) -> Option<&DisassemblyLine> {
        self.lines.get(line_index)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of distinct source lines that produced instructions
    pub fn correlated_source_line_count(&self) -> usize {
        self.source_to_lines.len()
    }

    /// Disassembly lines generated from `source_line`, in disassembly order
    pub fn disassembly_lines_for_source_line(&self, source_line: u32) -> Option<&[usize]> {
        self.source_to_lines
            .get(&source_line)
            .map(|indices| indices.as_slice())
    }

    /// Whether any instruction was generated from `source_line`
    pub fn is_source_line_correlated(&self, source_line: u32) -> bool {
        self.source_to_lines.contains_key(&source_line)
    }

    pub fn source_line_for_disassembly_line(&self, line_index: usize) -> Option<u32> {
        self.line_to_source.get(&line_index).copied()
    }

    /// Highlight every disassembly line of `source_line`. A miss clears
    /// the highlight. Returns whether the source line was found.
    pub fn set_correlated_source_line(&mut self, source_line: u32) -> bool {
        self.correlated_lines.clear();

        match self.source_to_lines.get(&source_line) {
            Some(indices) => {
                self.correlated_lines.extend(indices.iter().copied());
                debug!(
                    "Source line {} correlates with {} disassembly lines",
                    source_line,
                    indices.len()
                );
                true
            }
            None => false,
        }
    }

    pub fn clear_correlation(&mut self) {
        self.correlated_lines.clear();
    }

    /// Highlighted line indices in ascending order
    pub fn correlated_lines(&self) -> Vec<usize> {
        let mut lines: Vec<usize> = self.correlated_lines.iter().copied().collect();
        lines.sort_unstable();
        lines
    }

    /// Checked once per visible row on every repaint
    pub fn is_disassembly_line_correlated(&self, line_index: usize) -> bool {
        self.correlated_lines.contains(&line_index)
    }

    pub fn source_line_bounds(&self) -> Option<(u32, u32)> {
        self.source_bounds
    }

    pub fn is_source_line_in_entrypoint(&self, source_line: u32) -> bool {
        self.source_bounds
            .is_some_and(|(min, max)| (min..=max).contains(&source_line))
    }

    /// Row of the label `name`, so branch operands can be followed.
    /// A trailing colon on either side is ignored.
    pub fn label_line_index(&self, name: &str) -> Option<usize> {
        self.label_to_line.get(label_key(name)).copied()
    }

    /// Correlate a user selection of disassembly rows back to the source.
    ///
    /// When every correlated row in the selection comes from one source
    /// line, that line's full row set is highlighted and returned.
    /// Otherwise the highlight is cleared and `None` is returned.
    pub fn select_disassembly_lines(&mut self, rows: &[usize]) -> Option<u32> {
        let mut selected_source = None;

        for row in rows {
            let Some(source_line) = self.source_line_for_disassembly_line(*row) else {
                continue;
            };
            match selected_source {
                None => selected_source = Some(source_line),
                Some(existing) if existing == source_line => {}
                Some(_) => {
                    selected_source = None;
                    break;
                }
            }
        }

        match selected_source {
            Some(source_line) => {
                self.set_correlated_source_line(source_line);
                Some(source_line)
            }
            None => {
                self.clear_correlation();
                None
            }
        }
    }

    pub fn live_registers(&self) -> Option<&LiveRegisterOverlay> {
        self.live_registers.as_ref()
    }

    pub fn live_registers_mut(&mut self) -> Option<&mut LiveRegisterOverlay> {
        self.live_registers.as_mut()
    }

    pub fn set_live_registers(&mut self, overlay: LiveRegisterOverlay) {
        self.live_registers = Some(overlay);
    }

    pub fn clear_live_registers(&mut self) {
        self.live_registers = None;
    }

    /// Text of the live-register column for a row; empty without an overlay
    pub fn live_register_text(&self, line_index: usize) -> String {
        self.live_registers
            .as_ref()
            .and_then(|overlay| overlay.cell(line_index))
            .map(|cell| cell.to_string())
            .unwrap_or_default()
    }
}

fn label_key(name: &str) -> &str {
    name.trim().trim_end_matches(':')
}
