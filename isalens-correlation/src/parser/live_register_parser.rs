//! Live-register (VGPR) analysis report parsing
//!
//! The report is generated independently of the disassembly CSV. Each row
//! looks like `index | live count | flags | instruction text`, followed by
//! a register summary block. Rows are paired with disassembly lines by
//! walking both sequences; label rows and `s_nop` padding are skipped on
//! the disassembly side.

use crate::core::{DisassemblyLine, ParseError, ParseResult};
use crate::data::{LiveRegisterCell, LiveRegisterOverlay, RegisterSummary};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{debug, info, warn};

const NOP_OPCODE: &str = "s_nop";

/// Encoding suffixes the disassembler appends that the report omits
const ENCODING_SUFFIXES: [&str; 4] = ["_e32", "_e64", "_sdwa", "_dpp"];

static ROW_REGEX: OnceLock<Regex> = OnceLock::new();
static LABEL_ROW_REGEX: OnceLock<Regex> = OnceLock::new();
static INSTRUCTION_REGEX: OnceLock<Regex> = OnceLock::new();
static LABELED_INSTRUCTION_REGEX: OnceLock<Regex> = OnceLock::new();
static TOTAL_REGEX: OnceLock<Regex> = OnceLock::new();
static GRANULARITY_REGEX: OnceLock<Regex> = OnceLock::new();
static USED_ALLOCATED_REGEX: OnceLock<Regex> = OnceLock::new();
static NO_VGPRS_REGEX: OnceLock<Regex> = OnceLock::new();

fn cached_regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    // Patterns are compile-time constants.
    cell.get_or_init(|| Regex::new(pattern).expect("live register pattern must compile"))
}

fn row_regex() -> &'static Regex {
    cached_regex(&ROW_REGEX, r"^\s*(\d+)\s*\|\s*\d+\s*\|\s*")
}

fn label_row_regex() -> &'static Regex {
    cached_regex(
        &LABEL_ROW_REGEX,
        r"^\s*(\d+)\s*\|\s*(\d+)\s*\|.*\|\s*(label_.*):",
    )
}

fn instruction_regex() -> &'static Regex {
    cached_regex(
        &INSTRUCTION_REGEX,
        r"^\s*(\d+)\s*\|\s*(\d+)\s*\|\s*([vx:^*\s]+)\s*\|\s*(\w+)\s*",
    )
}

fn labeled_instruction_regex() -> &'static Regex {
    cached_regex(
        &LABELED_INSTRUCTION_REGEX,
        r"^\s*(\d+)\s*\|\s*(\d+)\s*\|\s*([vx:^*\s]+)\s*\|\s*[^:]*:\s*(\w+)",
    )
}

/// One instruction row of the report; `None` when the row was recognised
/// but its fields could not be extracted.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ReportRow {
    live_count: Option<u32>,
    opcode: String,
}

impl ReportRow {
    fn is_nop(&self) -> bool {
        self.opcode == NOP_OPCODE
    }

    fn matches_opcode(&self, disassembly_opcode: &str) -> bool {
        if self.opcode.is_empty() {
            return false;
        }
        if disassembly_opcode == self.opcode {
            return true;
        }
        disassembly_opcode
            .strip_prefix(self.opcode.as_str())
            .is_some_and(|suffix| ENCODING_SUFFIXES.contains(&suffix))
    }
}

/// Read a live-register report and align it with already parsed
/// disassembly lines.
pub fn parse_live_register_report(
    path: impl AsRef<Path>,
    lines: &[DisassemblyLine],
) -> ParseResult<LiveRegisterOverlay> {
    let path = path.as_ref();
    debug!("Loading live register report: {}", path.display());

    let text = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let overlay = parse_live_register_text(&text, lines)?;
    info!(
        "Live register overlay for {}: max {} VGPRs on {} line(s), {} unmatched",
        path.display(),
        overlay.max_vgprs(),
        overlay.max_line_numbers().len(),
        overlay.unmatched_count()
    );
    Ok(overlay)
}

/// Parse report content already held in memory
pub fn parse_live_register_text(
    text: &str,
    lines: &[DisassemblyLine],
) -> ParseResult<LiveRegisterOverlay> {
    let rows: Vec<ReportRow> = text
        .lines()
        .filter(|line| row_regex().is_match(line))
        .map(parse_report_row)
        .collect();

    let summary = parse_register_summary(text).ok_or(ParseError::MissingRegisterSummary)?;
    Ok(align_with_disassembly(&rows, lines, summary))
}

fn parse_report_row(line: &str) -> ReportRow {
    let regex = if label_row_regex().is_match(line) {
        labeled_instruction_regex()
    } else {
        instruction_regex()
    };

    match regex.captures(line) {
        Some(caps) => ReportRow {
            live_count: caps.get(2).and_then(|m| m.as_str().parse().ok()),
            opcode: caps.get(4).map(|m| m.as_str().to_string()).unwrap_or_default(),
        },
        None => ReportRow {
            live_count: None,
            opcode: String::new(),
        },
    }
}

/// Extract the architecture summary. Either the full triple (total,
/// granularity, used/allocated) or the "no VGPRs used" marker must be
/// present.
fn parse_register_summary(text: &str) -> Option<RegisterSummary> {
    let total_regex = cached_regex(&TOTAL_REGEX, r"^\s+VGPRs total:\s+(\d+)");
    let granularity_regex = cached_regex(
        &GRANULARITY_REGEX,
        r"^\s+VGPR allocation granularity:\s+(\d+)",
    );
    let used_allocated_regex = cached_regex(
        &USED_ALLOCATED_REGEX,
        r"^Maximum\s*#\s*VGPR\s*used\s*(\d+),\s*VGPRs\s*allocated\s*by\s*HW:\s*(\d+)",
    );
    let no_vgprs_regex = cached_regex(&NO_VGPRS_REGEX, r"^\s*No VGPRs used\s*");

    let capture_u32 = |caps: &regex::Captures, group: usize| -> u32 {
        caps.get(group)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0)
    };

    let mut total = None;
    let mut granularity = None;
    let mut used_allocated = None;
    let mut no_vgprs_used = false;

    for line in text.lines() {
        if let Some(caps) = total_regex.captures(line) {
            total = Some(capture_u32(&caps, 1));
        }
        if let Some(caps) = granularity_regex.captures(line) {
            granularity = Some(capture_u32(&caps, 1));
        }
        if let Some(caps) = used_allocated_regex.captures(line) {
            used_allocated = Some((capture_u32(&caps, 1), capture_u32(&caps, 2)));
        }
        if no_vgprs_regex.is_match(line) {
            no_vgprs_used = true;
        }
    }

    match (total, granularity, used_allocated) {
        (Some(total), Some(granularity), Some((used, allocated))) => Some(RegisterSummary {
            total,
            granularity,
            used,
            allocated,
        }),
        _ if no_vgprs_used => Some(RegisterSummary {
            total: total.unwrap_or(0),
            granularity: granularity.unwrap_or(0),
            used: 0,
            allocated: 0,
        }),
        _ => None,
    }
}

/// Walk report rows and disassembly lines with independent cursors.
fn align_with_disassembly(
    rows: &[ReportRow],
    lines: &[DisassemblyLine],
    summary: RegisterSummary,
) -> LiveRegisterOverlay {
    let mut cells = vec![LiveRegisterCell::Empty; lines.len()];
    let mut unmatched_count = 0usize;
    let mut max_vgprs = 0u32;
    let mut max_line_numbers: Vec<usize> = Vec::new();
    let mut row_cursor = 0usize;

    for (line_index, line) in lines.iter().enumerate() {
        let instruction = match line {
            DisassemblyLine::Label { .. } => {
                cells[line_index] = LiveRegisterCell::Label;
                continue;
            }
            DisassemblyLine::Instruction(instruction) => instruction,
        };

        if instruction.opcode == NOP_OPCODE {
            // Padding only pairs up when the report has a matching nop,
            // including after the report has run out.
            if let Some(row) = rows.get(row_cursor).filter(|row| row.is_nop()) {
                cells[line_index] = cell_for(row, summary.granularity);
                row_cursor += 1;
            }
            continue;
        }

        let Some(row) = rows.get(row_cursor) else {
            // Report ran out before the disassembly did.
            cells[line_index] = LiveRegisterCell::Unmatched;
            unmatched_count += 1;
            continue;
        };

        // Only rows whose opcode matches feed the maximum; a skewed row's
        // count belongs to some other instruction.
        match row.live_count {
            Some(count) if row.matches_opcode(&instruction.opcode) => {
                cells[line_index] = LiveRegisterCell::Count {
                    used: count,
                    granularity: summary.granularity,
                };
                if count >= max_vgprs {
                    if count > max_vgprs {
                        max_line_numbers.clear();
                    }
                    max_vgprs = count;
                    max_line_numbers.push(line_index);
                }
            }
            _ => {
                cells[line_index] = LiveRegisterCell::Unmatched;
                unmatched_count += 1;
            }
        }
        row_cursor += 1;
    }

    if row_cursor < rows.len() {
        let leftover = rows.len() - row_cursor;
        debug!("{} live register rows had no disassembly counterpart", leftover);
        unmatched_count += leftover;
    }

    if unmatched_count > 0 {
        warn!(
            "{} instructions could not be matched with the live register report",
            unmatched_count
        );
    }

    LiveRegisterOverlay::new(summary, cells, max_vgprs, max_line_numbers, unmatched_count)
}

fn cell_for(row: &ReportRow, granularity: u32) -> LiveRegisterCell {
    match row.live_count {
        Some(used) => LiveRegisterCell::Count { used, granularity },
        None => LiveRegisterCell::Unmatched,
    }
}
