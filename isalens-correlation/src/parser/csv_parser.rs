//! Disassembly CSV parsing
//!
//! One file holds the disassembly of a single entry point for a single
//! target GPU. The first line is a header; every other non-empty line is
//! either a one-field label row or a seven-field instruction row:
//!
//! ```text
//! Address, Source Line Number, Opcode, Operands, Functional Unit, Cycles, Binary Encoding
//! ```

use crate::core::{FunctionalUnit, InstructionLine, ParseError, ParseResult};
use crate::data::CorrelationIndex;
use std::path::Path;
use tracing::{debug, info};

/// Number of fields in an instruction row
pub(crate) const CSV_COLUMN_COUNT: usize = 7;

const COLUMN_ADDRESS: usize = 0;
const COLUMN_SOURCE_LINE: usize = 1;
const COLUMN_OPCODE: usize = 2;
const COLUMN_OPERANDS: usize = 3;
const COLUMN_FUNCTIONAL_UNIT: usize = 4;
const COLUMN_CYCLES: usize = 5;
const COLUMN_BINARY_ENCODING: usize = 6;

/// Source-line value the compiler writes for rows with no correlation
const NO_CORRELATION_SENTINEL: &str = "-1";

/// Parse a disassembly CSV file into a fully built correlation index.
///
/// The index is only returned when every row parsed; a malformed row
/// aborts the whole file.
pub fn parse_disassembly_csv(path: impl AsRef<Path>) -> ParseResult<CorrelationIndex> {
    let path = path.as_ref();
    debug!("Loading disassembly CSV: {}", path.display());

    let text = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let index = parse_disassembly_csv_text(&text)?;
    info!(
        "Parsed {} disassembly lines ({} correlated source lines) from {}",
        index.len(),
        index.correlated_source_line_count(),
        path.display()
    );
    Ok(index)
}

/// Parse disassembly CSV content already held in memory
pub fn parse_disassembly_csv_text(text: &str) -> ParseResult<CorrelationIndex> {
    let mut index = CorrelationIndex::new();

    // Line numbers reported in errors are 1-based file lines; skip the header.
    for (line_number, raw_line) in text.lines().enumerate().skip(1).map(|(i, l)| (i + 1, l)) {
        if raw_line.trim().is_empty() {
            continue;
        }

        let fields = split_csv_fields(raw_line, line_number)?;
        match fields.len() {
            1 => index.push_label(fields.into_iter().next().unwrap_or_default()),
            CSV_COLUMN_COUNT => {
                let source_line =
                    parse_source_line(&fields[COLUMN_SOURCE_LINE], line_number)?;
                index.push_instruction(instruction_from_fields(fields), source_line);
            }
            found => {
                return Err(ParseError::MalformedRow {
                    line: line_number,
                    expected: CSV_COLUMN_COUNT,
                    found,
                })
            }
        }
    }

    Ok(index)
}

fn instruction_from_fields(mut fields: Vec<String>) -> InstructionLine {
    let mut take = |column: usize| std::mem::take(&mut fields[column]);
    InstructionLine {
        address: take(COLUMN_ADDRESS),
        opcode: take(COLUMN_OPCODE),
        operands: take(COLUMN_OPERANDS),
        functional_unit: FunctionalUnit::parse(&take(COLUMN_FUNCTIONAL_UNIT)),
        cycles: take(COLUMN_CYCLES),
        binary_encoding: take(COLUMN_BINARY_ENCODING),
    }
}

/// `None` for rows without a source annotation
fn parse_source_line(field: &str, line_number: usize) -> ParseResult<Option<u32>> {
    let field = field.trim();
    if field.is_empty() || field == NO_CORRELATION_SENTINEL {
        return Ok(None);
    }

    field
        .parse::<u32>()
        .map(Some)
        .map_err(|_| ParseError::InvalidSourceLine {
            line: line_number,
            value: field.to_string(),
        })
}

/// Split one CSV row on commas, rejoining quoted fields that contain
/// embedded commas. Quote characters are removed from the result and every
/// field is trimmed.
pub(crate) fn split_csv_fields(line: &str, line_number: usize) -> ParseResult<Vec<String>> {
    let mut fields = Vec::new();
    let mut tokens = line.split(',');

    while let Some(token) = tokens.next() {
        match quote_count(token) {
            0 => fields.push(token.trim().to_string()),
            1 => {
                // Opening quote: collect tokens until the one holding the closing quote.
                let mut quoted = String::from(token);
                loop {
                    let Some(next) = tokens.next() else {
                        return Err(ParseError::UnbalancedQuotes { line: line_number });
                    };
                    quoted.push(',');
                    quoted.push_str(next);
                    match quote_count(next) {
                        0 => continue,
                        1 => break,
                        _ => return Err(ParseError::UnbalancedQuotes { line: line_number }),
                    }
                }
                fields.push(strip_quotes(&quoted));
            }
            2 => fields.push(strip_quotes(token)),
            _ => return Err(ParseError::UnbalancedQuotes { line: line_number }),
        }
    }

    Ok(fields)
}

fn quote_count(token: &str) -> usize {
    token.matches('"').count()
}

fn strip_quotes(token: &str) -> String {
    token.replace('"', "").trim().to_string()
}
