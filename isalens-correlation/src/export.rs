//! Plain-text rendering of selected disassembly rows (clipboard copy)

use crate::core::{DisassemblyColumn, DisassemblyLine, InstructionLine, VisibleColumns};
use crate::data::CorrelationIndex;

/// Spaces between a column's widest value and the next column
const MIN_COLUMN_OFFSET: usize = 4;

/// Render `rows` as aligned text, one line per row.
///
/// Instruction rows print the visible columns left-aligned; label rows
/// print the label. Rows outside the index are ignored.
pub fn copy_rows_as_text(
    index: &CorrelationIndex,
    rows: &[usize],
    visible: &VisibleColumns,
) -> String {
    let columns: Vec<DisassemblyColumn> = visible.iter().collect();
    let selected: Vec<(usize, &DisassemblyLine)> = rows
        .iter()
        .filter_map(|row| index.line(*row).map(|line| (*row, line)))
        .collect();

    let widths: Vec<usize> = columns
        .iter()
        .map(|column| {
            selected
                .iter()
                .filter_map(|(row, line)| {
                    line.as_instruction()
                        .map(|instr| cell_text(index, *row, instr, *column).chars().count())
                })
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut text = String::new();
    for (row, line) in selected {
        match line {
            DisassemblyLine::Instruction(instruction) => {
                let mut previous_len = 0;
                for (position, column) in columns.iter().enumerate() {
                    if position > 0 {
                        let padding = MIN_COLUMN_OFFSET + widths[position - 1] - previous_len;
                        text.extend(std::iter::repeat(' ').take(padding));
                    }
                    let cell = cell_text(index, row, instruction, *column);
                    previous_len = cell.chars().count();
                    text.push_str(&cell);
                }
            }
            DisassemblyLine::Label { name } => text.push_str(name),
        }
        text.push('\n');
    }

    text
}

fn cell_text(
    index: &CorrelationIndex,
    row: usize,
    instruction: &InstructionLine,
    column: DisassemblyColumn,
) -> String {
    match column {
        DisassemblyColumn::Address => instruction.address.clone(),
        DisassemblyColumn::Opcode => instruction.opcode.clone(),
        // Branch targets render as their operand text
        DisassemblyColumn::Operands => instruction.operands.clone(),
        DisassemblyColumn::FunctionalUnit => instruction.functional_unit.to_string(),
        DisassemblyColumn::Cycles => instruction.cycles.clone(),
        DisassemblyColumn::BinaryEncoding => instruction.binary_encoding.clone(),
        DisassemblyColumn::LiveVgprs => index.live_register_text(row),
    }
}
