//! Isalens source-to-ISA correlation library
//!
//! Maps lines of a high-level shader or kernel source file to the ISA
//! disassembly rows the compiler generated from them, across target GPUs
//! and compiled entry points. Disassembly is loaded lazily per entry point
//! and kept consistent as input files are renamed or removed.

// Core modules
pub mod core;

// Internal implementation modules
pub(crate) mod data;
pub(crate) mod parser;

pub mod build_output;
pub mod cache;
pub mod events;
pub mod export;
pub mod start_line;
pub mod view;

// Re-export main public API only
pub use build_output::{compare_target_gpus, BuildOutputStore, FileOutputs};
pub use cache::{EntryHandle, EntryPointDisassemblyCache, LiveRegisterStatus, SwitchOutcome};
pub use events::{event_channel, CorrelationEvent, EventReceiver, EventSender};
pub use export::copy_rows_as_text;
pub use start_line::{entry_start_line, find_real_start_line, SourceLines, SourceTextAccessor};
pub use view::DisassemblyView;

// Re-export essential core types
pub use crate::core::{
    ArtifactType, CorrelationError, DisassemblyColumn, DisassemblyLine, EntryOutput,
    FunctionalUnit, InstructionLine, OutputArtifact, ParseError, Result, VisibleColumns,
};

// Re-export data types needed by external users
pub use data::{
    CorrelationIndex, EntryKey, EntrypointLineRanges, LiveRegisterCell, LiveRegisterOverlay,
    RegisterSummary, ENTRY_KEY_SEPARATOR,
};

// Parsers are exposed as plain functions over paths or in-memory text
pub use parser::{
    parse_disassembly_csv, parse_disassembly_csv_text, parse_live_register_report,
    parse_live_register_text,
};
