//! Readers for the compiler's disassembly CSV and live-register report

pub(crate) mod csv_parser;
pub(crate) mod live_register_parser;

pub use csv_parser::{parse_disassembly_csv, parse_disassembly_csv_text};
pub use live_register_parser::{parse_live_register_report, parse_live_register_text};
