//! In-memory correlation structures built from parsed compiler output

pub(crate) mod correlation_index;
pub(crate) mod entry_key;
pub(crate) mod entry_ranges;
pub(crate) mod live_register;

pub use correlation_index::CorrelationIndex;
pub use entry_key::{EntryKey, ENTRY_KEY_SEPARATOR};
pub use entry_ranges::EntrypointLineRanges;
pub use live_register::{LiveRegisterCell, LiveRegisterOverlay, RegisterSummary};
