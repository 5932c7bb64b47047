//! Per-GPU cache of entry-point disassembly
//!
//! Entries are registered when build output is known and parsed the first
//! time they are shown. Parsed indices live in an arena addressed by
//! [`EntryHandle`]; every lookup map stores handles, never the index
//! itself.

use crate::core::{ArtifactType, CorrelationError, EntryOutput, Result};
use crate::data::{CorrelationIndex, EntryKey};
use crate::events::{emit, CorrelationEvent, EventSender};
use crate::parser::{parse_disassembly_csv, parse_live_register_report};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Stable reference to one cached entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryHandle(usize);

/// State of the live-register overlay after a switch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveRegisterStatus {
    /// No report was registered for the entry
    NotRequested,
    Loaded,
    /// Report registered but unusable; the pressure column shows `N/A`
    Unavailable(String),
}

/// Result of a successful [`EntryPointDisassemblyCache::switch_to`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchOutcome {
    AlreadyCurrent,
    Switched { live_registers: LiveRegisterStatus },
}

#[derive(Debug)]
enum SlotState {
    Unloaded,
    Loaded {
        index: CorrelationIndex,
        live_registers: LiveRegisterStatus,
    },
    /// Last load failed; the next switch retries
    Failed(String),
}

#[derive(Debug)]
struct EntrySlot {
    csv_path: PathBuf,
    live_register_path: Option<PathBuf>,
    state: SlotState,
}

/// Disassembly cache for every entry point built for one target GPU
#[derive(Debug, Default)]
pub struct EntryPointDisassemblyCache {
    gpu_name: String,

    /// Arena; removed entries leave a `None` so handles stay stable
    slots: Vec<Option<EntrySlot>>,

    entries: HashMap<EntryKey, EntryHandle>,
    handle_to_key: HashMap<EntryHandle, EntryKey>,

    /// Input file → every entry sourced from it
    file_entries: HashMap<String, Vec<EntryHandle>>,

    current: Option<EntryHandle>,
    events: Option<EventSender>,
}

impl EntryPointDisassemblyCache {
    pub fn new(gpu_name: impl Into<String>) -> Self {
        Self {
            gpu_name: gpu_name.into(),
            ..Default::default()
        }
    }

    pub fn with_events(mut self, sender: EventSender) -> Self {
        self.events = Some(sender);
        self
    }

    pub fn set_event_sender(&mut self, sender: Option<EventSender>) {
        self.events = sender;
    }

    pub fn gpu_name(&self) -> &str {
        &self.gpu_name
    }

    /// Register build outputs without parsing them. Entries without a
    /// disassembly CSV are skipped. Returns the number registered.
    pub fn populate(&mut self, outputs: &[EntryOutput]) -> usize {
        let mut registered = 0;

        for output in outputs {
            let Some(csv_path) = output.artifact_path(ArtifactType::DisassemblyCsv) else {
                debug!(
                    "No disassembly CSV for '{}' in {} on {}",
                    output.entrypoint_name, output.input_file_path, self.gpu_name
                );
                continue;
            };
            let live_register_path = output.artifact_path(ArtifactType::LiveRegisterReport);

            match self.add_entry(
                &output.input_file_path,
                &output.entrypoint_name,
                csv_path,
                live_register_path,
            ) {
                Ok(_) => registered += 1,
                Err(e) => warn!("Skipping build output on {}: {}", self.gpu_name, e),
            }
        }

        info!(
            "Registered {} disassembly entries for {}",
            registered, self.gpu_name
        );
        registered
    }

    /// Register one entry. Registering an existing key replaces its
    /// artifact paths and drops any parsed state.
    pub fn add_entry(
        &mut self,
        file_path: &str,
        entry_name: &str,
        csv_path: &Path,
        live_register_path: Option<&Path>,
    ) -> Result<EntryHandle> {
        let key = EntryKey::new(file_path, entry_name)?;
        let slot = EntrySlot {
            csv_path: csv_path.to_path_buf(),
            live_register_path: live_register_path.map(Path::to_path_buf),
            state: SlotState::Unloaded,
        };

        if let Some(&handle) = self.entries.get(&key) {
            debug!("Refreshing existing entry {}", key);
            self.slots[handle.0] = Some(slot);
            if self.current == Some(handle) {
                self.current = None;
            }
            return Ok(handle);
        }

        let handle = EntryHandle(self.slots.len());
        self.slots.push(Some(slot));
        self.entries.insert(key.clone(), handle);
        self.handle_to_key.insert(handle, key);
        self.file_entries
            .entry(file_path.to_string())
            .or_default()
            .push(handle);
        Ok(handle)
    }

    pub fn handle(&self, file_path: &str, entry_name: &str) -> Option<EntryHandle> {
        let key = EntryKey::new(file_path, entry_name).ok()?;
        self.entries.get(&key).copied()
    }

    pub fn key_for_handle(&self, handle: EntryHandle) -> Option<&EntryKey> {
        self.handle_to_key.get(&handle)
    }

    pub fn handles_for_file(&self, file_path: &str) -> &[EntryHandle] {
        self.file_entries
            .get(file_path)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Entry names registered under an input file, in registration order
    pub fn entry_names_for_file(&self, file_path: &str) -> Vec<&str> {
        self.handles_for_file(file_path)
            .iter()
            .filter_map(|handle| self.handle_to_key.get(handle))
            .map(EntryKey::entry_name)
            .collect()
    }

    pub fn contains_file(&self, file_path: &str) -> bool {
        self.file_entries.contains_key(file_path)
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Make an entry current, parsing its disassembly on first use.
    ///
    /// A parse failure is reported as [`CorrelationError::DisassemblyUnavailable`]
    /// and leaves no entry current. A live-register failure is not an
    /// error; it shows up in the returned status.
    pub fn switch_to(&mut self, file_path: &str, entry_name: &str) -> Result<SwitchOutcome> {
        let key = EntryKey::new(file_path, entry_name)?;
        let not_found = || CorrelationError::EntryNotFound {
            file: file_path.to_string(),
            entry: entry_name.to_string(),
        };
        let handle = *self.entries.get(&key).ok_or_else(not_found)?;

        if self.current == Some(handle) {
            return Ok(SwitchOutcome::AlreadyCurrent);
        }

        let events = self.events.clone();
        let slot = self
            .slots
            .get_mut(handle.0)
            .and_then(Option::as_mut)
            .ok_or_else(not_found)?;

        if !matches!(slot.state, SlotState::Loaded { .. }) {
            match parse_disassembly_csv(&slot.csv_path) {
                Ok(mut index) => {
                    let live_registers = load_live_registers(
                        &mut index,
                        slot.live_register_path.as_deref(),
                        file_path,
                        entry_name,
                        events.as_ref(),
                    );
                    slot.state = SlotState::Loaded {
                        index,
                        live_registers,
                    };
                }
                Err(e) => {
                    warn!(
                        "Failed to load disassembly for '{}' in {}: {}",
                        entry_name, file_path, e
                    );
                    slot.state = SlotState::Failed(e.to_string());
                    self.current = None;
                    emit(
                        events.as_ref(),
                        CorrelationEvent::DisassemblyLoadFailed {
                            file: file_path.to_string(),
                            entry: entry_name.to_string(),
                            reason: e.to_string(),
                        },
                    );
                    return Err(CorrelationError::DisassemblyUnavailable {
                        file: file_path.to_string(),
                        entry: entry_name.to_string(),
                        source: e,
                    });
                }
            }
        }

        let live_registers = match &slot.state {
            SlotState::Loaded { live_registers, .. } => live_registers.clone(),
            _ => LiveRegisterStatus::NotRequested,
        };

        debug!("Switched to {} on {}", key, self.gpu_name);
        self.current = Some(handle);
        Ok(SwitchOutcome::Switched { live_registers })
    }

    /// Last load error recorded for an entry
    pub fn load_failure(&self, handle: EntryHandle) -> Option<&str> {
        match &self.slot(handle)?.state {
            SlotState::Failed(reason) => Some(reason),
            _ => None,
        }
    }

    pub fn is_loaded(&self, handle: EntryHandle) -> bool {
        self.index(handle).is_some()
    }

    pub fn index(&self, handle: EntryHandle) -> Option<&CorrelationIndex> {
        match &self.slot(handle)?.state {
            SlotState::Loaded { index, .. } => Some(index),
            _ => None,
        }
    }

    pub fn index_mut(&mut self, handle: EntryHandle) -> Option<&mut CorrelationIndex> {
        match &mut self.slots.get_mut(handle.0)?.as_mut()?.state {
            SlotState::Loaded { index, .. } => Some(index),
            _ => None,
        }
    }

    /// Index of a loaded entry looked up by file and name
    pub fn index_for_entry(&self, file_path: &str, entry_name: &str) -> Option<&CorrelationIndex> {
        self.index(self.handle(file_path, entry_name)?)
    }

    pub fn index_for_entry_mut(
        &mut self,
        file_path: &str,
        entry_name: &str,
    ) -> Option<&mut CorrelationIndex> {
        let handle = self.handle(file_path, entry_name)?;
        self.index_mut(handle)
    }

    pub fn current_handle(&self) -> Option<EntryHandle> {
        self.current
    }

    pub fn current_key(&self) -> Option<&EntryKey> {
        self.key_for_handle(self.current?)
    }

    pub fn current_index(&self) -> Option<&CorrelationIndex> {
        self.index(self.current?)
    }

    pub fn current_index_mut(&mut self) -> Option<&mut CorrelationIndex> {
        let handle = self.current?;
        self.index_mut(handle)
    }

    /// Highlight a source line in the current entry. Returns whether the
    /// line produced any disassembly.
    pub fn set_correlated_source_line(&mut self, source_line: u32) -> bool {
        self.current_index_mut()
            .is_some_and(|index| index.set_correlated_source_line(source_line))
    }

    /// Correlate selected disassembly rows of the current entry back to a
    /// source line and announce the result.
    pub fn select_disassembly_lines(&mut self, rows: &[usize]) -> Option<u32> {
        let selected = self
            .current_index_mut()
            .and_then(|index| index.select_disassembly_lines(rows));
        emit(
            self.events.as_ref(),
            CorrelationEvent::CorrelatedSourceLineChanged(selected),
        );
        selected
    }

    /// Drop every entry sourced from `file_path`.
    ///
    /// Returns false, without touching anything, when the file is unknown.
    pub fn remove_input_file_entries(&mut self, file_path: &str) -> bool {
        let Some(handles) = self.file_entries.remove(file_path) else {
            error!(
                "Cannot remove entries of {} on {}: file not in cache",
                file_path, self.gpu_name
            );
            return false;
        };

        for handle in &handles {
            if let Some(key) = self.handle_to_key.remove(handle) {
                self.entries.remove(&key);
            }
            if let Some(slot) = self.slots.get_mut(handle.0) {
                *slot = None;
            }
            if self.current == Some(*handle) {
                self.current = None;
            }
        }

        debug!(
            "Removed {} entries of {} from {}",
            handles.len(),
            file_path,
            self.gpu_name
        );
        true
    }

    /// Move every entry of `old_path` under `new_path`, keeping entry names
    /// and parsed state.
    ///
    /// Returns false, without touching anything, when `old_path` is unknown,
    /// `new_path` cannot form a key, or an entry of the same name already
    /// exists under `new_path`.
    pub fn replace_input_file_path(&mut self, old_path: &str, new_path: &str) -> bool {
        let Some(rekeyed) = self.plan_rename(old_path, new_path) else {
            return false;
        };

        let handles = self.file_entries.remove(old_path).unwrap_or_default();
        for (_, old_key, _) in &rekeyed {
            self.entries.remove(old_key);
        }
        for (handle, _, new_key) in rekeyed {
            self.entries.insert(new_key.clone(), handle);
            self.handle_to_key.insert(handle, new_key);
        }
        self.file_entries
            .entry(new_path.to_string())
            .or_default()
            .extend(handles);

        debug!("Renamed {} to {} on {}", old_path, new_path, self.gpu_name);
        true
    }

    /// Whether [`replace_input_file_path`](Self::replace_input_file_path)
    /// would succeed, without changing anything
    pub fn can_replace_input_file_path(&self, old_path: &str, new_path: &str) -> bool {
        self.plan_rename(old_path, new_path).is_some()
    }

    /// Every (handle, old key, new key) of a rename, or `None` if the
    /// rename must be refused
    fn plan_rename(
        &self,
        old_path: &str,
        new_path: &str,
    ) -> Option<Vec<(EntryHandle, EntryKey, EntryKey)>> {
        let Some(handles) = self.file_entries.get(old_path) else {
            error!(
                "Cannot rename {} on {}: file not in cache",
                old_path, self.gpu_name
            );
            return None;
        };

        let mut rekeyed = Vec::with_capacity(handles.len());
        for handle in handles {
            let Some(old_key) = self.handle_to_key.get(handle) else {
                continue;
            };
            let new_key = match old_key.with_file_path(new_path) {
                Ok(new_key) => new_key,
                Err(e) => {
                    error!("Cannot rename {} to {}: {}", old_path, new_path, e);
                    return None;
                }
            };
            // A same-named entry already under new_path would be overwritten
            // and its handle orphaned
            let collides = self
                .entries
                .get(&new_key)
                .is_some_and(|existing| !handles.contains(existing));
            if collides {
                error!(
                    "Cannot rename {} to {} on {}: {} already exists",
                    old_path, new_path, self.gpu_name, new_key
                );
                return None;
            }
            rekeyed.push((*handle, old_key.clone(), new_key));
        }
        Some(rekeyed)
    }

    /// Discard every entry
    pub fn clear(&mut self) {
        self.slots.clear();
        self.entries.clear();
        self.handle_to_key.clear();
        self.file_entries.clear();
        self.current = None;
    }

    fn slot(&self, handle: EntryHandle) -> Option<&EntrySlot> {
        self.slots.get(handle.0)?.as_ref()
    }
}

fn load_live_registers(
    index: &mut CorrelationIndex,
    report_path: Option<&Path>,
    file_path: &str,
    entry_name: &str,
    events: Option<&EventSender>,
) -> LiveRegisterStatus {
    let Some(report_path) = report_path else {
        return LiveRegisterStatus::NotRequested;
    };

    match parse_live_register_report(report_path, index.lines()) {
        Ok(overlay) => {
            index.set_live_registers(overlay);
            LiveRegisterStatus::Loaded
        }
        Err(e) => {
            warn!(
                "Live register data unavailable for '{}' in {}: {}",
                entry_name, file_path, e
            );
            emit(
                events,
                CorrelationEvent::LiveRegistersUnavailable {
                    file: file_path.to_string(),
                    entry: entry_name.to_string(),
                    reason: e.to_string(),
                },
            );
            LiveRegisterStatus::Unavailable(e.to_string())
        }
    }
}
