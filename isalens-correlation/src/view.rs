//! Disassembly state across all target GPUs of one build

use crate::build_output::{compare_target_gpus, BuildOutputStore};
use crate::cache::{EntryPointDisassemblyCache, SwitchOutcome};
use crate::core::{CorrelationError, Result};
use crate::data::{CorrelationIndex, EntryKey};
use crate::events::EventSender;
use std::collections::BTreeMap;
use tracing::{debug, error, info};

/// One entry-point cache per target GPU, plus the build outputs they were
/// populated from
#[derive(Debug, Default)]
pub struct DisassemblyView {
    store: BuildOutputStore,
    gpu_caches: BTreeMap<String, EntryPointDisassemblyCache>,
    current_gpu: Option<String>,
    events: Option<EventSender>,
}

impl DisassemblyView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events(mut self, sender: EventSender) -> Self {
        self.events = Some(sender);
        self
    }

    /// Replace all state with a freshly finished build. Nothing from the
    /// previous build survives, even for GPUs the new build also targets.
    pub fn populate_build_output(&mut self, store: BuildOutputStore) -> usize {
        self.clear_build_output();

        let mut total = 0;
        for gpu in store.target_gpus() {
            let mut cache = EntryPointDisassemblyCache::new(gpu);
            cache.set_event_sender(self.events.clone());
            total += cache.populate(&store.all_entries_for_gpu(gpu));

            if cache.is_empty() {
                debug!("No disassembly entries for {}", gpu);
                continue;
            }
            self.gpu_caches.insert(gpu.to_string(), cache);
        }

        let newest = self.target_gpus().first().map(|gpu| gpu.to_string());
        self.current_gpu = newest;
        self.store = store;

        info!(
            "Populated disassembly for {} target GPUs ({} entries)",
            self.gpu_caches.len(),
            total
        );
        total
    }

    /// Discard every GPU cache and the recorded build outputs
    pub fn clear_build_output(&mut self) {
        self.gpu_caches.clear();
        self.store.clear();
        self.current_gpu = None;
    }

    pub fn build_output(&self) -> &BuildOutputStore {
        &self.store
    }

    /// GPUs with disassembly, newest first
    pub fn target_gpus(&self) -> Vec<&str> {
        let mut gpus: Vec<&str> = self.gpu_caches.keys().map(String::as_str).collect();
        gpus.sort_by(|a, b| compare_target_gpus(a, b));
        gpus
    }

    pub fn current_gpu(&self) -> Option<&str> {
        self.current_gpu.as_deref()
    }

    pub fn set_target_gpu(&mut self, gpu: &str) -> Result<()> {
        if !self.gpu_caches.contains_key(gpu) {
            return Err(CorrelationError::UnknownTargetGpu(gpu.to_string()));
        }
        if self.current_gpu.as_deref() != Some(gpu) {
            debug!("Target GPU changed to {}", gpu);
            self.current_gpu = Some(gpu.to_string());
        }
        Ok(())
    }

    pub fn cache(&self, gpu: &str) -> Option<&EntryPointDisassemblyCache> {
        self.gpu_caches.get(gpu)
    }

    pub fn cache_mut(&mut self, gpu: &str) -> Option<&mut EntryPointDisassemblyCache> {
        self.gpu_caches.get_mut(gpu)
    }

    pub fn current_cache(&self) -> Option<&EntryPointDisassemblyCache> {
        self.gpu_caches.get(self.current_gpu.as_deref()?)
    }

    pub fn current_cache_mut(&mut self) -> Option<&mut EntryPointDisassemblyCache> {
        let gpu = self.current_gpu.as_deref()?;
        self.gpu_caches.get_mut(gpu)
    }

    /// Disassembly of the entry currently shown on the current GPU
    pub fn current_index(&self) -> Option<&CorrelationIndex> {
        self.current_cache()?.current_index()
    }

    /// Show an entry point on a GPU, loading it if needed
    pub fn handle_selected_entrypoint_changed(
        &mut self,
        gpu: &str,
        file_path: &str,
        entry_name: &str,
    ) -> Result<SwitchOutcome> {
        self.set_target_gpu(gpu)?;
        let cache = self
            .gpu_caches
            .get_mut(gpu)
            .ok_or_else(|| CorrelationError::UnknownTargetGpu(gpu.to_string()))?;
        cache.switch_to(file_path, entry_name)
    }

    /// The user selected `source_line` in `file_path` while `entry_name`
    /// is the active entry. Returns whether the line produced disassembly.
    pub fn handle_source_line_selected(
        &mut self,
        gpu: &str,
        file_path: &str,
        entry_name: &str,
        source_line: u32,
    ) -> Result<bool> {
        self.handle_selected_entrypoint_changed(gpu, file_path, entry_name)?;
        Ok(self
            .current_cache_mut()
            .is_some_and(|cache| cache.set_correlated_source_line(source_line)))
    }

    /// Correlate selected rows of the current entry back to the source
    pub fn select_disassembly_lines(&mut self, rows: &[usize]) -> Option<u32> {
        self.current_cache_mut()?.select_disassembly_lines(rows)
    }

    /// Whether `source_line` generated any disassembly for a loaded entry
    pub fn is_line_correlated_in_entry(
        &self,
        file_path: &str,
        gpu: &str,
        entry_name: &str,
        source_line: u32,
    ) -> bool {
        self.gpu_caches
            .get(gpu)
            .and_then(|cache| cache.index_for_entry(file_path, entry_name))
            .is_some_and(|index| index.is_source_line_correlated(source_line))
    }

    /// Forget a removed input file on every GPU. GPUs left without any
    /// entries are dropped.
    pub fn remove_input_file_entries(&mut self, file_path: &str) -> bool {
        let mut removed = false;
        for cache in self.gpu_caches.values_mut() {
            if cache.contains_file(file_path) {
                removed |= cache.remove_input_file_entries(file_path);
            }
        }
        self.gpu_caches.retain(|_, cache| !cache.is_empty());
        self.store.remove_input_file(file_path);

        let current_dropped = self
            .current_gpu
            .as_deref()
            .is_some_and(|gpu| !self.gpu_caches.contains_key(gpu));
        if current_dropped {
            let newest = self.target_gpus().first().map(|gpu| gpu.to_string());
            self.current_gpu = newest;
        }

        if !removed {
            debug!("{} had no disassembly on any target GPU", file_path);
        }
        removed
    }

    /// Rename an input file on every GPU and in the build outputs.
    ///
    /// All or nothing: if any GPU would refuse the rename, no cache and
    /// no build output is changed.
    pub fn replace_input_file_path(&mut self, old_path: &str, new_path: &str) -> bool {
        if let Err(e) = EntryKey::new(new_path, "") {
            error!("Cannot rename {} to {}: {}", old_path, new_path, e);
            return false;
        }

        let affected: Vec<&str> = self
            .gpu_caches
            .iter()
            .filter(|(_, cache)| cache.contains_file(old_path))
            .map(|(gpu, _)| gpu.as_str())
            .collect();
        let refusing = affected.iter().find(|gpu| {
            self.gpu_caches
                .get(**gpu)
                .is_some_and(|cache| !cache.can_replace_input_file_path(old_path, new_path))
        });
        if let Some(gpu) = refusing {
            error!("Rename of {} to {} refused on {}", old_path, new_path, gpu);
            return false;
        }
        let affected: Vec<String> = affected.into_iter().map(str::to_string).collect();

        for gpu in &affected {
            if let Some(cache) = self.gpu_caches.get_mut(gpu) {
                cache.replace_input_file_path(old_path, new_path);
            }
        }
        let stored = self.store.replace_input_file_path(old_path, new_path);
        !affected.is_empty() || stored
    }

    pub fn is_empty(&self) -> bool {
        self.gpu_caches.is_empty()
    }
}
