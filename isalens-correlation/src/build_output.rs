//! What was built, for which GPU, and where the artifacts live

use crate::core::{ArtifactType, EntryOutput};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Input file path → outputs of each entry point built from it
pub type FileOutputs = BTreeMap<String, Vec<EntryOutput>>;

/// Build outputs of one session keyed by target GPU name.
///
/// Serializes as a plain JSON object of `gpu → file → [entry output]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildOutputStore {
    gpus: BTreeMap<String, FileOutputs>,
}

impl BuildOutputStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace everything recorded for one GPU
    pub fn insert_gpu_outputs(&mut self, gpu: impl Into<String>, outputs: FileOutputs) {
        self.gpus.insert(gpu.into(), outputs);
    }

    pub fn add_entry_output(&mut self, gpu: &str, output: EntryOutput) {
        self.gpus
            .entry(gpu.to_string())
            .or_default()
            .entry(output.input_file_path.clone())
            .or_default()
            .push(output);
    }

    pub fn outputs_for_gpu(&self, gpu: &str) -> Option<&FileOutputs> {
        self.gpus.get(gpu)
    }

    pub fn entries_for_file(&self, gpu: &str, file_path: &str) -> Option<&[EntryOutput]> {
        self.gpus
            .get(gpu)?
            .get(file_path)
            .map(Vec::as_slice)
    }

    /// Every entry output recorded for a GPU, across all input files
    pub fn all_entries_for_gpu(&self, gpu: &str) -> Vec<EntryOutput> {
        self.gpus
            .get(gpu)
            .map(|files| files.values().flatten().cloned().collect())
            .unwrap_or_default()
    }

    /// Path of one artifact kind for an entry point
    pub fn resolve_artifact(
        &self,
        gpu: &str,
        file_path: &str,
        entry_name: &str,
        artifact_type: ArtifactType,
    ) -> Option<&Path> {
        self.entries_for_file(gpu, file_path)?
            .iter()
            .find(|output| output.entrypoint_name == entry_name)?
            .artifact_path(artifact_type)
    }

    pub fn is_file_built(&self, gpu: &str, file_path: &str) -> bool {
        self.entries_for_file(gpu, file_path)
            .is_some_and(|entries| !entries.is_empty())
    }

    /// GPU names ordered with [`compare_target_gpus`]
    pub fn target_gpus(&self) -> Vec<&str> {
        let mut gpus: Vec<&str> = self.gpus.keys().map(String::as_str).collect();
        gpus.sort_by(|a, b| compare_target_gpus(a, b));
        gpus
    }

    /// Drop a file from every GPU, then any GPU left with nothing built.
    /// Returns whether anything was removed.
    pub fn remove_input_file(&mut self, file_path: &str) -> bool {
        let mut removed = false;
        for files in self.gpus.values_mut() {
            removed |= files.remove(file_path).is_some();
        }
        self.gpus.retain(|_, files| !files.is_empty());
        removed
    }

    /// Move a file's outputs to a new path on every GPU.
    /// Returns whether any GPU had outputs for `old_path`.
    pub fn replace_input_file_path(&mut self, old_path: &str, new_path: &str) -> bool {
        let mut replaced = false;
        for (gpu, files) in self.gpus.iter_mut() {
            let Some(mut entries) = files.remove(old_path) else {
                continue;
            };
            for entry in &mut entries {
                entry.input_file_path = new_path.to_string();
            }
            debug!("Moved {} outputs on {} to {}", old_path, gpu, new_path);
            files.entry(new_path.to_string()).or_default().extend(entries);
            replaced = true;
        }
        replaced
    }

    pub fn gpu_count(&self) -> usize {
        self.gpus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gpus.is_empty()
    }

    pub fn clear(&mut self) {
        self.gpus.clear();
    }
}

const GFX_NOTATION: &str = "gfx";

/// Ordering for presenting target GPUs: `gfx` names first, newest
/// generation first by the hexadecimal number after the `x`; other names
/// follow in descending order.
pub fn compare_target_gpus(a: &str, b: &str) -> Ordering {
    match (gfx_generation(a), gfx_generation(b)) {
        (Some(gen_a), Some(gen_b)) => gen_b.cmp(&gen_a).then_with(|| b.cmp(a)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => {
            if a.contains(GFX_NOTATION) || b.contains(GFX_NOTATION) {
                // gfx names with an unreadable number still go first
                b.contains(GFX_NOTATION)
                    .cmp(&a.contains(GFX_NOTATION))
                    .then_with(|| b.cmp(a))
            } else {
                b.cmp(a)
            }
        }
    }
}

fn gfx_generation(name: &str) -> Option<u32> {
    let start = name.find(GFX_NOTATION)?;
    let digits: String = name[start + GFX_NOTATION.len()..]
        .chars()
        .take_while(char::is_ascii_hexdigit)
        .collect();
    u32::from_str_radix(&digits, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> BuildOutputStore {
        let mut store = BuildOutputStore::new();
        store.add_entry_output(
            "gfx1030",
            EntryOutput::new("/src/a.cl", "main")
                .with_artifact(ArtifactType::DisassemblyCsv, "/out/1030/main.csv", "gfx1030")
                .with_artifact(ArtifactType::ResourceUsage, "/out/1030/main.res", "gfx1030"),
        );
        store.add_entry_output(
            "gfx900",
            EntryOutput::new("/src/a.cl", "main").with_artifact(
                ArtifactType::DisassemblyCsv,
                "/out/900/main.csv",
                "gfx900",
            ),
        );
        store.add_entry_output(
            "gfx900",
            EntryOutput::new("/src/b.cl", "other").with_artifact(
                ArtifactType::DisassemblyCsv,
                "/out/900/other.csv",
                "gfx900",
            ),
        );
        store
    }

    #[test]
    fn test_resolve_artifact() {
        let store = store();
        assert_eq!(
            store.resolve_artifact("gfx1030", "/src/a.cl", "main", ArtifactType::ResourceUsage),
            Some(Path::new("/out/1030/main.res"))
        );
        assert_eq!(
            store.resolve_artifact("gfx900", "/src/a.cl", "main", ArtifactType::ResourceUsage),
            None
        );
        assert_eq!(
            store.resolve_artifact("gfx1030", "/src/a.cl", "nope", ArtifactType::DisassemblyCsv),
            None
        );
    }

    #[test]
    fn test_is_file_built() {
        let store = store();
        assert!(store.is_file_built("gfx900", "/src/b.cl"));
        assert!(!store.is_file_built("gfx1030", "/src/b.cl"));
        assert!(!store.is_file_built("gfx1100", "/src/a.cl"));
    }

    #[test]
    fn test_remove_drops_empty_gpus() {
        let mut store = store();
        assert!(store.remove_input_file("/src/a.cl"));
        assert_eq!(store.target_gpus(), vec!["gfx900"]);
        assert!(!store.remove_input_file("/src/a.cl"));
    }

    #[test]
    fn test_replace_path_updates_entries() {
        let mut store = store();
        assert!(store.replace_input_file_path("/src/a.cl", "/src/renamed.cl"));
        let entries = store.entries_for_file("gfx900", "/src/renamed.cl").unwrap();
        assert_eq!(entries[0].input_file_path, "/src/renamed.cl");
        assert!(!store.is_file_built("gfx1030", "/src/a.cl"));
        assert!(!store.replace_input_file_path("/src/missing.cl", "/x.cl"));
    }

    #[test]
    fn test_gpu_ordering() {
        let mut names = vec!["Tonga", "gfx900", "Fiji", "gfx1030", "gfx90a", "gfx1100"];
        names.sort_by(|a, b| compare_target_gpus(a, b));
        assert_eq!(
            names,
            vec!["gfx1100", "gfx1030", "gfx90a", "gfx900", "Tonga", "Fiji"]
        );
    }

    #[test]
    fn test_all_entries_for_gpu() {
        let store = store();
        let names: Vec<_> = store
            .all_entries_for_gpu("gfx900")
            .into_iter()
            .map(|e| e.entrypoint_name)
            .collect();
        assert_eq!(names, vec!["main", "other"]);
        assert!(store.all_entries_for_gpu("gfx1100").is_empty());
    }
}
