use isalens_correlation::{
    copy_rows_as_text, parse_disassembly_csv, ArtifactType, BuildOutputStore, CorrelationEvent,
    DisassemblyColumn, DisassemblyView, EntryKey, EntryOutput, EntryPointDisassemblyCache,
    LiveRegisterStatus, SwitchOutcome, VisibleColumns,
};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const HEADER: &str =
    "Address, Source Line Number, Opcode, Operands, Functional Unit, Cycles, Binary Encoding";

fn write_fixture(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).expect("write fixture");
    path
}

fn example_csv(dir: &Path) -> PathBuf {
    let body = [
        HEADER,
        "10,5,s_mov,v0,SALU,4,0xAB01",
        "label_0042",
        "12,6,v_add,v0 v1,VALU,2,0xCD02",
    ]
    .join("\n");
    write_fixture(dir, "example.csv", &body)
}

#[test]
fn test_end_to_end_example() {
    let dir = TempDir::new().unwrap();
    let mut index = parse_disassembly_csv(example_csv(dir.path())).unwrap();

    assert_eq!(index.len(), 3);
    assert!(index.line(1).unwrap().is_label());
    assert_eq!(index.disassembly_lines_for_source_line(5), Some(&[0][..]));
    assert_eq!(index.disassembly_lines_for_source_line(6), Some(&[2][..]));
    assert_eq!(index.source_line_for_disassembly_line(0), Some(5));
    assert_eq!(index.source_line_for_disassembly_line(1), None);
    assert_eq!(index.source_line_for_disassembly_line(2), Some(6));
    assert_eq!(index.source_line_bounds(), Some((5, 6)));

    assert!(index.set_correlated_source_line(5));
    assert_eq!(index.correlated_lines(), vec![0]);

    assert!(!index.set_correlated_source_line(99));
    assert!(index.correlated_lines().is_empty());
}

#[test]
fn test_vgpr_max_line_tie() {
    let dir = TempDir::new().unwrap();
    let csv = [
        HEADER,
        "0x00,1,s_mov_b32,s0,Scalar ALU,4,0x1",
        "0x04,2,v_add_f32,v0,Vector ALU,4,0x2",
        "0x08,3,v_mul_f32,v1,Vector ALU,4,0x3",
    ]
    .join("\n");
    let report = "\
   0 |   4 | v      | s_mov_b32 s0, 0
   1 |   7 | vv     | v_add_f32 v0, v1, v2
   2 |   7 | vv     | v_mul_f32 v1, v0, v0
Maximum # VGPR used  7, VGPRs allocated by HW:  8
  VGPRs total:     256
  VGPR allocation granularity:    4
";
    let csv_path = write_fixture(dir.path(), "k.csv", &csv);
    let report_path = write_fixture(dir.path(), "k.livereg", report);

    let mut cache = EntryPointDisassemblyCache::new("gfx1030");
    cache.populate(&[EntryOutput::new("/src/k.cl", "k")
        .with_artifact(ArtifactType::DisassemblyCsv, &csv_path, "gfx1030")
        .with_artifact(ArtifactType::LiveRegisterReport, &report_path, "gfx1030")]);

    let outcome = cache.switch_to("/src/k.cl", "k").unwrap();
    assert_eq!(
        outcome,
        SwitchOutcome::Switched {
            live_registers: LiveRegisterStatus::Loaded
        }
    );

    let overlay = cache
        .current_index_mut()
        .and_then(|index| index.live_registers_mut())
        .unwrap();
    assert_eq!(overlay.max_line_numbers(), &[1, 2]);
    assert_eq!(overlay.next_max_line(), Some(1));
    assert_eq!(overlay.next_max_line(), Some(2));
    assert_eq!(overlay.next_max_line(), Some(1));
    assert_eq!(
        overlay.header_text(),
        "VGPR pressure (used:7, allocated:8/256)"
    );
}

#[test]
fn test_rekey_preserves_entry_count() {
    let dir = TempDir::new().unwrap();
    let csv = example_csv(dir.path());
    let mut cache = EntryPointDisassemblyCache::new("gfx900");
    let entries = ["main", "blur", "sharpen"];
    let outputs: Vec<EntryOutput> = entries
        .iter()
        .map(|name| {
            EntryOutput::new("/src/filters.spv", *name).with_artifact(
                ArtifactType::DisassemblyCsv,
                &csv,
                "gfx900",
            )
        })
        .collect();
    cache.populate(&outputs);
    cache.switch_to("/src/filters.spv", "blur").unwrap();

    assert!(cache.replace_input_file_path("/src/filters.spv", "/src/filters.spvasm"));

    assert_eq!(cache.handles_for_file("/src/filters.spvasm").len(), entries.len());
    assert!(cache.handles_for_file("/src/filters.spv").is_empty());
    for name in entries {
        assert!(cache.handle("/src/filters.spv", name).is_none());
        let handle = cache.handle("/src/filters.spvasm", name).unwrap();
        let key = cache.key_for_handle(handle).unwrap();
        assert_eq!(key, &EntryKey::new("/src/filters.spvasm", name).unwrap());
    }

    let current = cache.current_key().unwrap();
    assert_eq!(current.entry_name(), "blur");
    assert_eq!(current.file_path(), "/src/filters.spvasm");
}

#[test]
fn test_removal_is_total() {
    let dir = TempDir::new().unwrap();
    let csv = example_csv(dir.path());
    let mut cache = EntryPointDisassemblyCache::new("gfx900");
    cache.populate(&[
        EntryOutput::new("/src/a.cl", "one").with_artifact(ArtifactType::DisassemblyCsv, &csv, "gfx900"),
        EntryOutput::new("/src/a.cl", "two").with_artifact(ArtifactType::DisassemblyCsv, &csv, "gfx900"),
    ]);
    let handles: Vec<_> = cache.handles_for_file("/src/a.cl").to_vec();
    cache.switch_to("/src/a.cl", "two").unwrap();

    assert!(cache.remove_input_file_entries("/src/a.cl"));

    assert!(cache.handle("/src/a.cl", "one").is_none());
    assert!(cache.handle("/src/a.cl", "two").is_none());
    assert!(cache.handles_for_file("/src/a.cl").is_empty());
    for handle in handles {
        assert!(cache.key_for_handle(handle).is_none());
        assert!(cache.index(handle).is_none());
    }
    assert!(cache.current_index().is_none());
    assert!(cache.is_empty());
}

#[test]
fn test_session_manifest_drives_view() {
    let dir = TempDir::new().unwrap();
    let csv = example_csv(dir.path());
    let manifest = serde_json::json!({
        "gfx1030": {
            "/src/a.cl": [{
                "input_file_path": "/src/a.cl",
                "entrypoint_name": "main",
                "artifacts": [
                    { "file_path": csv, "artifact_type": "disassembly_csv", "gpu_name": "gfx1030" },
                    { "file_path": "/out/a.bin", "artifact_type": "binary", "gpu_name": "gfx1030" }
                ]
            }]
        }
    });
    let store: BuildOutputStore = serde_json::from_value(manifest).unwrap();
    assert_eq!(
        store.resolve_artifact("gfx1030", "/src/a.cl", "main", ArtifactType::Binary),
        Some(Path::new("/out/a.bin"))
    );

    let (tx, mut rx) = isalens_correlation::event_channel();
    let mut view = DisassemblyView::new().with_events(tx);
    assert_eq!(view.populate_build_output(store), 1);

    assert!(view
        .handle_source_line_selected("gfx1030", "/src/a.cl", "main", 6)
        .unwrap());
    assert!(view.is_line_correlated_in_entry("/src/a.cl", "gfx1030", "main", 5));

    assert_eq!(view.select_disassembly_lines(&[0]), Some(5));
    assert_eq!(
        rx.try_recv().unwrap(),
        CorrelationEvent::CorrelatedSourceLineChanged(Some(5))
    );

    let visible = VisibleColumns::new([DisassemblyColumn::Address, DisassemblyColumn::Opcode]);
    let text = copy_rows_as_text(view.current_index().unwrap(), &[0, 1, 2], &visible);
    assert_eq!(text, "10    s_mov\nlabel_0042\n12    v_add\n");
}
