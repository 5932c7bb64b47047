use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

const CSV: &str = "\
Address, Source Line Number, Opcode, Operands, Functional Unit, Cycles, Binary Encoding
0x00,5,s_mov_b32,s0,Scalar ALU,4,0xBE800080
label_0008
0x08,6,v_add_f32,\"v0, v1, v2\",Vector ALU,4,0x02000302
0x0C,6,v_mul_f32,v3,Vector ALU,4,0x10060702
0x10,-1,s_endpgm,,Flow Control,4,0xBF810000
";

const REPORT: &str = "\
   0 |   2 | v      | s_mov_b32 s0, 0
   1 |   4 | vv     | label_0008: v_add_f32 v0, v1, v2
   2 |   4 | vv     | v_mul_f32 v3, v0, v0
   3 |   0 |        | s_endpgm
Maximum # VGPR used  4, VGPRs allocated by HW:  4
  VGPRs total:     256
  VGPR allocation granularity:    4
";

fn tool_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_isa-tool"))
}

fn write_fixture(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).expect("write fixture");
    path
}

/// Run the tool with an empty config so user-level files never interfere
fn run(dir: &TempDir, args: &[&str]) -> Output {
    let config = write_fixture(dir.path(), "isalens.toml", "");
    Command::new(tool_path())
        .arg("--config")
        .arg(&config)
        .args(args)
        .current_dir(dir.path())
        .env_remove("RUST_LOG")
        .output()
        .expect("run isa-tool")
}

fn stdout(output: &Output) -> String {
    assert!(
        output.status.success(),
        "isa-tool failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn json(output: &Output) -> serde_json::Value {
    serde_json::from_str(&stdout(output)).expect("valid JSON output")
}

#[test]
fn test_lines_json_lists_every_row() {
    let dir = TempDir::new().unwrap();
    let csv = write_fixture(dir.path(), "k.csv", CSV);

    let value = json(&run(&dir, &["lines", csv.to_str().unwrap(), "--json"]));
    let rows = value["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 5);
    assert_eq!(rows[1]["is_label"], true);
    assert_eq!(rows[1]["text"], "label_0008");
    assert_eq!(rows[4]["source_line"], serde_json::Value::Null);
    assert_eq!(value["correlated_source_lines"], 2);
    assert_eq!(value["source_line_bounds"], serde_json::json!([5, 6]));
}

#[test]
fn test_source_line_prints_all_generated_rows() {
    let dir = TempDir::new().unwrap();
    let csv = write_fixture(dir.path(), "k.csv", CSV);

    let value = json(&run(&dir, &["--json", "source-line", csv.to_str().unwrap(), "6"]));
    let indices: Vec<u64> = value["rows"]
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["index"].as_u64().unwrap())
        .collect();
    assert_eq!(indices, vec![2, 3]);

    let text = stdout(&run(&dir, &["source-line", csv.to_str().unwrap(), "42"]));
    assert!(text.contains("No disassembly for source line 42"));
}

#[test]
fn test_isa_line_maps_back_to_source() {
    let dir = TempDir::new().unwrap();
    let csv = write_fixture(dir.path(), "k.csv", CSV);

    let value = json(&run(&dir, &["isa-line", csv.to_str().unwrap(), "3", "--json"]));
    assert_eq!(value["source_line"], 6);
    assert_eq!(value["correlated_rows"], serde_json::json!([2, 3]));

    let value = json(&run(&dir, &["isa-line", csv.to_str().unwrap(), "1", "--json"]));
    assert_eq!(value["source_line"], serde_json::Value::Null);

    let output = run(&dir, &["isa-line", csv.to_str().unwrap(), "99"]);
    assert!(!output.status.success());
}

#[test]
fn test_vgpr_overlay() {
    let dir = TempDir::new().unwrap();
    let csv = write_fixture(dir.path(), "k.csv", CSV);
    let report = write_fixture(dir.path(), "k.livereg", REPORT);

    let value = json(&run(
        &dir,
        &["vgpr", csv.to_str().unwrap(), report.to_str().unwrap(), "--json"],
    ));
    assert_eq!(value["header"], "VGPR pressure (used:4, allocated:4/256)");
    assert_eq!(value["max_lines"], serde_json::json!([2, 3]));
    assert_eq!(value["at_register_limit"], false);
    assert_eq!(value["rows"][0]["live_vgprs"], "2");
    assert_eq!(value["rows"][1]["live_vgprs"], "");
}

#[test]
fn test_entry_start() {
    let dir = TempDir::new().unwrap();
    let source = write_fixture(
        dir.path(),
        "k.cl",
        "__kernel void k(__global float* out)\n{\n    out[0] = 1.0f;\n}\n",
    );

    let text = stdout(&run(&dir, &["entry-start", source.to_str().unwrap(), "1"]));
    assert_eq!(text.trim(), "3");
}

#[test]
fn test_session_manifest() {
    let dir = TempDir::new().unwrap();
    let csv = write_fixture(dir.path(), "k.csv", CSV);
    let manifest = serde_json::json!({
        "gfx900": {
            "/src/k.cl": [{
                "input_file_path": "/src/k.cl",
                "entrypoint_name": "k",
                "artifacts": [
                    { "file_path": csv, "artifact_type": "disassembly_csv", "gpu_name": "gfx900" }
                ]
            }]
        },
        "gfx1030": {
            "/src/k.cl": [{
                "input_file_path": "/src/k.cl",
                "entrypoint_name": "k",
                "artifacts": [
                    { "file_path": csv, "artifact_type": "disassembly_csv", "gpu_name": "gfx1030" }
                ]
            }]
        }
    });
    let manifest = write_fixture(dir.path(), "session.json", &manifest.to_string());

    let value = json(&run(
        &dir,
        &[
            "session",
            manifest.to_str().unwrap(),
            "--file",
            "/src/k.cl",
            "--entry",
            "k",
            "--line",
            "5",
            "--json",
        ],
    ));
    assert_eq!(value["target_gpus"], serde_json::json!(["gfx1030", "gfx900"]));
    assert_eq!(value["gpu"], "gfx1030");
    assert_eq!(value["live_registers"], "not requested");
    assert_eq!(value["line_has_disassembly"], true);
    assert_eq!(value["correlated_rows"], serde_json::json!([0]));

    let output = run(
        &dir,
        &[
            "session",
            manifest.to_str().unwrap(),
            "--gpu",
            "gfx900",
            "--file",
            "/src/k.cl",
            "--entry",
            "missing",
        ],
    );
    assert!(!output.status.success());
}

#[test]
fn test_bad_config_is_reported() {
    let dir = TempDir::new().unwrap();
    let csv = write_fixture(dir.path(), "k.csv", CSV);
    let config = write_fixture(
        dir.path(),
        "bad.toml",
        "[disassembly]\nvisible_columns = [\"opcodes\"]\n",
    );

    let output = Command::new(tool_path())
        .arg("--config")
        .arg(&config)
        .args(["lines", csv.to_str().unwrap()])
        .output()
        .expect("run isa-tool");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("parsing error"));
}

#[test]
fn test_configured_columns_shape_output() {
    let dir = TempDir::new().unwrap();
    let csv = write_fixture(dir.path(), "k.csv", CSV);
    let config = write_fixture(
        dir.path(),
        "columns.toml",
        "[disassembly]\nvisible_columns = [\"opcode\"]\n",
    );

    let output = Command::new(tool_path())
        .arg("--config")
        .arg(&config)
        .args(["--json", "source-line", csv.to_str().unwrap(), "5"])
        .output()
        .expect("run isa-tool");
    let value = json(&output);
    assert_eq!(value["rows"][0]["text"], "s_mov_b32");
}
