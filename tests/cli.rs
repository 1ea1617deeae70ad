mod common;

use predicates::prelude::*;
use predicates::str::contains;
use serde_json::{Value, json};

use common::{TestWorkspace, fixture_path, galv};

fn path_arg(path: &std::path::Path) -> &str {
    path.to_str().expect("utf-8 path")
}

#[test]
fn encode_then_decode_round_trips_a_cell() {
    let workspace = TestWorkspace::new();
    let encoded = workspace.path().join("cell_tvn.json");
    galv()
        .args([
            "encode",
            "-i",
            path_arg(&fixture_path("cell.json")),
            "--kind",
            "cell",
            "-o",
            path_arg(&encoded),
        ])
        .assert()
        .success();

    let wrapper = workspace.read_json("cell_tvn.json");
    assert_eq!(wrapper["family"]["type"], "galv_CELL_FAMILY");
    assert_eq!(wrapper["cycler_tests"]["type"], "array");
    assert_eq!(
        wrapper["cycler_tests"]["value"][0]["type"],
        "galv_CYCLER_TEST"
    );

    galv()
        .args(["decode", "-i", path_arg(&encoded), "--compact"])
        .assert()
        .success()
        .stdout(contains(r#""identifier":"C-001""#));
}

#[test]
fn encode_fills_schema_defaults() {
    let workspace = TestWorkspace::new();
    let input = workspace.write_json("family.json", &json!({"name": "Voltage"}));
    let output = galv()
        .args(["encode", "-i", path_arg(&input), "-k", "COLUMN_FAMILY", "--compact"])
        .output()
        .expect("run encode");
    assert!(output.status.success());
    let wrapper: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(wrapper["data_type"], json!({"type": "string", "value": "float"}));
}

#[test]
fn encode_rejects_non_objects() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("list.json", "[1, 2]");
    galv()
        .args(["encode", "-i", path_arg(&input)])
        .assert()
        .failure()
        .stderr(contains("must contain a JSON object"));
}

#[test]
fn decode_fails_on_plain_json() {
    let workspace = TestWorkspace::new();
    let input = workspace.write_json("plain.json", &json!({"a": 1}));
    galv()
        .args(["decode", "-i", path_arg(&input)])
        .assert()
        .failure()
        .stderr(contains("Invalid TypeValueNotation"));
}

#[test]
fn decode_reads_yaml_input() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("node.yaml", "type: number\nvalue: 4\n");
    galv()
        .args(["decode", "-i", path_arg(&input)])
        .assert()
        .success()
        .stdout(predicate::eq("4\n"));
}

#[test]
fn validate_reports_strict_mismatches() {
    let workspace = TestWorkspace::new();
    let input = workspace.write_json("node.json", &json!({"type": "number", "value": "3"}));
    galv()
        .args(["validate", "-i", path_arg(&input)])
        .assert()
        .success();
    galv()
        .args(["validate", "-i", path_arg(&input), "--strict"])
        .assert()
        .failure()
        .stderr(contains("not of type 'number'"));
}

#[test]
fn validate_points_at_bad_wrapper_members() {
    let workspace = TestWorkspace::new();
    let input = workspace.write_json(
        "wrapper.json",
        &json!({"name": {"type": "string", "value": "A"}, "size": 3}),
    );
    galv()
        .args(["validate", "-i", path_arg(&input)])
        .assert()
        .failure()
        .stderr(contains("$.size"));
    galv()
        .args(["validate", "-i", path_arg(&input), "--no-wrappers"])
        .assert()
        .failure();
}

#[test]
fn coerce_converts_nodes_and_wrapper_fields() {
    let workspace = TestWorkspace::new();
    let node = workspace.write_json("node.json", &json!({"type": "string", "value": "false"}));
    galv()
        .args(["coerce", "-i", path_arg(&node), "--to", "boolean", "--compact"])
        .assert()
        .success()
        .stdout(contains(r#"{"type":"boolean","value":true}"#));

    let config = workspace.write("engine.yaml", "api_base_url: https://api.example/\n");
    let wrapper = workspace.write_json(
        "wrapper.json",
        &json!({"cell": {"type": "number", "value": 12}, "name": {"type": "string", "value": "A"}}),
    );
    galv()
        .args([
            "coerce",
            "-i",
            path_arg(&wrapper),
            "--to",
            "galv_CELL",
            "--field",
            "cell",
            "-c",
            path_arg(&config),
            "--compact",
        ])
        .assert()
        .success()
        .stdout(contains(r#""cell":{"type":"galv_CELL","value":"https://api.example/cells/12"}"#));
}

#[test]
fn coerce_rejects_unknown_targets() {
    let workspace = TestWorkspace::new();
    let node = workspace.write_json("node.json", &json!({"type": "string", "value": "x"}));
    galv()
        .args(["coerce", "-i", path_arg(&node), "--to", "mystery"])
        .assert()
        .failure()
        .stderr(contains("Could not get conversion function for type 'mystery'"));
}

#[test]
fn columns_lists_required_types_first() {
    let assert = galv()
        .args(["columns", "-i", path_arg(&fixture_path("column_types.json"))])
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert!(lines[0].starts_with("id"));
    assert!(lines[2].contains("Current_A"));
    assert!(lines[2].contains("required,default"));
    assert!(lines.last().unwrap().contains("Step"));
}

#[test]
fn preview_applies_a_stored_mapping() {
    galv()
        .args([
            "preview",
            "-i",
            path_arg(&fixture_path("summary.json")),
            "-m",
            path_arg(&fixture_path("mapping_db.json")),
            "-t",
            path_arg(&fixture_path("column_types.json")),
            "--db",
        ])
        .assert()
        .success()
        .stdout(contains("ElapsedTime_s"))
        .stdout(contains("1000"))
        .stdout(contains("Mapping is valid"));
}

#[test]
fn preview_reports_missing_required_columns() {
    let workspace = TestWorkspace::new();
    let mapping = workspace.write_json(
        "mapping.json",
        &json!({
            "name": "volts",
            "map": {"Volts": {"column_type": {"id": 2, "name": "Voltage_V", "data_type": "float", "is_required": true}}}
        }),
    );
    galv()
        .args([
            "preview",
            "-i",
            path_arg(&fixture_path("summary.json")),
            "-m",
            path_arg(&mapping),
            "--rows",
            "1",
        ])
        .assert()
        .success()
        .stdout(contains("missing required column(s): ElapsedTime_s, Current_A"))
        .stdout(contains("charge").not());
}

#[test]
fn preview_keeps_every_column_when_renames_collide() {
    let workspace = TestWorkspace::new();
    let summary = workspace.write(
        "summary.json",
        r#"{"Foo": ["1"], "_Foo": ["2"], "Bar": ["3"]}"#,
    );
    let mapping = workspace.write_json(
        "mapping.json",
        &json!({
            "name": "collide",
            "map": {"Bar": {"name": "Foo", "column_type": {"id": 7, "name": "Other", "data_type": "float"}}}
        }),
    );
    let assert = galv()
        .args(["preview", "-i", path_arg(&summary), "-m", path_arg(&mapping)])
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let header: Vec<&str> = stdout.lines().next().unwrap().split_whitespace().collect();
    assert_eq!(header, vec!["Foo", "_Foo", "__Foo"]);
}

#[test]
fn preview_db_mode_needs_column_types() {
    galv()
        .args([
            "preview",
            "-i",
            path_arg(&fixture_path("summary.json")),
            "-m",
            path_arg(&fixture_path("mapping_db.json")),
            "--db",
        ])
        .assert()
        .failure()
        .stderr(contains("--column-types"));
}

#[test]
fn rank_orders_applicable_mappings() {
    let assert = galv()
        .args([
            "rank",
            "--columns",
            "Time,Amps,Volts,Note",
            "-m",
            path_arg(&fixture_path("mappings.json")),
            "-t",
            path_arg(&fixture_path("column_types.json")),
        ])
        .assert()
        .success()
        .stdout(contains("Best mapping: Arbin"));
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    assert!(!stdout.contains("BioLogic"));
    let arbin = stdout.find("Arbin").unwrap();
    let maccor = stdout.find("Maccor").unwrap();
    assert!(arbin < maccor);
}

#[test]
fn rank_with_custom_required_columns() {
    let workspace = TestWorkspace::new();
    let config = workspace.write(
        "engine.yaml",
        "required_columns: [ElapsedTime_s, Voltage_V, Current_A, Comment]\n",
    );
    galv()
        .args([
            "rank",
            "--columns",
            "Time,Amps,Volts,Note",
            "-m",
            path_arg(&fixture_path("mappings.json")),
            "-t",
            path_arg(&fixture_path("column_types.json")),
            "-c",
            path_arg(&config),
        ])
        .assert()
        .success()
        .stdout(contains("Best mapping: Arbin"))
        .stdout(contains("Comment"));
}

#[test]
fn rename_resolves_collisions_in_db_form() {
    let workspace = TestWorkspace::new();
    let mapping = workspace.write_json(
        "mapping.json",
        &json!({
            "name": "collide",
            "map": {
                "Amps": {"column_type": 3, "name": "Volts"},
                "Volts": {"column_type": 2, "name": "__Volts"}
            }
        }),
    );
    let output = workspace.path().join("renamed.json");
    galv()
        .args([
            "rename",
            "-i",
            path_arg(&fixture_path("summary.json")),
            "-m",
            path_arg(&mapping),
            "-t",
            path_arg(&fixture_path("column_types.json")),
            "--db",
            "-o",
            path_arg(&output),
        ])
        .assert()
        .success();

    let renamed = workspace.read_json("renamed.json");
    assert_eq!(renamed["map"]["Amps"]["name"], "_Volts");
    assert_eq!(renamed["map"]["Amps"]["column_type"], 3);
    assert_eq!(renamed["map"]["Volts"]["name"], "__Volts");
}
