use assert_cmd::Command;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;
use serde_json::Value;
use tempfile::TempDir;

const FRAME_HEX: &str = "8512346162630102";

fn cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("bitwire"))
}

fn repo_root() -> std::path::PathBuf {
    let manifest = std::path::Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest
        .parent()
        .and_then(|p| p.parent())
        .expect("repo root")
        .to_path_buf()
}

fn golden(file: &str) -> std::path::PathBuf {
    repo_root()
        .join("tests")
        .join("golden")
        .join("frame")
        .join(file)
}

fn stdout_of(assert: &assert_cmd::assert::Assert) -> String {
    String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 stdout")
}

#[test]
fn help_lists_subcommands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("decode").and(contains("encode")));
    cmd().arg("decode").arg("--help").assert().success();
}

#[test]
fn version_carries_build_info() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(contains(concat!("bitwire ", env!("CARGO_PKG_VERSION"), " (")));
}

#[test]
fn decode_json_matches_golden() {
    let assert = cmd()
        .arg("decode")
        .arg("--schema")
        .arg(golden("schema.json"))
        .arg("--hex")
        .arg("85 12 34 61 62 63 01 02")
        .arg("--format")
        .arg("json")
        .assert()
        .success();
    let actual: Value = serde_json::from_str(&stdout_of(&assert)).expect("valid json");
    let expected: Value = serde_json::from_str(
        &std::fs::read_to_string(golden("expected.json")).expect("expected json"),
    )
    .expect("expected json parses");
    assert_eq!(actual, expected);
}

#[test]
fn decode_xml_matches_golden() {
    let assert = cmd()
        .arg("decode")
        .arg("--schema")
        .arg(golden("schema.json"))
        .arg("--hex")
        .arg(format!("0x{FRAME_HEX}"))
        .arg("--format")
        .arg("xml")
        .assert()
        .success();
    let expected = std::fs::read_to_string(golden("expected.xml")).expect("expected xml");
    assert_eq!(stdout_of(&assert).trim_end(), expected.trim_end());
}

#[test]
fn decode_box_is_the_default() {
    cmd()
        .arg("decode")
        .arg("--schema")
        .arg(golden("schema.json"))
        .arg("--hex")
        .arg(FRAME_HEX)
        .assert()
        .success()
        .stdout(
            contains("╔═frame")
                .and(contains("0x1234 4660"))
                .and(contains("b1 true")),
        );
}

#[test]
fn decode_box_merges_single_children() {
    cmd()
        .arg("decode")
        .arg("--schema")
        .arg(golden("schema.json"))
        .arg("--hex")
        .arg(FRAME_HEX)
        .arg("--format")
        .arg("box")
        .arg("--merge")
        .assert()
        .success()
        .stdout(contains("header/id"));
}

#[test]
fn decode_reads_input_file() {
    let temp = TempDir::new().expect("tempdir");
    let input = temp.path().join("frame.bin");
    std::fs::write(&input, hex::decode(FRAME_HEX).expect("hex")).expect("write input");

    let assert = cmd()
        .arg("decode")
        .arg("--schema")
        .arg(golden("schema.json"))
        .arg("--input")
        .arg(&input)
        .arg("--format")
        .arg("json")
        .assert()
        .success();
    let actual: Value = serde_json::from_str(&stdout_of(&assert)).expect("valid json");
    assert_eq!(actual["frame"]["label"], "abc");
}

#[test]
fn invalid_hex_shows_error_and_hint() {
    cmd()
        .arg("decode")
        .arg("--schema")
        .arg(golden("schema.json"))
        .arg("--hex")
        .arg("zz")
        .assert()
        .failure()
        .code(2)
        .stderr(contains("error:").and(contains("hint:")));
}

#[test]
fn short_input_hints_at_layout_length() {
    cmd()
        .arg("decode")
        .arg("--schema")
        .arg(golden("schema.json"))
        .arg("--hex")
        .arg("85 12")
        .assert()
        .failure()
        .code(1)
        .stderr(contains("error: decode:").and(contains("needs 8 bytes, input has 2")));
}

#[test]
fn missing_schema_shows_error_and_hint() {
    let temp = TempDir::new().expect("tempdir");
    cmd()
        .arg("decode")
        .arg("--schema")
        .arg(temp.path().join("missing.json"))
        .arg("--hex")
        .arg(FRAME_HEX)
        .assert()
        .failure()
        .code(2)
        .stderr(
            contains("error: schema:")
                .and(contains("schema file not found"))
                .and(contains("hint:")),
        );
}

#[test]
fn hex_and_input_conflict() {
    cmd()
        .arg("decode")
        .arg("--schema")
        .arg(golden("schema.json"))
        .arg("--hex")
        .arg(FRAME_HEX)
        .arg("--input")
        .arg("frame.bin")
        .assert()
        .failure();
}

#[test]
fn encode_json_fixture_reproduces_bytes() {
    cmd()
        .arg("encode")
        .arg("--schema")
        .arg(golden("schema.json"))
        .arg("--fixture")
        .arg(golden("expected.json"))
        .assert()
        .success()
        .stdout(contains(FRAME_HEX));
}

#[test]
fn encode_xml_fixture_reproduces_bytes() {
    cmd()
        .arg("encode")
        .arg("--schema")
        .arg(golden("schema.json"))
        .arg("--fixture")
        .arg(golden("expected.xml"))
        .assert()
        .success()
        .stdout(contains(FRAME_HEX));
}

#[test]
fn encode_writes_output_file() {
    let temp = TempDir::new().expect("tempdir");
    let output = temp.path().join("frame.bin");

    cmd()
        .arg("encode")
        .arg("--schema")
        .arg(golden("schema.json"))
        .arg("--fixture")
        .arg(golden("expected.json"))
        .arg("-o")
        .arg(&output)
        .assert()
        .success()
        .stderr(contains("8 bytes written"));

    let written = std::fs::read(&output).expect("output bytes");
    assert_eq!(hex::encode(written), FRAME_HEX);
}

#[test]
fn lenient_encode_skips_attribute_checks() {
    let temp = TempDir::new().expect("tempdir");
    let fixture = temp.path().join("fixture.json");
    let document = std::fs::read_to_string(golden("expected.json"))
        .expect("expected json")
        .replace(r#""kind__plc4x_dataType": "uint""#, r#""kind__plc4x_dataType": "int""#);
    std::fs::write(&fixture, document).expect("write fixture");

    cmd()
        .arg("encode")
        .arg("--schema")
        .arg(golden("schema.json"))
        .arg("--fixture")
        .arg(&fixture)
        .assert()
        .failure()
        .stderr(contains("error:").and(contains("--lenient")));

    cmd()
        .arg("encode")
        .arg("--schema")
        .arg(golden("schema.json"))
        .arg("--fixture")
        .arg(&fixture)
        .arg("--lenient")
        .assert()
        .success()
        .stdout(contains(FRAME_HEX));
}

#[test]
fn values_too_wide_for_the_layout_fail_to_encode() {
    let temp = TempDir::new().expect("tempdir");
    let fixture = temp.path().join("fixture.json");
    let mut document: Value = serde_json::from_str(
        &std::fs::read_to_string(golden("expected.json")).expect("expected json"),
    )
    .expect("expected json parses");
    let id = document
        .pointer_mut("/frame/header/id")
        .expect("header id in golden document");
    *id = Value::from(70_000);
    std::fs::write(&fixture, document.to_string()).expect("write fixture");

    cmd()
        .arg("encode")
        .arg("--schema")
        .arg(golden("schema.json"))
        .arg("--fixture")
        .arg(&fixture)
        .arg("--lenient")
        .assert()
        .failure()
        .stderr(contains("error: fixture:").and(contains("70000")));
}
