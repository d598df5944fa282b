//! Integration tests for the fpverify library

use fpverify::prelude::*;
use fpverify::{derive_layout, load_board};
use std::path::PathBuf;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

#[test]
fn test_reference_layout_matches() {
    let report = fpverify::verify(
        &fixture_path("reference_layout.kicad_pcb"),
        VerifyOptions::default(),
    )
    .expect("Reference layout should verify");

    assert_eq!(report.verdict, Verdict::Match);
    assert_eq!(report.compare, vec![true; 4]);
    assert_eq!(report.original_hash, report.regenerated_hash);
    assert!(report.diffs.is_empty());
}

#[test]
fn test_hashes_are_deterministic() {
    let path = fixture_path("reference_layout.kicad_pcb");
    let first = load_board(&path).unwrap();
    let second = load_board(&path).unwrap();
    assert_eq!(first.footprint_hashes(), second.footprint_hashes());
    assert_eq!(first.geohash(), second.geohash());
}

#[test]
fn test_wrong_references_fail_before_writing() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.kicad_pcb");
    let snapshot = dir.path().join("snapshot.kicad_pcb");
    let options = VerifyOptions {
        output: Some(output.clone()),
        snapshot: Some(snapshot.clone()),
        ..VerifyOptions::default()
    };

    let err = fpverify::verify(&fixture_path("wrong_refs.kicad_pcb"), options).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Expected footprint references ['XX1', 'XX2', 'XX3', 'XX4'] but got ['A', 'B']"
    );
    assert!(!output.exists());
    assert!(!snapshot.exists());
}

#[test]
fn test_broken_layout_reports_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("rebuilt.kicad_pcb");
    let options = VerifyOptions {
        output: Some(output.clone()),
        ..VerifyOptions::default()
    };

    let report = fpverify::verify(&fixture_path("broken_layout.kicad_pcb"), options).unwrap();
    assert_eq!(report.verdict, Verdict::GeometryMismatch);
    assert_eq!(report.compare_line(), "compare=[True, True, False, True]");
    assert_eq!(report.saved_output.as_deref(), Some(output.as_path()));
    assert!(output.exists());

    let xx3 = &report.diffs[2];
    assert_eq!(xx3.first.reference, "XX3");
    assert_eq!(xx3.only_in_first.len(), 1);
    assert_eq!(xx3.only_in_second.len(), 1);
    assert_eq!(xx3.only_in_first[0].kind, "Pad");
    assert!(report.diffs[0].is_empty());
    assert!(report.diffs[3].is_empty());

    // The saved board is the rebuilt one, so it verifies on its own
    let rebuilt = fpverify::verify(&output, VerifyOptions::default()).unwrap();
    assert!(rebuilt.is_match());
}

#[test]
fn test_matching_layout_does_not_write_output() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("rebuilt.kicad_pcb");
    let snapshot = dir.path().join("snapshot.kicad_pcb");
    let options = VerifyOptions {
        output: Some(output.clone()),
        snapshot: Some(snapshot.clone()),
        ..VerifyOptions::default()
    };

    let report = fpverify::verify(&fixture_path("reference_layout.kicad_pcb"), options).unwrap();
    assert!(report.is_match());
    assert!(!output.exists());
    assert!(snapshot.exists());

    let saved = load_board(&snapshot).unwrap();
    assert_eq!(saved.geohash(), report.original_hash);
}

#[test]
fn test_snapshot_holds_board_before_rebuild() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = dir.path().join("snapshot.kicad_pcb");
    let options = VerifyOptions {
        snapshot: Some(snapshot.clone()),
        ..VerifyOptions::default()
    };

    let report = fpverify::verify(&fixture_path("broken_layout.kicad_pcb"), options).unwrap();
    let saved = load_board(&snapshot).unwrap();
    assert_eq!(saved.geohash(), report.original_hash);
    assert_ne!(saved.geohash(), report.regenerated_hash);
}

#[test]
fn test_layout_positions_follow_first_footprint() {
    let board = load_board(&fixture_path("reference_layout.kicad_pcb")).unwrap();
    let mut base = board.footprint("XX1").unwrap().clone();
    let refs = ["XX2", "XX3", "XX4"].map(String::from);

    for origin in [Point::new(50.0, 100.0), Point::new(12.5, -30.0)] {
        base.set_position(origin);
        let [below, right, diagonal] = derive_layout(&base, &refs, 19.0, 43.0);
        assert_eq!(below.position, origin + (0.0, -19.0));
        assert_eq!(right.position, origin + (19.0, 0.0));
        assert_eq!(diagonal.position, origin + (19.0, -19.0));
    }
}

#[test]
fn test_flip_keeps_position_on_loaded_footprint() {
    let board = load_board(&fixture_path("reference_layout.kicad_pcb")).unwrap();
    let mut fp = board.footprint("XX3").unwrap().clone();
    let before = fp.position;

    fp.flip();
    assert_eq!(fp.position, before);
    fp.flip();
    assert_eq!(fp.geohash(), board.footprint("XX3").unwrap().geohash());
}

#[test]
fn test_geohash_survives_copy() {
    let board = load_board(&fixture_path("reference_layout.kicad_pcb")).unwrap();
    let fp = board.footprint("XX1").unwrap();
    let copy = fp.duplicate("XX1", fp.position);
    assert_eq!(fp.geohash(), copy.geohash());
    assert_ne!(fp.uuid, copy.uuid);
}

#[test]
fn test_custom_spacing_does_not_match_reference() {
    let options = VerifyOptions {
        spacing: 20.0,
        ..VerifyOptions::default()
    };
    let report = fpverify::verify(&fixture_path("reference_layout.kicad_pcb"), options).unwrap();
    assert!(!report.is_match());
    assert_eq!(report.compare_line(), "compare=[True, False, False, False]");
}

#[test]
fn test_report_serializes_to_json() {
    let report = fpverify::verify(
        &fixture_path("broken_layout.kicad_pcb"),
        VerifyOptions::default(),
    )
    .unwrap();

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["verdict"], "geometry_mismatch");
    assert_eq!(json["compare"], serde_json::json!([true, true, false, true]));
    assert_eq!(json["saved_output"], serde_json::Value::Null);

    let hash = json["original_hash"].as_str().unwrap();
    assert_eq!(hash.len(), 16);
    assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(hash, report.original_hash.to_string());

    let pad = &json["diffs"][2]["only_in_first"][0];
    assert_eq!(pad["kind"], "Pad");
    assert_eq!(pad["layer"], "F.Cu");
    assert!(pad["text"].is_null());
}
