//! Tests for KiCad board loading and saving

use fpverify::parser::pcb_schema::{Graphic, ShapeKind, TextKind};
use fpverify::{load_board, Board, Point, VerifyError};
use std::path::PathBuf;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

#[test]
fn test_parse_reference_layout() {
    let board = load_board(&fixture_path("reference_layout.kicad_pcb")).expect("Should parse");

    assert_eq!(board.version(), Some("20240108"));
    assert_eq!(board.references(), vec!["XX1", "XX2", "XX3", "XX4"]);

    let xx1 = board.footprint("XX1").unwrap();
    assert_eq!(xx1.library, "Resistor_SMD:R_0805_2012Metric");
    assert_eq!(xx1.position, Point::new(50.0, 100.0));
    assert_eq!(xx1.orientation, 0.0);
    assert!(!xx1.is_flipped());
    assert_eq!(xx1.pads.len(), 2);
    assert_eq!(xx1.items().len(), 12);
}

#[test]
fn test_parse_placements() {
    let board = load_board(&fixture_path("reference_layout.kicad_pcb")).unwrap();

    let xx3 = board.footprint("XX3").unwrap();
    assert_eq!(xx3.orientation, 43.0);
    // File angles include the footprint orientation
    assert_eq!(xx3.pads[0].angle, 0.0);

    let xx4 = board.footprint("XX4").unwrap();
    assert!(xx4.is_flipped());
    assert_eq!(xx4.position, Point::new(69.0, 81.0));
    assert_eq!(xx4.orientation, -43.0);
    assert_eq!(xx4.pads[0].layers, vec!["B.Cu", "B.Paste", "B.Mask"]);
}

#[test]
fn test_parse_texts_and_shapes() {
    let board = load_board(&fixture_path("reference_layout.kicad_pcb")).unwrap();
    let xx2 = board.footprint("XX2").unwrap();

    let texts: Vec<_> = xx2
        .graphical_items
        .iter()
        .filter_map(|g| match g {
            Graphic::Text(t) => Some(t),
            _ => None,
        })
        .collect();
    assert_eq!(texts.len(), 4);
    assert_eq!(texts[0].kind, TextKind::Reference);
    assert_eq!(texts[0].position, Point::new(0.0, 1.65));
    assert!(texts[0].justify.mirror);
    assert!(texts[2].hidden, "Footprint property is hidden");
    assert_eq!(texts[3].text, "${REFERENCE}");

    let arc = xx2.graphical_items.iter().find_map(|g| match g {
        Graphic::Shape(s) if matches!(s.kind, ShapeKind::Arc { .. }) => Some(s),
        _ => None,
    });
    assert_eq!(arc.map(|s| s.layer.as_str()), Some("B.Fab"));
}

#[test]
fn test_parse_invalid_file() {
    let result = load_board(&PathBuf::from("not_a_real_file.kicad_pcb"));
    assert!(matches!(result, Err(VerifyError::MissingFile(_))));
}

#[test]
fn test_parse_rejects_other_roots() {
    assert!(Board::parse_str("(kicad_sch (version 20231120))").is_err());
    assert!(Board::parse_str("(kicad_pcb (version 1)").is_err());
}

#[test]
fn test_save_and_reload_keeps_geometry() {
    let board = load_board(&fixture_path("reference_layout.kicad_pcb")).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("copy.kicad_pcb");

    board.save(&path).unwrap();
    let reloaded = load_board(&path).unwrap();

    assert_eq!(reloaded.references(), board.references());
    assert_eq!(reloaded.geohash(), board.geohash());
    assert_eq!(reloaded.footprint_hashes(), board.footprint_hashes());

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("(model"), "3D model is carried through");
    assert!(text.contains("Edge.Cuts"), "Board outline is carried through");
}
