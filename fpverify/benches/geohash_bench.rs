use criterion::{black_box, criterion_group, criterion_main, Criterion};
use fpverify::prelude::*;
use std::path::PathBuf;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn bench_board_geohash(c: &mut Criterion) {
    let board = fpverify::load_board(&fixture_path("reference_layout.kicad_pcb"))
        .expect("fixture should load");

    c.bench_function("board_geohash", |b| {
        b.iter(|| black_box(&board).geohash());
    });
}

fn bench_parse_board(c: &mut Criterion) {
    let content = std::fs::read_to_string(fixture_path("reference_layout.kicad_pcb"))
        .expect("fixture should read");

    c.bench_function("parse_board", |b| {
        b.iter(|| Board::parse_str(black_box(&content)));
    });
}

fn bench_verify(c: &mut Criterion) {
    let board = fpverify::load_board(&fixture_path("reference_layout.kicad_pcb"))
        .expect("fixture should load");
    let verifier = Verifier::new(VerifyOptions::default());

    c.bench_function("verify_reference_layout", |b| {
        b.iter(|| {
            let mut copy = board.clone();
            verifier.verify(black_box(&mut copy))
        });
    });
}

criterion_group!(benches, bench_board_geohash, bench_parse_board, bench_verify);
criterion_main!(benches);
