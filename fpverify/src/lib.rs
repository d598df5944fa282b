//! fpverify - footprint placement verification for KiCad boards
//!
//! This library loads a `.kicad_pcb` board holding four copies of one
//! footprint, rebuilds three of them from the first with move, rotate and
//! flip operations, and checks that the rebuilt board has the same geometry
//! hash as the board on disk.
//!
//! # Quick Start
//!
//! ```no_run
//! use fpverify::{Verifier, VerifyOptions};
//! use std::path::Path;
//!
//! let verifier = Verifier::new(VerifyOptions::default());
//! let report = verifier.run(Path::new("layout.kicad_pcb")).unwrap();
//!
//! if !report.is_match() {
//!     println!("{}", report.compare_line());
//!     for diff in &report.diffs {
//!         print!("{}", diff);
//!     }
//! }
//! ```
//!
//! # Features
//!
//! - **Board model**: footprints, pads, shapes and texts in local coordinates
//! - **Round trip**: unknown nodes are kept and written back untouched
//! - **Geohash**: order- and UUID-independent geometry fingerprints
//! - **Diff**: per-item report of what changed between two footprints

pub mod core;
pub mod diff;
pub mod geohash;
pub mod geometry;
pub mod parser;
pub mod transform;

// Re-export main types
pub use crate::core::{
    derive_layout, python_list, Verdict, Verifier, VerifyError, VerifyOptions, VerifyReport,
};
pub use diff::{diff_footprints, diff_items, placed_items, FootprintDiff, PlacedItem, ShapeInfo};
pub use geohash::Geohash;
pub use geometry::{Frame, Point, Size2D};
pub use parser::pcb::PcbParser;
pub use parser::pcb_schema::{Board, Footprint, ItemRef};
pub use parser::pcb_writer::PcbWriter;

/// Load a board file (convenience wrapper).
pub fn load_board(path: &std::path::Path) -> Result<Board, VerifyError> {
    if !path.is_file() {
        return Err(VerifyError::MissingFile(path.to_path_buf()));
    }
    Ok(Board::load(path)?)
}

/// Verify a board file with the given options (convenience wrapper).
pub fn verify(
    path: &std::path::Path,
    options: VerifyOptions,
) -> Result<VerifyReport, VerifyError> {
    Verifier::new(options).run(path)
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        Board, Footprint, Geohash, Point, Verdict, Verifier, VerifyError, VerifyOptions,
        VerifyReport,
    };
}
