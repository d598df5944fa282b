//! Verification driver shared by the CLI and the integration tests.
//!
//! The driver keeps the first footprint of a four-footprint board, rebuilds
//! the other three from it with move, rotate and flip operations, and checks
//! that the rebuilt board hashes the same as the board on disk.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::diff::{diff_footprints, FootprintDiff};
use crate::geohash::Geohash;
use crate::parser::pcb::PcbParseError;
use crate::parser::pcb_schema::{Board, Footprint};

pub const DEFAULT_SPACING: f64 = 19.0;
pub const DEFAULT_ANGLE: f64 = 43.0;

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("File not found: {}", .0.display())]
    MissingFile(PathBuf),
    #[error("Failed to load board: {0}")]
    Load(#[from] PcbParseError),
    #[error("Failed to save board to {}: {source}", path.display())]
    Save {
        path: PathBuf,
        #[source]
        source: PcbParseError,
    },
    #[error(
        "Expected footprint references {} but got {}",
        python_list(.expected),
        python_list(.found)
    )]
    ReferenceMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },
}

/// Options for a verification run.
#[derive(Clone, Debug)]
pub struct VerifyOptions {
    /// Distance between neighbouring footprints, in millimetres.
    pub spacing: f64,
    /// Orientation given to the rotated footprints, in degrees.
    pub angle: f64,
    /// References the board must carry, in file order. The first one is the
    /// footprint the others are rebuilt from.
    pub expected_references: [String; 4],
    /// Where to save the rebuilt board when it does not match.
    pub output: Option<PathBuf>,
    /// Where to save the board as loaded, before anything is rebuilt.
    pub snapshot: Option<PathBuf>,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            spacing: DEFAULT_SPACING,
            angle: DEFAULT_ANGLE,
            expected_references: ["XX1", "XX2", "XX3", "XX4"].map(String::from),
            output: None,
            snapshot: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Match,
    GeometryMismatch,
}

/// Outcome of a completed run. A geometry mismatch is reported here, not as
/// an error.
#[derive(Debug, Clone, Serialize)]
pub struct VerifyReport {
    pub verdict: Verdict,
    pub original_hash: Geohash,
    pub regenerated_hash: Geohash,
    pub original_footprints: Vec<Geohash>,
    pub regenerated_footprints: Vec<Geohash>,
    /// Per-index equality of the footprint hashes.
    pub compare: Vec<bool>,
    /// Loaded footprint against rebuilt footprint, filled on mismatch only.
    pub diffs: Vec<FootprintDiff>,
    /// Set when the rebuilt board was written out.
    pub saved_output: Option<PathBuf>,
}

impl VerifyReport {
    pub fn is_match(&self) -> bool {
        self.verdict == Verdict::Match
    }

    /// `compare=[True, False, ...]`
    pub fn compare_line(&self) -> String {
        let flags: Vec<&str> = self
            .compare
            .iter()
            .map(|&same| if same { "True" } else { "False" })
            .collect();
        format!("compare=[{}]", flags.join(", "))
    }
}

/// Render strings as a bracketed, single-quoted list: `['A', 'B']`.
pub fn python_list<I>(items: I) -> String
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let quoted: Vec<String> = items
        .into_iter()
        .map(|s| format!("'{}'", s.as_ref().replace('\\', "\\\\").replace('\'', "\\'")))
        .collect();
    format!("[{}]", quoted.join(", "))
}

/// Build the three footprints that sit next to `base` in the reference
/// layout, named after `references`:
///
/// - below: moved by `(0, -spacing)` and flipped
/// - right: moved by `(spacing, 0)` and turned to `angle`
/// - diagonal: moved by `(spacing, -spacing)`, turned to `angle` and flipped
pub fn derive_layout(
    base: &Footprint,
    references: &[String; 3],
    spacing: f64,
    angle: f64,
) -> [Footprint; 3] {
    let [below_ref, right_ref, diagonal_ref] = references;
    let origin = base.position;

    let mut below = base.duplicate(below_ref, origin);
    below.translate(0.0, -spacing);
    below.flip();

    let mut right = base.duplicate(right_ref, origin);
    right.translate(spacing, 0.0);
    right.set_orientation(angle);

    let mut diagonal = base.duplicate(diagonal_ref, origin);
    diagonal.translate(spacing, -spacing);
    diagonal.set_orientation(angle);
    diagonal.flip();

    [below, right, diagonal]
}

fn save_board(board: &Board, path: &Path) -> Result<(), VerifyError> {
    board.save(path).map_err(|source| VerifyError::Save {
        path: path.to_path_buf(),
        source,
    })
}

pub struct Verifier {
    options: VerifyOptions,
}

impl Verifier {
    pub fn new(options: VerifyOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &VerifyOptions {
        &self.options
    }

    /// Load the board at `path` and verify it.
    pub fn run(&self, path: &Path) -> Result<VerifyReport, VerifyError> {
        if !path.is_file() {
            return Err(VerifyError::MissingFile(path.to_path_buf()));
        }
        let mut board = Board::load(path)?;
        self.verify(&mut board)
    }

    /// Verify an already loaded board. On return `board` holds the rebuilt
    /// layout.
    pub fn verify(&self, board: &mut Board) -> Result<VerifyReport, VerifyError> {
        let expected = &self.options.expected_references;
        let found = board.references();
        if found.as_slice() != expected.as_slice() {
            return Err(VerifyError::ReferenceMismatch {
                expected: expected.to_vec(),
                found,
            });
        }

        let original_hash = board.geohash();
        let original_footprints = board.footprint_hashes();
        tracing::debug!("Original board hash {}", original_hash);
        for (reference, hash) in expected.iter().zip(&original_footprints) {
            tracing::debug!("  {} {}", reference, hash);
        }

        if let Some(path) = &self.options.snapshot {
            save_board(board, path)?;
        }

        let loaded = board.clone();
        let [base_ref, rest @ ..] = expected;
        let Some(base) = loaded.footprint(base_ref) else {
            return Err(VerifyError::ReferenceMismatch {
                expected: expected.to_vec(),
                found: loaded.references(),
            });
        };

        board.retain_footprints(|fp| fp.reference() == base_ref.as_str());
        let derived = derive_layout(base, rest, self.options.spacing, self.options.angle);
        for fp in derived {
            board.add_footprint(fp);
        }

        let regenerated_hash = board.geohash();
        let regenerated_footprints = board.footprint_hashes();
        tracing::debug!("Regenerated board hash {}", regenerated_hash);

        let compare: Vec<bool> = original_footprints
            .iter()
            .zip(&regenerated_footprints)
            .map(|(a, b)| a == b)
            .collect();

        let mut report = VerifyReport {
            verdict: Verdict::Match,
            original_hash,
            regenerated_hash,
            original_footprints,
            regenerated_footprints,
            compare,
            diffs: Vec::new(),
            saved_output: None,
        };

        if original_hash == regenerated_hash {
            tracing::info!("Board geometry matches ({})", original_hash);
            return Ok(report);
        }

        report.verdict = Verdict::GeometryMismatch;
        tracing::info!(
            "Board geometry differs: {} != {}",
            original_hash,
            regenerated_hash
        );
        report.diffs = loaded
            .footprints
            .iter()
            .zip(&board.footprints)
            .map(|(before, after)| diff_footprints(before, after))
            .collect();

        if let Some(path) = &self.options.output {
            save_board(board, path)?;
            report.saved_output = Some(path.clone());
        }

        Ok(report)
    }
}
