//! Geometry hashes.
//!
//! A geohash fingerprints what an item looks like on the board: its kind,
//! layers, sizes, text, and quantized board-space geometry. UUIDs, file
//! order, and in-memory identity never contribute, so two boards that draw
//! the same copper and silkscreen hash equal.
//!
//! Hashes come from a fixed-key [`DefaultHasher`] and are stable for a given
//! build. They are meant for comparisons within one run, not for storage.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Serialize, Serializer};

use crate::geometry::{quantize_angle, to_nm, Frame, Point};
use crate::parser::pcb_schema::{Board, Footprint, ItemRef, Pad, Shape, ShapeKind, Text};
use crate::parser::sexp::SExp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Geohash(pub u64);

impl fmt::Display for Geohash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl Serialize for Geohash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

fn finish<T: Hash>(value: T) -> Geohash {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    Geohash(hasher.finish())
}

fn sorted(mut hashes: Vec<Geohash>) -> Vec<Geohash> {
    hashes.sort_unstable();
    hashes
}

fn quantize_ratio(ratio: f64) -> i64 {
    (ratio * 10_000.0).round() as i64
}

impl ItemRef<'_> {
    /// Hash of this item placed in `frame`.
    pub fn geohash(&self, frame: &Frame) -> Geohash {
        match self {
            ItemRef::Pad(pad) => pad_hash(pad, frame),
            ItemRef::Shape(shape) => shape_hash(shape, frame),
            ItemRef::Text(text) => text_hash(text, frame),
        }
    }
}

fn pad_hash(pad: &Pad, frame: &Frame) -> Geohash {
    let mut layers: Vec<&str> = pad.layers.iter().map(|l| l.as_str()).collect();
    layers.sort_unstable();
    let drill = pad.drill.as_ref().map(|d| {
        (
            d.oval,
            to_nm(d.diameter),
            d.width.map(to_nm),
            d.offset.map(Point::quantized),
        )
    });
    finish((
        "pad",
        &pad.number,
        pad.pad_type.as_str(),
        pad.shape.as_str(),
        frame.to_board(pad.position).quantized(),
        quantize_angle(frame.angle_to_board(pad.angle)),
        pad.size.quantized(),
        drill,
        layers,
        pad.net.as_ref().map(|n| n.name.as_str()),
        pad.roundrect_rratio.map(quantize_ratio),
    ))
}

/// Board-space control points in a direction-independent order.
fn canonical_points(kind: &ShapeKind, frame: &Frame) -> Vec<(i64, i64)> {
    let q = |p: &Point| frame.to_board(*p).quantized();
    match kind {
        ShapeKind::Line { start, end } => {
            let mut ends = vec![q(start), q(end)];
            ends.sort_unstable();
            ends
        }
        ShapeKind::Rect { start, end } => {
            // Either diagonal describes the same rectangle
            let (x0, x1) = (start.x.min(end.x), start.x.max(end.x));
            let (y0, y1) = (start.y.min(end.y), start.y.max(end.y));
            let mut corners: Vec<_> = [(x0, y0), (x1, y0), (x1, y1), (x0, y1)]
                .into_iter()
                .map(|(x, y)| q(&Point::new(x, y)))
                .collect();
            corners.sort_unstable();
            corners
        }
        ShapeKind::Circle { center, end } => {
            let radius = to_nm(((end.x - center.x).powi(2) + (end.y - center.y).powi(2)).sqrt());
            vec![q(center), (radius, 0)]
        }
        ShapeKind::Arc { start, mid, end } => {
            let mut ends = vec![q(start), q(end)];
            ends.sort_unstable();
            let mut points = vec![q(mid)];
            points.extend(ends);
            points
        }
        ShapeKind::Poly { points } => canonical_ring(points.iter().map(q).collect()),
        ShapeKind::Curve { points } => {
            let forward: Vec<_> = points.iter().map(q).collect();
            let mut backward = forward.clone();
            backward.reverse();
            forward.min(backward)
        }
    }
}

/// Closed polygon: start at the smallest vertex, walk the smaller direction.
fn canonical_ring(points: Vec<(i64, i64)>) -> Vec<(i64, i64)> {
    let Some(start) = points
        .iter()
        .enumerate()
        .min_by_key(|(_, p)| **p)
        .map(|(i, _)| i)
    else {
        return points;
    };
    let n = points.len();
    let forward: Vec<_> = (0..n).map(|k| points[(start + k) % n]).collect();
    let backward: Vec<_> = (0..n).map(|k| points[(start + n - k) % n]).collect();
    forward.min(backward)
}

fn shape_hash(shape: &Shape, frame: &Frame) -> Geohash {
    finish((
        "shape",
        shape.kind.tag(),
        &shape.layer,
        to_nm(shape.width),
        shape.is_filled(),
        canonical_points(&shape.kind, frame),
    ))
}

fn text_hash(text: &Text, frame: &Frame) -> Geohash {
    finish((
        "text",
        text.kind.property_name(),
        &text.text,
        frame.to_board(text.position).quantized(),
        quantize_angle(frame.angle_to_board(text.angle)),
        &text.layer,
        text.hidden,
        text.font.size.quantized(),
        to_nm(text.font.thickness),
        text.font.bold,
        text.font.italic,
        text.justify,
    ))
}

impl Footprint {
    /// Hashes of [`Footprint::items`], in the same order.
    pub fn item_hashes(&self) -> Vec<Geohash> {
        let frame = self.frame();
        self.items().iter().map(|item| item.geohash(&frame)).collect()
    }

    pub fn geohash(&self) -> Geohash {
        finish((
            "footprint",
            &self.library,
            &self.layer,
            self.position.quantized(),
            quantize_angle(self.orientation),
            sorted(self.item_hashes()),
        ))
    }
}

/// Canonical text of a node with identity children dropped.
fn strip_identity(node: &SExp) -> SExp {
    match node {
        SExp::List(items) => SExp::List(
            items
                .iter()
                .filter(|c| !matches!(c.tag(), Some("uuid") | Some("tstamp")))
                .map(strip_identity)
                .collect(),
        ),
        other => other.clone(),
    }
}

impl Board {
    pub fn footprint_hashes(&self) -> Vec<Geohash> {
        self.footprints.iter().map(Footprint::geohash).collect()
    }

    pub fn geohash(&self) -> Geohash {
        let drawings: Vec<Geohash> = self
            .geometric_items()
            .map(|node| finish(("node", strip_identity(node).to_string())))
            .collect();
        finish(("board", sorted(self.footprint_hashes()), sorted(drawings)))
    }
}
