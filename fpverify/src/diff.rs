//! Item-level comparison of two footprints.
//!
//! Items are matched by geohash membership, not by position in the list:
//! an item is "only in first" when its hash does not occur anywhere in the
//! second footprint. This is a set difference, so a footprint that repeats
//! an identical item a different number of times compares equal.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use crate::geohash::Geohash;
use crate::geometry::{format_number, Frame, Point};
use crate::parser::pcb_schema::{Footprint, ItemRef, TextAttributes};

/// A footprint item together with the frame that places it on the board.
#[derive(Debug, Clone, Copy)]
pub struct PlacedItem<'a> {
    pub item: ItemRef<'a>,
    pub frame: Frame,
}

impl PlacedItem<'_> {
    pub fn geohash(&self) -> Geohash {
        self.item.geohash(&self.frame)
    }

    pub fn info(&self) -> ShapeInfo {
        ShapeInfo {
            kind: self.item.kind_name(),
            position: self.item.position(&self.frame),
            orientation: self.item.orientation(&self.frame),
            layer: self.item.layer().map(str::to_string),
            text: self.item.text(&self.frame),
        }
    }
}

/// Pads then graphical items of `fp`, placed in its frame.
pub fn placed_items(fp: &Footprint) -> Vec<PlacedItem<'_>> {
    let frame = fp.frame();
    fp.items()
        .into_iter()
        .map(|item| PlacedItem { item, frame })
        .collect()
}

/// Items of each list whose hash is absent from the other list.
pub fn diff_items<'a>(
    first: &[PlacedItem<'a>],
    second: &[PlacedItem<'a>],
) -> (Vec<PlacedItem<'a>>, Vec<PlacedItem<'a>>) {
    let hashes1: Vec<Geohash> = first.iter().map(PlacedItem::geohash).collect();
    let hashes2: Vec<Geohash> = second.iter().map(PlacedItem::geohash).collect();

    let set1: HashSet<Geohash> = hashes1.iter().copied().collect();
    let set2: HashSet<Geohash> = hashes2.iter().copied().collect();

    let only_first = first
        .iter()
        .zip(&hashes1)
        .filter(|(_, h)| !set2.contains(*h))
        .map(|(item, _)| *item)
        .collect();
    let only_second = second
        .iter()
        .zip(&hashes2)
        .filter(|(_, h)| !set1.contains(*h))
        .map(|(item, _)| *item)
        .collect();

    (only_first, only_second)
}

/// Printable attributes of one item; groups the item lacks are `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShapeInfo {
    pub kind: &'static str,
    pub position: Option<Point>,
    pub orientation: Option<f64>,
    pub layer: Option<String>,
    pub text: Option<TextAttributes>,
}

impl fmt::Display for ShapeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  {}", self.kind)?;
        if let Some(position) = self.position {
            writeln!(f, "    Position: {}", position)?;
        }
        if let Some(orientation) = self.orientation {
            writeln!(f, "    Orientation: {}", format_number(orientation))?;
        }
        if let Some(layer) = &self.layer {
            writeln!(f, "    Layer: {}", layer)?;
        }
        if let Some(text) = &self.text {
            writeln!(
                f,
                "    Text: O:{} J:{} S:{} T:{}",
                format_number(text.orientation),
                text.justification,
                text.size,
                format_number(text.thickness)
            )?;
            writeln!(f, "          {}", text.text)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FootprintSummary {
    pub reference: String,
    pub position: Point,
    pub orientation: f64,
    pub layer: String,
}

impl From<&Footprint> for FootprintSummary {
    fn from(fp: &Footprint) -> Self {
        Self {
            reference: fp.reference().to_string(),
            position: fp.position,
            orientation: fp.orientation,
            layer: fp.layer.clone(),
        }
    }
}

impl fmt::Display for FootprintSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at {} rot {} on {}",
            self.reference,
            self.position,
            format_number(self.orientation),
            self.layer
        )
    }
}

/// Result of comparing a loaded footprint against a regenerated one.
#[derive(Debug, Clone, Serialize)]
pub struct FootprintDiff {
    pub first: FootprintSummary,
    pub second: FootprintSummary,
    pub first_total: usize,
    pub second_total: usize,
    pub only_in_first: Vec<ShapeInfo>,
    pub only_in_second: Vec<ShapeInfo>,
}

impl FootprintDiff {
    pub fn is_empty(&self) -> bool {
        self.only_in_first.is_empty() && self.only_in_second.is_empty()
    }
}

pub fn diff_footprints(first: &Footprint, second: &Footprint) -> FootprintDiff {
    let items1 = placed_items(first);
    let items2 = placed_items(second);
    let (only1, only2) = diff_items(&items1, &items2);

    FootprintDiff {
        first: first.into(),
        second: second.into(),
        first_total: items1.len(),
        second_total: items2.len(),
        only_in_first: only1.iter().map(PlacedItem::info).collect(),
        only_in_second: only2.iter().map(PlacedItem::info).collect(),
    }
}

impl fmt::Display for FootprintDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "FP1: {}", self.first)?;
        writeln!(f, "FP2: {}", self.second)?;

        if !self.only_in_first.is_empty() {
            writeln!(
                f,
                "Shapes in first but not in second ({}/{})",
                self.only_in_first.len(),
                self.first_total
            )?;
            for shape in &self.only_in_first {
                write!(f, "{}", shape)?;
            }
        }

        if !self.only_in_second.is_empty() {
            writeln!(
                f,
                "Shapes in second but not in first ({}/{})",
                self.only_in_second.len(),
                self.second_total
            )?;
            for shape in &self.only_in_second {
                write!(f, "{}", shape)?;
            }
        }

        if self.is_empty() {
            writeln!(f, "No differences found.")?;
        }
        Ok(())
    }
}
