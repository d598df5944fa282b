//! Footprint placement edits: duplicate, move, rotate, flip.
//!
//! Children live in the footprint's local frame, so moving or rotating a
//! footprint only touches its own frame. Flipping rewrites the children.

use crate::geometry::{normalize_degrees_180, Point};
use crate::parser::pcb_schema::{Footprint, Graphic, ShapeKind};

/// Swap a `F.` layer for its `B.` counterpart and the other way round.
/// Wildcards (`*.Cu`) and non-sided layers are returned unchanged.
pub fn flip_layer_name(name: &str) -> String {
    if let Some(rest) = name.strip_prefix("F.") {
        format!("B.{}", rest)
    } else if let Some(rest) = name.strip_prefix("B.") {
        format!("F.{}", rest)
    } else {
        name.to_string()
    }
}

fn fresh_uuid(uuid: &Option<String>) -> Option<String> {
    uuid.as_ref().map(|_| uuid::Uuid::new_v4().to_string())
}

impl Footprint {
    /// Deep copy carrying a new reference and position. Every UUID the
    /// source had is replaced with a fresh one.
    pub fn duplicate(&self, reference: &str, position: Point) -> Footprint {
        let mut copy = self.clone();
        copy.uuid = fresh_uuid(&self.uuid);
        for pad in copy.pads.iter_mut() {
            pad.uuid = fresh_uuid(&pad.uuid);
        }
        for item in copy.graphical_items.iter_mut() {
            match item {
                Graphic::Shape(s) => s.uuid = fresh_uuid(&s.uuid),
                Graphic::Text(t) => t.uuid = fresh_uuid(&t.uuid),
            }
        }
        copy.set_reference(reference);
        copy.position = position;
        tracing::debug!(
            "Duplicated {} as {} at {}",
            self.reference(),
            reference,
            position
        );
        copy
    }

    pub fn set_position(&mut self, position: Point) {
        self.position = position;
    }

    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.position = self.position + (dx, dy);
    }

    /// Absolute orientation in degrees; children turn with the footprint.
    pub fn set_orientation(&mut self, degrees: f64) {
        self.orientation = normalize_degrees_180(degrees);
    }

    pub fn rotate(&mut self, degrees: f64) {
        self.set_orientation(self.orientation + degrees);
    }

    /// Move the footprint to the other side of the board.
    ///
    /// Mirrors about the horizontal axis through the footprint position, the
    /// way KiCad flips footprints: the position stays put, the orientation is
    /// negated, every sided layer swaps, local Y coordinates and child angles
    /// are negated, and text on a sided layer toggles its mirroring.
    pub fn flip(&mut self) {
        self.layer = flip_layer_name(&self.layer);
        self.orientation = normalize_degrees_180(-self.orientation);

        for pad in self.pads.iter_mut() {
            pad.position = pad.position.mirror_y();
            pad.angle = normalize_degrees_180(-pad.angle);
            pad.layers = pad.layers.iter().map(|l| flip_layer_name(l)).collect();
            if let Some(offset) = pad.drill.as_mut().and_then(|d| d.offset.as_mut()) {
                *offset = offset.mirror_y();
            }
        }

        for item in self.graphical_items.iter_mut() {
            match item {
                Graphic::Shape(shape) => {
                    shape.kind.map_points(Point::mirror_y);
                    // Keep arcs counter-clockwise after mirroring
                    if let ShapeKind::Arc { start, end, .. } = &mut shape.kind {
                        std::mem::swap(start, end);
                    }
                    shape.layer = flip_layer_name(&shape.layer);
                }
                Graphic::Text(text) => {
                    text.position = text.position.mirror_y();
                    text.angle = normalize_degrees_180(-text.angle);
                    let layer = flip_layer_name(&text.layer);
                    // Texts on non-sided layers keep their mirroring
                    if layer != text.layer {
                        text.justify.mirror = !text.justify.mirror;
                    }
                    text.layer = layer;
                }
            }
        }

        tracing::debug!("Flipped {} to {}", self.reference(), self.layer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Size2D;
    use crate::parser::pcb_schema::{Pad, PadShape, PadType, Shape, Text, TextKind};

    fn footprint() -> Footprint {
        let mut fp = Footprint::new("lib:fp", "XX1");
        fp.position = Point::new(50.0, 100.0);
        fp.uuid = Some("00000000-0000-0000-0000-000000000001".to_string());
        fp.pads.push(Pad {
            number: "1".to_string(),
            pad_type: PadType::Smd,
            shape: PadShape::Rect,
            position: Point::new(1.0, 2.0),
            angle: 30.0,
            size: Size2D::new(1.0, 2.0),
            drill: None,
            layers: vec!["F.Cu".to_string(), "F.Paste".to_string(), "*.Mask".to_string()],
            net: None,
            roundrect_rratio: None,
            uuid: Some("00000000-0000-0000-0000-000000000002".to_string()),
            extra: Vec::new(),
        });
        fp.graphical_items.push(Graphic::Shape(Shape::new(
            ShapeKind::Arc {
                start: Point::new(-1.0, 0.0),
                mid: Point::new(0.0, -1.0),
                end: Point::new(1.0, 0.0),
            },
            "F.SilkS",
            0.12,
        )));
        let mut label = Text::field(TextKind::User, "label");
        label.position = Point::new(0.0, 3.0);
        label.angle = 10.0;
        fp.graphical_items.push(Graphic::Text(label));
        fp
    }

    #[test]
    fn test_flip_layer_name() {
        assert_eq!(flip_layer_name("F.Cu"), "B.Cu");
        assert_eq!(flip_layer_name("B.SilkS"), "F.SilkS");
        assert_eq!(flip_layer_name("*.Cu"), "*.Cu");
        assert_eq!(flip_layer_name("Edge.Cuts"), "Edge.Cuts");
    }

    #[test]
    fn test_flip_keeps_position() {
        let mut fp = footprint();
        fp.set_orientation(43.0);
        let before = fp.position;
        fp.flip();
        assert_eq!(fp.position, before);
        assert_eq!(fp.orientation, -43.0);
        assert!(fp.is_flipped());
    }

    #[test]
    fn test_flip_mirrors_children() {
        let mut fp = footprint();
        fp.flip();

        let pad = &fp.pads[0];
        assert_eq!(pad.position, Point::new(1.0, -2.0));
        assert_eq!(pad.angle, -30.0);
        assert_eq!(pad.layers, vec!["B.Cu", "B.Paste", "*.Mask"]);

        match &fp.graphical_items[1] {
            Graphic::Shape(s) => {
                assert_eq!(s.layer, "B.SilkS");
                assert_eq!(
                    s.kind,
                    ShapeKind::Arc {
                        start: Point::new(1.0, 0.0),
                        mid: Point::new(0.0, 1.0),
                        end: Point::new(-1.0, 0.0),
                    }
                );
            }
            other => panic!("expected shape, got {:?}", other),
        }

        match &fp.graphical_items[2] {
            Graphic::Text(t) => {
                assert_eq!(t.position, Point::new(0.0, -3.0));
                assert_eq!(t.angle, -10.0);
                assert!(t.justify.mirror);
                assert_eq!(t.layer, "B.SilkS");
            }
            other => panic!("expected text, got {:?}", other),
        }
    }

    #[test]
    fn test_flip_keeps_mirror_on_user_layer_text() {
        let mut fp = footprint();
        let mut note = Text::field(TextKind::User, "note");
        note.layer = "Dwgs.User".to_string();
        fp.graphical_items.push(Graphic::Text(note));
        fp.flip();

        match fp.graphical_items.last() {
            Some(Graphic::Text(t)) => {
                assert_eq!(t.layer, "Dwgs.User");
                assert!(!t.justify.mirror);
            }
            other => panic!("expected text, got {:?}", other),
        }
    }

    #[test]
    fn test_double_flip_restores_footprint() {
        let mut fp = footprint();
        fp.set_orientation(43.0);
        fp.flip();
        fp.flip();
        assert_eq!(fp.layer, "F.Cu");
        assert_eq!(fp.orientation, 43.0);
        assert_eq!(fp.pads[0].position, Point::new(1.0, 2.0));
        assert_eq!(fp.pads[0].layers, vec!["F.Cu", "F.Paste", "*.Mask"]);
    }

    #[test]
    fn test_duplicate_refreshes_identity() {
        let fp = footprint();
        let copy = fp.duplicate("XX2", fp.position + (0.0, -19.0));
        assert_eq!(copy.reference(), "XX2");
        assert_eq!(fp.reference(), "XX1");
        assert_eq!(copy.position, Point::new(50.0, 81.0));
        assert_ne!(copy.uuid, fp.uuid);
        assert!(copy.uuid.is_some());
        assert_ne!(copy.pads[0].uuid, fp.pads[0].uuid);
        assert_eq!(copy.pads[0].position, fp.pads[0].position);
    }

    #[test]
    fn test_orientation_is_normalized() {
        let mut fp = footprint();
        fp.set_orientation(270.0);
        assert_eq!(fp.orientation, -90.0);
        fp.rotate(100.0);
        assert_eq!(fp.orientation, 10.0);
    }
}
