//! KiCAD PCB Parser
//!
//! This module parses KiCAD PCB files (.kicad_pcb) following the official
//! S-Expression file format specification.
//!
//! Key format details:
//! - All values are in millimeters
//! - Footprint children are stored relative to the footprint position
//! - Pad and text angles in the file include the footprint orientation;
//!   the model keeps them relative to the footprint
//! - Nodes the model does not interpret are carried along verbatim

use std::path::Path;

use thiserror::Error;

use crate::geometry::{normalize_degrees_180, Point, Size2D};
use crate::parser::pcb_schema::*;
use crate::parser::sexp::{ParseError, SExp, SExpParser};

#[derive(Debug, Error)]
pub enum PcbParseError {
    #[error("S-expression parse error: {0}")]
    SExpParse(#[from] ParseError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid PCB format: {0}")]
    InvalidFormat(String),
    #[error("Missing required field: {0}")]
    MissingField(String),
}

const SHAPE_TAGS: [&str; 6] = ["fp_line", "fp_rect", "fp_circle", "fp_arc", "fp_poly", "fp_curve"];

/// Parser for KiCAD PCB files (KiCad 6 and later, S-expression format).
pub struct PcbParser;

impl PcbParser {
    /// Read and parse a board file.
    pub fn parse_pcb(path: &Path) -> Result<Board, PcbParseError> {
        let content = std::fs::read_to_string(path)?;
        let board = Self::parse_pcb_str(&content)?;
        tracing::info!(
            "Loaded {} with {} footprints",
            path.display(),
            board.footprints.len()
        );
        Ok(board)
    }

    /// Parse board text.
    pub fn parse_pcb_str(content: &str) -> Result<Board, PcbParseError> {
        let mut parser = SExpParser::new(content);
        let root = parser.parse()?;

        // Root should be (kicad_pcb ...)
        let tag = root
            .tag()
            .ok_or_else(|| PcbParseError::InvalidFormat("Expected kicad_pcb root".to_string()))?;

        if tag != "kicad_pcb" {
            return Err(PcbParseError::InvalidFormat(format!(
                "Expected kicad_pcb, found {}",
                tag
            )));
        }

        let mut board = Board::default();
        for item in root.children() {
            match item.tag() {
                Some("footprint") | Some("module") => {
                    let index = board.footprints.len();
                    let fp = Self::parse_footprint(item).map_err(|e| {
                        PcbParseError::InvalidFormat(format!("footprint #{}: {}", index + 1, e))
                    })?;
                    board.footprints.push(fp);
                }
                _ if board.footprints.is_empty() => board.preamble.push(item.clone()),
                _ => board.trailer.push(item.clone()),
            }
        }

        Ok(board)
    }

    fn parse_footprint(sexp: &SExp) -> Result<Footprint, PcbParseError> {
        // Footprint library is the first element after the tag
        let library = sexp
            .children()
            .first()
            .and_then(|a| a.as_atom())
            .ok_or_else(|| PcbParseError::MissingField("footprint library id".to_string()))?
            .to_string();

        let (position, orientation) = Self::parse_at(sexp)?;
        let mut fp = Footprint {
            library,
            layer: "F.Cu".to_string(),
            position,
            orientation: normalize_degrees_180(orientation),
            uuid: None,
            pads: Vec::new(),
            graphical_items: Vec::new(),
            extra: Vec::new(),
        };

        for child in sexp.children().iter().skip(1) {
            match child.tag() {
                Some("layer") => {
                    fp.layer = child
                        .atom_at(0)
                        .ok_or_else(|| PcbParseError::MissingField("footprint layer".to_string()))?
                        .to_string();
                }
                Some("uuid") | Some("tstamp") => fp.uuid = child.atom_at(0).map(str::to_string),
                Some("at") => {}
                Some("pad") => fp.pads.push(Self::parse_pad(child, fp.orientation)?),
                Some("fp_text") | Some("property") => {
                    let text = Self::parse_text(child, fp.orientation)?;
                    fp.graphical_items.push(Graphic::Text(text));
                }
                Some(tag) if SHAPE_TAGS.contains(&tag) => match Self::parse_shape(child, tag) {
                    Ok(shape) => fp.graphical_items.push(Graphic::Shape(shape)),
                    Err(e) => {
                        tracing::warn!("Keeping unsupported {} verbatim: {}", tag, e);
                        fp.extra.push(child.clone());
                    }
                },
                _ => fp.extra.push(child.clone()),
            }
        }

        Ok(fp)
    }

    fn parse_pad(sexp: &SExp, fp_orientation: f64) -> Result<Pad, PcbParseError> {
        let number = sexp
            .atom_at(0)
            .ok_or_else(|| PcbParseError::MissingField("pad number".to_string()))?
            .to_string();

        let pad_type = sexp
            .atom_at(1)
            .and_then(PadType::parse)
            .ok_or_else(|| PcbParseError::InvalidFormat(format!("pad {}: unknown type", number)))?;

        let shape = sexp
            .atom_at(2)
            .and_then(PadShape::parse)
            .ok_or_else(|| PcbParseError::InvalidFormat(format!("pad {}: unknown shape", number)))?;

        let (position, angle) = Self::parse_at(sexp)?;
        let size = Self::parse_size(sexp)?;

        let mut pad = Pad {
            number,
            pad_type,
            shape,
            position,
            angle: normalize_degrees_180(angle - fp_orientation),
            size,
            drill: None,
            layers: Vec::new(),
            net: None,
            roundrect_rratio: None,
            uuid: None,
            extra: Vec::new(),
        };

        for child in sexp.children().iter().skip(3) {
            match child.tag() {
                Some("at") | Some("size") => {}
                Some("drill") => pad.drill = Some(Self::parse_drill(child)?),
                Some("layers") => {
                    pad.layers = child
                        .children()
                        .iter()
                        .filter_map(|l| l.as_atom())
                        .map(str::to_string)
                        .collect();
                }
                Some("net") => pad.net = Self::parse_net(child),
                Some("roundrect_rratio") => pad.roundrect_rratio = child.f64_at(0),
                Some("uuid") | Some("tstamp") => pad.uuid = child.atom_at(0).map(str::to_string),
                _ => pad.extra.push(child.clone()),
            }
        }

        Ok(pad)
    }

    fn parse_drill(sexp: &SExp) -> Result<Drill, PcbParseError> {
        let mut drill = Drill {
            oval: false,
            diameter: 0.0,
            width: None,
            offset: None,
        };
        let mut numbers = Vec::new();
        for child in sexp.children() {
            match child {
                SExp::Atom(s) if s == "oval" => drill.oval = true,
                SExp::List(_) if child.tag() == Some("offset") => {
                    drill.offset = Some(Point::new(
                        child.f64_at(0).unwrap_or(0.0),
                        child.f64_at(1).unwrap_or(0.0),
                    ));
                }
                _ => {
                    if let Some(atom) = child.as_atom() {
                        let value = atom
                            .parse::<f64>()
                            .map_err(|_| ParseError::InvalidNumber(atom.to_string()))?;
                        numbers.push(value);
                    }
                }
            }
        }
        drill.diameter = numbers.first().copied().unwrap_or(0.0);
        drill.width = numbers.get(1).copied();
        Ok(drill)
    }

    fn parse_net(sexp: &SExp) -> Option<PadNet> {
        match (sexp.atom_at(0), sexp.atom_at(1)) {
            (Some(id), Some(name)) => Some(PadNet {
                id: id.parse().ok(),
                name: name.to_string(),
            }),
            (Some(name), None) => Some(PadNet {
                id: None,
                name: name.to_string(),
            }),
            _ => None,
        }
    }

    fn parse_text(sexp: &SExp, fp_orientation: f64) -> Result<Text, PcbParseError> {
        let (source, kind, text) = match sexp.tag() {
            Some("fp_text") => {
                let kind = match sexp.atom_at(0) {
                    Some("reference") => TextKind::Reference,
                    Some("value") => TextKind::Value,
                    _ => TextKind::User,
                };
                (TextSource::FpText, kind, sexp.atom_at(1))
            }
            _ => {
                let kind = match sexp.atom_at(0) {
                    Some("Reference") => TextKind::Reference,
                    Some("Value") => TextKind::Value,
                    Some(name) => TextKind::Field(name.to_string()),
                    None => return Err(PcbParseError::MissingField("property name".to_string())),
                };
                (TextSource::Property, kind, sexp.atom_at(1))
            }
        };
        let text = text
            .ok_or_else(|| PcbParseError::MissingField("text content".to_string()))?
            .to_string();

        // Properties may leave placement out entirely
        let (position, angle) = match sexp.find("at") {
            Some(_) => Self::parse_at(sexp)?,
            None => (Point::default(), fp_orientation),
        };

        let mut item = Text {
            kind,
            source,
            text,
            position,
            angle: normalize_degrees_180(angle - fp_orientation),
            layer: String::new(),
            hidden: sexp.has_flag("hide"),
            unlocked: sexp.has_flag("unlocked")
                || sexp.find("at").is_some_and(|at| at.has_flag("unlocked")),
            font: TextFont::default(),
            justify: Justify::default(),
            uuid: None,
            extra: Vec::new(),
        };

        for child in sexp.children().iter().skip(2) {
            match child.tag() {
                Some("at") | Some("hide") | Some("unlocked") => {}
                Some("layer") => item.layer = child.atom_at(0).unwrap_or_default().to_string(),
                Some("uuid") | Some("tstamp") => item.uuid = child.atom_at(0).map(str::to_string),
                Some("effects") => Self::parse_effects(child, &mut item),
                Some(_) => item.extra.push(child.clone()),
                // bare flags such as `hide` are already folded in
                None => {}
            }
        }

        Ok(item)
    }

    fn parse_effects(sexp: &SExp, text: &mut Text) {
        if sexp.has_flag("hide") {
            text.hidden = true;
        }
        if let Some(font) = sexp.find("font") {
            if let Some(size) = font.find("size") {
                // KiCad writes font size as (size HEIGHT WIDTH)
                text.font.size = Size2D::new(
                    size.f64_at(1).unwrap_or(1.0),
                    size.f64_at(0).unwrap_or(1.0),
                );
            }
            if let Some(thickness) = font.find("thickness").and_then(|t| t.f64_at(0)) {
                text.font.thickness = thickness;
            }
            text.font.bold = font.has_flag("bold");
            text.font.italic = font.has_flag("italic");
        }
        if let Some(justify) = sexp.find("justify") {
            for atom in justify.children().iter().filter_map(|a| a.as_atom()) {
                match atom {
                    "left" => text.justify.horizontal = HAlign::Left,
                    "right" => text.justify.horizontal = HAlign::Right,
                    "top" => text.justify.vertical = VAlign::Top,
                    "bottom" => text.justify.vertical = VAlign::Bottom,
                    "mirror" => text.justify.mirror = true,
                    _ => {}
                }
            }
        }
    }

    fn parse_shape(sexp: &SExp, tag: &str) -> Result<Shape, PcbParseError> {
        let kind = match tag {
            "fp_line" => ShapeKind::Line {
                start: Self::parse_xy(sexp, "start")?,
                end: Self::parse_xy(sexp, "end")?,
            },
            "fp_rect" => ShapeKind::Rect {
                start: Self::parse_xy(sexp, "start")?,
                end: Self::parse_xy(sexp, "end")?,
            },
            "fp_circle" => ShapeKind::Circle {
                center: Self::parse_xy(sexp, "center")?,
                end: Self::parse_xy(sexp, "end")?,
            },
            "fp_arc" => ShapeKind::Arc {
                start: Self::parse_xy(sexp, "start")?,
                // KiCad 5 arcs have no mid point
                mid: Self::parse_xy(sexp, "mid")?,
                end: Self::parse_xy(sexp, "end")?,
            },
            "fp_poly" => ShapeKind::Poly {
                points: Self::parse_pts(sexp)?,
            },
            "fp_curve" => ShapeKind::Curve {
                points: Self::parse_pts(sexp)?,
            },
            other => {
                return Err(PcbParseError::InvalidFormat(format!(
                    "Not a footprint shape: {}",
                    other
                )))
            }
        };

        let layer = sexp
            .value_of("layer")
            .ok_or_else(|| PcbParseError::MissingField(format!("{} layer", tag)))?
            .to_string();

        let stroke = sexp.find("stroke");
        let width = stroke
            .and_then(|s| s.find("width"))
            .or_else(|| sexp.find("width"))
            .and_then(|w| w.f64_at(0))
            .unwrap_or(0.0);

        let mut shape = Shape::new(kind, layer, width);
        shape.stroke_type = stroke.and_then(|s| s.value_of("type")).map(str::to_string);
        shape.fill = sexp.value_of("fill").map(str::to_string);

        for child in sexp.children() {
            match child.tag() {
                Some("start") | Some("end") | Some("mid") | Some("center") | Some("pts")
                | Some("layer") | Some("stroke") | Some("width") | Some("fill") => {}
                Some("uuid") | Some("tstamp") => shape.uuid = child.atom_at(0).map(str::to_string),
                _ => shape.extra.push(child.clone()),
            }
        }

        Ok(shape)
    }

    /// `(at x y [angle])` → position and angle.
    fn parse_at(sexp: &SExp) -> Result<(Point, f64), PcbParseError> {
        let at = sexp
            .find("at")
            .ok_or_else(|| PcbParseError::MissingField("at".to_string()))?;
        let x = Self::number(at, 0, "at")?;
        let y = Self::number(at, 1, "at")?;
        let angle = at.f64_at(2).unwrap_or(0.0);
        Ok((Point::new(x, y), angle))
    }

    fn parse_xy(sexp: &SExp, key: &str) -> Result<Point, PcbParseError> {
        let node = sexp
            .find(key)
            .ok_or_else(|| PcbParseError::MissingField(key.to_string()))?;
        Ok(Point::new(
            Self::number(node, 0, key)?,
            Self::number(node, 1, key)?,
        ))
    }

    fn parse_size(sexp: &SExp) -> Result<Size2D, PcbParseError> {
        let node = sexp
            .find("size")
            .ok_or_else(|| PcbParseError::MissingField("size".to_string()))?;
        Ok(Size2D::new(
            Self::number(node, 0, "size")?,
            Self::number(node, 1, "size")?,
        ))
    }

    fn parse_pts(sexp: &SExp) -> Result<Vec<Point>, PcbParseError> {
        let pts = sexp
            .find("pts")
            .ok_or_else(|| PcbParseError::MissingField("pts".to_string()))?;
        pts.find_all("xy")
            .into_iter()
            .map(|xy| Ok(Point::new(Self::number(xy, 0, "xy")?, Self::number(xy, 1, "xy")?)))
            .collect()
    }

    fn number(node: &SExp, index: usize, what: &str) -> Result<f64, PcbParseError> {
        let atom = node
            .atom_at(index)
            .ok_or_else(|| PcbParseError::InvalidFormat(format!("Invalid '{}' format", what)))?;
        atom.parse()
            .map_err(|_| ParseError::InvalidNumber(atom.to_string()).into())
    }
}

impl Board {
    /// Load a board file from disk.
    pub fn load(path: &Path) -> Result<Board, PcbParseError> {
        PcbParser::parse_pcb(path)
    }

    pub fn parse_str(content: &str) -> Result<Board, PcbParseError> {
        PcbParser::parse_pcb_str(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOARD: &str = r#"(kicad_pcb (version 20240108) (generator "pcbnew")
  (general (thickness 1.6))
  (net 0 "")
  (net 1 "GND")
  (footprint "test:part" (layer "F.Cu") (uuid "0c1b4d37-3c3b-4d7e-9b0e-0a7d1f4c1a01")
    (at 69 100 43)
    (property "Reference" "XX3" (at 0 -2.5 43) (layer "F.SilkS") (uuid "a1")
      (effects (font (size 1 1) (thickness 0.15))))
    (property "Value" "part" (at 0 2.5 43) (layer "F.Fab") (hide yes)
      (effects (font (size 1 1) (thickness 0.15))))
    (fp_text user "${REFERENCE}" (at 0 0 43) (layer "F.Fab")
      (effects (font (size 0.8 0.8) (thickness 0.12)) (justify left)))
    (fp_line (start -2 -1) (end 2 -1) (stroke (width 0.12) (type solid)) (layer "F.SilkS") (uuid "b1"))
    (fp_arc (start -1 0) (mid 0 1) (end 1 0) (stroke (width 0.1) (type solid)) (layer "F.Fab"))
    (fp_poly (pts (xy 0 0) (xy 1 0) (xy 1 1)) (stroke (width 0) (type solid)) (fill solid) (layer "F.Cu"))
    (pad "1" thru_hole circle (at -1.27 0 43) (size 1.7 1.7) (drill 1.0 (offset 0.1 0))
      (layers "*.Cu" "*.Mask") (net 1 "GND") (uuid "c1"))
    (pad "2" smd roundrect (at 1.27 0 133) (size 1 1.5) (layers "F.Cu" "F.Paste" "F.Mask")
      (roundrect_rratio 0.25))
    (model "${KICAD8_3DMODEL_DIR}/part.wrl" (offset (xyz 0 0 0)))
  )
  (gr_line (start 0 0) (end 10 0) (stroke (width 0.1) (type solid)) (layer "Edge.Cuts") (uuid "d1"))
)"#;

    #[test]
    fn test_parse_board_structure() {
        let board = Board::parse_str(BOARD).unwrap();
        assert_eq!(board.version(), Some("20240108"));
        assert_eq!(board.references(), vec!["XX3"]);
        assert_eq!(board.preamble.len(), 5);
        assert_eq!(board.trailer.len(), 1);
        assert_eq!(board.geometric_items().count(), 1);
    }

    #[test]
    fn test_parse_footprint_frame() {
        let board = Board::parse_str(BOARD).unwrap();
        let fp = &board.footprints[0];
        assert_eq!(fp.library, "test:part");
        assert_eq!(fp.position, Point::new(69.0, 100.0));
        assert_eq!(fp.orientation, 43.0);
        assert!(!fp.is_flipped());
        assert_eq!(fp.extra.len(), 1);
        assert_eq!(fp.extra[0].tag(), Some("model"));
    }

    #[test]
    fn test_pad_angles_become_local() {
        let board = Board::parse_str(BOARD).unwrap();
        let fp = &board.footprints[0];
        assert_eq!(fp.pads.len(), 2);
        assert_eq!(fp.pads[0].angle, 0.0);
        assert_eq!(fp.pads[1].angle, 90.0);
        assert_eq!(fp.pads[0].net.as_ref().map(|n| n.name.as_str()), Some("GND"));
        assert_eq!(fp.pads[0].net.as_ref().and_then(|n| n.id), Some(1));
        let drill = fp.pads[0].drill.as_ref().unwrap();
        assert_eq!(drill.diameter, 1.0);
        assert_eq!(drill.offset, Some(Point::new(0.1, 0.0)));
        assert_eq!(fp.pads[1].roundrect_rratio, Some(0.25));
        assert_eq!(fp.pads[1].layers, vec!["F.Cu", "F.Paste", "F.Mask"]);
    }

    #[test]
    fn test_texts_and_shapes() {
        let board = Board::parse_str(BOARD).unwrap();
        let fp = &board.footprints[0];
        let kinds: Vec<_> = fp.items().iter().map(|i| i.kind_name()).collect();
        assert_eq!(
            kinds,
            vec!["Pad", "Pad", "Text", "Text", "Text", "Line", "Arc", "Polygon"]
        );

        let value = fp
            .graphical_items
            .iter()
            .find_map(|g| match g {
                Graphic::Text(t) if t.kind == TextKind::Value => Some(t),
                _ => None,
            })
            .unwrap();
        assert!(value.hidden);
        assert_eq!(value.angle, 0.0);
        assert_eq!(value.source, TextSource::Property);

        let user = fp
            .graphical_items
            .iter()
            .find_map(|g| match g {
                Graphic::Text(t) if t.kind == TextKind::User => Some(t),
                _ => None,
            })
            .unwrap();
        assert_eq!(user.justify.horizontal, HAlign::Left);
        assert_eq!(user.font.size, Size2D::new(0.8, 0.8));
        assert_eq!(user.source, TextSource::FpText);

        let poly = fp
            .graphical_items
            .iter()
            .find_map(|g| match g {
                Graphic::Shape(s) if matches!(s.kind, ShapeKind::Poly { .. }) => Some(s),
                _ => None,
            })
            .unwrap();
        assert!(poly.is_filled());
        assert_eq!(poly.kind.points().len(), 3);
    }

    #[test]
    fn test_rejects_other_roots() {
        let err = Board::parse_str("(kicad_sch (version 1))").unwrap_err();
        assert!(matches!(err, PcbParseError::InvalidFormat(_)));
    }

    #[test]
    fn test_footprint_without_position_is_an_error() {
        let err = Board::parse_str("(kicad_pcb (footprint \"a:b\" (layer \"F.Cu\")))").unwrap_err();
        assert!(err.to_string().contains("footprint #1"));
    }

    #[test]
    fn test_legacy_arc_is_kept_verbatim() {
        let board = Board::parse_str(
            "(kicad_pcb (footprint \"a:b\" (layer \"F.Cu\") (at 0 0) \
             (fp_arc (start 0 0) (end 1 0) (angle 90) (layer \"F.SilkS\") (width 0.12))))",
        )
        .unwrap();
        let fp = &board.footprints[0];
        assert!(fp.graphical_items.is_empty());
        assert_eq!(fp.extra[0].tag(), Some("fp_arc"));
    }
}
