//! PCB Schema Definitions
//!
//! In-memory model of the parts of a KiCad board (.kicad_pcb) that footprint
//! placement depends on. Footprint children keep their geometry in the
//! footprint's local frame; board coordinates are derived through
//! [`Footprint::frame`].

use std::fmt;

use serde::Serialize;

use crate::geometry::{Frame, Point, Size2D};
use crate::parser::sexp::SExp;

/// A loaded board.
///
/// Top-level nodes other than footprints are kept verbatim so a saved board
/// round-trips. `preamble` holds everything before the first footprint,
/// `trailer` everything after it that is not a footprint.
#[derive(Debug, Clone, Default)]
pub struct Board {
    pub preamble: Vec<SExp>,
    pub footprints: Vec<Footprint>,
    pub trailer: Vec<SExp>,
}

impl Board {
    /// File format version from the `(version ...)` node.
    pub fn version(&self) -> Option<&str> {
        self.preamble
            .iter()
            .find(|n| n.tag() == Some("version"))
            .and_then(|n| n.atom_at(0))
    }

    pub fn references(&self) -> Vec<String> {
        self.footprints.iter().map(|fp| fp.reference().to_string()).collect()
    }

    pub fn footprint(&self, reference: &str) -> Option<&Footprint> {
        self.footprints.iter().find(|fp| fp.reference() == reference)
    }

    pub fn footprint_mut(&mut self, reference: &str) -> Option<&mut Footprint> {
        self.footprints.iter_mut().find(|fp| fp.reference() == reference)
    }

    /// Append a footprint and hand it back for further edits.
    pub fn add_footprint(&mut self, footprint: Footprint) -> &mut Footprint {
        self.footprints.push(footprint);
        let last = self.footprints.len() - 1;
        &mut self.footprints[last]
    }

    /// Remove every footprint carrying `reference`; returns how many went.
    pub fn remove_footprint(&mut self, reference: &str) -> usize {
        let before = self.footprints.len();
        self.footprints.retain(|fp| fp.reference() != reference);
        before - self.footprints.len()
    }

    pub fn retain_footprints<F>(&mut self, keep: F)
    where
        F: FnMut(&Footprint) -> bool,
    {
        self.footprints.retain(keep);
    }

    /// Board-level drawings and copper that take part in the board hash.
    pub fn geometric_items(&self) -> impl Iterator<Item = &SExp> {
        self.preamble
            .iter()
            .chain(self.trailer.iter())
            .filter(|n| n.tag().is_some_and(is_board_geometry))
    }
}

fn is_board_geometry(tag: &str) -> bool {
    tag.starts_with("gr_")
        || matches!(tag, "segment" | "arc" | "via" | "zone" | "dimension" | "target")
}

/// Footprint placed on the board.
#[derive(Debug, Clone)]
pub struct Footprint {
    /// Library identifier, e.g. `Resistor_SMD:R_0603`.
    pub library: String,
    /// `F.Cu` for the front side, `B.Cu` when mirrored to the back.
    pub layer: String,
    pub position: Point,
    /// Degrees, counter-clockwise.
    pub orientation: f64,
    pub uuid: Option<String>,
    pub pads: Vec<Pad>,
    pub graphical_items: Vec<Graphic>,
    /// Children this model does not interpret (attr, path, model, ...).
    pub extra: Vec<SExp>,
}

impl Footprint {
    pub fn new(library: impl Into<String>, reference: impl Into<String>) -> Self {
        Self {
            library: library.into(),
            layer: "F.Cu".to_string(),
            position: Point::default(),
            orientation: 0.0,
            uuid: None,
            pads: Vec::new(),
            graphical_items: vec![Graphic::Text(Text::field(TextKind::Reference, reference))],
            extra: Vec::new(),
        }
    }

    /// Reference designator taken from the reference field.
    pub fn reference(&self) -> &str {
        self.reference_text().map(|t| t.text.as_str()).unwrap_or("")
    }

    pub fn set_reference(&mut self, reference: impl Into<String>) {
        let reference = reference.into();
        match self.reference_text_mut() {
            Some(text) => text.text = reference,
            None => self
                .graphical_items
                .insert(0, Graphic::Text(Text::field(TextKind::Reference, reference))),
        }
    }

    fn reference_text(&self) -> Option<&Text> {
        self.graphical_items.iter().find_map(|g| match g {
            Graphic::Text(t) if t.kind == TextKind::Reference => Some(t),
            _ => None,
        })
    }

    fn reference_text_mut(&mut self) -> Option<&mut Text> {
        self.graphical_items.iter_mut().find_map(|g| match g {
            Graphic::Text(t) if t.kind == TextKind::Reference => Some(t),
            _ => None,
        })
    }

    pub fn is_flipped(&self) -> bool {
        self.layer.starts_with("B.")
    }

    pub fn frame(&self) -> Frame {
        Frame::new(self.position, self.orientation)
    }

    /// Pads followed by graphical items, the sequence the diff works on.
    pub fn items(&self) -> Vec<ItemRef<'_>> {
        self.pads
            .iter()
            .map(ItemRef::Pad)
            .chain(self.graphical_items.iter().map(|g| match g {
                Graphic::Shape(s) => ItemRef::Shape(s),
                Graphic::Text(t) => ItemRef::Text(t),
            }))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PadType {
    ThruHole,
    Smd,
    Connect,
    NpThruHole,
}

impl PadType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "thru_hole" => Some(PadType::ThruHole),
            "smd" => Some(PadType::Smd),
            "connect" => Some(PadType::Connect),
            "np_thru_hole" => Some(PadType::NpThruHole),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PadType::ThruHole => "thru_hole",
            PadType::Smd => "smd",
            PadType::Connect => "connect",
            PadType::NpThruHole => "np_thru_hole",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PadShape {
    Circle,
    Rect,
    Oval,
    Trapezoid,
    RoundRect,
    Custom,
}

impl PadShape {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "circle" => Some(PadShape::Circle),
            "rect" => Some(PadShape::Rect),
            "oval" => Some(PadShape::Oval),
            "trapezoid" => Some(PadShape::Trapezoid),
            "roundrect" => Some(PadShape::RoundRect),
            "custom" => Some(PadShape::Custom),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PadShape::Circle => "circle",
            PadShape::Rect => "rect",
            PadShape::Oval => "oval",
            PadShape::Trapezoid => "trapezoid",
            PadShape::RoundRect => "roundrect",
            PadShape::Custom => "custom",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Drill {
    pub oval: bool,
    pub diameter: f64,
    /// Second dimension of an oval drill.
    pub width: Option<f64>,
    pub offset: Option<Point>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PadNet {
    pub id: Option<u32>,
    pub name: String,
}

/// Pad on a footprint
#[derive(Debug, Clone)]
pub struct Pad {
    pub number: String,
    pub pad_type: PadType,
    pub shape: PadShape,
    /// Local to the footprint.
    pub position: Point,
    /// Local to the footprint; the file stores it board-absolute.
    pub angle: f64,
    pub size: Size2D,
    pub drill: Option<Drill>,
    pub layers: Vec<String>,
    pub net: Option<PadNet>,
    pub roundrect_rratio: Option<f64>,
    pub uuid: Option<String>,
    pub extra: Vec<SExp>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ShapeKind {
    Line { start: Point, end: Point },
    Rect { start: Point, end: Point },
    Circle { center: Point, end: Point },
    Arc { start: Point, mid: Point, end: Point },
    Poly { points: Vec<Point> },
    Curve { points: Vec<Point> },
}

impl ShapeKind {
    pub fn name(&self) -> &'static str {
        match self {
            ShapeKind::Line { .. } => "Line",
            ShapeKind::Rect { .. } => "Rect",
            ShapeKind::Circle { .. } => "Circle",
            ShapeKind::Arc { .. } => "Arc",
            ShapeKind::Poly { .. } => "Polygon",
            ShapeKind::Curve { .. } => "Curve",
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            ShapeKind::Line { .. } => "fp_line",
            ShapeKind::Rect { .. } => "fp_rect",
            ShapeKind::Circle { .. } => "fp_circle",
            ShapeKind::Arc { .. } => "fp_arc",
            ShapeKind::Poly { .. } => "fp_poly",
            ShapeKind::Curve { .. } => "fp_curve",
        }
    }

    /// Every control point, in declaration order.
    pub fn points(&self) -> Vec<Point> {
        match self {
            ShapeKind::Line { start, end } | ShapeKind::Rect { start, end } => vec![*start, *end],
            ShapeKind::Circle { center, end } => vec![*center, *end],
            ShapeKind::Arc { start, mid, end } => vec![*start, *mid, *end],
            ShapeKind::Poly { points } | ShapeKind::Curve { points } => points.clone(),
        }
    }

    pub fn map_points<F>(&mut self, mut f: F)
    where
        F: FnMut(Point) -> Point,
    {
        match self {
            ShapeKind::Line { start, end } | ShapeKind::Rect { start, end } => {
                *start = f(*start);
                *end = f(*end);
            }
            ShapeKind::Circle { center, end } => {
                *center = f(*center);
                *end = f(*end);
            }
            ShapeKind::Arc { start, mid, end } => {
                *start = f(*start);
                *mid = f(*mid);
                *end = f(*end);
            }
            ShapeKind::Poly { points } | ShapeKind::Curve { points } => {
                for p in points.iter_mut() {
                    *p = f(*p);
                }
            }
        }
    }
}

/// Graphic shape on a footprint (`fp_line`, `fp_arc`, ...)
#[derive(Debug, Clone)]
pub struct Shape {
    pub kind: ShapeKind,
    pub layer: String,
    pub width: f64,
    pub stroke_type: Option<String>,
    pub fill: Option<String>,
    pub uuid: Option<String>,
    pub extra: Vec<SExp>,
}

impl Shape {
    pub fn new(kind: ShapeKind, layer: impl Into<String>, width: f64) -> Self {
        Self {
            kind,
            layer: layer.into(),
            width,
            stroke_type: None,
            fill: None,
            uuid: None,
            extra: Vec::new(),
        }
    }

    pub fn is_filled(&self) -> bool {
        matches!(self.fill.as_deref(), Some("solid") | Some("yes"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum TextKind {
    Reference,
    Value,
    User,
    /// Any other named footprint property.
    Field(String),
}

impl TextKind {
    pub fn property_name(&self) -> &str {
        match self {
            TextKind::Reference => "Reference",
            TextKind::Value => "Value",
            TextKind::User => "User",
            TextKind::Field(name) => name,
        }
    }
}

/// Which node form a text was read from, so it is written back the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextSource {
    FpText,
    Property,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum HAlign {
    Left,
    #[default]
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum VAlign {
    Top,
    #[default]
    Center,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Justify {
    pub horizontal: HAlign,
    pub vertical: VAlign,
    pub mirror: bool,
}

impl Justify {
    pub fn is_default(&self) -> bool {
        *self == Justify::default()
    }
}

impl fmt::Display for Justify {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let h = match self.horizontal {
            HAlign::Left => "left",
            HAlign::Center => "center",
            HAlign::Right => "right",
        };
        let v = match self.vertical {
            VAlign::Top => "top",
            VAlign::Center => "center",
            VAlign::Bottom => "bottom",
        };
        write!(f, "{} {}", h, v)?;
        if self.mirror {
            write!(f, " mirror")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextFont {
    pub size: Size2D,
    pub thickness: f64,
    pub bold: bool,
    pub italic: bool,
}

impl Default for TextFont {
    fn default() -> Self {
        Self {
            size: Size2D::new(1.0, 1.0),
            thickness: 0.15,
            bold: false,
            italic: false,
        }
    }
}

/// Text on a footprint: `fp_text` or a `property` field.
#[derive(Debug, Clone)]
pub struct Text {
    pub kind: TextKind,
    pub source: TextSource,
    pub text: String,
    /// Local to the footprint.
    pub position: Point,
    /// Local to the footprint; the file stores it board-absolute.
    pub angle: f64,
    pub layer: String,
    pub hidden: bool,
    pub unlocked: bool,
    pub font: TextFont,
    pub justify: Justify,
    pub uuid: Option<String>,
    pub extra: Vec<SExp>,
}

impl Text {
    /// A property field with default placement and font.
    pub fn field(kind: TextKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            source: TextSource::Property,
            text: text.into(),
            position: Point::default(),
            angle: 0.0,
            layer: "F.SilkS".to_string(),
            hidden: false,
            unlocked: false,
            font: TextFont::default(),
            justify: Justify::default(),
            uuid: None,
            extra: Vec::new(),
        }
    }
}

/// Non-pad footprint child.
#[derive(Debug, Clone)]
pub enum Graphic {
    Shape(Shape),
    Text(Text),
}

/// Borrowed view of one footprint item.
///
/// Each variant supports a subset of the attribute groups below; accessors
/// return `None` for groups a variant does not carry.
///
/// | variant | position | orientation | layer | text |
/// |---------|----------|-------------|-------|------|
/// | Pad     | yes      | yes         | yes   | no   |
/// | Shape   | yes      | no          | yes   | no   |
/// | Text    | yes      | yes         | yes   | yes  |
#[derive(Debug, Clone, Copy)]
pub enum ItemRef<'a> {
    Pad(&'a Pad),
    Shape(&'a Shape),
    Text(&'a Text),
}

/// Text attributes in board space.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextAttributes {
    pub text: String,
    pub orientation: f64,
    pub justification: String,
    pub size: Size2D,
    pub thickness: f64,
}

impl<'a> ItemRef<'a> {
    pub fn kind_name(&self) -> &'static str {
        match self {
            ItemRef::Pad(_) => "Pad",
            ItemRef::Shape(s) => s.kind.name(),
            ItemRef::Text(_) => "Text",
        }
    }

    /// Anchor point in board coordinates.
    pub fn position(&self, frame: &Frame) -> Option<Point> {
        let local = match self {
            ItemRef::Pad(p) => p.position,
            ItemRef::Text(t) => t.position,
            ItemRef::Shape(s) => *s.kind.points().first()?,
        };
        Some(frame.to_board(local))
    }

    /// Orientation in board space, `[0, 360)`.
    pub fn orientation(&self, frame: &Frame) -> Option<f64> {
        match self {
            ItemRef::Pad(p) => Some(frame.angle_to_board(p.angle)),
            ItemRef::Text(t) => Some(frame.angle_to_board(t.angle)),
            ItemRef::Shape(_) => None,
        }
    }

    pub fn layer(&self) -> Option<&'a str> {
        match self {
            ItemRef::Pad(p) => p.layers.first().map(|l| l.as_str()),
            ItemRef::Shape(s) => Some(s.layer.as_str()),
            ItemRef::Text(t) => Some(t.layer.as_str()),
        }
    }

    pub fn text(&self, frame: &Frame) -> Option<TextAttributes> {
        match self {
            ItemRef::Text(t) => Some(TextAttributes {
                text: t.text.clone(),
                orientation: frame.angle_to_board(t.angle),
                justification: t.justify.to_string(),
                size: t.font.size,
                thickness: t.font.thickness,
            }),
            _ => None,
        }
    }
}
