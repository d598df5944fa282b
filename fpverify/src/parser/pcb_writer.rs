//! Board serialization back to the KiCad S-expression format.

use std::path::Path;

use crate::geometry::{format_number, normalize_degrees_180, Point};
use crate::parser::pcb::PcbParseError;
use crate::parser::pcb_schema::*;
use crate::parser::sexp::SExp;

/// Footprint children KiCad writes after pads.
const TRAILING_TAGS: [&str; 3] = ["model", "zone", "group"];

/// First board version written by KiCad 8.
const KICAD8_VERSION: u32 = 20240108;

/// How `fp_text` spells its boolean flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagStyle {
    /// KiCad 7 and older: bare `hide`, `unlocked` inside `(at ...)`.
    Bare,
    /// KiCad 8: `(hide yes)`, `(unlocked yes)`.
    YesNo,
}

impl FlagStyle {
    pub fn for_board(board: &Board) -> Self {
        match board.version().and_then(|v| v.parse::<u32>().ok()) {
            Some(version) if version < KICAD8_VERSION => FlagStyle::Bare,
            _ => FlagStyle::YesNo,
        }
    }
}

pub struct PcbWriter;

impl PcbWriter {
    pub fn write_pcb_str(board: &Board) -> String {
        Self::board_to_sexp(board).to_pretty_string()
    }

    pub fn board_to_sexp(board: &Board) -> SExp {
        let mut items = Vec::with_capacity(board.preamble.len() + board.footprints.len() + board.trailer.len());
        items.extend(board.preamble.iter().cloned());
        let style = FlagStyle::for_board(board);
        items.extend(board.footprints.iter().map(|fp| Self::footprint_to_sexp(fp, style)));
        items.extend(board.trailer.iter().cloned());
        SExp::node("kicad_pcb", items)
    }

    pub fn footprint_to_sexp(fp: &Footprint, style: FlagStyle) -> SExp {
        let mut items = vec![
            SExp::string(&fp.library),
            SExp::node("layer", vec![SExp::string(&fp.layer)]),
        ];
        if let Some(uuid) = &fp.uuid {
            items.push(uuid_node(uuid));
        }
        items.push(at_node(fp.position, fp.orientation));

        let is_trailing = |n: &SExp| n.tag().is_some_and(|t| TRAILING_TAGS.contains(&t));
        items.extend(fp.extra.iter().filter(|n| !is_trailing(*n)).cloned());
        for item in &fp.graphical_items {
            items.push(match item {
                Graphic::Text(text) => Self::text_to_sexp(text, fp.orientation, style),
                Graphic::Shape(shape) => Self::shape_to_sexp(shape),
            });
        }
        items.extend(fp.pads.iter().map(|p| Self::pad_to_sexp(p, fp.orientation)));
        items.extend(fp.extra.iter().filter(|n| is_trailing(*n)).cloned());

        SExp::node("footprint", items)
    }

    pub fn pad_to_sexp(pad: &Pad, fp_orientation: f64) -> SExp {
        let mut items = vec![
            SExp::string(&pad.number),
            SExp::atom(pad.pad_type.as_str()),
            SExp::atom(pad.shape.as_str()),
            at_node(pad.position, pad.angle + fp_orientation),
            SExp::node("size", vec![num(pad.size.width), num(pad.size.height)]),
        ];
        if let Some(drill) = &pad.drill {
            let mut args = Vec::new();
            if drill.oval {
                args.push(SExp::atom("oval"));
            }
            args.push(num(drill.diameter));
            if let Some(width) = drill.width {
                args.push(num(width));
            }
            if let Some(offset) = drill.offset {
                args.push(SExp::node("offset", vec![num(offset.x), num(offset.y)]));
            }
            items.push(SExp::node("drill", args));
        }
        items.push(SExp::node(
            "layers",
            pad.layers.iter().map(SExp::string).collect(),
        ));
        if let Some(ratio) = pad.roundrect_rratio {
            items.push(SExp::node("roundrect_rratio", vec![num(ratio)]));
        }
        if let Some(net) = &pad.net {
            let mut args = Vec::new();
            if let Some(id) = net.id {
                args.push(SExp::atom(id.to_string()));
            }
            args.push(SExp::string(&net.name));
            items.push(SExp::node("net", args));
        }
        items.extend(pad.extra.iter().cloned());
        if let Some(uuid) = &pad.uuid {
            items.push(uuid_node(uuid));
        }
        SExp::node("pad", items)
    }

    pub fn text_to_sexp(text: &Text, fp_orientation: f64, style: FlagStyle) -> SExp {
        let (tag, mut items) = match text.source {
            TextSource::Property => (
                "property",
                vec![SExp::string(text.kind.property_name())],
            ),
            TextSource::FpText => {
                let kind = match text.kind {
                    TextKind::Reference => "reference",
                    TextKind::Value => "value",
                    _ => "user",
                };
                ("fp_text", vec![SExp::atom(kind)])
            }
        };
        items.push(SExp::string(&text.text));

        let bare = style == FlagStyle::Bare && text.source == TextSource::FpText;
        let mut at = at_node(text.position, text.angle + fp_orientation);
        if text.unlocked && bare {
            if let Some(args) = at.as_list_mut() {
                args.push(SExp::atom("unlocked"));
            }
        }
        items.push(at);
        if text.unlocked && !bare {
            items.push(yes_node("unlocked"));
        }
        items.push(SExp::node("layer", vec![SExp::string(&text.layer)]));
        if text.hidden {
            items.push(if bare { SExp::atom("hide") } else { yes_node("hide") });
        }
        if let Some(uuid) = &text.uuid {
            items.push(uuid_node(uuid));
        }

        let mut font = vec![
            SExp::node("size", vec![num(text.font.size.height), num(text.font.size.width)]),
            SExp::node("thickness", vec![num(text.font.thickness)]),
        ];
        if text.font.bold {
            font.push(yes_node("bold"));
        }
        if text.font.italic {
            font.push(yes_node("italic"));
        }
        let mut effects = vec![SExp::node("font", font)];
        if !text.justify.is_default() {
            let mut justify = Vec::new();
            match text.justify.horizontal {
                HAlign::Left => justify.push(SExp::atom("left")),
                HAlign::Right => justify.push(SExp::atom("right")),
                HAlign::Center => {}
            }
            match text.justify.vertical {
                VAlign::Top => justify.push(SExp::atom("top")),
                VAlign::Bottom => justify.push(SExp::atom("bottom")),
                VAlign::Center => {}
            }
            if text.justify.mirror {
                justify.push(SExp::atom("mirror"));
            }
            effects.push(SExp::node("justify", justify));
        }
        items.push(SExp::node("effects", effects));
        items.extend(text.extra.iter().cloned());

        SExp::node(tag, items)
    }

    pub fn shape_to_sexp(shape: &Shape) -> SExp {
        let mut items = match &shape.kind {
            ShapeKind::Line { start, end } | ShapeKind::Rect { start, end } => {
                vec![xy_node("start", *start), xy_node("end", *end)]
            }
            ShapeKind::Circle { center, end } => {
                vec![xy_node("center", *center), xy_node("end", *end)]
            }
            ShapeKind::Arc { start, mid, end } => vec![
                xy_node("start", *start),
                xy_node("mid", *mid),
                xy_node("end", *end),
            ],
            ShapeKind::Poly { points } | ShapeKind::Curve { points } => vec![SExp::node(
                "pts",
                points.iter().map(|p| xy_node("xy", *p)).collect(),
            )],
        };
        items.push(SExp::node(
            "stroke",
            vec![
                SExp::node("width", vec![num(shape.width)]),
                SExp::node(
                    "type",
                    vec![SExp::atom(shape.stroke_type.as_deref().unwrap_or("solid"))],
                ),
            ],
        ));
        if let Some(fill) = &shape.fill {
            items.push(SExp::node("fill", vec![SExp::atom(fill.as_str())]));
        }
        items.push(SExp::node("layer", vec![SExp::string(&shape.layer)]));
        if let Some(uuid) = &shape.uuid {
            items.push(uuid_node(uuid));
        }
        items.extend(shape.extra.iter().cloned());
        SExp::node(shape.kind.tag(), items)
    }
}

fn num(value: f64) -> SExp {
    SExp::atom(format_number(value))
}

fn xy_node(tag: &str, p: Point) -> SExp {
    SExp::node(tag, vec![num(p.x), num(p.y)])
}

/// `(at x y)`, with the angle only when it is not zero.
fn at_node(p: Point, angle: f64) -> SExp {
    let angle = normalize_degrees_180(angle);
    let mut args = vec![num(p.x), num(p.y)];
    if format_number(angle) != "0" {
        args.push(num(angle));
    }
    SExp::node("at", args)
}

fn uuid_node(uuid: &str) -> SExp {
    SExp::node("uuid", vec![SExp::string(uuid)])
}

fn yes_node(tag: &str) -> SExp {
    SExp::node(tag, vec![SExp::atom("yes")])
}

impl Board {
    /// Write the board to `path` in KiCad layout.
    pub fn save(&self, path: &Path) -> Result<(), PcbParseError> {
        std::fs::write(path, PcbWriter::write_pcb_str(self))?;
        tracing::info!("Saved board to {}", path.display());
        Ok(())
    }

    pub fn to_kicad_string(&self) -> String {
        PcbWriter::write_pcb_str(self)
    }
}
