//! Plane geometry in KiCad board coordinates.
//!
//! Lengths are millimetres with Y growing downward. Positive angles turn
//! counter-clockwise as seen on screen, which with a downward Y axis means
//! `x' = x·cosθ + y·sinθ`, `y' = −x·sinθ + y·cosθ`.

use serde::Serialize;
use std::fmt;
use std::ops::{Add, Neg, Sub};

/// KiCad's internal resolution.
pub const NM_PER_MM: f64 = 1_000_000.0;

/// Angle resolution used when hashing: thousandths of a degree.
const MILLIDEGREES: f64 = 1000.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Reflect across the horizontal axis through the local origin.
    pub fn mirror_y(self) -> Self {
        Self::new(self.x, -self.y)
    }

    /// Rotate about the origin by `degrees`.
    pub fn rotate(self, degrees: f64) -> Self {
        if degrees == 0.0 {
            return self;
        }
        let (sin, cos) = degrees.to_radians().sin_cos();
        Self::new(
            self.x * cos + self.y * sin,
            -self.x * sin + self.y * cos,
        )
    }

    /// Integer nanometre coordinates.
    pub fn quantized(self) -> (i64, i64) {
        (to_nm(self.x), to_nm(self.y))
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Add<(f64, f64)> for Point {
    type Output = Point;

    fn add(self, (dx, dy): (f64, f64)) -> Point {
        Point::new(self.x + dx, self.y + dy)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Neg for Point {
    type Output = Point;

    fn neg(self) -> Point {
        Point::new(-self.x, -self.y)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", format_number(self.x), format_number(self.y))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Size2D {
    pub width: f64,
    pub height: f64,
}

impl Size2D {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn quantized(self) -> (i64, i64) {
        (to_nm(self.width), to_nm(self.height))
    }
}

impl fmt::Display for Size2D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", format_number(self.width), format_number(self.height))
    }
}

/// Placement of a footprint: maps local child geometry onto the board.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Frame {
    pub origin: Point,
    pub angle: f64,
}

impl Frame {
    pub const fn new(origin: Point, angle: f64) -> Self {
        Self { origin, angle }
    }

    pub fn to_board(&self, local: Point) -> Point {
        self.origin + local.rotate(self.angle)
    }

    pub fn angle_to_board(&self, local: f64) -> f64 {
        normalize_degrees(local + self.angle)
    }
}

/// Normalize into `[0, 360)`.
pub fn normalize_degrees(degrees: f64) -> f64 {
    let a = degrees % 360.0;
    let a = if a < 0.0 { a + 360.0 } else { a };
    // -0.0 and values that round up to 360
    if a == 0.0 || a >= 360.0 {
        0.0
    } else {
        a
    }
}

/// Normalize into `(-180, 180]`, the range KiCad writes footprint angles in.
pub fn normalize_degrees_180(degrees: f64) -> f64 {
    let a = normalize_degrees(degrees);
    if a > 180.0 {
        a - 360.0
    } else {
        a
    }
}

pub fn to_nm(mm: f64) -> i64 {
    (mm * NM_PER_MM).round() as i64
}

/// Angle in thousandths of a degree, wrapped into one turn.
pub fn quantize_angle(degrees: f64) -> i64 {
    let q = (normalize_degrees(degrees) * MILLIDEGREES).round() as i64;
    q.rem_euclid((360.0 * MILLIDEGREES) as i64)
}

/// Shortest decimal form with at most six fractional digits, as KiCad writes.
pub fn format_number(value: f64) -> String {
    let s = format!("{:.6}", value);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    match s {
        "-0" | "" => "0".to_string(),
        _ => s.to_string(),
    }
}
