//! Polygon construction for strokes, arcs and aperture outlines.

use std::f64::consts::{PI, TAU};

use crate::types::{Contour, Point, Shape};

/// Maximum angle covered by one chord when arcs are flattened (~2 degrees).
pub const ARC_SEGMENT_ANGLE: f64 = PI / 90.0;

/// Segments shorter than this are treated as degenerate.
pub const DEGENERATE_LENGTH: f64 = 1e-9;

/// Rotate a point around the origin by the given angle in degrees.
pub fn rotate_point(p: Point, angle_deg: f64) -> Point {
    if angle_deg.abs() < 1e-9 {
        return p;
    }
    let (sin_a, cos_a) = angle_deg.to_radians().sin_cos();
    [p[0] * cos_a - p[1] * sin_a, p[0] * sin_a + p[1] * cos_a]
}

/// The filled rectangle swept by a straight draw of the given width.
///
/// Both endpoints are displaced along the segment's unit normal by half the
/// width. Returns `None` for zero-length segments.
pub fn stroke_rectangle(start: Point, end: Point, width: f64) -> Option<Contour> {
    let dx = end[0] - start[0];
    let dy = end[1] - start[1];
    let len = dx.hypot(dy);
    if len < DEGENERATE_LENGTH {
        return None;
    }
    let half = width / 2.0;
    let nx = -dy / len * half;
    let ny = dx / len * half;
    Some(vec![
        [start[0] + nx, start[1] + ny],
        [start[0] - nx, start[1] - ny],
        [end[0] - nx, end[1] - ny],
        [end[0] + nx, end[1] + ny],
    ])
}

/// Number of chords used to flatten a sweep.
fn segment_count(sweep: f64) -> usize {
    ((sweep.abs() / ARC_SEGMENT_ANGLE).ceil() as usize).max(2)
}

/// Points along an arc, both endpoints included.
///
/// `sweep` is signed: positive is counter-clockwise.
pub fn arc_points(center: Point, radius: f64, start_angle: f64, sweep: f64) -> Vec<Point> {
    let n = segment_count(sweep);
    (0..=n)
        .map(|k| {
            let a = start_angle + sweep * (k as f64) / (n as f64);
            [center[0] + radius * a.cos(), center[1] + radius * a.sin()]
        })
        .collect()
}

/// A closed counter-clockwise polygon approximating a circle.
pub fn circle_polygon(center: Point, radius: f64) -> Contour {
    let mut pts = arc_points(center, radius, 0.0, TAU);
    pts.pop();
    pts
}

/// The annular band swept by an arc draw of the given width.
///
/// A full-circle sweep yields a ring (outer contour plus a hole); anything
/// shorter yields a single band contour without end caps.
pub fn arc_band(center: Point, radius: f64, start_angle: f64, sweep: f64, width: f64) -> Shape {
    let outer_r = radius + width / 2.0;
    let inner_r = (radius - width / 2.0).max(0.0);

    if sweep.abs() >= TAU - 1e-9 {
        let mut shape = vec![circle_polygon(center, outer_r)];
        if inner_r > DEGENERATE_LENGTH {
            let mut hole = circle_polygon(center, inner_r);
            hole.reverse();
            shape.push(hole);
        }
        return shape;
    }

    let mut band = arc_points(center, outer_r, start_angle, sweep);
    let mut inner = arc_points(center, inner_r, start_angle, sweep);
    inner.reverse();
    band.extend(inner);
    if sweep < 0.0 {
        band.reverse();
    }
    vec![band]
}

/// Axis-aligned rectangle centred on a point, counter-clockwise.
pub fn centered_rectangle(center: Point, width: f64, height: f64) -> Contour {
    let hw = width / 2.0;
    let hh = height / 2.0;
    vec![
        [center[0] - hw, center[1] - hh],
        [center[0] + hw, center[1] - hh],
        [center[0] + hw, center[1] + hh],
        [center[0] - hw, center[1] + hh],
    ]
}

/// Stadium outline: a rectangle with semicircular caps on the shorter axis.
pub fn obround_polygon(center: Point, x_size: f64, y_size: f64) -> Contour {
    const SEGS: usize = 16;
    let [cx, cy] = center;
    let mut pts = Vec::with_capacity(SEGS * 2 + 2);

    if x_size >= y_size {
        let r = y_size / 2.0;
        let straight = x_size / 2.0 - r;
        for (offset, base) in [(straight, -PI / 2.0), (-straight, PI / 2.0)] {
            for k in 0..=SEGS {
                let a = base + PI * (k as f64) / (SEGS as f64);
                pts.push([cx + offset + r * a.cos(), cy + r * a.sin()]);
            }
        }
    } else {
        let r = x_size / 2.0;
        let straight = y_size / 2.0 - r;
        for (offset, base) in [(straight, 0.0), (-straight, PI)] {
            for k in 0..=SEGS {
                let a = base + PI * (k as f64) / (SEGS as f64);
                pts.push([cx + r * a.cos(), cy + offset + r * a.sin()]);
            }
        }
    }

    pts
}

/// Regular polygon inscribed in a circle of the given diameter.
/// The first vertex sits at `rotation` degrees.
pub fn regular_polygon(center: Point, diameter: f64, vertices: u32, rotation: f64) -> Contour {
    let r = diameter / 2.0;
    let n = vertices.max(3);
    let rot = rotation.to_radians();
    (0..n)
        .map(|k| {
            let a = rot + TAU * (k as f64) / (n as f64);
            [center[0] + r * a.cos(), center[1] + r * a.sin()]
        })
        .collect()
}

/// Signed area via the shoelace formula. Positive for counter-clockwise.
pub fn contour_area(contour: &[Point]) -> f64 {
    let n = contour.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..n {
        let a = contour[i];
        let b = contour[(i + 1) % n];
        sum += a[0] * b[1] - b[0] * a[1];
    }
    sum / 2.0
}

/// Total filled area of a shape set (holes subtract).
pub fn shapes_area(shapes: &[Shape]) -> f64 {
    shapes
        .iter()
        .map(|shape| {
            shape
                .iter()
                .enumerate()
                .map(|(i, c)| {
                    let a = contour_area(c).abs();
                    if i == 0 {
                        a
                    } else {
                        -a
                    }
                })
                .sum::<f64>()
        })
        .sum()
}

/// Orient a shape so its outer contour is counter-clockwise and holes clockwise.
pub fn orient_shape(shape: &mut Shape) {
    for (i, contour) in shape.iter_mut().enumerate() {
        let ccw = contour_area(contour) > 0.0;
        if (i == 0) != ccw {
            contour.reverse();
        }
    }
}

/// Whether `angle` lies on the arc starting at `start` with signed `sweep`.
fn angle_on_arc(angle: f64, start: f64, sweep: f64) -> bool {
    if sweep >= 0.0 {
        (angle - start).rem_euclid(TAU) <= sweep
    } else {
        (start - angle).rem_euclid(TAU) <= -sweep
    }
}

/// Axis-aligned extreme points (0°, 90°, 180°, 270°) the arc passes through.
pub fn arc_extremes(center: Point, radius: f64, start_angle: f64, sweep: f64) -> Vec<Point> {
    [0.0, PI / 2.0, PI, 3.0 * PI / 2.0]
        .into_iter()
        .filter(|&a| sweep.abs() >= TAU - 1e-9 || angle_on_arc(a, start_angle, sweep))
        .map(|a| [center[0] + radius * a.cos(), center[1] + radius * a.sin()])
        .collect()
}
