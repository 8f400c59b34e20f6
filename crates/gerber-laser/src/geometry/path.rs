use std::fmt::Write;

use crate::types::{round_f64, Contour, Point, Shape};

/// One vector drawing primitive emitted by the plotter.
#[derive(Debug, Clone, PartialEq)]
pub enum PathPrimitive {
    MoveTo(Point),
    LineTo(Point),
    /// Circular arc from the current point to `end`.
    /// Flags follow the usual path grammar: `sweep` true is counter-clockwise
    /// in Gerber's y-up coordinates.
    ArcTo {
        radius: f64,
        large_arc: bool,
        sweep: bool,
        end: Point,
    },
    ClosePath,
    /// A closed polygon, serialized as its own subpath.
    FilledPolygon(Contour),
    Circle {
        center: Point,
        radius: f64,
    },
}

/// Format a coordinate for path output: at most 6 decimals, no trailing zeros.
pub fn fmt_num(v: f64) -> String {
    format!("{}", round_f64(v, 6))
}

fn flag(b: bool) -> char {
    if b {
        '1'
    } else {
        '0'
    }
}

/// Serialize primitives into `M`/`L`/`A`/`Z` path data.
pub fn to_path_data(primitives: &[PathPrimitive]) -> String {
    let mut out = String::new();
    for prim in primitives {
        if !out.is_empty() {
            out.push(' ');
        }
        // Writing into a String cannot fail
        let _ = match prim {
            PathPrimitive::MoveTo(p) => write!(out, "M {} {}", fmt_num(p[0]), fmt_num(p[1])),
            PathPrimitive::LineTo(p) => write!(out, "L {} {}", fmt_num(p[0]), fmt_num(p[1])),
            PathPrimitive::ArcTo {
                radius,
                large_arc,
                sweep,
                end,
            } => {
                let r = fmt_num(*radius);
                write!(
                    out,
                    "A {r} {r} 0 {} {} {} {}",
                    flag(*large_arc),
                    flag(*sweep),
                    fmt_num(end[0]),
                    fmt_num(end[1])
                )
            }
            PathPrimitive::ClosePath => write!(out, "Z"),
            PathPrimitive::FilledPolygon(pts) => write_contour(&mut out, pts),
            PathPrimitive::Circle { center, radius } => {
                let r = fmt_num(*radius);
                let (right, left, y) = (
                    fmt_num(center[0] + radius),
                    fmt_num(center[0] - radius),
                    fmt_num(center[1]),
                );
                write!(
                    out,
                    "M {right} {y} A {r} {r} 0 0 1 {left} {y} A {r} {r} 0 0 1 {right} {y} Z"
                )
            }
        };
    }
    out
}

fn write_contour(out: &mut String, pts: &[Point]) -> std::fmt::Result {
    for (i, p) in pts.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let cmd = if i == 0 { 'M' } else { 'L' };
        write!(out, "{cmd} {} {}", fmt_num(p[0]), fmt_num(p[1]))?;
    }
    if !pts.is_empty() {
        out.push_str(" Z");
    }
    Ok(())
}

/// Serialize polygon shapes, one closed subpath per contour.
pub fn shapes_to_path_data(shapes: &[Shape]) -> String {
    let mut out = String::new();
    for contour in shapes.iter().flatten().filter(|c| !c.is_empty()) {
        if !out.is_empty() {
            out.push(' ');
        }
        let _ = write_contour(&mut out, contour);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fmt_num() {
        assert_eq!(fmt_num(10.0), "10");
        assert_eq!(fmt_num(0.1), "0.1");
        assert_eq!(fmt_num(-2.5), "-2.5");
        assert_eq!(fmt_num(1.23456789), "1.234568");
        assert_eq!(fmt_num(-0.0000001), "0");
    }

    #[test]
    fn test_lines_and_arcs() {
        let path = to_path_data(&[
            PathPrimitive::MoveTo([0.0, 0.0]),
            PathPrimitive::LineTo([1.0, 0.0]),
            PathPrimitive::ArcTo {
                radius: 1.0,
                large_arc: false,
                sweep: true,
                end: [2.0, 1.0],
            },
            PathPrimitive::ClosePath,
        ]);
        assert_eq!(path, "M 0 0 L 1 0 A 1 1 0 0 1 2 1 Z");
    }

    #[test]
    fn test_circle_as_two_half_arcs() {
        let path = to_path_data(&[PathPrimitive::Circle {
            center: [1.0, 2.0],
            radius: 0.5,
        }]);
        assert_eq!(
            path,
            "M 1.5 2 A 0.5 0.5 0 0 1 0.5 2 A 0.5 0.5 0 0 1 1.5 2 Z"
        );
    }

    #[test]
    fn test_filled_polygon() {
        let path = to_path_data(&[PathPrimitive::FilledPolygon(vec![
            [0.0, 0.0],
            [1.0, 0.0],
            [1.0, 1.0],
        ])]);
        assert_eq!(path, "M 0 0 L 1 0 L 1 1 Z");
    }

    #[test]
    fn test_shapes_to_path_data() {
        let shapes = vec![vec![
            vec![[0.0, 0.0], [2.0, 0.0], [2.0, 2.0]],
            vec![],
            vec![[0.5, 0.5], [1.0, 1.0], [1.0, 0.5]],
        ]];
        assert_eq!(
            shapes_to_path_data(&shapes),
            "M 0 0 L 2 0 L 2 2 Z M 0.5 0.5 L 1 1 L 1 0.5 Z"
        );
        assert_eq!(shapes_to_path_data(&[]), "");
    }
}
