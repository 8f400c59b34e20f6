use std::f64::consts::{PI, TAU};

use log::debug;

use crate::geometry::path::{to_path_data, PathPrimitive};
use crate::geometry::shapes::{
    arc_band, arc_extremes, arc_points, circle_polygon, stroke_rectangle, DEGENERATE_LENGTH,
};
use crate::types::{BBox, Contour, Point, Shape};

/// A circular arc resolved to centre, radius and signed sweep (radians,
/// positive counter-clockwise).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArcSpec {
    pub center: Point,
    pub radius: f64,
    pub start_angle: f64,
    pub sweep: f64,
}

impl ArcSpec {
    pub fn is_full_circle(&self) -> bool {
        self.sweep.abs() >= TAU - 1e-9
    }

    pub fn large_arc(&self) -> bool {
        self.sweep.abs() > PI
    }

    /// Sweep flag of the path grammar: 1 counter-clockwise, 0 clockwise.
    pub fn sweep_flag(&self) -> bool {
        self.sweep > 0.0
    }

    pub fn point_at(&self, angle: f64, radius: f64) -> Point {
        [
            self.center[0] + radius * angle.cos(),
            self.center[1] + radius * angle.sin(),
        ]
    }

    pub fn end_angle(&self) -> f64 {
        self.start_angle + self.sweep
    }
}

/// Everything plotted for one layer.
#[derive(Debug, Clone, Default)]
pub struct PlotOutput {
    /// Vector primitives in emission order.
    pub primitives: Vec<PathPrimitive>,
    /// The same geometry as filled polygons (arcs flattened), one entry per
    /// stroke, flash or region. Region shapes hold all of their contours and
    /// are meant to be filled even-odd.
    pub shapes: Vec<Shape>,
    /// Centre lines of connected draws, used to recover board outlines.
    pub centerlines: Vec<Vec<Point>>,
    pub bbox: BBox,
}

impl PlotOutput {
    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    pub fn path_data(&self) -> String {
        to_path_data(&self.primitives)
    }

    /// Centre-line chains that return to their starting point, as contours.
    pub fn closed_centerlines(&self, tolerance: f64) -> Vec<Contour> {
        self.centerlines
            .iter()
            .filter(|chain| chain.len() >= 4)
            .filter_map(|chain| {
                let first = chain[0];
                let last = chain[chain.len() - 1];
                let closed = (first[0] - last[0]).hypot(first[1] - last[1]) <= tolerance;
                closed.then(|| chain[..chain.len() - 1].to_vec())
            })
            .collect()
    }
}

fn same_point(a: Point, b: Point) -> bool {
    (a[0] - b[0]).hypot(a[1] - b[1]) < DEGENERATE_LENGTH
}

/// Region contour under construction.
#[derive(Debug, Default)]
struct OpenContour {
    points: Contour,
    path: Vec<PathPrimitive>,
    bbox: BBox,
}

/// Turns interpreted draw/flash/region operations into path primitives,
/// filled polygons and a running bounding box.
#[derive(Debug, Default)]
pub struct PathPlotter {
    out: PlotOutput,
    chain: Vec<Point>,
    region_contours: Vec<Contour>,
    region_path: Vec<PathPrimitive>,
    region_bbox: BBox,
    contour: OpenContour,
}

impl PathPlotter {
    pub fn new() -> Self {
        Self::default()
    }

    fn extend_chain(&mut self, from: Point, points: impl IntoIterator<Item = Point>) {
        match self.chain.last() {
            Some(&last) if same_point(last, from) => {}
            _ => {
                self.break_path();
                self.chain.push(from);
            }
        }
        self.chain.extend(points);
    }

    /// End the current centre-line chain; the next draw starts a new one.
    pub fn break_path(&mut self) {
        let chain = std::mem::take(&mut self.chain);
        if chain.len() >= 2 {
            self.out.centerlines.push(chain);
        }
    }

    /// A straight draw with a round aperture: a filled rectangle.
    pub fn stroke_line(&mut self, from: Point, to: Point, width: f64) {
        let Some(rect) = stroke_rectangle(from, to, width) else {
            debug!("Gerber: skipping zero-length draw at ({}, {})", from[0], from[1]);
            return;
        };
        for p in &rect {
            self.out.bbox.expand_point(p[0], p[1]);
        }
        self.extend_chain(from, [to]);
        self.out.shapes.push(vec![rect.clone()]);
        self.out.primitives.push(PathPrimitive::FilledPolygon(rect));
    }

    /// A circular draw: a filled annular band around the arc.
    pub fn stroke_arc(&mut self, from: Point, arc: &ArcSpec, width: f64) {
        let outer_r = arc.radius + width / 2.0;
        let inner_r = (arc.radius - width / 2.0).max(0.0);
        let sa = arc.start_angle;
        let ea = arc.end_angle();

        for p in arc_extremes(arc.center, outer_r, sa, arc.sweep) {
            self.out.bbox.expand_point(p[0], p[1]);
        }

        let prims = &mut self.out.primitives;
        if arc.is_full_circle() {
            for (radius, flag) in [(outer_r, true), (inner_r, false)] {
                if radius < DEGENERATE_LENGTH {
                    continue;
                }
                let right = arc.point_at(0.0, radius);
                let left = arc.point_at(PI, radius);
                prims.push(PathPrimitive::MoveTo(right));
                for end in [left, right] {
                    prims.push(PathPrimitive::ArcTo {
                        radius,
                        large_arc: false,
                        sweep: flag,
                        end,
                    });
                }
                prims.push(PathPrimitive::ClosePath);
            }
        } else {
            let outer_start = arc.point_at(sa, outer_r);
            let outer_end = arc.point_at(ea, outer_r);
            let inner_end = arc.point_at(ea, inner_r);
            let inner_start = arc.point_at(sa, inner_r);
            for p in [outer_start, outer_end, inner_end, inner_start] {
                self.out.bbox.expand_point(p[0], p[1]);
            }
            prims.push(PathPrimitive::MoveTo(outer_start));
            prims.push(PathPrimitive::ArcTo {
                radius: outer_r,
                large_arc: arc.large_arc(),
                sweep: arc.sweep_flag(),
                end: outer_end,
            });
            prims.push(PathPrimitive::LineTo(inner_end));
            if inner_r >= DEGENERATE_LENGTH {
                prims.push(PathPrimitive::ArcTo {
                    radius: inner_r,
                    large_arc: arc.large_arc(),
                    sweep: !arc.sweep_flag(),
                    end: inner_start,
                });
            }
            prims.push(PathPrimitive::ClosePath);
        }

        let centre_pts = arc_points(arc.center, arc.radius, sa, arc.sweep);
        self.extend_chain(from, centre_pts.into_iter().skip(1));
        self.out
            .shapes
            .push(arc_band(arc.center, arc.radius, sa, arc.sweep, width));
    }

    /// Stamp flashed geometry (already placed at the flash point).
    pub fn stamp(&mut self, prims: Vec<PathPrimitive>) {
        self.break_path();
        for prim in prims {
            match &prim {
                PathPrimitive::Circle { center, radius } => {
                    if *radius <= 0.0 {
                        continue;
                    }
                    self.out.bbox.expand_point(center[0] - radius, center[1] - radius);
                    self.out.bbox.expand_point(center[0] + radius, center[1] + radius);
                    self.out.shapes.push(vec![circle_polygon(*center, *radius)]);
                }
                PathPrimitive::FilledPolygon(pts) => {
                    if pts.len() < 3 {
                        continue;
                    }
                    for p in pts {
                        self.out.bbox.expand_point(p[0], p[1]);
                    }
                    self.out.shapes.push(vec![pts.clone()]);
                }
                // Flashes only ever produce closed shapes
                _ => continue,
            }
            self.out.primitives.push(prim);
        }
    }

    // ─── Regions ─────────────────────────────────────────────────────

    /// Start collecting region contours (G36).
    pub fn begin_region(&mut self) {
        self.break_path();
        self.discard_region();
    }

    fn start_contour_at(&mut self, from: Point) {
        if self.contour.points.is_empty() {
            self.contour.points.push(from);
            self.contour.path.push(PathPrimitive::MoveTo(from));
            self.contour.bbox.expand_point(from[0], from[1]);
        }
    }

    /// Append a straight edge to the open contour.
    pub fn region_line(&mut self, from: Point, to: Point) {
        self.start_contour_at(from);
        self.contour.points.push(to);
        self.contour.path.push(PathPrimitive::LineTo(to));
        self.contour.bbox.expand_point(to[0], to[1]);
    }

    /// Append an arc edge to the open contour.
    pub fn region_arc(&mut self, from: Point, to: Point, arc: &ArcSpec) {
        self.start_contour_at(from);
        let pts = arc_points(arc.center, arc.radius, arc.start_angle, arc.sweep);
        self.contour.points.extend(pts.into_iter().skip(1));
        if arc.is_full_circle() {
            let opposite = arc.point_at(arc.start_angle + arc.sweep / 2.0, arc.radius);
            for end in [opposite, to] {
                self.contour.path.push(PathPrimitive::ArcTo {
                    radius: arc.radius,
                    large_arc: false,
                    sweep: arc.sweep_flag(),
                    end,
                });
            }
        } else {
            self.contour.path.push(PathPrimitive::ArcTo {
                radius: arc.radius,
                large_arc: arc.large_arc(),
                sweep: arc.sweep_flag(),
                end: to,
            });
        }
        self.contour.bbox.expand_point(to[0], to[1]);
        for p in arc_extremes(arc.center, arc.radius, arc.start_angle, arc.sweep) {
            self.contour.bbox.expand_point(p[0], p[1]);
        }
    }

    /// Close the open contour (D02 inside a region); the next edge starts a new one.
    pub fn region_move(&mut self) {
        let contour = std::mem::take(&mut self.contour);
        let mut points = contour.points;
        if points.len() > 1 && same_point(points[0], points[points.len() - 1]) {
            points.pop();
        }
        if points.len() < 3 {
            if !points.is_empty() {
                debug!("Gerber: dropping region contour with {} points", points.len());
            }
            return;
        }
        self.region_contours.push(points);
        self.region_path.extend(contour.path);
        self.region_path.push(PathPrimitive::ClosePath);
        self.region_bbox.expand_bbox(&contour.bbox);
    }

    /// Finalize all region contours as one filled shape (G37).
    pub fn end_region(&mut self) {
        self.region_move();
        if self.region_contours.is_empty() {
            return;
        }
        let contours = std::mem::take(&mut self.region_contours);
        self.out.shapes.push(contours);
        self.out.primitives.append(&mut self.region_path);
        self.out.bbox.expand_bbox(&self.region_bbox);
        self.region_bbox = BBox::empty();
    }

    /// Drop everything collected since the region started.
    pub fn discard_region(&mut self) {
        self.contour = OpenContour::default();
        self.region_contours.clear();
        self.region_path.clear();
        self.region_bbox = BBox::empty();
    }

    pub fn finish(mut self) -> PlotOutput {
        self.break_path();
        self.out
    }
}
