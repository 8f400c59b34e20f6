use std::f64::consts::{FRAC_PI_2, TAU};

use log::{debug, warn};

use crate::geometry::path::PathPrimitive;
use crate::geometry::shapes::{centered_rectangle, obround_polygon, regular_polygon};
use crate::types::Point;

use super::apertures::{ApertureTable, DEFAULT_STROKE_WIDTH};
use super::commands::{ApertureShape, Coordinates, DCode, GerberCommand, Polarity};
use super::coord::{Axis, CoordinateConverter, Notation, RawCoord};
use super::macros::{self, MacroTable};
use super::plotter::{ArcSpec, PathPlotter, PlotOutput};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InterpolationMode {
    #[default]
    Linear,
    Clockwise,
    CounterClockwise,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QuadrantMode {
    Single,
    #[default]
    Multi,
}

/// Modal state carried from one command to the next.
#[derive(Debug, Clone, Default)]
pub struct InterpreterState {
    /// Current point in mm.
    pub x: f64,
    pub y: f64,
    /// Whether a coordinate has been seen on each axis. The first one is
    /// always absolute, even in incremental notation.
    pub x_seen: bool,
    pub y_seen: bool,
    pub aperture: Option<u32>,
    pub interpolation: InterpolationMode,
    pub quadrant: QuadrantMode,
    pub region_active: bool,
    /// Last explicit D01/D02/D03, reused by coordinate-only blocks.
    pub operation: DCode,
    pub polarity: Polarity,
    pub converter: CoordinateConverter,
    /// Set by M02; later commands are ignored.
    pub ended: bool,
}

impl InterpreterState {
    pub fn position(&self) -> Point {
        [self.x, self.y]
    }

    fn advance(&mut self, raw: Option<&RawCoord>, axis: Axis) {
        let Some(raw) = raw else {
            return;
        };
        let value = self.converter.decode(raw, axis);
        let incremental = self.converter.notation() == Notation::Incremental;
        let (current, seen) = match axis {
            Axis::X => (&mut self.x, &mut self.x_seen),
            Axis::Y => (&mut self.y, &mut self.y_seen),
        };
        if incremental && *seen {
            *current += value;
        } else {
            *current = value;
        }
        *seen = true;
    }

    /// I/J offsets in mm. Always relative to the start point.
    fn offsets(&self, coords: &Coordinates) -> Point {
        let decode = |raw: &Option<RawCoord>, axis| {
            raw.as_ref()
                .map(|r| self.converter.decode(r, axis))
                .unwrap_or(0.0)
        };
        [decode(&coords.i, Axis::X), decode(&coords.j, Axis::Y)]
    }
}

/// Gerber state machine. Walks commands and feeds the plotter.
#[derive(Debug, Default)]
pub struct Interpreter {
    state: InterpreterState,
    apertures: ApertureTable,
    macros: MacroTable,
    plotter: PathPlotter,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &InterpreterState {
        &self.state
    }

    /// Apply one command to the state, emitting geometry as needed.
    pub fn step(&mut self, cmd: &GerberCommand) {
        if self.state.ended {
            return;
        }
        match cmd {
            GerberCommand::FormatSpec(fmt) => self.state.converter.set_format(fmt),
            GerberCommand::Units(units) => self.state.converter.set_units(*units),
            GerberCommand::ApertureDefine { code, shape } => {
                self.apertures
                    .define(*code, shape, self.state.converter.units);
            }
            GerberCommand::MacroDefine { name, body } => {
                self.macros.define(macros::parse_macro_body(name, body));
            }
            GerberCommand::SelectAperture(code) => {
                if self.apertures.get(*code).is_none() {
                    warn!("Gerber: selecting undefined aperture D{code}");
                }
                self.state.aperture = Some(*code);
            }
            GerberCommand::LinearMode => self.state.interpolation = InterpolationMode::Linear,
            GerberCommand::ClockwiseArcMode => {
                self.state.interpolation = InterpolationMode::Clockwise;
            }
            GerberCommand::CounterClockwiseArcMode => {
                self.state.interpolation = InterpolationMode::CounterClockwise;
            }
            GerberCommand::SingleQuadrant => self.state.quadrant = QuadrantMode::Single,
            GerberCommand::MultiQuadrant => self.state.quadrant = QuadrantMode::Multi,
            GerberCommand::Polarity(p) => {
                if *p == Polarity::Clear && self.state.polarity == Polarity::Dark {
                    debug!("Gerber: clear polarity objects are not plotted");
                }
                self.state.polarity = *p;
            }
            GerberCommand::RegionBegin => {
                if self.state.region_active {
                    warn!("Gerber: G36 inside an open region, discarding the open region");
                }
                self.state.region_active = true;
                self.plotter.begin_region();
            }
            GerberCommand::RegionEnd => {
                if !self.state.region_active {
                    warn!("Gerber: G37 without G36");
                    return;
                }
                self.state.region_active = false;
                if self.state.polarity == Polarity::Clear {
                    self.plotter.discard_region();
                } else {
                    self.plotter.end_region();
                }
            }
            GerberCommand::Operation { coords, op } => self.operate(coords, *op),
            GerberCommand::EndOfFile => self.state.ended = true,
        }
    }

    fn operate(&mut self, coords: &Coordinates, op: Option<DCode>) {
        let op = match op {
            Some(op) => {
                self.state.operation = op;
                op
            }
            None => self.state.operation,
        };

        let from = self.state.position();
        self.state.advance(coords.x.as_ref(), Axis::X);
        self.state.advance(coords.y.as_ref(), Axis::Y);
        let to = self.state.position();

        match op {
            DCode::Move => {
                if self.state.region_active {
                    self.plotter.region_move();
                } else {
                    self.plotter.break_path();
                }
            }
            DCode::Draw => self.draw(from, to, coords),
            DCode::Flash => {
                if self.state.region_active {
                    warn!("Gerber: ignoring D03 inside a region");
                    return;
                }
                self.flash(to);
            }
        }
    }

    fn draw(&mut self, from: Point, to: Point, coords: &Coordinates) {
        let arc = match self.state.interpolation {
            InterpolationMode::Linear => None,
            _ => {
                let arc = self.resolve_arc(from, to, coords);
                if arc.is_none() {
                    debug!("Gerber: degenerate arc, drawing a line instead");
                }
                arc
            }
        };

        if self.state.region_active {
            match arc {
                Some(arc) => self.plotter.region_arc(from, to, &arc),
                None => self.plotter.region_line(from, to),
            }
            return;
        }

        if self.state.polarity == Polarity::Clear {
            return;
        }
        let width = self.apertures.stroke_width(self.state.aperture);
        match arc {
            Some(arc) => self.plotter.stroke_arc(from, &arc, width),
            None => self.plotter.stroke_line(from, to, width),
        }
    }

    /// Resolve the centre and signed sweep of a circular draw.
    ///
    /// Returns `None` for a zero radius, which callers draw as a line.
    fn resolve_arc(&self, from: Point, to: Point, coords: &Coordinates) -> Option<ArcSpec> {
        let clockwise = self.state.interpolation == InterpolationMode::Clockwise;
        let [i, j] = self.state.offsets(coords);
        let same_endpoints = (to[0] - from[0]).hypot(to[1] - from[1]) < 1e-9;

        let center = match self.state.quadrant {
            QuadrantMode::Multi => [from[0] + i, from[1] + j],
            QuadrantMode::Single => {
                if same_endpoints {
                    return None;
                }
                single_quadrant_center(from, to, i.abs(), j.abs(), clockwise)?
            }
        };

        let radius = (from[0] - center[0]).hypot(from[1] - center[1]);
        if radius < 1e-9 {
            return None;
        }

        let start_angle = (from[1] - center[1]).atan2(from[0] - center[0]);
        let sweep = if same_endpoints {
            if clockwise {
                -TAU
            } else {
                TAU
            }
        } else {
            let end_angle = (to[1] - center[1]).atan2(to[0] - center[0]);
            directed_sweep(end_angle - start_angle, clockwise)
        };

        Some(ArcSpec {
            center,
            radius,
            start_angle,
            sweep,
        })
    }

    fn flash(&mut self, at: Point) {
        if self.state.polarity == Polarity::Clear {
            return;
        }
        let default_pad = || {
            vec![PathPrimitive::Circle {
                center: at,
                radius: DEFAULT_STROKE_WIDTH / 2.0,
            }]
        };

        let Some(code) = self.state.aperture else {
            warn!("Gerber: D03 before any aperture was selected, using default pad");
            self.plotter.stamp(default_pad());
            return;
        };
        let Some(ap) = self.apertures.get(code) else {
            warn!("Gerber: D03 flash with undefined aperture D{code}, using default pad");
            self.plotter.stamp(default_pad());
            return;
        };

        let prims = match &ap.shape {
            ApertureShape::Circle { diameter } => vec![PathPrimitive::Circle {
                center: at,
                radius: diameter / 2.0,
            }],
            ApertureShape::Rectangle { x_size, y_size } => {
                vec![PathPrimitive::FilledPolygon(centered_rectangle(
                    at, *x_size, *y_size,
                ))]
            }
            ApertureShape::Obround { x_size, y_size } => {
                vec![PathPrimitive::FilledPolygon(obround_polygon(
                    at, *x_size, *y_size,
                ))]
            }
            ApertureShape::Polygon {
                outer_diameter,
                num_vertices,
                rotation,
            } => vec![PathPrimitive::FilledPolygon(regular_polygon(
                at,
                *outer_diameter,
                *num_vertices,
                *rotation,
            ))],
            ApertureShape::Macro { name, params } => match self.macros.get(name) {
                Some(template) => macros::evaluate_macro(template, params, ap.unit_scale, at),
                None => {
                    warn!("Gerber: D03 flash with undefined macro '{name}', using default pad");
                    default_pad()
                }
            },
        };
        self.plotter.stamp(prims);
    }

    /// Flush open state and return the plotted layer.
    pub fn finish(mut self) -> PlotOutput {
        if self.state.region_active {
            warn!("Gerber: region still open at end of file, discarding it");
            self.plotter.discard_region();
            self.state.region_active = false;
        }
        let out = self.plotter.finish();
        debug!(
            "Gerber: plotted {} primitives, {} shapes",
            out.primitives.len(),
            out.shapes.len()
        );
        out
    }
}

/// Bring a raw angle difference into the direction of travel.
/// Clockwise sweeps are negative, counter-clockwise positive.
fn directed_sweep(mut sweep: f64, clockwise: bool) -> f64 {
    if clockwise {
        while sweep >= 0.0 {
            sweep -= TAU;
        }
        while sweep < -TAU {
            sweep += TAU;
        }
    } else {
        while sweep <= 0.0 {
            sweep += TAU;
        }
        while sweep > TAU {
            sweep -= TAU;
        }
    }
    sweep
}

/// G74: the I/J signs are implicit. Pick the centre that gives an arc of at
/// most 90 degrees in the requested direction with the best matching radii.
fn single_quadrant_center(
    from: Point,
    to: Point,
    i: f64,
    j: f64,
    clockwise: bool,
) -> Option<Point> {
    let mut best: Option<(Point, f64)> = None;
    for (si, sj) in [(1.0, 1.0), (1.0, -1.0), (-1.0, 1.0), (-1.0, -1.0)] {
        let c = [from[0] + si * i, from[1] + sj * j];
        let r_start = (from[0] - c[0]).hypot(from[1] - c[1]);
        let r_end = (to[0] - c[0]).hypot(to[1] - c[1]);
        let a0 = (from[1] - c[1]).atan2(from[0] - c[0]);
        let a1 = (to[1] - c[1]).atan2(to[0] - c[0]);
        let sweep = directed_sweep(a1 - a0, clockwise);
        if sweep.abs() > FRAC_PI_2 + 1e-6 {
            continue;
        }
        let mismatch = (r_start - r_end).abs();
        if best.map_or(true, |(_, m)| mismatch < m) {
            best = Some((c, mismatch));
        }
    }
    best.map(|(c, _)| c)
}

/// Interpret a sequence of Gerber commands into plotted geometry.
pub fn interpret(commands: &[GerberCommand]) -> PlotOutput {
    let mut interp = Interpreter::new();
    for cmd in commands {
        interp.step(cmd);
    }
    interp.finish()
}
