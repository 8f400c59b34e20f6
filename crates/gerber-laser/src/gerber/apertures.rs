use std::collections::HashMap;

use log::warn;

use super::commands::ApertureShape;
use super::coord::Units;

/// Width used for draws when no usable aperture is selected, in mm.
pub const DEFAULT_STROKE_WIDTH: f64 = 0.1;

/// An aperture in the aperture table.
///
/// Standard shapes are stored in millimetres. Macro references keep their
/// raw instantiation parameters together with the unit scale in force when
/// they were defined, since macro geometry is only scaled after evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct ApertureDefinition {
    pub code: u32,
    pub shape: ApertureShape,
    pub unit_scale: f64,
}

/// Aperture table built from %AD commands.
#[derive(Debug, Default)]
pub struct ApertureTable {
    apertures: HashMap<u32, ApertureDefinition>,
}

impl ApertureTable {
    /// Register (or redefine) an aperture, converting standard sizes to mm.
    pub fn define(&mut self, code: u32, shape: &ApertureShape, units: Units) {
        let s = units.scale();
        let shape = match shape {
            ApertureShape::Circle { diameter } => ApertureShape::Circle {
                diameter: diameter * s,
            },
            ApertureShape::Rectangle { x_size, y_size } => ApertureShape::Rectangle {
                x_size: x_size * s,
                y_size: y_size * s,
            },
            ApertureShape::Obround { x_size, y_size } => ApertureShape::Obround {
                x_size: x_size * s,
                y_size: y_size * s,
            },
            ApertureShape::Polygon {
                outer_diameter,
                num_vertices,
                rotation,
            } => ApertureShape::Polygon {
                outer_diameter: outer_diameter * s,
                num_vertices: *num_vertices,
                rotation: *rotation,
            },
            ApertureShape::Macro { .. } => shape.clone(),
        };
        if self.apertures.contains_key(&code) {
            warn!("Gerber: aperture D{code} redefined");
        }
        self.apertures.insert(
            code,
            ApertureDefinition {
                code,
                shape,
                unit_scale: s,
            },
        );
    }

    pub fn get(&self, code: u32) -> Option<&ApertureDefinition> {
        self.apertures.get(&code)
    }

    /// Effective stroke width of the selected aperture when used for D01 draws.
    /// For circles this is the diameter, for rectangles/obrounds the smaller side.
    /// Anything unusable falls back to [`DEFAULT_STROKE_WIDTH`].
    pub fn stroke_width(&self, code: Option<u32>) -> f64 {
        let Some(code) = code else {
            warn!("Gerber: D01 before any aperture was selected, using default width");
            return DEFAULT_STROKE_WIDTH;
        };
        match self.apertures.get(&code).map(|ap| &ap.shape) {
            Some(ApertureShape::Circle { diameter }) => *diameter,
            Some(ApertureShape::Rectangle { x_size, y_size })
            | Some(ApertureShape::Obround { x_size, y_size }) => x_size.min(*y_size),
            Some(ApertureShape::Polygon { outer_diameter, .. }) => *outer_diameter,
            Some(ApertureShape::Macro { name, .. }) => {
                warn!("Gerber: D01 with macro aperture D{code} ({name}), using default width");
                DEFAULT_STROKE_WIDTH
            }
            None => {
                warn!("Gerber: D01 with undefined aperture D{code}, using default width");
                DEFAULT_STROKE_WIDTH
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_define_and_get() {
        let mut table = ApertureTable::default();
        table.define(10, &ApertureShape::Circle { diameter: 0.5 }, Units::Millimeters);
        let ap = table.get(10).unwrap();
        assert_eq!(ap.code, 10);
        assert!(
            matches!(ap.shape, ApertureShape::Circle { diameter } if (diameter - 0.5).abs() < 1e-9)
        );
    }

    #[test]
    fn test_get_missing() {
        let table = ApertureTable::default();
        assert!(table.get(10).is_none());
    }

    #[test]
    fn test_inch_sizes_converted() {
        let mut table = ApertureTable::default();
        table.define(
            11,
            &ApertureShape::Rectangle {
                x_size: 0.1,
                y_size: 0.05,
            },
            Units::Inches,
        );
        match table.get(11).unwrap().shape {
            ApertureShape::Rectangle { x_size, y_size } => {
                assert_abs_diff_eq!(x_size, 2.54, epsilon = 1e-9);
                assert_abs_diff_eq!(y_size, 1.27, epsilon = 1e-9);
            }
            ref other => panic!("expected Rectangle, got: {other:?}"),
        }
    }

    #[test]
    fn test_macro_keeps_raw_params_and_scale() {
        let mut table = ApertureTable::default();
        let shape = ApertureShape::Macro {
            name: "OC8".into(),
            params: vec![0.05],
        };
        table.define(12, &shape, Units::Inches);
        let ap = table.get(12).unwrap();
        assert_eq!(ap.shape, shape);
        assert_abs_diff_eq!(ap.unit_scale, 25.4);
    }

    #[test]
    fn test_stroke_width_circle() {
        let mut table = ApertureTable::default();
        table.define(10, &ApertureShape::Circle { diameter: 0.254 }, Units::Millimeters);
        assert_abs_diff_eq!(table.stroke_width(Some(10)), 0.254);
    }

    #[test]
    fn test_stroke_width_rect() {
        let mut table = ApertureTable::default();
        table.define(
            11,
            &ApertureShape::Rectangle {
                x_size: 0.5,
                y_size: 0.3,
            },
            Units::Millimeters,
        );
        assert_abs_diff_eq!(table.stroke_width(Some(11)), 0.3);
    }

    #[test]
    fn test_stroke_width_falls_back_to_default() {
        let mut table = ApertureTable::default();
        assert_abs_diff_eq!(table.stroke_width(None), DEFAULT_STROKE_WIDTH);
        assert_abs_diff_eq!(table.stroke_width(Some(99)), DEFAULT_STROKE_WIDTH);
        table.define(
            20,
            &ApertureShape::Macro {
                name: "X".into(),
                params: vec![],
            },
            Units::Millimeters,
        );
        assert_abs_diff_eq!(table.stroke_width(Some(20)), DEFAULT_STROKE_WIDTH);
    }
}
