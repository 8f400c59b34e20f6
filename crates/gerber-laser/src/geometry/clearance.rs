//! Clearance geometry: the board plate with every trace cut out of it.
//!
//! The boolean kernel sits behind [`PolygonBoolean`]. Whatever the kernel
//! does (error, panic, empty output) the caller always gets usable geometry
//! back; on failure that is the original trace set.

use std::panic;

use i_overlay::core::fill_rule::FillRule;
use i_overlay::core::overlay_rule::OverlayRule;
use i_overlay::float::single::SingleFloatOverlay;
use log::{debug, warn};

use crate::error::GerberError;
use crate::geometry::shapes::orient_shape;
use crate::types::{shapes_bbox, BBox, Contour, Shape};

/// Vertices closer than this (mm) are merged in the result.
pub const SIMPLIFY_TOLERANCE: f64 = 1e-3;

/// Planar boolean difference on filled shape sets.
pub trait PolygonBoolean {
    /// `plate − traces`. Trace shapes list their outer contour first.
    fn difference(&self, plate: &[Shape], traces: &[Shape]) -> Result<Vec<Shape>, GerberError>;
}

/// [`PolygonBoolean`] backed by `i_overlay`.
#[derive(Debug, Default, Clone, Copy)]
pub struct OverlayBoolean;

impl OverlayBoolean {
    /// Resolve each shape on its own under even-odd so inner contours stay holes.
    fn normalize_even_odd(shapes: &[Shape]) -> Vec<Shape> {
        let empty: Vec<Shape> = Vec::new();
        let mut out = Vec::with_capacity(shapes.len());
        for shape in shapes {
            let contours: Vec<Contour> =
                shape.iter().filter(|c| c.len() >= 3).cloned().collect();
            match contours.len() {
                0 => {}
                1 => {
                    let mut single = contours;
                    orient_shape(&mut single);
                    out.push(single);
                }
                _ => {
                    let resolved =
                        vec![contours].overlay(&empty, OverlayRule::Subject, FillRule::EvenOdd);
                    out.extend(resolved);
                }
            }
        }
        out
    }
}

impl PolygonBoolean for OverlayBoolean {
    fn difference(&self, plate: &[Shape], traces: &[Shape]) -> Result<Vec<Shape>, GerberError> {
        let subject = Self::normalize_even_odd(plate);
        if subject.is_empty() {
            return Err(GerberError::BooleanError("plate has no usable contour".into()));
        }

        let clip = Self::normalize_even_odd(traces);
        Ok(subject.overlay(&clip, OverlayRule::Difference, FillRule::NonZero))
    }
}

/// Where material exists before the traces are removed.
#[derive(Debug, Clone, PartialEq)]
pub enum PlateRegion {
    /// Closed board outline contours. Contours nested inside another are
    /// cut-outs (slots, holes) and carry no material.
    Outline(Vec<Contour>),
    /// A rectangle; the request's padding is added on every side.
    Bounds(BBox),
}

impl PlateRegion {
    fn to_shapes(&self, padding: f64) -> Vec<Shape> {
        match self {
            PlateRegion::Outline(contours) => {
                let shape: Shape = contours.iter().filter(|c| c.len() >= 3).cloned().collect();
                if shape.is_empty() {
                    Vec::new()
                } else {
                    vec![shape]
                }
            }
            PlateRegion::Bounds(bbox) => {
                if bbox.is_empty() {
                    Vec::new()
                } else {
                    vec![vec![bbox.padded(padding).corners()]]
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClearanceRequest<'a> {
    pub traces: &'a [Shape],
    pub plate: PlateRegion,
    pub padding: f64,
}

impl<'a> ClearanceRequest<'a> {
    /// Plate taken from the trace bounds grown by `padding`.
    pub fn around(traces: &'a [Shape], padding: f64) -> Self {
        Self {
            traces,
            plate: PlateRegion::Bounds(shapes_bbox(traces)),
            padding,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClearanceResult {
    pub shapes: Vec<Shape>,
    pub bbox: BBox,
    /// False when the original traces were returned instead of a clearance.
    pub inverted: bool,
}

impl ClearanceResult {
    fn fallback(traces: &[Shape]) -> Self {
        Self {
            shapes: traces.to_vec(),
            bbox: shapes_bbox(traces),
            inverted: false,
        }
    }
}

/// Compute `plate − traces` with the default kernel.
pub fn compute_clearance(req: &ClearanceRequest) -> ClearanceResult {
    compute_clearance_with(&OverlayBoolean, req)
}

/// Compute `plate − traces` with a caller-supplied kernel.
pub fn compute_clearance_with(
    kernel: &dyn PolygonBoolean,
    req: &ClearanceRequest,
) -> ClearanceResult {
    let traces = req.traces;
    if traces.iter().all(|s| s.iter().all(|c| c.is_empty())) {
        warn!("Clearance: no trace geometry, returning original");
        return ClearanceResult::fallback(traces);
    }
    if !all_finite(traces) {
        warn!("Clearance: non-finite trace coordinates, returning original");
        return ClearanceResult::fallback(traces);
    }

    let plate = req.plate.to_shapes(req.padding);
    if plate.is_empty() || !all_finite(&plate) {
        warn!("Clearance: empty or invalid plate, returning original");
        return ClearanceResult::fallback(traces);
    }

    let outcome =
        panic::catch_unwind(panic::AssertUnwindSafe(|| kernel.difference(&plate, traces)));
    let shapes = match outcome {
        Ok(Ok(shapes)) => simplify_shapes(shapes),
        Ok(Err(e)) => {
            warn!("Clearance: boolean failed ({e}), returning original");
            return ClearanceResult::fallback(traces);
        }
        Err(_) => {
            warn!("Panic during clearance boolean, returning original");
            return ClearanceResult::fallback(traces);
        }
    };

    if shapes.is_empty() {
        warn!("Clearance: boolean produced nothing, returning original");
        return ClearanceResult::fallback(traces);
    }

    let bbox = shapes_bbox(&shapes);
    debug!(
        "Clearance: {} trace shapes -> {} plate shapes",
        traces.len(),
        shapes.len()
    );
    ClearanceResult {
        shapes,
        bbox,
        inverted: true,
    }
}

fn all_finite(shapes: &[Shape]) -> bool {
    shapes
        .iter()
        .flatten()
        .flatten()
        .all(|p| p[0].is_finite() && p[1].is_finite())
}

/// Merge near-duplicate vertices and drop degenerate contours.
fn simplify_contour(contour: &[[f64; 2]]) -> Option<Contour> {
    let mut out: Contour = Vec::with_capacity(contour.len());
    for &p in contour {
        if let Some(last) = out.last() {
            if (p[0] - last[0]).hypot(p[1] - last[1]) < SIMPLIFY_TOLERANCE {
                continue;
            }
        }
        out.push(p);
    }
    while out.len() > 1 {
        let (first, last) = (out[0], out[out.len() - 1]);
        if (first[0] - last[0]).hypot(first[1] - last[1]) < SIMPLIFY_TOLERANCE {
            out.pop();
        } else {
            break;
        }
    }
    (out.len() >= 3).then_some(out)
}

fn simplify_shapes(shapes: Vec<Shape>) -> Vec<Shape> {
    shapes
        .into_iter()
        .filter_map(|shape| {
            let mut contours = shape.iter().map(|c| simplify_contour(c));
            // Losing the outer contour loses the whole shape
            let outer = contours.next()??;
            let mut kept = vec![outer];
            kept.extend(contours.flatten());
            Some(kept)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::shapes::{centered_rectangle, shapes_area};
    use approx::assert_abs_diff_eq;

    fn square(cx: f64, cy: f64, side: f64) -> Shape {
        vec![centered_rectangle([cx, cy], side, side)]
    }

    struct FailingKernel;

    impl PolygonBoolean for FailingKernel {
        fn difference(&self, _: &[Shape], _: &[Shape]) -> Result<Vec<Shape>, GerberError> {
            Err(GerberError::BooleanError("nope".into()))
        }
    }

    struct PanickingKernel;

    impl PolygonBoolean for PanickingKernel {
        fn difference(&self, _: &[Shape], _: &[Shape]) -> Result<Vec<Shape>, GerberError> {
            panic!("kernel blew up")
        }
    }

    struct EmptyKernel;

    impl PolygonBoolean for EmptyKernel {
        fn difference(&self, _: &[Shape], _: &[Shape]) -> Result<Vec<Shape>, GerberError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_square_cut_from_padded_plate() {
        let traces = vec![square(5.0, 5.0, 2.0)];
        let result = compute_clearance(&ClearanceRequest::around(&traces, 1.0));
        assert!(result.inverted);
        // Plate is 4 x 4, minus the 2 x 2 trace
        assert_abs_diff_eq!(shapes_area(&result.shapes), 12.0, epsilon = 1e-6);
        assert_abs_diff_eq!(result.bbox.x(), 3.0, epsilon = 1e-9);
        assert_abs_diff_eq!(result.bbox.width(), 4.0, epsilon = 1e-9);
    }

    #[test]
    fn test_overlapping_traces_union() {
        let traces = vec![square(0.0, 0.0, 2.0), square(1.0, 0.0, 2.0)];
        let plate = PlateRegion::Outline(vec![centered_rectangle([0.5, 0.0], 10.0, 10.0)]);
        let result = compute_clearance(&ClearanceRequest {
            traces: &traces,
            plate,
            padding: 0.0,
        });
        assert!(result.inverted);
        // Union of the two squares covers 3 x 2
        assert_abs_diff_eq!(shapes_area(&result.shapes), 100.0 - 6.0, epsilon = 1e-6);
    }

    #[test]
    fn test_outline_cutout_is_not_plate() {
        // 10 x 10 board with a 2 x 2 slot, one 1 x 1 pad clear of the slot
        let plate = PlateRegion::Outline(vec![
            centered_rectangle([0.0, 0.0], 10.0, 10.0),
            centered_rectangle([2.0, 2.0], 2.0, 2.0),
        ]);
        let traces = vec![square(-2.0, -2.0, 1.0)];
        let result = compute_clearance(&ClearanceRequest {
            traces: &traces,
            plate,
            padding: 0.0,
        });
        assert!(result.inverted);
        assert_abs_diff_eq!(shapes_area(&result.shapes), 100.0 - 4.0 - 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_outline_cutout_listed_first() {
        let plate = PlateRegion::Outline(vec![
            centered_rectangle([2.0, 2.0], 2.0, 2.0),
            centered_rectangle([0.0, 0.0], 10.0, 10.0),
        ]);
        let traces = vec![square(-2.0, -2.0, 1.0)];
        let result = compute_clearance(&ClearanceRequest {
            traces: &traces,
            plate,
            padding: 0.0,
        });
        assert!(result.inverted);
        assert_abs_diff_eq!(shapes_area(&result.shapes), 95.0, epsilon = 1e-6);
    }

    #[test]
    fn test_region_hole_keeps_copper_island() {
        // A ring: 4 x 4 outer with a 2 x 2 cut-out, wound the same way
        let ring: Shape = vec![
            centered_rectangle([0.0, 0.0], 4.0, 4.0),
            centered_rectangle([0.0, 0.0], 2.0, 2.0),
        ];
        let traces = vec![ring];
        let result = compute_clearance(&ClearanceRequest::around(&traces, 1.0));
        assert!(result.inverted);
        // 6 x 6 plate minus the 12 mm² ring
        assert_abs_diff_eq!(shapes_area(&result.shapes), 36.0 - 12.0, epsilon = 1e-6);
    }

    #[test]
    fn test_double_clearance_restores_traces() {
        let traces = vec![square(5.0, 5.0, 2.0)];
        let first = compute_clearance(&ClearanceRequest::around(&traces, 1.0));
        assert!(first.inverted);

        let plate = PlateRegion::Outline(vec![first.bbox.corners()]);
        let second = compute_clearance(&ClearanceRequest {
            traces: &first.shapes,
            plate,
            padding: 0.0,
        });
        assert!(second.inverted);
        assert_abs_diff_eq!(shapes_area(&second.shapes), 4.0, epsilon = 1e-6);
        let original = shapes_bbox(&traces);
        assert_abs_diff_eq!(second.bbox.x(), original.x(), epsilon = 1e-6);
        assert_abs_diff_eq!(second.bbox.y(), original.y(), epsilon = 1e-6);
        assert_abs_diff_eq!(second.bbox.width(), original.width(), epsilon = 1e-6);
        assert_abs_diff_eq!(second.bbox.height(), original.height(), epsilon = 1e-6);
    }

    #[test]
    fn test_kernel_error_falls_back() {
        let traces = vec![square(0.0, 0.0, 1.0)];
        let req = ClearanceRequest::around(&traces, 1.0);
        let result = compute_clearance_with(&FailingKernel, &req);
        assert!(!result.inverted);
        assert_eq!(result.shapes, traces);
    }

    #[test]
    fn test_kernel_panic_falls_back() {
        let traces = vec![square(0.0, 0.0, 1.0)];
        let req = ClearanceRequest::around(&traces, 1.0);
        let result = compute_clearance_with(&PanickingKernel, &req);
        assert!(!result.inverted);
        assert_eq!(result.shapes, traces);
    }

    #[test]
    fn test_empty_result_falls_back() {
        let traces = vec![square(0.0, 0.0, 1.0)];
        let req = ClearanceRequest::around(&traces, 1.0);
        let result = compute_clearance_with(&EmptyKernel, &req);
        assert!(!result.inverted);
        assert_eq!(result.shapes, traces);
    }

    #[test]
    fn test_empty_and_non_finite_inputs_fall_back() {
        let empty: Vec<Shape> = Vec::new();
        let result = compute_clearance(&ClearanceRequest::around(&empty, 1.0));
        assert!(!result.inverted);
        assert!(result.shapes.is_empty());
        assert!(result.bbox.is_empty());

        let bad = vec![vec![vec![[0.0, 0.0], [f64::NAN, 1.0], [1.0, 1.0]]]];
        let result = compute_clearance(&ClearanceRequest::around(&bad, 1.0));
        assert!(!result.inverted);
        assert_eq!(result.shapes.len(), 1);
    }

    #[test]
    fn test_outline_without_contours_falls_back() {
        let traces = vec![square(0.0, 0.0, 1.0)];
        let result = compute_clearance(&ClearanceRequest {
            traces: &traces,
            plate: PlateRegion::Outline(vec![vec![[0.0, 0.0], [1.0, 1.0]]]),
            padding: 0.0,
        });
        assert!(!result.inverted);
    }

    #[test]
    fn test_simplify_contour() {
        let c = vec![
            [0.0, 0.0],
            [0.0001, 0.0],
            [1.0, 0.0],
            [1.0, 1.0],
            [0.0, 0.0002],
        ];
        let s = simplify_contour(&c).unwrap();
        assert_eq!(s, vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]]);
        assert!(simplify_contour(&[[0.0, 0.0], [0.0, 0.0005], [1.0, 0.0]]).is_none());
    }
}
