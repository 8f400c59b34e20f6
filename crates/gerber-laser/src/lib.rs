pub mod error;
pub mod geometry;
pub mod gerber;
pub mod types;

use log::{debug, warn};
use serde::Deserialize;

use geometry::clearance::{compute_clearance, ClearanceRequest, PlateRegion};
use geometry::mirror::mirror_path;
use geometry::path::shapes_to_path_data;
use types::LayerGeometry;

/// Closed outline chains must meet within this distance (mm).
const OUTLINE_CLOSE_TOLERANCE: f64 = 1e-3;

/// Options for turning one Gerber layer into path geometry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConvertOptions {
    /// Produce clearance geometry (plate minus copper) instead of copper.
    pub invert: bool,
    /// Margin in mm around the copper when no board outline is given.
    pub padding: f64,
    /// Mirror horizontally, for bottom layers.
    pub mirror: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            invert: false,
            padding: 1.0,
            mirror: false,
        }
    }
}

/// Convert Gerber text into layer geometry.
///
/// Never fails: unreadable input yields an empty path with the zero box.
pub fn convert(content: &str, opts: &ConvertOptions) -> LayerGeometry {
    convert_with_plate(content, opts, None)
}

/// Like [`convert`], cutting clearances out of `plate` when one is given.
pub fn convert_with_plate(
    content: &str,
    opts: &ConvertOptions,
    plate: Option<&PlateRegion>,
) -> LayerGeometry {
    let plot = match gerber::parse_layer(content) {
        Ok(plot) => plot,
        Err(e) => {
            warn!("Skipping layer: {e}");
            return LayerGeometry::default();
        }
    };

    let mut geometry = if opts.invert {
        let req = ClearanceRequest {
            traces: &plot.shapes,
            plate: plate.cloned().unwrap_or(PlateRegion::Bounds(plot.bbox)),
            padding: opts.padding,
        };
        let result = compute_clearance(&req);
        if result.inverted {
            LayerGeometry {
                path: shapes_to_path_data(&result.shapes),
                bbox: result.bbox,
                inverted: true,
            }
        } else {
            LayerGeometry {
                path: plot.path_data(),
                bbox: plot.bbox,
                inverted: false,
            }
        }
    } else {
        LayerGeometry {
            path: plot.path_data(),
            bbox: plot.bbox,
            inverted: false,
        }
    };

    if opts.mirror {
        geometry.path = mirror_path(&geometry.path, &geometry.bbox);
    }
    debug!(
        "Layer: {} path bytes, inverted={}, mirrored={}",
        geometry.path.len(),
        geometry.inverted,
        opts.mirror
    );
    geometry
}

/// Derive a plate from a board outline layer.
///
/// Closed centre-line chains become the plate contours; an outline that
/// never closes falls back to its bounding rectangle.
pub fn plate_from_outline(content: &str) -> Option<PlateRegion> {
    let plot = match gerber::parse_layer(content) {
        Ok(plot) => plot,
        Err(e) => {
            warn!("Unusable outline layer: {e}");
            return None;
        }
    };

    let contours = plot.closed_centerlines(OUTLINE_CLOSE_TOLERANCE);
    if !contours.is_empty() {
        debug!("Outline: {} closed contours", contours.len());
        return Some(PlateRegion::Outline(contours));
    }
    if plot.bbox.is_empty() {
        return None;
    }
    warn!("Outline layer has no closed contour, using its bounding box");
    Some(PlateRegion::Outline(vec![plot.bbox.corners()]))
}
